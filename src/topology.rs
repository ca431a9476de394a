//! Circuit graph helpers.
//!
//! Series and parallel detection for the state-space checks, and the
//! structural diagnosis reported when an MNA system is singular.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::analysis::AnalysisKind;
use crate::catalog::Kind;
use crate::error::SymnodalError;
use crate::ir::{is_ground, Component, Netlist, Params};

const GROUND: &str = "0";

fn canonical(node: &str) -> &str {
    if is_ground(node) {
        GROUND
    } else {
        node
    }
}

/// Components attached to each node, ground folded into `"0"`.
pub fn adjacency(netlist: &Netlist) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for c in &netlist.components {
        let mut seen = BTreeSet::new();
        for n in &c.nodes {
            let n = canonical(n);
            if seen.insert(n) {
                out.entry(n.to_string()).or_default().push(c.name.clone());
            }
        }
    }
    out
}

fn two_terminal(c: &Component) -> Option<(&str, &str)> {
    match c.nodes.as_slice() {
        [a, b] => Some((canonical(a), canonical(b))),
        _ => None,
    }
}

/// Two-terminal components `a` and `b` share a non-ground node that nothing
/// else touches.
pub fn in_series(netlist: &Netlist, a: &str, b: &str) -> bool {
    let (Some(ca), Some(cb)) = (netlist.find(a), netlist.find(b)) else {
        return false;
    };
    let (Some((a1, a2)), Some((b1, b2))) = (two_terminal(ca), two_terminal(cb)) else {
        return false;
    };
    if a == b {
        return false;
    }
    let adj = adjacency(netlist);
    [a1, a2]
        .into_iter()
        .filter(|n| *n != GROUND && (*n == b1 || *n == b2))
        .any(|n| adj.get(n).is_some_and(|cs| cs.len() == 2))
}

/// Two-terminal components `a` and `b` connect the same pair of nodes.
pub fn in_parallel(netlist: &Netlist, a: &str, b: &str) -> bool {
    let (Some(ca), Some(cb)) = (netlist.find(a), netlist.find(b)) else {
        return false;
    };
    let (Some((a1, a2)), Some((b1, b2))) = (two_terminal(ca), two_terminal(cb)) else {
        return false;
    };
    a != b && a1 != a2 && ((a1 == b1 && a2 == b2) || (a1 == b2 && a2 == b1))
}

// ---------------------------------------------------------------------------
// Union-find over node names
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Sets {
    index: HashMap<String, usize>,
    parent: Vec<usize>,
}

impl Sets {
    fn id(&mut self, node: &str) -> usize {
        let node = canonical(node);
        if let Some(&i) = self.index.get(node) {
            return i;
        }
        let i = self.parent.len();
        self.parent.push(i);
        self.index.insert(node.to_string(), i);
        i
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Joins the sets of `a` and `b`; false if they were already joined.
    fn union(&mut self, a: &str, b: &str) -> bool {
        let (ia, ib) = (self.id(a), self.id(b));
        let (ra, rb) = (self.find(ia), self.find(ib));
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }
}

fn pair(n: &[String], a: usize, b: usize) -> (&str, &str) {
    (n[a].as_str(), n[b].as_str())
}

/// Node pairs a component forces to a fixed voltage difference.
fn voltage_edges<'a>(c: &'a Component, kind: &AnalysisKind) -> Vec<(&'a str, &'a str)> {
    let n = &c.nodes;
    match c.kind {
        Kind::VoltageSource | Kind::Wire | Kind::Ccvs => vec![pair(n, 0, 1)],
        Kind::Inductor if *kind == AnalysisKind::Dc => vec![pair(n, 0, 1)],
        Kind::Vcvs if n.len() == 4 => vec![pair(n, 0, 1)],
        Kind::Opamp if n.len() == 4 => match c.params {
            Params::Opamp { gain: None } => vec![pair(n, 2, 3)],
            _ => vec![pair(n, 0, 1)],
        },
        _ => Vec::new(),
    }
}

/// Node pairs a component connects with a finite, source-free conductance
/// path or a defined terminal voltage.
fn conducting_edges<'a>(c: &'a Component, kind: &AnalysisKind) -> Vec<(&'a str, &'a str)> {
    let n = &c.nodes;
    match c.kind {
        Kind::CurrentSource | Kind::Vccs | Kind::Cccs | Kind::Open | Kind::Port | Kind::Coupling => {
            Vec::new()
        }
        Kind::Capacitor if *kind == AnalysisKind::Dc => Vec::new(),
        Kind::Transformer | Kind::Gyrator | Kind::TwoPort | Kind::TransmissionLine
            if n.len() == 4 =>
        {
            vec![pair(n, 0, 1), pair(n, 2, 3)]
        }
        Kind::Vcvs | Kind::Opamp if n.len() == 4 => vec![pair(n, 0, 1)],
        _ if n.len() >= 2 => vec![pair(n, 0, 1)],
        _ => Vec::new(),
    }
}

/// First component that closes a loop of voltage-defining elements.
pub fn voltage_loop(netlist: &Netlist, kind: &AnalysisKind) -> Option<String> {
    let mut sets = Sets::default();
    for c in &netlist.components {
        for (a, b) in voltage_edges(c, kind) {
            if !sets.union(a, b) {
                return Some(c.name.clone());
            }
        }
    }
    None
}

/// Groups of nodes with no conducting path to ground.
pub fn floating_groups(netlist: &Netlist, kind: &AnalysisKind) -> Vec<Vec<String>> {
    let mut sets = Sets::default();
    sets.id(GROUND);
    for c in &netlist.components {
        for n in &c.nodes {
            sets.id(n);
        }
        for (a, b) in conducting_edges(c, kind) {
            sets.union(a, b);
        }
    }
    let ground = sets.id(GROUND);
    let ground = sets.find(ground);
    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut names: Vec<(String, usize)> = sets.index.iter().map(|(k, v)| (k.clone(), *v)).collect();
    names.sort();
    for (name, i) in names {
        let root = sets.find(i);
        if root != ground {
            groups.entry(root).or_default().push(name);
        }
    }
    groups.into_values().collect()
}

/// Explains a singular MNA system by its topology.
pub fn diagnose(netlist: &Netlist, kind: &AnalysisKind, fallback: &str) -> SymnodalError {
    if let Some(name) = voltage_loop(netlist, kind) {
        let extra = if *kind == AnalysisKind::Dc {
            ", wires or inductors"
        } else {
            " or wires"
        };
        return SymnodalError::StructuralDegeneracy {
            cause: format!(
                "{} closes a loop of voltage sources{} in {} analysis",
                name, extra, kind
            ),
            hint: "add series resistance to the loop or remove a redundant source".to_string(),
        };
    }
    let groups = floating_groups(netlist, kind);
    if let Some(group) = groups.first() {
        let via = if *kind == AnalysisKind::Dc {
            "current sources, capacitors or open circuits"
        } else {
            "current sources or open circuits"
        };
        return SymnodalError::StructuralDegeneracy {
            cause: format!(
                "node(s) {} connect to ground only through {} (a cut-set) in {} analysis",
                group.join(", "),
                via,
                kind
            ),
            hint: "add a resistive path from these nodes to ground".to_string(),
        };
    }
    SymnodalError::StructuralDegeneracy {
        cause: fallback.to_string(),
        hint: "check controlled-source gains and two-port parameters for degenerate values"
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::session::Session;

    fn netlist(text: &str) -> Netlist {
        parser::parse(text, &Session::new()).unwrap()
    }

    #[test]
    fn test_series_detection() {
        let n = netlist("V1 1 0 1\nR1 1 2 1\nR2 2 0 1\nR3 2 3 1\nR4 3 0 1");
        assert!(!in_series(&n, "R1", "R2"));
        assert!(in_series(&n, "R3", "R4"));
        let n = netlist("V1 1 0 1\nR1 1 2 1\nL1 2 0 1");
        assert!(in_series(&n, "R1", "L1"));
        assert!(!in_series(&n, "V1", "L1"));
    }

    #[test]
    fn test_parallel_detection() {
        let n = netlist("V1 1 0 1\nC1 0 1 1\nR1 1 2 1");
        assert!(in_parallel(&n, "V1", "C1"));
        assert!(!in_parallel(&n, "V1", "R1"));
    }

    #[test]
    fn test_voltage_loop() {
        let n = netlist("V1 1 0 1\nV2 1 0 2\nR1 1 0 1");
        assert_eq!(voltage_loop(&n, &AnalysisKind::Laplace).as_deref(), Some("V2"));
        let n = netlist("V1 1 0 1\nL1 1 0 1");
        assert!(voltage_loop(&n, &AnalysisKind::Laplace).is_none());
        assert_eq!(voltage_loop(&n, &AnalysisKind::Dc).as_deref(), Some("L1"));
    }

    #[test]
    fn test_floating_groups() {
        let n = netlist("I1 0 1 1\nR1 1 2 1\nC1 2 0 1");
        assert!(floating_groups(&n, &AnalysisKind::Laplace).is_empty());
        assert_eq!(
            floating_groups(&n, &AnalysisKind::Dc),
            vec![vec!["1".to_string(), "2".to_string()]]
        );
    }

    #[test]
    fn test_diagnosis_names_the_loop() {
        let n = netlist("V1 1 0 1\nV2 1 0 2");
        match diagnose(&n, &AnalysisKind::Dc, "singular") {
            SymnodalError::StructuralDegeneracy { cause, .. } => assert!(cause.contains("V2")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
