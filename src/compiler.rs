//! Symbolic MNA (Modified Nodal Analysis) compiler.
//!
//! Converts a netlist into a symbolic MNA system for one analysis kind.
//!
//! # MNA System
//!
//! For n non-ground nodes and m branch variables the system is (n+m) x (n+m):
//!
//! ```text
//! [G B] [V]   [Is]
//! [C D] [I] = [Es]
//! ```
//!
//! The matrix starts at zero and every stamp only adds to it, so stamps can
//! be applied in any order. Reactive entries are written in terms of the
//! analysis kind's value of `s`: `epsilon` at DC, `jω` for AC, `j2πf` for
//! noise and the symbol `s` otherwise.
//!
//! # Stamps
//!
//! - **Admittance** Y between nodes i,j (R as 1/R, Z as 1/Z, Y, C as sC):
//!   G(i,i) += Y, G(j,j) += Y, G(i,j) -= Y, G(j,i) -= Y
//! - **Branch element** between nodes i,j with branch k (current entering i):
//!   B(i,k) += 1, C(k,i) += 1, B(j,k) -= 1, C(k,j) -= 1
//! - **Inductor**: branch element with D(k,k) -= sL; an initial current i0
//!   adds Es(k) -= L·i0
//! - **Capacitor** initial voltage v0: Is(i) += C·v0, Is(j) -= C·v0
//! - **Voltage source** / **wire**: branch element with Es(k) = V (0 for a wire)
//! - **Current source** I out of n+: Is(n+) += I, Is(n-) -= I
//! - **VCVS** gain A: branch element with C(k,c+) -= A, C(k,c-) += A.
//!   The ideal op-amp replaces the output KVL row by V(c+) - V(c-) = 0.
//! - **VCCS** gm out of o+: G(o+,c+) -= gm, G(o+,c-) += gm, and the
//!   negatives on row o-
//! - **CCCS** / **CCVS**: coupling to the controlling branch kc,
//!   B(o+,kc) -= gain, B(o-,kc) += gain / D(k,kc) -= r
//! - **Two-port** in chain form (TF, GY, TP, TL) with port branches k1, k2:
//!   row k1: V1 - A·V2 + B·I2 = 0, row k2: I1 - C·V2 + D·I2 = 0
//! - **Coupling** K between inductor branches b1, b2: D(b1,b2) -= sM,
//!   D(b2,b1) -= sM with M = k·sqrt(L1·L2)

use std::collections::HashMap;

use tracing::debug;

use crate::analysis::AnalysisKind;
use crate::cas::{self, Ratio, SymMatrix};
use crate::catalog::Kind;
use crate::error::{Result, SymnodalError};
use crate::ir::{is_ground, Component, Netlist, Params};
use crate::twoport::TwoPort;

/// Stamp operation of one catalog entry.
pub type StampFn = fn(&mut Stamper<'_>, &Component) -> Result<()>;

/// Unknown ordering: node voltages, then branch currents.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Node names in matrix-index order.
    pub node_names: Vec<String>,
    /// Branch variable names. Branch k has matrix index n_nodes + k.
    pub branch_names: Vec<String>,
    node_map: HashMap<String, usize>,
    branch_map: HashMap<String, usize>,
}

impl Layout {
    pub fn new(netlist: &Netlist) -> Self {
        let node_names = netlist.node_names();
        let node_map = node_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        let mut branch_names = Vec::new();
        let mut branch_map = HashMap::new();
        for c in &netlist.components {
            let count = c.kind.branches();
            if count == 0 {
                continue;
            }
            branch_map.insert(c.name.clone(), branch_names.len());
            branch_names.push(c.name.clone());
            for p in 2..=count {
                branch_names.push(format!("{}.{}", c.name, p));
            }
        }

        Self {
            node_names,
            branch_names,
            node_map,
            branch_map,
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.node_names.len()
    }

    pub fn size(&self) -> usize {
        self.node_names.len() + self.branch_names.len()
    }

    /// Matrix index of a node, or None for ground.
    pub fn node(&self, node: &str) -> Result<Option<usize>> {
        if is_ground(node) {
            return Ok(None);
        }
        self.node_map
            .get(node)
            .copied()
            .map(Some)
            .ok_or_else(|| SymnodalError::UnknownName {
                what: "node",
                name: node.to_string(),
            })
    }

    /// Matrix index of a component's `which`-th branch current.
    pub fn branch(&self, component: &str, which: usize) -> Result<usize> {
        self.branch_map
            .get(component)
            .map(|k| self.n_nodes() + k + which)
            .ok_or_else(|| {
                SymnodalError::Compile(format!("{} has no branch current unknown", component))
            })
    }

    pub fn has_branch(&self, component: &str) -> bool {
        self.branch_map.contains_key(component)
    }
}

/// What scales an excitation pattern.
#[derive(Debug, Clone)]
pub enum Drive {
    /// The named independent source's value in the analysis kind.
    Source(String),
    /// A fixed transform-domain value, from an initial condition.
    Fixed(Ratio),
}

/// A right-hand-side contribution: `drive` times a fixed sign pattern.
#[derive(Debug, Clone)]
pub struct Injection {
    pub drive: Drive,
    pub pattern: Vec<(usize, f64)>,
}

/// The compiled MNA system for one analysis kind.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    pub kind: AnalysisKind,
    pub layout: Layout,
    pub matrix: SymMatrix,
    pub injections: Vec<Injection>,
}

/// Accumulates stamps.
pub struct Stamper<'a> {
    kind: &'a AnalysisKind,
    s: Ratio,
    netlist: &'a Netlist,
    layout: &'a Layout,
    matrix: SymMatrix,
    injections: Vec<Injection>,
}

impl<'a> Stamper<'a> {
    fn new(netlist: &'a Netlist, kind: &'a AnalysisKind, layout: &'a Layout) -> Self {
        Self {
            kind,
            s: kind.s_value(),
            netlist,
            layout,
            matrix: SymMatrix::zeros(layout.size(), layout.size()),
            injections: Vec::new(),
        }
    }

    pub fn kind(&self) -> &AnalysisKind {
        self.kind
    }

    /// Value of `s` in this analysis kind.
    pub fn s(&self) -> &Ratio {
        &self.s
    }

    /// Evaluates a value that may depend on `s`.
    pub fn at_s(&self, r: &Ratio) -> Result<Ratio> {
        if r.contains(cas::S) {
            r.subs(cas::S, &self.s)
        } else {
            Ok(r.clone())
        }
    }

    pub fn node(&self, node: &str) -> Result<Option<usize>> {
        self.layout.node(node)
    }

    pub fn branch(&self, component: &str, which: usize) -> Result<usize> {
        self.layout.branch(component, which)
    }

    /// Adds `v` at (i, j); ground rows and columns are dropped.
    pub fn add(&mut self, i: Option<usize>, j: Option<usize>, v: &Ratio) {
        if let (Some(i), Some(j)) = (i, j) {
            if !v.is_zero() {
                self.matrix.add_at(i, j, v);
            }
        }
    }

    /// Two-terminal admittance between nodes a and b.
    pub fn admittance(&mut self, a: Option<usize>, b: Option<usize>, y: &Ratio) {
        let neg = y.neg();
        self.add(a, a, y);
        self.add(b, b, y);
        self.add(a, b, &neg);
        self.add(b, a, &neg);
    }

    /// Couples branch k to nodes a (current enters) and b (current leaves).
    pub fn kcl(&mut self, a: Option<usize>, b: Option<usize>, k: usize) {
        self.add(a, Some(k), &Ratio::one());
        self.add(b, Some(k), &Ratio::real(-1.0));
    }

    /// Writes `V(a) - V(b)` into branch row k.
    pub fn kvl(&mut self, k: usize, a: Option<usize>, b: Option<usize>) {
        self.add(Some(k), a, &Ratio::one());
        self.add(Some(k), b, &Ratio::real(-1.0));
    }

    /// Branch element between a and b with branch k.
    pub fn incidence(&mut self, a: Option<usize>, b: Option<usize>, k: usize) {
        self.kcl(a, b, k);
        self.kvl(k, a, b);
    }

    pub fn inject(&mut self, drive: Drive, pattern: Vec<(usize, f64)>) {
        if !pattern.is_empty() {
            self.injections.push(Injection { drive, pattern });
        }
    }

    fn finish(self) -> MnaSystem {
        MnaSystem {
            kind: self.kind.clone(),
            layout: self.layout.clone(),
            matrix: self.matrix,
            injections: self.injections,
        }
    }
}

fn pattern(entries: &[(Option<usize>, f64)]) -> Vec<(usize, f64)> {
    entries
        .iter()
        .filter_map(|(i, sign)| i.map(|i| (i, *sign)))
        .collect()
}

/// Compile a netlist into an MNA system for one analysis kind.
pub fn compile(netlist: &Netlist, kind: &AnalysisKind) -> Result<MnaSystem> {
    compile_with_layout(netlist, kind, &Layout::new(netlist))
}

/// Like [`compile`] with a given unknown ordering; `layout` must cover every
/// node and branch of `netlist`.
pub fn compile_with_layout(
    netlist: &Netlist,
    kind: &AnalysisKind,
    layout: &Layout,
) -> Result<MnaSystem> {
    debug!(
        kind = %kind,
        components = netlist.components.len(),
        nodes = layout.n_nodes(),
        branches = layout.branch_names.len(),
        "stamping MNA system"
    );
    let mut stamper = Stamper::new(netlist, kind, layout);
    for component in &netlist.components {
        (component.kind.entry().stamp)(&mut stamper, component)?;
    }
    Ok(stamper.finish())
}

/// Admittance of a two-terminal R, Z, Y or C in an analysis kind.
pub fn admittance_of(component: &Component, s: &Ratio) -> Result<Ratio> {
    let value = component.value()?;
    let y = match component.kind {
        Kind::Resistor | Kind::Impedance => {
            if value.is_zero() {
                return Err(SymnodalError::Compile(format!(
                    "{} {} has zero {}",
                    component.kind,
                    component.name,
                    if component.kind == Kind::Resistor {
                        "resistance"
                    } else {
                        "impedance"
                    }
                )));
            }
            value.inv()?
        }
        Kind::Admittance => value.clone(),
        Kind::Capacitor => return Ok(s.mul(value)),
        _ => {
            return Err(SymnodalError::Compile(format!(
                "{} {} is not a two-terminal admittance",
                component.kind, component.name
            )));
        }
    };
    if y.contains(cas::S) {
        y.subs(cas::S, s)
    } else {
        Ok(y)
    }
}

// ---------------------------------------------------------------------------
// Stamp functions
// ---------------------------------------------------------------------------

pub fn stamp_admittance(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (p, m) = c.terminals()?;
    let (a, b) = (st.node(p)?, st.node(m)?);
    let y = admittance_of(c, st.s())?;
    st.admittance(a, b, &y);
    Ok(())
}

pub fn stamp_capacitor(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    stamp_admittance(st, c)?;
    if let (Some(v0), true) = (c.initial_condition(), st.kind().uses_initial_conditions()) {
        let (p, m) = c.terminals()?;
        let (a, b) = (st.node(p)?, st.node(m)?);
        let q0 = c.value()?.mul(v0);
        st.inject(Drive::Fixed(q0), pattern(&[(a, 1.0), (b, -1.0)]));
    }
    Ok(())
}

pub fn stamp_inductor(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (p, m) = c.terminals()?;
    let (a, b) = (st.node(p)?, st.node(m)?);
    let k = st.branch(&c.name, 0)?;
    let l = c.value()?;
    st.incidence(a, b, k);
    let z = st.s().mul(l);
    st.add(Some(k), Some(k), &z.neg());
    if let (Some(i0), true) = (c.initial_condition(), st.kind().uses_initial_conditions()) {
        st.inject(Drive::Fixed(l.mul(i0).neg()), vec![(k, 1.0)]);
    }
    Ok(())
}

/// Voltage sources and wires.
pub fn stamp_voltage_source(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (p, m) = c.terminals()?;
    let (a, b) = (st.node(p)?, st.node(m)?);
    let k = st.branch(&c.name, 0)?;
    st.incidence(a, b, k);
    if c.kind == Kind::VoltageSource {
        st.inject(Drive::Source(c.name.clone()), vec![(k, 1.0)]);
    }
    Ok(())
}

pub fn stamp_current_source(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (p, m) = c.terminals()?;
    let (a, b) = (st.node(p)?, st.node(m)?);
    st.inject(Drive::Source(c.name.clone()), pattern(&[(a, 1.0), (b, -1.0)]));
    Ok(())
}

/// VCVS and op-amp.
pub fn stamp_vcvs(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (op, om, cp, cm) = c.ports()?;
    let (a, b) = (st.node(op)?, st.node(om)?);
    let (cp, cm) = (st.node(cp)?, st.node(cm)?);
    let k = st.branch(&c.name, 0)?;
    let gain = match &c.params {
        Params::Opamp { gain: None } => {
            st.kcl(a, b, k);
            st.kvl(k, cp, cm);
            return Ok(());
        }
        Params::Opamp { gain: Some(g) } => g,
        _ => c.value()?,
    };
    let gain = st.at_s(gain)?;
    st.incidence(a, b, k);
    st.add(Some(k), cp, &gain.neg());
    st.add(Some(k), cm, &gain);
    Ok(())
}

pub fn stamp_vccs(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (op, om, cp, cm) = c.ports()?;
    let (a, b) = (st.node(op)?, st.node(om)?);
    let (cp, cm) = (st.node(cp)?, st.node(cm)?);
    let gm = st.at_s(c.value()?)?;
    let neg = gm.neg();
    st.add(a, cp, &neg);
    st.add(a, cm, &gm);
    st.add(b, cp, &gm);
    st.add(b, cm, &neg);
    Ok(())
}

fn controlling_branch(st: &Stamper<'_>, c: &Component) -> Result<(usize, Ratio)> {
    let Params::Controlled { control, gain } = &c.params else {
        return Err(SymnodalError::Compile(format!("{} has no controlling component", c.name)));
    };
    st.netlist.get(control)?;
    if !st.layout.has_branch(control) {
        return Err(SymnodalError::Compile(format!(
            "{} is controlled by the current of {}, which is not a branch element",
            c.name, control
        )));
    }
    Ok((st.branch(control, 0)?, st.at_s(gain)?))
}

pub fn stamp_cccs(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (p, m) = c.terminals()?;
    let (a, b) = (st.node(p)?, st.node(m)?);
    let (kc, gain) = controlling_branch(st, c)?;
    st.add(a, Some(kc), &gain.neg());
    st.add(b, Some(kc), &gain);
    Ok(())
}

pub fn stamp_ccvs(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (p, m) = c.terminals()?;
    let (a, b) = (st.node(p)?, st.node(m)?);
    let k = st.branch(&c.name, 0)?;
    let (kc, r) = controlling_branch(st, c)?;
    st.incidence(a, b, k);
    st.add(Some(k), Some(kc), &r.neg());
    Ok(())
}

/// Chain parameters of a two-port component in an analysis kind.
pub fn chain_of(c: &Component, kind: &AnalysisKind) -> Result<TwoPort> {
    let s = kind.s_value();
    let at_s = |r: &Ratio| -> Result<Ratio> {
        if r.contains(cas::S) {
            r.subs(cas::S, &s)
        } else {
            Ok(r.clone())
        }
    };
    match (&c.params, c.kind) {
        (Params::Value { value, .. }, Kind::Transformer) => TwoPort::transformer(at_s(value)?),
        (Params::Value { value, .. }, Kind::Gyrator) => TwoPort::gyrator(at_s(value)?),
        (Params::TwoPort { params, m }, _) => {
            let m = [
                [at_s(&m[0][0])?, at_s(&m[0][1])?],
                [at_s(&m[1][0])?, at_s(&m[1][1])?],
            ];
            TwoPort::from_params(*params, &m)
        }
        (Params::Line { z0, delay }, _) => {
            let omega = match kind {
                AnalysisKind::Dc => Some(0.0),
                AnalysisKind::Ac(w) => w.as_f64(),
                _ => None,
            };
            let omega = omega.ok_or_else(|| SymnodalError::UnsupportedComponent {
                name: c.name.clone(),
                reason: format!(
                    "transmission lines are only supported in DC and numeric AC analysis, not {}",
                    kind
                ),
            })?;
            Ok(TwoPort::transmission_line(*z0, *delay, omega))
        }
        _ => Err(SymnodalError::Compile(format!("{} is not a two-port", c.name))),
    }
}

/// TF, GY, TP and TL.
pub fn stamp_two_port(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let (p1, m1, p2, m2) = c.ports()?;
    let (a1, b1, a2, b2) = (st.node(p1)?, st.node(m1)?, st.node(p2)?, st.node(m2)?);
    let (k1, k2) = (st.branch(&c.name, 0)?, st.branch(&c.name, 1)?);
    let t = chain_of(c, st.kind())?;

    st.kcl(a1, b1, k1);
    st.kcl(a2, b2, k2);

    st.kvl(k1, a1, b1);
    st.add(Some(k1), a2, &t.a.neg());
    st.add(Some(k1), b2, &t.a);
    st.add(Some(k1), Some(k2), &t.b);

    st.add(Some(k2), Some(k1), &Ratio::one());
    st.add(Some(k2), a2, &t.c.neg());
    st.add(Some(k2), b2, &t.c);
    st.add(Some(k2), Some(k2), &t.d);
    Ok(())
}

/// Mutual inductance `k·sqrt(L1·L2)`.
pub fn mutual_inductance(l1: &Ratio, l2: &Ratio, k: &Ratio) -> Result<Ratio> {
    let product = l1.mul(l2);
    let root = match product.as_real() {
        Some(p) if p >= 0.0 => Ratio::real(p.sqrt()),
        _ if l1 == l2 => l1.clone(),
        _ => {
            return Err(SymnodalError::Compile(format!(
                "coupling needs numeric or equal inductances, found {} and {}",
                l1, l2
            )));
        }
    };
    Ok(k.mul(&root))
}

pub fn stamp_coupling(st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let Params::Coupling { l1, l2, k } = &c.params else {
        return Err(SymnodalError::Compile(format!("{} is not a coupling", c.name)));
    };
    let (ind1, ind2) = (st.netlist.get(l1)?, st.netlist.get(l2)?);
    for ind in [ind1, ind2] {
        if ind.kind != Kind::Inductor {
            return Err(SymnodalError::Compile(format!(
                "{} couples {}, which is not an inductor",
                c.name, ind.name
            )));
        }
    }
    let m = mutual_inductance(ind1.value()?, ind2.value()?, k)?;
    let (b1, b2) = (st.branch(l1, 0)?, st.branch(l2, 0)?);
    let zm = st.s().mul(&m).neg();
    st.add(Some(b1), Some(b2), &zm);
    st.add(Some(b2), Some(b1), &zm);
    if st.kind().uses_initial_conditions() {
        for (row, other) in [(b1, ind2), (b2, ind1)] {
            if let Some(i0) = other.initial_condition() {
                st.inject(Drive::Fixed(m.mul(i0).neg()), vec![(row, 1.0)]);
            }
        }
    }
    Ok(())
}

/// Opens, ports.
pub fn stamp_nothing(_st: &mut Stamper<'_>, _c: &Component) -> Result<()> {
    Ok(())
}

pub fn stamp_unresolved_switch(_st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    Err(SymnodalError::UnsupportedComponent {
        name: c.name.clone(),
        reason: "switches must be resolved with replace_switches(t) before analysis".to_string(),
    })
}

pub fn stamp_unsupported(_st: &mut Stamper<'_>, c: &Component) -> Result<()> {
    let reason = match c.kind {
        Kind::Logic => "logic components have no linear model",
        _ => "non-linear components cannot be solved by linear analysis",
    };
    Err(SymnodalError::UnsupportedComponent {
        name: c.name.clone(),
        reason: format!("{} ({})", reason, c.kind),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Omega;
    use crate::parser;
    use crate::session::Session;
    use approx::assert_abs_diff_eq;

    fn netlist(text: &str) -> Netlist {
        parser::parse(text, &Session::new()).unwrap()
    }

    fn real(m: &SymMatrix, i: usize, j: usize) -> f64 {
        m.get(i, j).as_real().unwrap()
    }

    #[test]
    fn test_single_resistor_to_ground() {
        let mna = compile(&netlist("R1 1 0 1k"), &AnalysisKind::Laplace).unwrap();
        assert_eq!(mna.layout.size(), 1);
        assert_eq!(mna.layout.node_names, vec!["1"]);
        assert!(mna.layout.branch_names.is_empty());
        assert_abs_diff_eq!(real(&mna.matrix, 0, 0), 0.001, epsilon = 1e-12);
    }

    #[test]
    fn test_voltage_divider() {
        let mna = compile(
            &netlist("V1 1 0 5\nR1 1 2 1k\nR2 2 0 1k"),
            &AnalysisKind::Dc,
        )
        .unwrap();
        assert_eq!(mna.layout.size(), 3);
        assert_eq!(mna.layout.node_names, vec!["1", "2"]);
        assert_eq!(mna.layout.branch_names, vec!["V1"]);

        let m = &mna.matrix;
        assert_abs_diff_eq!(real(m, 0, 0), 0.001, epsilon = 1e-12);
        assert_abs_diff_eq!(real(m, 0, 1), -0.001, epsilon = 1e-12);
        assert_abs_diff_eq!(real(m, 0, 2), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(real(m, 1, 1), 0.002, epsilon = 1e-12);
        assert_abs_diff_eq!(real(m, 2, 0), 1.0, epsilon = 1e-12);
        assert!(m.get(2, 2).is_zero());

        assert_eq!(mna.injections.len(), 1);
        assert!(matches!(&mna.injections[0].drive, Drive::Source(n) if n == "V1"));
        assert_eq!(mna.injections[0].pattern, vec![(2, 1.0)]);
    }

    #[test]
    fn test_capacitor_uses_kind_s() {
        let n = netlist("C1 1 0 2");
        let dc = compile(&n, &AnalysisKind::Dc).unwrap();
        assert_eq!(
            dc.matrix.get(0, 0),
            &Ratio::symbol(cas::EPSILON).scale(cas::C64::new(2.0, 0.0))
        );
        let ac = compile(&n, &AnalysisKind::Ac(Omega::numeric(3.0))).unwrap();
        let y = ac.matrix.get(0, 0).as_constant().unwrap();
        assert_abs_diff_eq!(y.im, 6.0, epsilon = 1e-12);
        let s = compile(&n, &AnalysisKind::Laplace).unwrap();
        assert_eq!(s.matrix.get(0, 0), &Ratio::symbol(cas::S).scale(cas::C64::new(2.0, 0.0)));
    }

    #[test]
    fn test_inductor_stamps() {
        let mna = compile(&netlist("L1 1 0 1m"), &AnalysisKind::Laplace).unwrap();
        assert_eq!(mna.layout.branch_names, vec!["L1"]);
        assert_abs_diff_eq!(real(&mna.matrix, 0, 1), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(real(&mna.matrix, 1, 0), 1.0, epsilon = 1e-12);
        let d = mna.matrix.get(1, 1);
        assert_eq!(d, &Ratio::symbol(cas::S).scale(cas::C64::new(-1e-3, 0.0)));
    }

    #[test]
    fn test_initial_conditions_only_in_ivp() {
        let n = netlist("L1 1 0 2 3\nC1 1 0 4 5");
        assert!(compile(&n, &AnalysisKind::Laplace).unwrap().injections.is_empty());
        let ivp = compile(&n, &AnalysisKind::Ivp).unwrap();
        assert_eq!(ivp.injections.len(), 2);
        let fixed: Vec<f64> = ivp
            .injections
            .iter()
            .filter_map(|inj| match &inj.drive {
                Drive::Fixed(r) => r.as_real(),
                _ => None,
            })
            .collect();
        assert!(fixed.contains(&-6.0));
        assert!(fixed.contains(&20.0));
    }

    #[test]
    fn test_current_source_between_non_ground_nodes() {
        let mna = compile(&netlist("I1 1 2 1\nR1 1 0 1\nR2 2 0 1"), &AnalysisKind::Dc).unwrap();
        assert_eq!(mna.injections[0].pattern, vec![(0, 1.0), (1, -1.0)]);
    }

    #[test]
    fn test_ground_variants() {
        let mna = compile(&netlist("R1 1 GND 1\nR2 1 gnd 1\nR3 1 0 1"), &AnalysisKind::Dc).unwrap();
        assert_eq!(mna.layout.size(), 1);
        assert_abs_diff_eq!(real(&mna.matrix, 0, 0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_resistance_error() {
        let err = compile(&netlist("R1 1 0 0"), &AnalysisKind::Dc).unwrap_err();
        assert!(matches!(err, SymnodalError::Compile(_)));
    }

    #[test]
    fn test_stamps_are_additive() {
        let full = netlist("V1 1 0 1\nR1 1 2 R\nC1 2 0 C\nL1 2 3 L\nE1 3 0 2 0 A");
        let layout = Layout::new(&full);
        let kind = AnalysisKind::Laplace;
        let whole = compile_with_layout(&full, &kind, &layout).unwrap().matrix;
        let mut sum = SymMatrix::zeros(layout.size(), layout.size());
        for c in &full.components {
            let part = Netlist::with_components(vec![c.clone()]);
            sum = sum.add(&compile_with_layout(&part, &kind, &layout).unwrap().matrix).unwrap();
        }
        assert_eq!(whole, sum);

        let (a, b) = full.components.split_at(2);
        let ma = compile_with_layout(&Netlist::with_components(a.to_vec()), &kind, &layout).unwrap();
        let mb = compile_with_layout(&Netlist::with_components(b.to_vec()), &kind, &layout).unwrap();
        assert_eq!(whole, ma.matrix.add(&mb.matrix).unwrap());
    }

    #[test]
    fn test_vcvs_row() {
        let mna = compile(&netlist("E1 2 0 1 0 10\nR1 1 0 1\nR2 2 0 1"), &AnalysisKind::Dc).unwrap();
        let k = mna.layout.branch("E1", 0).unwrap();
        let out = mna.layout.node("2").unwrap().unwrap();
        let ctrl = mna.layout.node("1").unwrap().unwrap();
        assert_abs_diff_eq!(real(&mna.matrix, k, out), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(real(&mna.matrix, k, ctrl), -10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ideal_opamp_row() {
        let mna = compile(&netlist("E1 o 0 opamp p m\nR1 p 0 1\nR2 m 0 1\nR3 o 0 1"), &AnalysisKind::Dc)
            .unwrap();
        let k = mna.layout.branch("E1", 0).unwrap();
        let o = mna.layout.node("o").unwrap().unwrap();
        let p = mna.layout.node("p").unwrap().unwrap();
        assert!(mna.matrix.get(k, o).is_zero());
        assert_abs_diff_eq!(real(&mna.matrix, k, p), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_current_controlled_needs_branch() {
        let err = compile(&netlist("R1 1 0 1\nF1 1 0 R1 2"), &AnalysisKind::Dc).unwrap_err();
        assert!(matches!(err, SymnodalError::Compile(_)));
        assert!(compile(&netlist("V1 1 0 1\nR1 1 0 1\nF1 1 0 V1 2"), &AnalysisKind::Dc).is_ok());
    }

    #[test]
    fn test_transformer_rows() {
        let mna = compile(&netlist("TF1 1 0 2 0 3\nR1 2 0 1\nV1 1 0 1"), &AnalysisKind::Dc).unwrap();
        assert_eq!(mna.layout.branch_names, vec!["TF1", "TF1.2", "V1"]);
        let k1 = mna.layout.branch("TF1", 0).unwrap();
        let two = mna.layout.node("2").unwrap();
        assert_abs_diff_eq!(real(&mna.matrix, k1, two.unwrap()), -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejections() {
        let err = compile(&netlist("D1 1 0 dmod\nR1 1 0 1"), &AnalysisKind::Dc).unwrap_err();
        assert!(matches!(err, SymnodalError::UnsupportedComponent { ref name, .. } if name == "D1"));
        let err = compile(&netlist("SW1 1 0 no 1"), &AnalysisKind::Dc).unwrap_err();
        assert!(matches!(err, SymnodalError::UnsupportedComponent { .. }));
        let err = compile(&netlist("TL1 1 0 2 0 50 1n"), &AnalysisKind::Laplace).unwrap_err();
        assert!(matches!(err, SymnodalError::UnsupportedComponent { .. }));
    }

    #[test]
    fn test_coupling_stamp() {
        let mna = compile(&netlist("L1 1 0 4\nL2 2 0 1\nK1 L1 L2 0.5"), &AnalysisKind::Laplace).unwrap();
        let (b1, b2) = (
            mna.layout.branch("L1", 0).unwrap(),
            mna.layout.branch("L2", 0).unwrap(),
        );
        assert_eq!(mna.matrix.get(b1, b2), &Ratio::symbol(cas::S).neg());
        assert_eq!(mna.matrix.get(b2, b1), &Ratio::symbol(cas::S).neg());
    }
}
