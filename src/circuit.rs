//! Circuits: netlist plus cached solutions per analysis kind.
//!
//! Voltages and currents come back as superpositions. Each source part is
//! solved in its own analysis kind (DC, each AC frequency, transient, each
//! noise process) and the per-kind solutions are cached; a kind is solved at
//! most once per circuit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::analysis::{self, AnalysisKind, Solution};
use crate::cas::{self, Ratio};
use crate::catalog::Kind;
use crate::compiler;
use crate::error::{Result, SymnodalError};
use crate::expr::{Expr, Quantity};
use crate::immittance::Immittance;
use crate::ir::{is_ground, Component, Netlist, Params, SwitchMode};
use crate::parser;
use crate::session::Session;
use crate::superposition::Superposition;

/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.380_649e-23;

const TEST_SOURCE: &str = "(test)";

pub struct Circuit {
    session: Arc<Session>,
    netlist: Netlist,
    cache: Mutex<HashMap<AnalysisKind, Arc<Solution>>>,
}

impl Clone for Circuit {
    fn clone(&self) -> Self {
        Self::new(self.netlist.clone(), self.session.clone())
    }
}

impl std::fmt::Debug for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Circuit")
            .field("components", &self.netlist.components.len())
            .finish()
    }
}

/// Thevenin equivalent seen between two nodes.
#[derive(Debug, Clone)]
pub struct Thevenin {
    pub voc: Superposition,
    pub z: Immittance,
}

/// Norton equivalent seen between two nodes.
#[derive(Debug, Clone)]
pub struct Norton {
    pub isc: Superposition,
    pub y: Immittance,
}

fn at_s(r: &Ratio, s: &Ratio) -> Result<Ratio> {
    if r.contains(cas::S) {
        r.subs(cas::S, s)
    } else {
        Ok(r.clone())
    }
}

fn laplace_source(name: &str, kind: Kind, nodes: [&str; 2], value: Ratio) -> Result<Component> {
    let quantity = match kind {
        Kind::VoltageSource => Quantity::Voltage,
        _ => Quantity::Current,
    };
    let e = Expr::laplace_ratio(value)?.with_quantity(quantity);
    Ok(Component {
        name: name.to_string(),
        kind,
        nodes: nodes.iter().map(|n| n.to_string()).collect(),
        params: Params::Source(Superposition::from_expr(e)?),
        options: Vec::new(),
    })
}

impl Circuit {
    pub fn new(netlist: Netlist, session: Arc<Session>) -> Self {
        Self {
            session,
            netlist,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Parses a netlist; noise sources draw identities from `session`.
    pub fn parse(text: &str, session: Arc<Session>) -> Result<Self> {
        let netlist = parser::parse(text, &session)?;
        Ok(Self::new(netlist, session))
    }

    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn derived(&self, components: Vec<Component>) -> Circuit {
        Circuit::new(Netlist::with_components(components), self.session.clone())
    }

    fn check_node(&self, node: &str) -> Result<()> {
        if self.netlist.has_node(node) {
            Ok(())
        } else {
            Err(SymnodalError::UnknownName {
                what: "node",
                name: node.to_string(),
            })
        }
    }

    /// Solution of one analysis kind, solved on first request.
    pub fn solution(&self, kind: &AnalysisKind) -> Result<Arc<Solution>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sol) = cache.get(kind) {
            debug!(kind = %kind, "solution cache hit");
            return Ok(sol.clone());
        }
        let sol = Arc::new(analysis::solve(&self.netlist, kind)?);
        cache.insert(kind.clone(), sol.clone());
        Ok(sol)
    }

    /// Whether a solution of `kind` is cached.
    pub fn is_solved(&self, kind: &AnalysisKind) -> bool {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.contains_key(kind)
    }

    /// Analysis kinds this circuit's sources need.
    pub fn kinds(&self) -> Result<Vec<AnalysisKind>> {
        analysis::kinds_for(&self.netlist)
    }

    /// Sums one result over every analysis kind.
    fn collect<F>(&self, quantity: Quantity, mut f: F) -> Result<Superposition>
    where
        F: FnMut(&Solution) -> Result<Expr>,
    {
        let mut out = Superposition::new(quantity);
        for kind in self.kinds()? {
            let sol = self.solution(&kind)?;
            out.add_expr(f(&sol)?.with_quantity(quantity))?;
        }
        Ok(out)
    }

    pub fn node_voltage(&self, node: &str) -> Result<Superposition> {
        self.voltage_between(node, "0")
    }

    /// `V(a) - V(b)`.
    pub fn voltage_between(&self, a: &str, b: &str) -> Result<Superposition> {
        self.check_node(a)?;
        self.check_node(b)?;
        self.collect(Quantity::Voltage, |sol| sol.voltage_between(a, b))
    }

    /// Every non-ground node voltage, in netlist order.
    pub fn node_voltages(&self) -> Result<Vec<(String, Superposition)>> {
        self.netlist
            .node_names()
            .into_iter()
            .map(|n| {
                let v = self.node_voltage(&n)?;
                Ok((n, v))
            })
            .collect()
    }

    pub fn cpt(&self, name: &str) -> Result<CptRef<'_>> {
        Ok(CptRef {
            circuit: self,
            component: self.netlist.get(name)?,
        })
    }

    /// Current through a component, entering its positive terminal.
    pub fn current(&self, name: &str) -> Result<Superposition> {
        self.cpt(name)?.current()
    }

    // -----------------------------------------------------------------------
    // Derived circuits
    // -----------------------------------------------------------------------

    fn killed(c: &Component) -> Component {
        match c.kind {
            Kind::VoltageSource => Component {
                params: Params::Source(Superposition::new(Quantity::Voltage)),
                ..c.clone()
            },
            Kind::CurrentSource => Component {
                kind: Kind::Open,
                params: Params::None,
                ..c.clone()
            },
            _ => c.clone(),
        }
    }

    /// Independent voltage sources shorted and current sources opened.
    pub fn kill(&self) -> Circuit {
        self.kill_except(&[])
    }

    /// Like [`Circuit::kill`], keeping the named sources.
    pub fn kill_except(&self, keep: &[&str]) -> Circuit {
        let components = self
            .netlist
            .components
            .iter()
            .map(|c| {
                if keep.contains(&c.name.as_str()) {
                    c.clone()
                } else {
                    Self::killed(c)
                }
            })
            .collect();
        self.derived(components)
    }

    /// Sources killed and initial conditions cleared.
    fn dead_netlist(&self) -> Result<Netlist> {
        let components = self
            .netlist
            .components
            .iter()
            .map(|c| {
                let c = Self::killed(c);
                if c.initial_condition().is_some() {
                    c.with_initial_condition(None)
                } else {
                    Ok(c)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Netlist::with_components(components))
    }

    /// Replaces a symbol by a value in every component.
    pub fn subs(&self, symbol: &str, value: &Ratio) -> Result<Circuit> {
        let components = self
            .netlist
            .components
            .iter()
            .map(|c| c.map_values(|r| r.subs(symbol, value)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.derived(components))
    }

    /// Substitutes numeric values for symbols.
    pub fn with_values(&self, values: &HashMap<String, f64>) -> Result<Circuit> {
        let mut out = self.clone();
        for (symbol, v) in values {
            out = out.subs(symbol, &Ratio::real(*v))?;
        }
        Ok(out)
    }

    /// Times at which some switch changes state, ascending.
    pub fn switching_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .netlist
            .components
            .iter()
            .filter_map(|c| match c.params {
                Params::Switch { at, .. } => Some(at),
                _ => None,
            })
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// Resolves every switch to its state at time `t`: a switch has acted
    /// once `t >= at`. Closed switches become wires and open ones are removed.
    pub fn replace_switches(&self, t: f64) -> Circuit {
        let mut components = Vec::new();
        for c in &self.netlist.components {
            let Params::Switch { mode, at } = c.params else {
                components.push(c.clone());
                continue;
            };
            let acted = t >= at;
            let wire = |nodes: Vec<String>| Component {
                kind: Kind::Wire,
                nodes,
                params: Params::None,
                ..c.clone()
            };
            match (mode, acted) {
                (SwitchMode::NormallyOpen, true) | (SwitchMode::NormallyClosed, false) => {
                    components.push(wire(c.nodes[..2].to_vec()));
                }
                (SwitchMode::NormallyOpen, false) | (SwitchMode::NormallyClosed, true) => {}
                (SwitchMode::Changeover, acted) => {
                    let throw = if acted { &c.nodes[2] } else { &c.nodes[1] };
                    components.push(wire(vec![c.nodes[0].clone(), throw.clone()]));
                }
            }
        }
        self.derived(components)
    }

    /// Adds a thermal noise current source across every numeric resistor at
    /// `temperature` kelvin.
    pub fn noisy(&self, temperature: f64) -> Result<Circuit> {
        let mut components = self.netlist.components.clone();
        for c in &self.netlist.components {
            if c.kind != Kind::Resistor {
                continue;
            }
            let Some(r) = c.value()?.as_real() else {
                warn!(resistor = %c.name, "skipping thermal noise of a symbolic resistance");
                continue;
            };
            if r <= 0.0 {
                continue;
            }
            let asd = (4.0 * BOLTZMANN * temperature / r).sqrt();
            let nid = self.session.next_nid();
            let e = Expr::noise_f(nid, Ratio::real(asd))?.with_quantity(Quantity::Current);
            components.push(Component {
                name: format!("Inoise_{}", c.name),
                kind: Kind::CurrentSource,
                nodes: c.nodes.clone(),
                params: Params::Source(Superposition::from_expr(e)?),
                options: Vec::new(),
            });
        }
        Ok(self.derived(components))
    }

    /// Copies capacitor voltages and inductor currents of `other` at time `t`
    /// into this circuit's initial conditions.
    pub fn initialize_from(&self, other: &Circuit, t: f64) -> Result<Circuit> {
        let components = self
            .netlist
            .components
            .iter()
            .map(|c| {
                let waveform = match (c.kind, other.netlist.find(&c.name)) {
                    (Kind::Capacitor, Some(_)) => other.cpt(&c.name)?.v()?,
                    (Kind::Inductor, Some(_)) => other.cpt(&c.name)?.i()?,
                    _ => return Ok(c.clone()),
                };
                let value = waveform.transient_response(&[t])?[0];
                c.with_initial_condition(Some(Ratio::real(value)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.derived(components))
    }

    // -----------------------------------------------------------------------
    // Network functions
    // -----------------------------------------------------------------------

    /// Driving-point impedance between two nodes, sources killed.
    pub fn impedance(&self, n1: &str, n2: &str) -> Result<Expr> {
        self.check_node(n1)?;
        self.check_node(n2)?;
        let mut netlist = self.dead_netlist()?;
        netlist.components.push(laplace_source(
            TEST_SOURCE,
            Kind::CurrentSource,
            [n1, n2],
            Ratio::one(),
        )?);
        let sol = analysis::solve(&netlist, &AnalysisKind::Laplace)?;
        Ok(sol.voltage_between(n1, n2)?.with_quantity(Quantity::Impedance))
    }

    pub fn admittance(&self, n1: &str, n2: &str) -> Result<Expr> {
        let z = self.impedance(n1, n2)?;
        let y = z.ratio().ok_or_else(|| {
            SymnodalError::Analysis(format!("impedance {} is not rational", z))
        })?;
        Ok(Expr::laplace_ratio(y.inv()?)?.with_quantity(Quantity::Admittance))
    }

    /// `V(n3, n4) / V(n1, n2)` for a voltage applied across `n1, n2`.
    pub fn transfer(&self, n1: &str, n2: &str, n3: &str, n4: &str) -> Result<Expr> {
        for n in [n1, n2, n3, n4] {
            self.check_node(n)?;
        }
        let mut netlist = self.dead_netlist()?;
        // A shorted source across the input would fight the test source.
        let same = |a: &str, b: &str| a == b || (is_ground(a) && is_ground(b));
        netlist.components.retain(|c| {
            c.kind != Kind::VoltageSource
                || c.nodes.len() != 2
                || !((same(&c.nodes[0], n1) && same(&c.nodes[1], n2))
                    || (same(&c.nodes[0], n2) && same(&c.nodes[1], n1)))
        });
        netlist.components.push(laplace_source(
            TEST_SOURCE,
            Kind::VoltageSource,
            [n1, n2],
            Ratio::one(),
        )?);
        let sol = analysis::solve(&netlist, &AnalysisKind::Laplace)?;
        Ok(sol.voltage_between(n3, n4)?.with_quantity(Quantity::Transfer))
    }

    pub fn thevenin(&self, n1: &str, n2: &str) -> Result<Thevenin> {
        let voc = self.voltage_between(n1, n2)?;
        let z = Immittance::from_expr(&self.impedance(n1, n2)?)?;
        Ok(Thevenin { voc, z })
    }

    pub fn norton(&self, n1: &str, n2: &str) -> Result<Norton> {
        let Thevenin { voc, z } = self.thevenin(n1, n2)?;
        let isc = voc.div_immittance(&z)?;
        Ok(Norton {
            isc,
            y: z.invert()?,
        })
    }
}

/// A component viewed in its circuit.
#[derive(Debug, Clone, Copy)]
pub struct CptRef<'a> {
    circuit: &'a Circuit,
    component: &'a Component,
}

impl<'a> CptRef<'a> {
    pub fn component(&self) -> &'a Component {
        self.component
    }

    fn terminals(&self) -> Result<(&'a str, &'a str)> {
        self.component.terminals()
    }

    /// Voltage across the component, positive terminal first.
    pub fn voltage(&self) -> Result<Superposition> {
        let (p, m) = self.terminals()?;
        self.circuit.voltage_between(p, m)
    }

    /// Current entering the positive terminal.
    pub fn current(&self) -> Result<Superposition> {
        let c = self.component;
        if c.kind == Kind::CurrentSource {
            let src = c.source().ok_or_else(|| {
                SymnodalError::Analysis(format!("{} has no source value", c.name))
            })?;
            // The source drives its current out of the positive terminal.
            return Ok(src.neg());
        }
        self.circuit
            .collect(Quantity::Current, |sol| self.current_in(sol))
    }

    fn current_in(&self, sol: &Solution) -> Result<Expr> {
        let c = self.component;
        let layout = &sol.layout;
        if layout.has_branch(&c.name) {
            return sol.branch_current(&c.name);
        }
        let s = sol.kind.s_value();
        let pair = |a: &str, b: &str, k: &Ratio| -> Result<Vec<(usize, Ratio)>> {
            let mut combo = Vec::new();
            if let Some(i) = layout.node(a)? {
                combo.push((i, k.clone()));
            }
            if let Some(i) = layout.node(b)? {
                combo.push((i, k.neg()));
            }
            Ok(combo)
        };
        let combo = match c.kind {
            Kind::Resistor | Kind::Impedance | Kind::Admittance | Kind::Capacitor => {
                let (p, m) = c.terminals()?;
                pair(p, m, &compiler::admittance_of(c, &s)?)?
            }
            Kind::Vccs => {
                let (_, _, cp, cm) = c.ports()?;
                pair(cp, cm, &at_s(c.value()?, &s)?.neg())?
            }
            Kind::Cccs => {
                let Params::Controlled { control, gain } = &c.params else {
                    return Err(SymnodalError::Compile(format!("{} has no control", c.name)));
                };
                vec![(layout.branch(control, 0)?, at_s(gain, &s)?.neg())]
            }
            Kind::Open | Kind::Port => Vec::new(),
            _ => {
                return Err(SymnodalError::Analysis(format!(
                    "{} {} has no terminal current",
                    c.kind, c.name
                )));
            }
        };
        let i = sol.combine(&combo)?;
        match (c.kind, c.initial_condition(), sol.kind.uses_initial_conditions()) {
            (Kind::Capacitor, Some(v0), true) => {
                let q0 = Expr::laplace_ratio(c.value()?.mul(v0))?;
                (&i - &q0).map(Expr::as_current)
            }
            _ => Ok(i.as_current()),
        }
    }

    /// Time-domain voltage.
    pub fn v(&self) -> Result<Expr> {
        self.voltage()?.time()
    }

    /// Time-domain current.
    pub fn i(&self) -> Result<Expr> {
        self.current()?.time()
    }

    /// Self impedance, sources killed.
    pub fn impedance(&self) -> Result<Immittance> {
        let c = self.component;
        match c.kind {
            Kind::Resistor => Immittance::resistance(c.value()?.clone()),
            Kind::Inductor => Immittance::inductance(c.value()?.clone()),
            Kind::Capacitor => Immittance::capacitance(c.value()?.clone()),
            Kind::Impedance => Immittance::impedance(c.value()?.clone()),
            Kind::Admittance => Immittance::admittance(c.value()?.clone()),
            Kind::VoltageSource | Kind::Wire => Immittance::impedance(Ratio::zero()),
            Kind::CurrentSource | Kind::Open => Immittance::admittance(Ratio::zero()),
            _ => Err(SymnodalError::Analysis(format!(
                "{} {} has no two-terminal immittance",
                c.kind, c.name
            ))),
        }
    }

    pub fn admittance(&self) -> Result<Immittance> {
        self.impedance()?.invert()
    }

    /// Open-circuit voltage of the component on its own.
    pub fn voc(&self) -> Result<Superposition> {
        let c = self.component;
        let s = Ratio::symbol(cas::S);
        let laplace = |r: Ratio| -> Result<Superposition> {
            Superposition::from_expr(Expr::laplace_ratio(r)?.with_quantity(Quantity::Voltage))
        };
        match (c.kind, c.initial_condition()) {
            (Kind::VoltageSource, _) => Ok(c.source().cloned().unwrap_or_else(Superposition::voltage)),
            (Kind::Capacitor, Some(v0)) => laplace(v0.div(&s)?),
            (Kind::Inductor, Some(i0)) => laplace(c.value()?.mul(i0).neg()),
            (Kind::Resistor | Kind::Inductor | Kind::Capacitor | Kind::Impedance | Kind::Admittance | Kind::Wire, _) => {
                Ok(Superposition::voltage())
            }
            _ => Err(SymnodalError::Analysis(format!(
                "{} {} has no finite open-circuit voltage",
                c.kind, c.name
            ))),
        }
    }

    /// Short-circuit current of the component on its own, flowing out of the
    /// positive terminal through the short.
    pub fn isc(&self) -> Result<Superposition> {
        let c = self.component;
        let s = Ratio::symbol(cas::S);
        let laplace = |r: Ratio| -> Result<Superposition> {
            Superposition::from_expr(Expr::laplace_ratio(r)?.with_quantity(Quantity::Current))
        };
        match (c.kind, c.initial_condition()) {
            (Kind::CurrentSource, _) => Ok(c.source().cloned().unwrap_or_else(Superposition::current)),
            (Kind::Capacitor, Some(v0)) => laplace(c.value()?.mul(v0)),
            (Kind::Inductor, Some(i0)) => laplace(i0.div(&s)?.neg()),
            (Kind::Resistor | Kind::Inductor | Kind::Capacitor | Kind::Impedance | Kind::Admittance | Kind::Open, _) => {
                Ok(Superposition::current())
            }
            _ => Err(SymnodalError::Analysis(format!(
                "{} {} has no finite short-circuit current",
                c.kind, c.name
            ))),
        }
    }

    /// Impedance seen across the component in place, sources killed.
    pub fn dp_impedance(&self) -> Result<Expr> {
        let (p, m) = self.terminals()?;
        self.circuit.impedance(p, m)
    }

    pub fn dp_admittance(&self) -> Result<Expr> {
        let (p, m) = self.terminals()?;
        self.circuit.admittance(p, m)
    }

    /// Voltage across the component's terminals with the component removed.
    pub fn dp_voc(&self) -> Result<Superposition> {
        let (p, m) = self.terminals()?;
        let rest = self.without()?;
        rest.voltage_between(p, m)
    }

    /// Current through a short replacing the component.
    pub fn dp_isc(&self) -> Result<Superposition> {
        let c = self.component;
        let (p, m) = self.terminals()?;
        let components = self
            .circuit
            .netlist
            .components
            .iter()
            .map(|other| {
                if other.name == c.name {
                    Component {
                        name: c.name.clone(),
                        kind: Kind::Wire,
                        nodes: vec![p.to_string(), m.to_string()],
                        params: Params::None,
                        options: Vec::new(),
                    }
                } else {
                    other.clone()
                }
            })
            .collect();
        let shorted = self.circuit.derived(components);
        shorted.current(&c.name)
    }

    fn without(&self) -> Result<Circuit> {
        let name = &self.component.name;
        let components: Vec<Component> = self
            .circuit
            .netlist
            .components
            .iter()
            .filter(|c| &c.name != name)
            .cloned()
            .collect();
        let (p, m) = self.terminals()?;
        for n in [p, m] {
            if !is_ground(n) && !components.iter().any(|c| c.nodes.iter().any(|x| x == n)) {
                return Err(SymnodalError::Analysis(format!(
                    "node {} is only connected through {}",
                    n, name
                )));
            }
        }
        Ok(self.circuit.derived(components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::superposition::Key;
    use approx::assert_abs_diff_eq;

    fn circuit(text: &str) -> Circuit {
        Circuit::parse(text, Session::new()).unwrap()
    }

    fn dc_value(s: &Superposition) -> f64 {
        s.dc().unwrap().ratio().unwrap().as_real().unwrap()
    }

    #[test]
    fn test_divider_voltages_and_currents() {
        let c = circuit("V1 1 0 10\nRa 1 2 1\nRb 2 0 1");
        assert_abs_diff_eq!(dc_value(&c.node_voltage("2").unwrap()), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dc_value(&c.current("Ra").unwrap()), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dc_value(&c.current("Rb").unwrap()), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dc_value(&c.cpt("Ra").unwrap().voltage().unwrap()), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solutions_are_cached() {
        let c = circuit("V1 1 0 10\nR1 1 0 1");
        let a = c.solution(&AnalysisKind::Dc).unwrap();
        let b = c.solution(&AnalysisKind::Dc).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_node() {
        let c = circuit("V1 1 0 10\nR1 1 0 1");
        assert!(matches!(
            c.node_voltage("9").unwrap_err(),
            SymnodalError::UnknownName { what: "node", .. }
        ));
    }

    #[test]
    fn test_series_and_parallel_impedance() {
        let c = circuit("R1 1 2 R1\nR2 2 0 R2");
        let z = c.impedance("1", "0").unwrap().ratio().unwrap();
        assert_eq!(z, Ratio::symbol("R1").add(&Ratio::symbol("R2")));

        let c = circuit("R1 1 0 R1\nR2 1 0 R2");
        let z = c.impedance("1", "0").unwrap().ratio().unwrap();
        let (r1, r2) = (Ratio::symbol("R1"), Ratio::symbol("R2"));
        assert_eq!(z, r1.mul(&r2).div(&r1.add(&r2)).unwrap());
    }

    #[test]
    fn test_impedance_kills_sources() {
        let c = circuit("V1 1 0 5\nR1 1 2 2\nR2 2 0 2");
        let z = c.impedance("2", "0").unwrap().ratio().unwrap();
        assert_abs_diff_eq!(z.as_real().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rc_transfer() {
        let c = circuit("R1 1 2 1\nC1 2 0 1");
        let h = c.transfer("1", "0", "2", "0").unwrap();
        assert_eq!(h.quantity(), Quantity::Transfer);
        let poles = h.poles().unwrap();
        assert_eq!(poles.len(), 1);
        assert_abs_diff_eq!(poles[0].numeric().unwrap().re, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_thevenin_and_norton() {
        let c = circuit("V1 1 0 10\nR1 1 2 2\nR2 2 0 2");
        let th = c.thevenin("2", "0").unwrap();
        assert_abs_diff_eq!(dc_value(&th.voc), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(th.z.z().unwrap().as_real().unwrap(), 1.0, epsilon = 1e-12);
        let no = c.norton("2", "0").unwrap();
        assert_abs_diff_eq!(dc_value(&no.isc), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_driving_point_quantities() {
        let c = circuit("V1 1 0 10\nR1 1 2 2\nR2 2 0 2");
        let r2 = c.cpt("R2").unwrap();
        assert_abs_diff_eq!(dc_value(&r2.dp_voc().unwrap()), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dc_value(&r2.dp_isc().unwrap()), 5.0, epsilon = 1e-12);
        let z = r2.dp_impedance().unwrap().ratio().unwrap();
        assert_abs_diff_eq!(z.as_real().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_isolated_sources() {
        let c = circuit("V1 1 0 3\nI1 1 0 2\nC1 1 0 1 4");
        assert_abs_diff_eq!(dc_value(&c.cpt("V1").unwrap().voc().unwrap()), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dc_value(&c.cpt("I1").unwrap().isc().unwrap()), 2.0, epsilon = 1e-12);
        assert!(c.cpt("I1").unwrap().voc().is_err());
        let voc = c.cpt("C1").unwrap().voc().unwrap();
        assert_eq!(voc.kinds().unwrap(), vec![Key::S]);
    }

    #[test]
    fn test_kill_and_subs() {
        let c = circuit("V1 1 0 V\nI1 0 1 2\nR1 1 0 R");
        let dead = c.kill_except(&["I1"]);
        let c2 = dead.subs("R", &Ratio::real(3.0)).unwrap();
        assert_abs_diff_eq!(dc_value(&c2.current("V1").unwrap()), -2.0, epsilon = 1e-12);
        let v = c.kill().node_voltage("1").unwrap();
        assert!(v.is_zero());
    }

    #[test]
    fn test_switches() {
        let c = circuit("V1 1 0 1\nR1 1 2 1\nSW1 2 3 no 1\nR2 3 0 1\nR3 2 0 1");
        assert_eq!(c.switching_times(), vec![1.0]);
        assert!(c.node_voltage("2").is_err());
        let before = c.replace_switches(0.5);
        assert_abs_diff_eq!(dc_value(&before.node_voltage("2").unwrap()), 0.5, epsilon = 1e-12);
        let after = c.replace_switches(1.0);
        assert_abs_diff_eq!(dc_value(&after.node_voltage("2").unwrap()), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_noisy_resistor() {
        let c = circuit("R1 1 0 1k").noisy(300.0).unwrap();
        let v = c.node_voltage("1").unwrap();
        let expected = (4.0 * BOLTZMANN * 300.0 * 1e3).sqrt();
        assert_abs_diff_eq!(v.noise_rms().unwrap(), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_initialize_from() {
        let charged = circuit("V1 1 0 2\nR1 1 2 1\nC1 2 0 1");
        let c = circuit("R1 2 0 1\nC1 2 0 1").initialize_from(&charged, 0.0).unwrap();
        let ic = c.netlist().get("C1").unwrap().initial_condition().unwrap().clone();
        assert_abs_diff_eq!(ic.as_real().unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capacitor_current_with_initial_voltage() {
        let c = circuit("R1 1 0 1\nC1 1 0 1 1");
        let i_c = c.cpt("C1").unwrap().i().unwrap();
        let i_r = c.cpt("R1").unwrap().i().unwrap();
        let (a, b) = (
            i_c.transient_response(&[1.0]).unwrap()[0],
            i_r.transient_response(&[1.0]).unwrap()[0],
        );
        assert_abs_diff_eq!(a + b, 0.0, epsilon = 1e-9);
    }
}
