//! Analysis engine: solves the MNA system of one analysis kind.
//!
//! Each kind has its own excitation type. DC, AC and noise solve against
//! rational right-hand sides, Laplace and initial-value analyses against
//! delayed rational sums, and memoryless time-domain analysis directly
//! against time signals.

pub mod ac;
pub mod dc;
pub mod laplace;
pub mod noise;

use std::fmt;

use tracing::{debug, info_span};

use crate::cas::{self, Delayed, Excitation, Family, Ratio, Signal};
use crate::compiler::{self, Drive, Layout, MnaSystem};
use crate::error::{Result, SymnodalError};
use crate::expr::{Expr, Omega, Quantity, Value};
use crate::ir::Netlist;
use crate::session::Nid;
use crate::superposition::{Key, Superposition};
use crate::topology;

/// What a solve computes and how reactive parts are stamped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    /// DC operating point, `s = epsilon -> 0`.
    Dc,
    /// Sinusoidal steady state at one angular frequency.
    Ac(Omega),
    /// Transient response in `s`, zero initial state.
    Laplace,
    /// Initial-value problem in `s`; every source and initial condition together.
    Ivp,
    /// Memoryless circuit driven directly in the time domain.
    Time,
    /// Noise amplitude density of one noise process, `s = j2πf`.
    Noise(Nid),
}

impl AnalysisKind {
    /// Value the Laplace variable takes in this kind.
    pub fn s_value(&self) -> Ratio {
        match self {
            AnalysisKind::Dc => Ratio::symbol(cas::EPSILON),
            AnalysisKind::Ac(w) => w.jw(),
            AnalysisKind::Laplace | AnalysisKind::Ivp | AnalysisKind::Time => {
                Ratio::symbol(cas::S)
            }
            AnalysisKind::Noise(_) => cas::j2pif(),
        }
    }

    pub fn uses_initial_conditions(&self) -> bool {
        matches!(self, AnalysisKind::Ivp)
    }

    /// Kind that solves one superposition part.
    pub fn for_key(key: &Key, memoryless: bool) -> AnalysisKind {
        match key {
            Key::Dc => AnalysisKind::Dc,
            Key::Ac(w) => AnalysisKind::Ac(w.clone()),
            Key::S => AnalysisKind::Laplace,
            Key::T if memoryless => AnalysisKind::Time,
            Key::T => AnalysisKind::Laplace,
            Key::Noise(nid) => AnalysisKind::Noise(*nid),
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::Dc => write!(f, "dc"),
            AnalysisKind::Ac(w) => write!(f, "ac({})", w),
            AnalysisKind::Laplace => write!(f, "s"),
            AnalysisKind::Ivp => write!(f, "ivp"),
            AnalysisKind::Time => write!(f, "t"),
            AnalysisKind::Noise(n) => write!(f, "noise({})", n),
        }
    }
}

/// Solved unknowns in the representation of their kind.
#[derive(Debug, Clone)]
pub enum Unknowns {
    Ratio(Vec<Ratio>),
    Delayed(Vec<Delayed>),
    Signal(Vec<Signal>),
}

impl Unknowns {
    pub fn len(&self) -> usize {
        match self {
            Unknowns::Ratio(x) => x.len(),
            Unknowns::Delayed(x) => x.len(),
            Unknowns::Signal(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The solution of one analysis kind.
#[derive(Debug, Clone)]
pub struct Solution {
    pub kind: AnalysisKind,
    pub layout: Layout,
    unknowns: Unknowns,
}

fn weighted_sum<E: Excitation>(xs: &[E], combo: &[(usize, Ratio)], zero: E) -> Result<E> {
    let mut acc = zero;
    for (i, k) in combo {
        let x = xs.get(*i).ok_or_else(|| {
            SymnodalError::Analysis(format!("unknown index {} out of range", i))
        })?;
        acc = acc.plus(&x.times(k))?;
    }
    Ok(acc)
}

/// DC values are taken in the limit `epsilon -> 0`.
pub(crate) fn dc_limit(r: &Ratio) -> Result<Ratio> {
    r.limit_zero(cas::EPSILON).map_err(|_| SymnodalError::StructuralDegeneracy {
        cause: format!("DC value {} grows without bound as epsilon -> 0", r),
        hint: "a node is charged by a DC current with no resistive path to ground".to_string(),
    })
}

impl Solution {
    pub fn new(kind: AnalysisKind, layout: Layout, unknowns: Unknowns) -> Self {
        Self {
            kind,
            layout,
            unknowns,
        }
    }

    pub fn unknowns(&self) -> &Unknowns {
        &self.unknowns
    }

    /// `Σ k·x[i]` over the given unknowns, as an expression of this kind.
    ///
    /// Coefficients must already be evaluated at this kind's `s`.
    pub fn combine(&self, combo: &[(usize, Ratio)]) -> Result<Expr> {
        match (&self.kind, &self.unknowns) {
            (AnalysisKind::Dc, Unknowns::Ratio(xs)) => {
                Expr::constant(dc_limit(&weighted_sum(xs, combo, Ratio::zero())?)?)
            }
            (AnalysisKind::Ac(w), Unknowns::Ratio(xs)) => {
                Expr::ac(w.clone(), weighted_sum(xs, combo, Ratio::zero())?)
            }
            (AnalysisKind::Noise(nid), Unknowns::Ratio(xs)) => {
                Expr::noise_f(*nid, weighted_sum(xs, combo, Ratio::zero())?)
            }
            (_, Unknowns::Delayed(xs)) => Expr::new(
                Quantity::Undefined,
                Value::Laplace(weighted_sum(xs, combo, Delayed::zero())?),
            ),
            (_, Unknowns::Signal(xs)) => {
                if let Some((_, k)) = combo.iter().find(|(_, k)| k.contains(cas::S)) {
                    return Err(SymnodalError::Analysis(format!(
                        "coefficient {} depends on s in a time-domain solution",
                        k
                    )));
                }
                let zero = Signal::zero(Family::Continuous, cas::T);
                Expr::from_signal(weighted_sum(xs, combo, zero)?)
            }
            (kind, _) => Err(SymnodalError::Analysis(format!(
                "{} solution holds unknowns of the wrong representation",
                kind
            ))),
        }
    }

    pub fn node_voltage(&self, node: &str) -> Result<Expr> {
        self.voltage_between(node, "0")
    }

    /// `V(a) - V(b)`.
    pub fn voltage_between(&self, a: &str, b: &str) -> Result<Expr> {
        let mut combo = Vec::new();
        if let Some(i) = self.layout.node(a)? {
            combo.push((i, Ratio::one()));
        }
        if let Some(i) = self.layout.node(b)? {
            combo.push((i, Ratio::real(-1.0)));
        }
        Ok(self.combine(&combo)?.as_voltage())
    }

    /// Current entering the positive terminal of a branch element.
    pub fn branch_current(&self, component: &str) -> Result<Expr> {
        let k = self.layout.branch(component, 0)?;
        Ok(self.combine(&[(k, Ratio::one())])?.as_current())
    }
}

/// Source value for a drive, looked up in the netlist.
pub(crate) fn source_of<'a>(netlist: &'a Netlist, name: &str) -> Result<&'a Superposition> {
    netlist.get(name)?.source().ok_or_else(|| {
        SymnodalError::Analysis(format!("{} drives the circuit but is not a source", name))
    })
}

/// Builds the right-hand side from the system's injections.
pub(crate) fn assemble<E, F>(mna: &MnaSystem, zero: E, mut drive: F) -> Result<Vec<E>>
where
    E: Excitation,
    F: FnMut(&Drive) -> Result<E>,
{
    let mut rhs = vec![zero; mna.layout.size()];
    for injection in &mna.injections {
        let value = drive(&injection.drive)?;
        if value.is_null() {
            continue;
        }
        for &(i, sign) in &injection.pattern {
            rhs[i] = rhs[i].plus(&value.times(&Ratio::real(sign)))?;
        }
    }
    Ok(rhs)
}

/// Solves the system, explaining a singular matrix by topology.
pub(crate) fn solve_system<E: Excitation>(
    netlist: &Netlist,
    mna: &MnaSystem,
    rhs: &[E],
) -> Result<Vec<E>> {
    mna.matrix.solve(rhs).map_err(|e| match e {
        SymnodalError::StructuralDegeneracy { cause, .. } => {
            topology::diagnose(netlist, &mna.kind, &cause)
        }
        other => other,
    })
}

/// Stamps and solves one analysis kind.
pub fn solve(netlist: &Netlist, kind: &AnalysisKind) -> Result<Solution> {
    let _span = info_span!("mna_solve", kind = %kind).entered();
    let mna = compiler::compile(netlist, kind)?;
    let solution = match kind {
        AnalysisKind::Dc => dc::run(netlist, &mna)?,
        AnalysisKind::Ac(w) => ac::run(netlist, &mna, w)?,
        AnalysisKind::Noise(nid) => noise::run(netlist, &mna, *nid)?,
        AnalysisKind::Laplace | AnalysisKind::Ivp => laplace::run(netlist, &mna)?,
        AnalysisKind::Time => laplace::run_time(netlist, &mna)?,
    };
    debug!(unknowns = solution.unknowns.len(), "solved");
    Ok(solution)
}

/// Analysis kinds needed to solve every part of every source.
pub fn kinds_for(netlist: &Netlist) -> Result<Vec<AnalysisKind>> {
    let memoryless = netlist.is_memoryless();
    let mut out: Vec<AnalysisKind> = Vec::new();
    let mut push = |k: AnalysisKind| {
        if !out.contains(&k) {
            out.push(k);
        }
    };
    if netlist.has_initial_conditions() {
        push(AnalysisKind::Ivp);
        for src in netlist.sources() {
            if let Some(s) = src.source() {
                for (nid, _) in s.noise_terms() {
                    push(AnalysisKind::Noise(nid));
                }
            }
        }
        return Ok(out);
    }
    for src in netlist.sources() {
        if let Some(s) = src.source() {
            for key in s.kinds()? {
                push(AnalysisKind::for_key(&key, memoryless));
            }
        }
    }
    Ok(out)
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
    fn test_kinds_follow_sources() {
        let n = netlist("V1 1 0 dc 2 ac 1\nR1 1 2 1\nC1 2 0 1");
        let kinds = kinds_for(&n).unwrap();
        assert!(kinds.contains(&AnalysisKind::Dc));
        assert!(kinds.iter().any(|k| matches!(k, AnalysisKind::Ac(_))));
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn test_initial_conditions_select_ivp() {
        let n = netlist("V1 1 0 2\nR1 1 2 1\nC1 2 0 1 3");
        assert_eq!(kinds_for(&n).unwrap(), vec![AnalysisKind::Ivp]);
    }

    #[test]
    fn test_time_kind_for_memoryless_step() {
        let n = netlist("V1 1 0 step 2\nR1 1 0 1");
        let kinds = kinds_for(&n).unwrap();
        assert!(kinds.contains(&AnalysisKind::Time));
        let n = netlist("V1 1 0 step 2\nR1 1 2 1\nC1 2 0 1");
        assert!(kinds_for(&n).unwrap().contains(&AnalysisKind::Laplace));
    }

    #[test]
    fn test_s_values() {
        assert_eq!(AnalysisKind::Dc.s_value(), Ratio::symbol(cas::EPSILON));
        assert_eq!(AnalysisKind::Laplace.s_value(), Ratio::symbol(cas::S));
        assert_eq!(AnalysisKind::Ac(Omega::numeric(2.0)).s_value(), Ratio::imag(2.0));
    }
}
