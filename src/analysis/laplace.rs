//! Transient analysis.
//!
//! `Laplace` solves the transient parts of the sources with zero initial
//! state; `Ivp` solves the complete source waveforms together with the
//! initial conditions of inductors and capacitors. Both work in `s` and the
//! results come back to the time domain through the inverse Laplace
//! transform. A circuit without memory is solved directly against time
//! signals instead (`Time`).

use tracing::{debug, info_span};

use super::{assemble, solve_system, source_of, AnalysisKind, Solution, Unknowns};
use crate::cas::{self, Delayed, Family, Signal};
use crate::compiler::{Drive, MnaSystem};
use crate::error::{Result, SymnodalError};
use crate::expr::Expr;
use crate::ir::Netlist;
use crate::superposition::{Key, Superposition};

fn laplace_part(netlist: &Netlist, kind: &AnalysisKind, source: &Superposition) -> Result<Expr> {
    match kind {
        AnalysisKind::Ivp => source.laplace(),
        // A memoryless circuit solves its `T` parts in the `Time` kind.
        _ if netlist.is_memoryless() => source.select(&Key::S),
        _ => source.s(),
    }
}

/// Run a Laplace-domain analysis (`Laplace` or `Ivp`).
pub fn run(netlist: &Netlist, system: &MnaSystem) -> Result<Solution> {
    let kind = system.kind.clone();
    let _span = info_span!("laplace_analysis", kind = %kind).entered();
    let rhs = assemble(system, Delayed::zero(), |drive| match drive {
        Drive::Source(name) => {
            let e = laplace_part(netlist, &kind, source_of(netlist, name)?)?;
            e.delayed().cloned().ok_or_else(|| {
                SymnodalError::Analysis(format!("{} has no Laplace transform: {}", name, e))
            })
        }
        Drive::Fixed(r) => Ok(Delayed::from_ratio(r.clone())),
    })?;
    let x = solve_system(netlist, system, &rhs)?;
    debug!(unknowns = x.len(), "Laplace-domain unknowns solved");
    Ok(Solution::new(kind, system.layout.clone(), Unknowns::Delayed(x)))
}

/// Run a time-domain analysis of a memoryless circuit.
pub fn run_time(netlist: &Netlist, system: &MnaSystem) -> Result<Solution> {
    let _span = info_span!("time_analysis").entered();
    if !netlist.is_memoryless() {
        return Err(SymnodalError::Analysis(
            "direct time-domain analysis needs a circuit without inductors or capacitors"
                .to_string(),
        ));
    }
    let zero = Signal::zero(Family::Continuous, cas::T);
    let rhs = assemble(system, zero, |drive| match drive {
        Drive::Source(name) => {
            let e = source_of(netlist, name)?.select(&Key::T)?;
            e.signal().cloned().ok_or_else(|| {
                SymnodalError::Analysis(format!("{} has no time-domain part: {}", name, e))
            })
        }
        Drive::Fixed(_) => Err(SymnodalError::Analysis(
            "a memoryless circuit has no initial conditions".to_string(),
        )),
    })?;
    let x = solve_system(netlist, system, &rhs)?;
    debug!(unknowns = x.len(), "time-domain unknowns solved");
    Ok(Solution::new(
        AnalysisKind::Time,
        system.layout.clone(),
        Unknowns::Signal(x),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::solve;
    use crate::cas::Ratio;
    use crate::parser;
    use crate::session::Session;
    use approx::assert_abs_diff_eq;

    fn netlist(text: &str) -> Netlist {
        parser::parse(text, &Session::new()).unwrap()
    }

    #[test]
    fn test_rc_transfer_function() {
        let n = netlist("V1 1 0 s 1\nR1 1 2 1\nC1 2 0 1");
        let sol = solve(&n, &AnalysisKind::Laplace).unwrap();
        let v = sol.node_voltage("2").unwrap().ratio().unwrap();
        let s = Ratio::symbol(cas::S);
        assert_eq!(v, s.add(&Ratio::one()).inv().unwrap());
    }

    #[test]
    fn test_rc_step_response() {
        let n = netlist("V1 1 0 step 1\nR1 1 2 1\nC1 2 0 1");
        let sol = solve(&n, &AnalysisKind::Laplace).unwrap();
        let v = sol.node_voltage("2").unwrap().time().unwrap();
        let samples = v.transient_response(&[0.5, 1.0, 2.0]).unwrap();
        for (t, got) in [0.5f64, 1.0, 2.0].iter().zip(samples) {
            assert_abs_diff_eq!(got, 1.0 - (-t).exp(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_capacitor_discharge() {
        let n = netlist("R1 1 0 2\nC1 1 0 1 3");
        let sol = solve(&n, &AnalysisKind::Ivp).unwrap();
        let v = sol.node_voltage("1").unwrap().time().unwrap();
        let samples = v.transient_response(&[0.0, 2.0]).unwrap();
        assert_abs_diff_eq!(samples[0], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(samples[1], 3.0 * (-1.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_inductor_initial_current_decays() {
        let n = netlist("R1 1 0 1\nL1 1 0 1 2");
        let sol = solve(&n, &AnalysisKind::Ivp).unwrap();
        let i = sol.branch_current("L1").unwrap().time().unwrap();
        let samples = i.transient_response(&[0.0, 1.0]).unwrap();
        assert_abs_diff_eq!(samples[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(samples[1], 2.0 * (-1.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_memoryless_time_solve() {
        let n = netlist("V1 1 0 step 4\nR1 1 2 1\nR2 2 0 1");
        let sol = solve(&n, &AnalysisKind::Time).unwrap();
        let v = sol.node_voltage("2").unwrap();
        let samples = v.transient_response(&[-1.0, 1.0]).unwrap();
        assert_abs_diff_eq!(samples[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(samples[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_time_kind_rejects_reactive_circuit() {
        let n = netlist("V1 1 0 step 1\nC1 1 0 1");
        let err = solve(&n, &AnalysisKind::Time).unwrap_err();
        assert!(matches!(err, SymnodalError::Analysis(_)));
    }
}
