//! AC steady-state analysis at one angular frequency.
//!
//! The system is stamped with `s = jω` and solved against the phasors of
//! every source's part at that frequency. `ω` may be numeric or symbolic.

use tracing::{debug, info_span};

use super::{assemble, solve_system, source_of, AnalysisKind, Solution, Unknowns};
use crate::cas::Ratio;
use crate::compiler::{Drive, MnaSystem};
use crate::error::{Result, SymnodalError};
use crate::expr::Omega;
use crate::ir::Netlist;
use crate::superposition::Key;

/// Run AC analysis at `omega`.
pub fn run(netlist: &Netlist, system: &MnaSystem, omega: &Omega) -> Result<Solution> {
    let _span = info_span!("ac_analysis", omega = %omega).entered();
    let key = Key::Ac(omega.clone());
    let rhs = assemble(system, Ratio::zero(), |drive| match drive {
        Drive::Source(name) => {
            let phasor = source_of(netlist, name)?.select(&key)?;
            phasor.ratio().ok_or_else(|| {
                SymnodalError::Analysis(format!("AC part of {} has no phasor: {}", name, phasor))
            })
        }
        Drive::Fixed(_) => Err(SymnodalError::Analysis(
            "initial conditions are not part of a steady-state analysis".to_string(),
        )),
    })?;
    let x = solve_system(netlist, system, &rhs)?;
    debug!(unknowns = x.len(), "AC phasors solved");
    Ok(Solution::new(
        AnalysisKind::Ac(omega.clone()),
        system.layout.clone(),
        Unknowns::Ratio(x),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::solve;
    use crate::cas::C64;
    use crate::parser;
    use crate::session::Session;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rc_at_corner_frequency() {
        let n = parser::parse("V1 1 0 ac 1 0 1\nR1 1 2 1\nC1 2 0 1", &Session::new()).unwrap();
        let sol = solve(&n, &AnalysisKind::Ac(Omega::numeric(1.0))).unwrap();
        let v = sol.node_voltage("2").unwrap().ratio().unwrap().as_constant().unwrap();
        // 1 / (1 + j)
        assert_abs_diff_eq!(v.re, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(v.im, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_symbolic_omega() {
        let n = parser::parse("V1 1 0 ac 2\nR1 1 2 R\nC1 2 0 C", &Session::new()).unwrap();
        let sol = solve(&n, &AnalysisKind::Ac(Omega::symbolic())).unwrap();
        let v = sol.node_voltage("2").unwrap().ratio().unwrap();
        let mut values = std::collections::HashMap::new();
        values.insert("R".to_string(), C64::new(1.0, 0.0));
        values.insert("C".to_string(), C64::new(1.0, 0.0));
        values.insert("omega".to_string(), C64::new(1.0, 0.0));
        let at = v.evaluate(&values).unwrap();
        assert_abs_diff_eq!(at.norm(), 2.0 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_source_without_ac_part_is_silent() {
        let n = parser::parse("V1 1 0 dc 5\nR1 1 0 1", &Session::new()).unwrap();
        let sol = solve(&n, &AnalysisKind::Ac(Omega::numeric(3.0))).unwrap();
        assert!(sol.node_voltage("1").unwrap().is_zero());
    }
}
