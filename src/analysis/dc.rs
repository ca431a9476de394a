//! DC operating point analysis.
//!
//! Capacitors are stamped as the admittance `epsilon·C` and inductors as
//! branches with impedance `-epsilon·L`, so a node held only by capacitors
//! still has a pivot. Every unknown is then taken in the limit
//! `epsilon -> 0`; an unknown that diverges means the DC state is undefined.

use tracing::{debug, info_span};

use super::{assemble, dc_limit, solve_system, source_of, AnalysisKind, Solution, Unknowns};
use crate::cas::Ratio;
use crate::compiler::{Drive, MnaSystem};
use crate::error::{Result, SymnodalError};
use crate::ir::Netlist;
use crate::topology;

/// Run DC operating point analysis.
///
/// 1. Build the right-hand side from each source's DC part.
/// 2. Solve the ε-regularised system.
/// 3. Take every unknown in the limit ε → 0.
pub fn run(netlist: &Netlist, system: &MnaSystem) -> Result<Solution> {
    let _span = info_span!("dc_analysis").entered();
    let rhs = assemble(system, Ratio::zero(), |drive| match drive {
        Drive::Source(name) => {
            let dc = source_of(netlist, name)?.dc()?;
            dc.ratio().ok_or_else(|| {
                SymnodalError::Analysis(format!("DC part of {} is not a constant: {}", name, dc))
            })
        }
        Drive::Fixed(r) => Ok(r.clone()),
    })?;
    let x = solve_system(netlist, system, &rhs)?;

    let limited = x
        .iter()
        .map(|v| {
            dc_limit(v).map_err(|_| {
                topology::diagnose(
                    netlist,
                    &AnalysisKind::Dc,
                    &format!("DC unknown {} diverges as epsilon -> 0", v),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(unknowns = limited.len(), "DC operating point solved");

    Ok(Solution::new(
        AnalysisKind::Dc,
        system.layout.clone(),
        Unknowns::Ratio(limited),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::solve;
    use crate::parser;
    use crate::session::Session;
    use approx::assert_abs_diff_eq;

    fn dc(text: &str) -> Result<Solution> {
        solve(&parser::parse(text, &Session::new()).unwrap(), &AnalysisKind::Dc)
    }

    fn volts(sol: &Solution, node: &str) -> f64 {
        sol.node_voltage(node).unwrap().ratio().unwrap().as_real().unwrap()
    }

    #[test]
    fn test_voltage_divider() {
        let sol = dc("V1 1 0 10\nR1 1 2 1\nR2 2 0 1").unwrap();
        assert_abs_diff_eq!(volts(&sol, "1"), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(volts(&sol, "2"), 5.0, epsilon = 1e-12);
        // Current enters V1's positive terminal: the source delivers 5 A.
        let i = sol.branch_current("V1").unwrap().ratio().unwrap().as_real().unwrap();
        assert_abs_diff_eq!(i, -5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capacitor_is_open() {
        let sol = dc("V1 1 0 3\nR1 1 2 1k\nC1 2 0 1u").unwrap();
        assert_abs_diff_eq!(volts(&sol, "2"), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capacitive_divider_resolves_in_the_limit() {
        let sol = dc("V1 1 0 6\nC1 1 2 1\nC2 2 0 2").unwrap();
        assert_abs_diff_eq!(volts(&sol, "2"), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inductor_is_short() {
        let sol = dc("V1 1 0 2\nR1 1 2 1\nL1 2 0 1m").unwrap();
        assert_abs_diff_eq!(volts(&sol, "2"), 0.0, epsilon = 1e-12);
        let i = sol.branch_current("L1").unwrap().ratio().unwrap().as_real().unwrap();
        assert_abs_diff_eq!(i, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_current_source_into_resistor() {
        let sol = dc("I1 0 1 2\nR1 1 0 3").unwrap();
        // I1 drives current out of node 0's side into node 1.
        assert_abs_diff_eq!(volts(&sol, "1"), -6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symbolic_divider() {
        let sol = dc("V1 1 0 V\nR1 1 2 Ra\nR2 2 0 Rb").unwrap();
        let v = sol.node_voltage("2").unwrap().ratio().unwrap();
        let expected = Ratio::symbol("V")
            .mul(&Ratio::symbol("Rb"))
            .div(&Ratio::symbol("Ra").add(&Ratio::symbol("Rb")))
            .unwrap();
        assert_eq!(v, expected);
    }

    #[test]
    fn test_current_into_capacitor_is_degenerate() {
        let err = dc("I1 0 1 1\nC1 1 0 1").unwrap_err();
        assert!(matches!(err, SymnodalError::StructuralDegeneracy { .. }));
    }

    #[test]
    fn test_parallel_voltage_sources_are_degenerate() {
        let err = dc("V1 1 0 1\nV2 1 0 2\nR1 1 0 1").unwrap_err();
        match err {
            SymnodalError::StructuralDegeneracy { cause, .. } => assert!(cause.contains("V2")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
