//! Noise analysis of one noise process.
//!
//! Each noise identity is an independent process, so each gets its own
//! solve with `s = j2πf` and only that process's sources driving. The
//! results stay separate and are combined in quadrature by the
//! superposition container.

use tracing::{debug, info_span};

use super::{assemble, solve_system, source_of, AnalysisKind, Solution, Unknowns};
use crate::cas::Ratio;
use crate::compiler::{Drive, MnaSystem};
use crate::error::{Result, SymnodalError};
use crate::ir::Netlist;
use crate::session::Nid;
use crate::superposition::Key;

/// Run noise analysis for the process `nid`.
pub fn run(netlist: &Netlist, system: &MnaSystem, nid: Nid) -> Result<Solution> {
    let _span = info_span!("noise_analysis", nid = %nid).entered();
    let key = Key::Noise(nid);
    let rhs = assemble(system, Ratio::zero(), |drive| match drive {
        Drive::Source(name) => {
            let asd = source_of(netlist, name)?.select(&key)?;
            asd.ratio().ok_or_else(|| {
                SymnodalError::Analysis(format!("noise part of {} has no density: {}", name, asd))
            })
        }
        Drive::Fixed(_) => Ok(Ratio::zero()),
    })?;
    let x = solve_system(netlist, system, &rhs)?;
    debug!(unknowns = x.len(), "noise densities solved");
    Ok(Solution::new(
        AnalysisKind::Noise(nid),
        system.layout.clone(),
        Unknowns::Ratio(x),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::solve;
    use crate::expr::Value;
    use crate::parser;
    use crate::session::Session;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_noise_through_divider() {
        let session = Session::new();
        let n = parser::parse("V1 1 0 noise 4\nR1 1 2 1\nR2 2 0 1", &session).unwrap();
        let nid = n.get("V1").unwrap().source().unwrap().noise_terms()[0].0;
        let sol = solve(&n, &AnalysisKind::Noise(nid)).unwrap();
        let v = sol.node_voltage("2").unwrap();
        match v.value() {
            Value::NoiseF { nid: got, asd } => {
                assert_eq!(*got, nid);
                assert_abs_diff_eq!(asd.as_real().unwrap(), 2.0, epsilon = 1e-12);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
