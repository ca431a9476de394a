//! End-to-end integration tests for symnodal.

use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use symnodal::analysis::AnalysisKind;
use symnodal::cas::{Ratio, C64};
use symnodal::circuit::Circuit;
use symnodal::compiler::{self, Layout};
use symnodal::error::SymnodalError;
use symnodal::expr::{Domain, Expr, Omega};
use symnodal::parser;
use symnodal::session::Session;
use symnodal::superposition::Superposition;

fn circuit(netlist: &str) -> Circuit {
    Circuit::parse(netlist, Session::new()).expect("parse failed")
}

fn dc(s: &Superposition) -> f64 {
    s.dc().unwrap().ratio().unwrap().as_real().unwrap()
}

fn sorted_roots(mut roots: Vec<C64>) -> Vec<C64> {
    roots.sort_by(|a, b| a.im.total_cmp(&b.im).then(a.re.total_cmp(&b.re)));
    roots
}

// ── MNA scenarios ─────────────────────────────────────────────────

#[test]
fn test_voltage_divider() {
    let c = circuit(
        "\
V1 1 0 10
Ra 1 2 1
Rb 2 0 1
",
    );
    assert_abs_diff_eq!(dc(&c.node_voltage("2").unwrap()), 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(dc(&c.current("Ra").unwrap()), 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(dc(&c.current("Rb").unwrap()), 5.0, epsilon = 1e-12);
    // The source delivers its current out of the positive terminal.
    assert_abs_diff_eq!(dc(&c.current("V1").unwrap()), -5.0, epsilon = 1e-12);
}

#[test]
fn test_rc_lowpass() {
    let c = circuit(
        "\
V1 1 0 step 1
R1 1 2 1
C1 2 0 1
",
    );
    let h = c.transfer("1", "0", "2", "0").unwrap().ratio().unwrap();
    let s = Ratio::symbol("s");
    assert_eq!(h, s.add(&Ratio::one()).inv().unwrap());

    let v = c.node_voltage("2").unwrap().time().unwrap();
    let times = [0.0, 0.5, 1.0, 2.0, 5.0];
    let values = v.transient_response(&times).unwrap();
    for (t, x) in times.iter().zip(values) {
        assert_abs_diff_eq!(x, 1.0 - (-t).exp(), epsilon = 1e-9);
    }
}

#[test]
fn test_parallel_voltage_sources_are_degenerate() {
    let c = circuit(
        "\
V1 1 0 5
V2 1 0 3
R1 1 0 1
",
    );
    match c.node_voltage("1").unwrap_err() {
        SymnodalError::StructuralDegeneracy { cause, .. } => assert!(cause.contains("V2")),
        other => panic!("expected structural degeneracy, got {:?}", other),
    }
}

#[test]
fn test_floating_node_is_degenerate() {
    let c = circuit(
        "\
I1 0 1 1
C1 1 0 1
",
    );
    assert!(matches!(
        c.node_voltage("1").unwrap_err(),
        SymnodalError::StructuralDegeneracy { .. }
    ));
}

#[test]
fn test_ac_phasor() {
    let c = circuit(
        "\
V1 1 0 ac 1 0 1
R1 1 2 1
C1 2 0 1
",
    );
    let ac = c.node_voltage("2").unwrap().ac().unwrap();
    assert_eq!(ac.len(), 1);
    assert_eq!(ac[0].0, Omega::numeric(1.0));
    let v = ac[0].1.ratio().unwrap().as_constant().unwrap();
    assert_abs_diff_eq!(v.re, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(v.im, -0.5, epsilon = 1e-12);
}

#[test]
fn test_symbol_substitution() {
    let c = circuit(
        "\
V1 1 0 V
R1 1 2 R1
R2 2 0 R2
",
    );
    let values: HashMap<String, f64> = [("V", 12.0), ("R1", 1e3), ("R2", 2e3)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let c = c.with_values(&values).unwrap();
    assert_abs_diff_eq!(dc(&c.node_voltage("2").unwrap()), 8.0, epsilon = 1e-9);
}

// ── Stamping ──────────────────────────────────────────────────────

#[test]
fn test_stamp_additivity() {
    let session = Session::new();
    let both = parser::parse("R1 1 2 Ra\nC1 2 0 C\nV1 1 0 1", &session).unwrap();
    let a = parser::parse("R1 1 2 Ra\nV1 1 0 1", &session).unwrap();
    let b = parser::parse("C1 2 0 C", &session).unwrap();
    let layout = Layout::new(&both);
    let kind = AnalysisKind::Laplace;
    let whole = compiler::compile_with_layout(&both, &kind, &layout).unwrap();
    let ma = compiler::compile_with_layout(&a, &kind, &layout).unwrap();
    let mb = compiler::compile_with_layout(&b, &kind, &layout).unwrap();
    assert_eq!(whole.matrix, ma.matrix.add(&mb.matrix).unwrap());
}

#[test]
fn test_series_and_parallel_reduction() {
    let (r1, r2) = (Ratio::symbol("R1"), Ratio::symbol("R2"));

    let series = circuit("R1 1 2 R1\nR2 2 0 R2");
    let z = series.impedance("1", "0").unwrap().ratio().unwrap();
    assert_eq!(z, r1.add(&r2));

    let parallel = circuit("R1 1 0 R1\nR2 1 0 R2");
    let z = parallel.impedance("1", "0").unwrap().ratio().unwrap();
    assert_eq!(z, r1.mul(&r2).div(&r1.add(&r2)).unwrap());

    let (g1, g2) = (Ratio::symbol("G1"), Ratio::symbol("G2"));
    let conductances = circuit("Y1 1 0 G1\nY2 1 0 G2");
    let y = conductances.admittance("1", "0").unwrap().ratio().unwrap();
    assert_eq!(y, g1.add(&g2));
}

// ── Superposition and noise ───────────────────────────────────────

#[test]
fn test_superposition_idempotence() {
    let dc5 = Superposition::from_expr(Expr::real(5.0).as_voltage()).unwrap();
    let ac3 = Superposition::from_expr(
        Expr::ac(Omega::numeric(10.0), Ratio::real(3.0)).unwrap().as_voltage(),
    )
    .unwrap();
    let round = dc5.add(&ac3).unwrap().sub(&ac3).unwrap();
    assert_eq!(round, dc5);
}

#[test]
fn test_independent_noise_does_not_cancel() {
    let session = Session::new();
    let n1 = Expr::noise_f(session.next_nid(), Ratio::real(3.0)).unwrap();
    let n2 = Expr::noise_f(session.next_nid(), Ratio::real(3.0)).unwrap();
    let a = Superposition::from_expr(n1.as_voltage()).unwrap();
    let b = Superposition::from_expr(n2.as_voltage()).unwrap();
    let d = a.sub(&b).unwrap();
    assert!(!d.is_zero());
    assert_abs_diff_eq!(d.noise_rms().unwrap(), 18f64.sqrt(), epsilon = 1e-12);
    assert!(a.sub(&a).unwrap().is_zero());
}

#[test]
fn test_noise_combination() {
    let session = Session::new();
    let (id1, id2) = (session.next_nid(), session.next_nid());
    let three = Superposition::from_expr(Expr::noise_f(id1, Ratio::real(3.0)).unwrap()).unwrap();
    let four = Superposition::from_expr(Expr::noise_f(id2, Ratio::real(4.0)).unwrap()).unwrap();
    assert_abs_diff_eq!(three.add(&four).unwrap().noise_rms().unwrap(), 5.0, epsilon = 1e-12);

    let same = Superposition::from_expr(Expr::noise_f(id1, Ratio::real(4.0)).unwrap()).unwrap();
    assert_abs_diff_eq!(three.add(&same).unwrap().noise_rms().unwrap(), 7.0, epsilon = 1e-12);
}

#[test]
fn test_noise_sources_in_circuit() {
    let c = circuit(
        "\
V1 1 0 noise 3
I1 0 2 noise 4
R1 1 2 1
R2 2 0 1
",
    );
    // V(2) = V1/2 + I1/2 in independent processes.
    let v = c.node_voltage("2").unwrap();
    assert_eq!(v.noise_terms().len(), 2);
    assert_abs_diff_eq!(v.noise_rms().unwrap(), 2.5, epsilon = 1e-12);
}

// ── Transforms ────────────────────────────────────────────────────

#[test]
fn test_laplace_time_round_trip() {
    for text in [
        "1/(s + 1)",
        "(s + 3)/((s + 1)*(s + 2))",
        "exp(-s)/(s + 2)",
        "1/(s + 1)^2",
        "1/(s^2 + 2*s + 5)^2",
    ] {
        let h = Expr::parse(text, Domain::Laplace).unwrap();
        assert_eq!(h.time().unwrap().laplace().unwrap(), h, "{}", text);
    }
}

// ── State space ───────────────────────────────────────────────────

#[test]
fn test_series_rlc_state_space_matches_mna_poles() {
    let c = circuit(
        "\
V1 1 0 step 1
R1 1 2 2
L1 2 3 1
C1 3 0 0.5
",
    );
    let ss = c.state_space().unwrap();
    assert_eq!(ss.x().len(), 2);
    let eig = sorted_roots(
        ss.eigenvalues()
            .unwrap()
            .iter()
            .map(|r| r.numeric().unwrap())
            .collect(),
    );
    let h = c.transfer("1", "0", "3", "0").unwrap();
    let poles = sorted_roots(h.poles().unwrap().iter().map(|r| r.numeric().unwrap()).collect());
    assert_eq!(eig.len(), poles.len());
    for (a, b) in eig.iter().zip(&poles) {
        assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-9);
        assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(eig[0].re, -1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(eig[0].im, -1.0, epsilon = 1e-9);
}

#[test]
fn test_current_source_in_series_with_inductor_is_rejected() {
    let c = circuit(
        "\
I1 0 1 1
L1 1 2 1
R1 2 0 1
",
    );
    assert!(matches!(c.state_space().unwrap_err(), SymnodalError::StateSpace(_)));
}
