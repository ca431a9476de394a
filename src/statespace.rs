//! State-space models of linear circuits.
//!
//! Inductor currents and capacitor voltages are the states. Each inductor is
//! replaced by a current source and each capacitor by a voltage source, which
//! leaves a memoryless circuit. Solving that circuit once, with every state
//! and input as a symbol, gives the terminal quantities as linear combinations:
//!
//! | Element | State   | Derivative      |
//! |---------|---------|-----------------|
//! | L       | `i_<L>` | `v_L / L`       |
//! | C       | `v_<C>` | `i_C / C`       |
//!
//! Inputs are the independent sources, `v_<V>` and `i_<I>`. Outputs are the
//! non-ground node voltages followed by the reactive currents.

use std::collections::HashMap;

use nalgebra::DMatrix;
use tracing::{debug, info_span};

use crate::analysis::{self, AnalysisKind};
use crate::cas::{self, Ratio, Root, SymMatrix, UPoly, C64};
use crate::catalog::Kind;
use crate::circuit::Circuit;
use crate::compiler::{self, Drive};
use crate::error::{Result, SymnodalError};
use crate::expr::{Expr, Quantity};
use crate::ir::{Component, Netlist, Params};
use crate::superposition::Superposition;
use crate::topology;

/// Continuous-time model `x' = A x + B u`, `y = C x + D u`.
#[derive(Debug, Clone)]
pub struct StateSpace {
    pub a: SymMatrix,
    pub b: SymMatrix,
    pub c: SymMatrix,
    pub d: SymMatrix,
    states: Vec<String>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    x0: Vec<Ratio>,
}

/// Zero-order-hold discretisation of a numeric [`StateSpace`].
#[derive(Debug, Clone)]
pub struct DiscreteStateSpace {
    pub ad: DMatrix<f64>,
    pub bd: DMatrix<f64>,
    pub c: DMatrix<f64>,
    pub d: DMatrix<f64>,
    pub dt: f64,
}

fn state_space_error(msg: impl Into<String>) -> SymnodalError {
    SymnodalError::StateSpace(msg.into())
}

fn check_topology(netlist: &Netlist) -> Result<()> {
    let of = |k: Kind| netlist.components.iter().filter(move |c| c.kind == k);
    for l in of(Kind::Inductor) {
        if let Some(i) = of(Kind::CurrentSource).find(|i| topology::in_series(netlist, &i.name, &l.name)) {
            return Err(state_space_error(format!(
                "current source {} is in series with inductor {}; the inductor current is not a state",
                i.name, l.name
            )));
        }
    }
    for c in of(Kind::Capacitor) {
        if let Some(v) = of(Kind::VoltageSource).find(|v| topology::in_parallel(netlist, &v.name, &c.name)) {
            return Err(state_space_error(format!(
                "voltage source {} is in parallel with capacitor {}; the capacitor voltage is not a state",
                v.name, c.name
            )));
        }
    }
    for c in &netlist.components {
        let supported = match c.kind {
            Kind::Coupling | Kind::TransmissionLine | Kind::Switch => false,
            k if !k.flags().linear => false,
            Kind::Inductor | Kind::Capacitor | Kind::VoltageSource | Kind::CurrentSource => true,
            _ => !c.depends_on_s(),
        };
        if !supported {
            return Err(SymnodalError::UnsupportedComponent {
                name: c.name.clone(),
                reason: "not expressible in a state-space model".to_string(),
            });
        }
    }
    Ok(())
}

fn source(c: &Component, kind: Kind) -> Component {
    let quantity = match kind {
        Kind::VoltageSource => Quantity::Voltage,
        _ => Quantity::Current,
    };
    Component {
        name: c.name.clone(),
        kind,
        nodes: c.nodes.clone(),
        params: Params::Source(Superposition::new(quantity)),
        options: Vec::new(),
    }
}

/// Row of linear coefficients of `r` in `vars`.
fn coefficients(r: &Ratio, vars: &[String]) -> Result<Vec<Ratio>> {
    vars.iter()
        .map(|v| {
            r.linear_coefficient(v)
                .map_err(|_| state_space_error(format!("{} is not linear in {}", r, v)))
        })
        .collect()
}

fn matrix(rows: Vec<Vec<Ratio>>, cols: usize) -> Result<SymMatrix> {
    if rows.is_empty() {
        return Ok(SymMatrix::zeros(0, cols));
    }
    SymMatrix::from_rows(rows)
}

fn hstack(blocks: &[SymMatrix]) -> Result<SymMatrix> {
    let rows = blocks.first().map(SymMatrix::rows).unwrap_or(0);
    let mut out = vec![Vec::new(); rows];
    for b in blocks {
        for (i, row) in out.iter_mut().enumerate() {
            row.extend_from_slice(b.row(i));
        }
    }
    SymMatrix::from_rows(out)
}

fn vstack(blocks: &[SymMatrix]) -> Result<SymMatrix> {
    let rows = blocks
        .iter()
        .flat_map(|b| (0..b.rows()).map(move |i| b.row(i).to_vec()))
        .collect();
    SymMatrix::from_rows(rows)
}

/// Rank of a numeric matrix by SVD, of a symbolic one by elimination.
fn rank(m: &SymMatrix) -> Result<usize> {
    match m.to_real() {
        Ok(x) => Ok(x.rank(1e-9 * x.norm().max(1.0))),
        Err(_) => m.rank(),
    }
}

/// Solves `A W + W Aᵀ + Q = 0` via the Kronecker form.
fn lyapunov(a: &DMatrix<f64>, q: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = a.nrows();
    let id = DMatrix::<f64>::identity(n, n);
    let k = id.kronecker(a) + a.kronecker(&id);
    let rhs = -DMatrix::from_column_slice(n * n, 1, q.as_slice());
    let w = k
        .lu()
        .solve(&rhs)
        .ok_or_else(|| state_space_error("Lyapunov equation has no unique solution"))?;
    Ok(DMatrix::from_column_slice(n, n, w.as_slice()))
}

/// Solves `W = A W Aᵀ + Q`.
fn stein(a: &DMatrix<f64>, q: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = a.nrows();
    let k = DMatrix::<f64>::identity(n * n, n * n) - a.kronecker(a);
    let rhs = DMatrix::from_column_slice(n * n, 1, q.as_slice());
    let w = k
        .lu()
        .solve(&rhs)
        .ok_or_else(|| state_space_error("discrete Lyapunov equation has no unique solution"))?;
    Ok(DMatrix::from_column_slice(n, n, w.as_slice()))
}

impl StateSpace {
    /// Builds the model of a circuit.
    pub fn from_circuit(circuit: &Circuit) -> Result<StateSpace> {
        let netlist = circuit.netlist();
        let _span = info_span!("state_space", components = netlist.components.len()).entered();
        check_topology(netlist)?;
        // the circuit must solve in s before it is re-expressed in states
        circuit.solution(&AnalysisKind::Laplace)?;

        let mut states = Vec::new();
        let mut inputs = Vec::new();
        let mut x0 = Vec::new();
        let mut drives: HashMap<String, Ratio> = HashMap::new();
        let mut components = Vec::new();
        for c in &netlist.components {
            match c.kind {
                Kind::Inductor => {
                    let x = format!("i_{}", c.name);
                    // Inductor current leaves the positive node.
                    drives.insert(c.name.clone(), Ratio::symbol(&x).neg());
                    components.push(source(c, Kind::CurrentSource));
                    x0.push(c.initial_condition().cloned().unwrap_or_else(Ratio::zero));
                    states.push(x);
                }
                Kind::Capacitor => {
                    let x = format!("v_{}", c.name);
                    drives.insert(c.name.clone(), Ratio::symbol(&x));
                    components.push(source(c, Kind::VoltageSource));
                    x0.push(c.initial_condition().cloned().unwrap_or_else(Ratio::zero));
                    states.push(x);
                }
                Kind::VoltageSource | Kind::CurrentSource => {
                    let prefix = if c.kind == Kind::VoltageSource { "v" } else { "i" };
                    let u = format!("{}_{}", prefix, c.name);
                    drives.insert(c.name.clone(), Ratio::symbol(&u));
                    components.push(source(c, c.kind));
                    inputs.push(u);
                }
                _ => components.push(c.clone()),
            }
        }
        let memoryless = Netlist::with_components(components);

        let kind = AnalysisKind::Laplace;
        let mna = compiler::compile(&memoryless, &kind)?;
        let rhs = analysis::assemble(&mna, Ratio::zero(), |d| match d {
            Drive::Source(name) => drives
                .get(name)
                .cloned()
                .ok_or_else(|| state_space_error(format!("{} has no state or input symbol", name))),
            Drive::Fixed(r) => Ok(r.clone()),
        })?;
        let xs = analysis::solve_system(&memoryless, &mna, &rhs)?;
        let layout = &mna.layout;
        let voltage = |c: &Component| -> Result<Ratio> {
            let (p, m) = c.terminals()?;
            let mut v = Ratio::zero();
            if let Some(i) = layout.node(p)? {
                v = v.add(&xs[i]);
            }
            if let Some(i) = layout.node(m)? {
                v = v.sub(&xs[i]);
            }
            Ok(v)
        };

        let mut derivatives = Vec::new();
        let mut reactive_currents = Vec::new();
        let mut outputs = Vec::new();
        for c in &netlist.components {
            match c.kind {
                Kind::Inductor => {
                    derivatives.push(voltage(c)?.div(c.value()?)?);
                    reactive_currents.push((c.name.clone(), Ratio::symbol(&format!("i_{}", c.name))));
                }
                Kind::Capacitor => {
                    let i = xs[layout.branch(&c.name, 0)?].clone();
                    derivatives.push(i.div(c.value()?)?);
                    reactive_currents.push((c.name.clone(), i));
                }
                _ => {}
            }
        }
        let mut output_values = Vec::new();
        for (i, name) in layout.node_names.iter().enumerate() {
            outputs.push(format!("v_{}", name));
            output_values.push(xs[i].clone());
        }
        for (name, i) in reactive_currents {
            outputs.push(format!("i_{}", name));
            output_values.push(i);
        }

        let split = |values: &[Ratio]| -> Result<(SymMatrix, SymMatrix)> {
            let left = values
                .iter()
                .map(|r| coefficients(r, &states))
                .collect::<Result<Vec<_>>>()?;
            let right = values
                .iter()
                .map(|r| coefficients(r, &inputs))
                .collect::<Result<Vec<_>>>()?;
            Ok((matrix(left, states.len())?, matrix(right, inputs.len())?))
        };
        let (a, b) = split(&derivatives)?;
        let (c, d) = split(&output_values)?;
        debug!(states = states.len(), inputs = inputs.len(), outputs = outputs.len(), "state space built");
        Ok(StateSpace {
            a,
            b,
            c,
            d,
            states,
            inputs,
            outputs,
            x0,
        })
    }

    /// State names.
    pub fn x(&self) -> &[String] {
        &self.states
    }

    /// Input names.
    pub fn u(&self) -> &[String] {
        &self.inputs
    }

    /// Output names.
    pub fn y(&self) -> &[String] {
        &self.outputs
    }

    /// Initial state from the reactive components' initial conditions.
    pub fn x0(&self) -> &[Ratio] {
        &self.x0
    }

    fn equations(&self, left: &SymMatrix, right: &SymMatrix, names: &[String]) -> Vec<(String, Ratio)> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut acc = Ratio::zero();
                for (j, x) in self.states.iter().enumerate() {
                    acc = acc.add(&left.get(i, j).mul(&Ratio::symbol(x)));
                }
                for (j, u) in self.inputs.iter().enumerate() {
                    acc = acc.add(&right.get(i, j).mul(&Ratio::symbol(u)));
                }
                (name.clone(), acc)
            })
            .collect()
    }

    /// `dx/dt` for each state, in the state and input symbols.
    pub fn state_equations(&self) -> Vec<(String, Ratio)> {
        self.equations(&self.a, &self.b, &self.states)
    }

    /// Each output in the state and input symbols.
    pub fn output_equations(&self) -> Vec<(String, Ratio)> {
        self.equations(&self.c, &self.d, &self.outputs)
    }

    /// `det(sI − A)`.
    pub fn characteristic_polynomial(&self) -> Result<Ratio> {
        self.a.char_poly(cas::S)
    }

    /// Roots of the characteristic polynomial.
    pub fn eigenvalues(&self) -> Result<Vec<Root>> {
        let p = self.characteristic_polynomial()?;
        UPoly::from_poly(p.num(), cas::S).roots()
    }

    /// `C (sI − A)⁻¹ B + D`.
    pub fn transfer_matrix(&self) -> Result<SymMatrix> {
        let n = self.states.len();
        if n == 0 {
            return Ok(self.d.clone());
        }
        let resolvent = SymMatrix::identity(n)
            .scale(&Ratio::symbol(cas::S))
            .sub(&self.a)?
            .inverse()?;
        self.c.mul(&resolvent)?.mul(&self.b)?.add(&self.d)
    }

    /// Transfer function from input `u` to output `y`.
    pub fn transfer(&self, y: &str, u: &str) -> Result<Expr> {
        let i = self.outputs.iter().position(|n| n == y).ok_or_else(|| SymnodalError::UnknownName {
            what: "output",
            name: y.to_string(),
        })?;
        let j = self.inputs.iter().position(|n| n == u).ok_or_else(|| SymnodalError::UnknownName {
            what: "input",
            name: u.to_string(),
        })?;
        let h = self.transfer_matrix()?.get(i, j).clone();
        Ok(Expr::laplace_ratio(h)?.with_quantity(Quantity::Transfer))
    }

    /// `[B, AB, A²B, ...]`.
    pub fn controllability_matrix(&self) -> Result<SymMatrix> {
        let mut blocks = vec![self.b.clone()];
        for k in 1..self.states.len() {
            let next = self.a.mul(&blocks[k - 1])?;
            blocks.push(next);
        }
        hstack(&blocks)
    }

    /// `[C; CA; CA²; ...]`.
    pub fn observability_matrix(&self) -> Result<SymMatrix> {
        let mut blocks = vec![self.c.clone()];
        for k in 1..self.states.len() {
            let next = blocks[k - 1].mul(&self.a)?;
            blocks.push(next);
        }
        vstack(&blocks)
    }

    pub fn is_controllable(&self) -> Result<bool> {
        Ok(rank(&self.controllability_matrix()?)? == self.states.len())
    }

    pub fn is_observable(&self) -> Result<bool> {
        Ok(rank(&self.observability_matrix()?)? == self.states.len())
    }

    fn numeric(&self) -> Result<(DMatrix<f64>, DMatrix<f64>, DMatrix<f64>, DMatrix<f64>)> {
        let real = |m: &SymMatrix| {
            m.to_real()
                .map_err(|e| state_space_error(format!("numeric model needed: {}", e)))
        };
        Ok((real(&self.a)?, real(&self.b)?, real(&self.c)?, real(&self.d)?))
    }

    /// Solves `A Wc + Wc Aᵀ + B Bᵀ = 0`.
    pub fn controllability_gramian(&self) -> Result<DMatrix<f64>> {
        let (a, b, _, _) = self.numeric()?;
        lyapunov(&a, &(&b * b.transpose()))
    }

    /// Solves `Aᵀ Wo + Wo A + Cᵀ C = 0`.
    pub fn observability_gramian(&self) -> Result<DMatrix<f64>> {
        let (a, _, c, _) = self.numeric()?;
        lyapunov(&a.transpose(), &(c.transpose() * &c))
    }

    /// Zero-order hold with sample period `dt`.
    pub fn discretize(&self, dt: f64) -> Result<DiscreteStateSpace> {
        if dt.is_nan() || dt <= 0.0 {
            return Err(state_space_error(format!("sample period {} must be positive", dt)));
        }
        let (a, b, c, d) = self.numeric()?;
        let (n, m) = (a.nrows(), b.ncols());
        let mut aug = DMatrix::<f64>::zeros(n + m, n + m);
        aug.view_mut((0, 0), (n, n)).copy_from(&(&a * dt));
        aug.view_mut((0, n), (n, m)).copy_from(&(&b * dt));
        let e = aug.exp();
        Ok(DiscreteStateSpace {
            ad: e.view((0, 0), (n, n)).into_owned(),
            bd: e.view((0, n), (n, m)).into_owned(),
            c,
            d,
            dt,
        })
    }
}

impl DiscreteStateSpace {
    pub fn eigenvalues(&self) -> Vec<C64> {
        self.ad.complex_eigenvalues().iter().copied().collect()
    }

    /// Solves `Wc = Ad Wc Adᵀ + Bd Bdᵀ`.
    pub fn controllability_gramian(&self) -> Result<DMatrix<f64>> {
        stein(&self.ad, &(&self.bd * self.bd.transpose()))
    }

    /// Solves `Wo = Adᵀ Wo Ad + Cᵀ C`.
    pub fn observability_gramian(&self) -> Result<DMatrix<f64>> {
        stein(&self.ad.transpose(), &(self.c.transpose() * &self.c))
    }
}

impl Circuit {
    pub fn state_space(&self) -> Result<StateSpace> {
        StateSpace::from_circuit(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use approx::assert_abs_diff_eq;

    fn ss(text: &str) -> StateSpace {
        Circuit::parse(text, Session::new()).unwrap().state_space().unwrap()
    }

    #[test]
    fn test_rc_model() {
        let m = ss("V1 1 0 5\nR1 1 2 2\nC1 2 0 3");
        assert_eq!(m.x(), ["v_C1".to_string()]);
        assert_eq!(m.u(), ["v_V1".to_string()]);
        assert_eq!(m.y(), ["v_1".to_string(), "v_2".to_string(), "i_C1".to_string()]);
        // dv/dt = (v_V1 - v_C1) / (R C)
        assert_abs_diff_eq!(m.a.get(0, 0).as_real().unwrap(), -1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.b.get(0, 0).as_real().unwrap(), 1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.d.get(0, 0).as_real().unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.c.get(1, 0).as_real().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_series_rlc() {
        let m = ss("V1 1 0 1\nR1 1 2 2\nL1 2 3 1\nC1 3 0 1");
        assert_eq!(m.x(), ["i_L1".to_string(), "v_C1".to_string()]);
        let a = m.a.to_real().unwrap();
        assert_abs_diff_eq!(a[(0, 0)], -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a[(0, 1)], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a[(1, 0)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a[(1, 1)], 0.0, epsilon = 1e-12);
        for root in m.eigenvalues().unwrap() {
            let r = root.numeric().unwrap();
            assert_abs_diff_eq!(r.re, -1.0, epsilon = 1e-6);
        }
        assert!(m.is_controllable().unwrap());
        assert!(m.is_observable().unwrap());
    }

    #[test]
    fn test_symbolic_rl() {
        let m = ss("V1 1 0 V\nR1 1 2 R\nL1 2 0 L");
        let (r, l) = (Ratio::symbol("R"), Ratio::symbol("L"));
        assert_eq!(*m.a.get(0, 0), r.neg().div(&l).unwrap());
        let eqs = m.state_equations();
        assert_eq!(eqs[0].0, "i_L1");
        let h = m.transfer("i_L1", "v_V1").unwrap().ratio().unwrap();
        let s = Ratio::symbol(cas::S);
        assert_eq!(h, l.mul(&s).add(&r).inv().unwrap());
    }

    #[test]
    fn test_initial_state() {
        let m = ss("R1 1 0 1\nC1 1 0 1 2\nL1 1 0 1 3");
        let x0: Vec<f64> = m.x0().iter().map(|r| r.as_real().unwrap()).collect();
        assert_eq!(x0, vec![2.0, 3.0]);
    }

    #[test]
    fn test_builds_on_laplace_solution() {
        let c = Circuit::parse("V1 1 0 1\nR1 1 2 1\nC1 2 0 1", Session::new()).unwrap();
        assert!(!c.is_solved(&AnalysisKind::Laplace));
        c.state_space().unwrap();
        assert!(c.is_solved(&AnalysisKind::Laplace));
    }

    #[test]
    fn test_degenerate_topologies() {
        let c = Circuit::parse("I1 0 1 1\nL1 1 2 1\nR1 2 0 1", Session::new()).unwrap();
        assert!(matches!(c.state_space().unwrap_err(), SymnodalError::StateSpace(_)));
        let c = Circuit::parse("V1 1 0 1\nC1 1 0 1\nR1 1 0 1", Session::new()).unwrap();
        assert!(matches!(c.state_space().unwrap_err(), SymnodalError::StateSpace(_)));
    }

    #[test]
    fn test_gramians_and_discretisation() {
        let m = ss("V1 1 0 1\nR1 1 2 1\nC1 2 0 1");
        // a = -1, b = 1: Wc = 1/2
        let wc = m.controllability_gramian().unwrap();
        assert_abs_diff_eq!(wc[(0, 0)], 0.5, epsilon = 1e-12);
        let dss = m.discretize(0.1).unwrap();
        assert_abs_diff_eq!(dss.ad[(0, 0)], (-0.1f64).exp(), epsilon = 1e-9);
        assert_abs_diff_eq!(dss.bd[(0, 0)], 1.0 - (-0.1f64).exp(), epsilon = 1e-9);
        let eig = dss.eigenvalues();
        assert_abs_diff_eq!(eig[0].re, (-0.1f64).exp(), epsilon = 1e-9);
        let wd = dss.controllability_gramian().unwrap();
        let bd = 1.0 - (-0.1f64).exp();
        assert_abs_diff_eq!(wd[(0, 0)], bd * bd / (1.0 - (-0.2f64).exp()), epsilon = 1e-9);
    }
}
