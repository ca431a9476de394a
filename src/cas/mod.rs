//! Symbolic algebra backend.
//!
//! A small computer-algebra layer sized for linear circuit work: sparse
//! multivariate polynomials with complex coefficients, rational functions,
//! delayed rational sums for transform-domain values, exponential-polynomial
//! signals for the time domains, and dense symbolic matrices.

pub mod delayed;
pub mod matrix;
pub mod parse;
pub mod poly;
pub mod ratio;
pub mod signal;
pub mod upoly;

pub use delayed::Delayed;
pub use matrix::{Excitation, SymMatrix};
pub use poly::{Monomial, Poly, C64};
pub use ratio::Ratio;
pub use signal::{Family, Signal, Support};
pub use upoly::{series_div, Root, UPoly};

/// Continuous time.
pub const T: &str = "t";
/// Laplace variable.
pub const S: &str = "s";
/// Linear frequency.
pub const F: &str = "f";
/// Angular frequency.
pub const OMEGA: &str = "omega";
/// Z-transform variable.
pub const Z: &str = "z";
/// Discrete time index.
pub const N: &str = "n";
/// Discrete frequency index.
pub const K: &str = "k";
/// Infinitesimal admittance used for capacitors in DC analysis.
pub const EPSILON: &str = "epsilon";

/// Every symbol with a fixed meaning.
pub const RESERVED: [&str; 8] = [T, S, F, OMEGA, Z, N, K, EPSILON];

/// `j·2π·f`, the Laplace variable on the linear-frequency axis.
pub fn j2pif() -> Ratio {
    Ratio::symbol(F).mul(&Ratio::imag(2.0 * std::f64::consts::PI))
}

/// `j·ω`.
pub fn jomega() -> Ratio {
    Ratio::symbol(OMEGA).mul(&Ratio::imag(1.0))
}
