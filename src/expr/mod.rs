//! Domain-tagged expressions.

pub mod density;
pub mod domain;
pub mod expression;
pub mod rational;
pub mod response;
pub mod transform;

pub use density::Density;
pub use domain::{Domain, Omega, Quantity};
pub use expression::{Expr, Value};
pub use rational::{Canonical, PartialFractions, Residue, Zpk};
