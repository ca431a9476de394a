//! Symbolic linear circuit analysis.
//!
//! Netlists are parsed into components, stamped into a modified nodal
//! analysis system over rational functions and solved exactly. Results are
//! domain-tagged expressions collected into superpositions, one part per
//! analysis kind.

pub mod analysis;
pub mod cas;
pub mod catalog;
pub mod circuit;
pub mod compiler;
pub mod error;
pub mod expr;
pub mod immittance;
pub mod ir;
pub mod output;
pub mod parser;
pub mod session;
pub mod statespace;
pub mod superposition;
pub mod topology;
pub mod twoport;

pub use circuit::Circuit;
pub use error::{Result, SymnodalError};
pub use session::Session;
