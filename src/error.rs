use thiserror::Error;

#[derive(Debug, Error)]
pub enum SymnodalError {
    #[error("Parse error: {0}")]
    Parse(String),

    /// An expression carries a free variable that belongs to another domain.
    #[error("Domain error: {domain} expression cannot depend on '{symbol}': {expr}")]
    DomainInvariant {
        domain: &'static str,
        symbol: String,
        expr: String,
    },

    #[error("Domain mismatch: cannot {op} {lhs} and {rhs} expressions without an explicit conversion")]
    DomainMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("Unsupported component {name}: {reason}")]
    UnsupportedComponent { name: String, reason: String },

    #[error("Singular MNA system: {cause} (hint: {hint})")]
    StructuralDegeneracy { cause: String, hint: String },

    #[error("Incompatible operands: {0}")]
    IncompatibleOperands(String),

    #[error("Initial condition count mismatch: expected {expected}, got {got}")]
    InitialConditionCount { expected: usize, got: usize },

    #[error("Degenerate two-port conversion to {target}: {reason}")]
    DegenerateTwoPort { target: char, reason: String },

    #[error("Algebra error: {0}")]
    Algebra(String),

    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Unknown {what} '{name}'")]
    UnknownName { what: &'static str, name: String },

    #[error("State-space error: {0}")]
    StateSpace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SymnodalError>;
