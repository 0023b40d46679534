//! Error types for the metadata substrate and the erased call path

/// Result type for substrate operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Faults raised by the erased (generic) call path and by registration
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    /// The receiver passed to an accessor is not an instance of the
    /// declaring type (or of a registered subtype of it)
    #[error("Receiver type mismatch: expected {expected}, got {got}")]
    TargetMismatch {
        /// Expected receiver type name
        expected: String,
        /// Actual receiver type name
        got: String,
    },

    /// A value did not conform to the declared member type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual value kind
        got: String,
    },

    /// Wrong number of arguments for an invocation
    #[error("Arity mismatch: expected {expected} argument(s), got {got}")]
    ArityMismatch {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Attempt to call a member that has no body (abstract declaration)
    #[error("`{member}` is abstract and has no body")]
    MissingBody {
        /// Member name
        member: String,
    },

    /// Attempt to write a field registered without a setter
    #[error("`{member}` is read-only")]
    ReadOnly {
        /// Member name
        member: String,
    },

    /// A fault raised by the callee itself, carried through unchanged
    #[error("{0}")]
    Callee(String),

    /// Malformed registration input
    #[error("Registration error: {0}")]
    Registration(String),
}

/// Precondition check: evaluates to `return Err($err.into())` when the
/// condition does not hold.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
