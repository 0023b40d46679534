//! Reflection error taxonomy

use mirra_core::CoreError;

/// Result type for reflection operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Errors surfaced by the reflection core
///
/// Synthesis failure is deliberately absent: a member that cannot be given a
/// fast dispatch slot silently degrades to the erased path. Everything else
/// propagates synchronously to the triggering caller and is never retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflectError {
    /// The host has no metadata for the type: nothing can be enumerated
    #[error("No reflection metadata registered for type `{type_name}`")]
    TypeUnavailable {
        /// Requested type name
        type_name: String,
    },

    /// `new_instance` on a type without a zero-argument constructor
    #[error("Type `{type_name}` has no default constructor")]
    NoDefaultConstructor {
        /// Type name
        type_name: String,
    },

    /// Stale or invalid accessor index; a programming error, failed fast
    #[error("Accessor index {index} out of range for type `{type_name}`")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Type whose engine was addressed
        type_name: String,
    },

    /// Invocation-machinery fault: receiver, arity, or argument conversion
    #[error("Invocation of `{member}` on `{type_name}` failed: {source}")]
    Invocation {
        /// Member being invoked
        member: String,
        /// Type owning the member
        type_name: String,
        /// Underlying substrate fault
        #[source]
        source: CoreError,
    },

    /// A fault raised by the callee itself, surfaced with its own message
    /// rather than wrapped as an invocation failure
    #[error("{message}")]
    Callee {
        /// The callee's message, unchanged
        message: String,
    },

    /// Name-based member lookup found nothing
    #[error("Type `{type_name}` has no member named `{member}`")]
    MemberNotFound {
        /// Requested member name
        member: String,
        /// Type searched
        type_name: String,
    },

    /// A generic-type expression the resolver cannot process
    #[error("Unsupported type expression: {detail}")]
    UnsupportedTypeExpression {
        /// What was wrong with the expression
        detail: String,
    },

    /// Reverse enum lookup found no constant with a matching value
    #[error("`{value}` is not a valid value of enum `{type_name}`")]
    InvalidValue {
        /// String form of the rejected value
        value: String,
        /// Enum type name
        type_name: String,
    },
}

impl ReflectError {
    /// Wrap a substrate fault, re-surfacing callee faults unwrapped
    pub(crate) fn from_core(member: &str, type_name: &str, source: CoreError) -> Self {
        match source {
            CoreError::Callee(message) => ReflectError::Callee { message },
            source => ReflectError::Invocation {
                member: member.to_string(),
                type_name: type_name.to_string(),
                source,
            },
        }
    }
}
