//! Reification errors.

use std::fmt;

use crate::runtime::DefineError;

/// Why a target type cannot be given a stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReifiableReason {
    /// Primitive types have no stub
    Primitive,
    /// The type is declared final
    Final,
    /// Stubs are built without arguments, so the class needs `()`
    NoPublicNoArgConstructor,
    /// Generic parameter count differs from the declared type parameters
    GenericArity {
        /// Declared type parameters
        expected: usize,
        /// Supplied generic parameters
        found: usize,
    },
}

impl fmt::Display for NotReifiableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive => f.write_str("cannot reify primitive types"),
            Self::Final => f.write_str("cannot reify final types"),
            Self::NoPublicNoArgConstructor => {
                f.write_str("class needs a public no-argument constructor")
            }
            Self::GenericArity { expected, found } => write!(
                f,
                "expected {} generic parameter(s), found {}",
                expected, found
            ),
        }
    }
}

/// Constructor or method overload resolution failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// No candidate accepts the actual arguments
    #[error("no overload of {type_name} accepts ({})", format_args_list(.args))]
    NoMatch {
        /// Type (constructors) or `Type.method` (methods) searched
        type_name: String,
        /// Actual argument types (`None` = unknown)
        args: Vec<Option<String>>,
    },

    /// Several candidates are equally specific
    #[error("choice of an overload of {type_name} is ambiguous, possible choices are: {}", .candidates.join(", "))]
    Ambiguous {
        /// Type (constructors) or `Type.method` (methods) searched
        type_name: String,
        /// Every tied candidate, rendered as a signature
        candidates: Vec<String>,
    },
}

fn format_args_list(args: &[Option<String>]) -> String {
    args.iter()
        .map(|a| a.as_deref().unwrap_or("null"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by the reification engine and its host runtime
#[derive(Debug, thiserror::Error)]
pub enum ReifyError {
    /// Type name is not registered
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// Target type cannot receive a stub
    #[error("type {type_name} is not reifiable: {reason}")]
    NotReifiable {
        /// Offending type
        type_name: String,
        /// Specific reason
        reason: NotReifiableReason,
    },

    /// Constructor or overload resolution failed
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Malformed stub name
    #[error("malformed stub name '{name}': {reason}")]
    Format {
        /// The rejected name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Dispatcher type lacks the `(ConstructorCall, args)` constructor shape
    #[error("invalid dispatcher {name}: {reason}")]
    InvalidDispatcher {
        /// Dispatcher type name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// The type registry rejected a generated stub definition
    #[error("cannot synthesize stub {name}: {reason}")]
    SynthesisFailure {
        /// Stub type name
        name: String,
        /// Rejection reason
        reason: String,
    },

    /// Cross-view cast between unrelated types, or on a non-reified object
    #[error("cannot cast {from} into {to}")]
    ReifiedCast {
        /// Source type
        from: String,
        /// Requested type
        to: String,
    },

    /// Object is not a stub instance
    #[error("object of type {0} is not reified")]
    NotReified(String),

    /// No operation matches the call
    #[error("no method {method} on {type_name}")]
    NoSuchMethod {
        /// Receiver type
        type_name: String,
        /// Requested method, rendered as a signature or name
        method: String,
    },

    /// Argument does not fit the declared parameter
    #[error("argument {index} of {method}: expected {expected}, found {found}")]
    ArgumentMismatch {
        /// Operation signature
        method: String,
        /// Zero-based argument position
        index: usize,
        /// Declared parameter type
        expected: String,
        /// Runtime type of the argument
        found: String,
    },

    /// Dispatcher result does not fit the declared return type
    #[error("{method} must return {expected}, dispatcher returned {found}")]
    ReturnTypeMismatch {
        /// Operation signature
        method: String,
        /// Declared return type
        expected: String,
        /// Runtime type of the result
        found: String,
    },

    /// Intercepted operation has no ancestor body to fall back on
    #[error("{method} called on an unattached stub with no inherited implementation")]
    DispatcherNotAttached {
        /// Operation signature
        method: String,
    },

    /// Abstract or opaque body invoked
    #[error("{method} has no executable body")]
    AbstractInvocation {
        /// Operation signature
        method: String,
    },

    /// Interfaces and abstract classes cannot be built
    #[error("type {0} cannot be instantiated")]
    NotInstantiable(String),

    /// Host runtime rejected a type definition
    #[error(transparent)]
    Define(#[from] DefineError),

    /// Error raised by a native method or constructor body
    #[error("{0}")]
    Native(String),
}

/// Reification result
pub type ReifyResult<T> = Result<T, ReifyError>;

impl ReifyError {
    /// Build a [`ReifyError::NotReifiable`]
    pub fn not_reifiable(type_name: impl Into<String>, reason: NotReifiableReason) -> Self {
        Self::NotReifiable {
            type_name: type_name.into(),
            reason,
        }
    }

    /// Build a [`ReifyError::Format`]
    pub fn format(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
