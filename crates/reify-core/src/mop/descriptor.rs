//! Reified call and construction descriptors
//!
//! Descriptors are plain values handed to a dispatcher by move. A dispatcher
//! may ship them elsewhere or execute them in place.

use std::fmt;
use std::sync::Arc;

use crate::error::{ReifyError, ReifyResult};
use crate::runtime::{construct, ConstructorHandle, MethodHandle, ObjectRef, TypeHandle, Value};

/// Ordered binding of a target's type parameters to generic arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericBindings {
    bindings: Vec<(String, String)>,
}

impl GenericBindings {
    /// Pair type parameters with arguments; extra entries on either side are dropped
    pub fn new(params: &[String], args: &[String]) -> Self {
        Self {
            bindings: params.iter().cloned().zip(args.iter().cloned()).collect(),
        }
    }

    /// Bound type for a type parameter
    pub fn get(&self, param: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(p, _)| p == param)
            .map(|(_, t)| t.as_str())
    }

    /// `(parameter, type)` pairs, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if the target is not parameterized
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// An intercepted call: operation, boxed arguments, generic bindings
pub struct CallDescriptor {
    method: MethodHandle,
    args: Vec<Value>,
    generics: Arc<GenericBindings>,
}

impl CallDescriptor {
    pub(crate) fn new(method: MethodHandle, args: Vec<Value>, generics: Arc<GenericBindings>) -> Self {
        Self {
            method,
            args,
            generics,
        }
    }

    /// Operation being called
    pub fn method(&self) -> &MethodHandle {
        &self.method
    }

    /// Boxed arguments
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Generic bindings of the stub the call went through
    pub fn generic_bindings(&self) -> &GenericBindings {
        &self.generics
    }

    /// Take the descriptor apart
    pub fn into_parts(self) -> (MethodHandle, Vec<Value>, Arc<GenericBindings>) {
        (self.method, self.args, self.generics)
    }

    /// Run the call against a real object
    pub fn execute(self, target: &ObjectRef) -> ReifyResult<Value> {
        target.invoke_signature(&self.method.signature, &self.args)
    }
}

impl fmt::Debug for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallDescriptor")
            .field("method", &self.method.qualified())
            .field("args", &self.args)
            .field("generics", &self.generics)
            .finish()
    }
}

/// How the dispatcher obtains the real target object
pub enum ConstructorCall {
    /// Build the object when executed
    Deferred {
        /// Type to build
        target: TypeHandle,
        /// Resolved constructor; `None` for interfaces
        constructor: Option<ConstructorHandle>,
        /// Converted constructor arguments
        args: Vec<Value>,
    },
    /// Return an existing object unchanged
    PreBuilt(ObjectRef),
}

impl ConstructorCall {
    /// Name of the type the call produces
    pub fn target_name(&self) -> &str {
        match self {
            ConstructorCall::Deferred { target, .. } => target.name(),
            ConstructorCall::PreBuilt(obj) => obj.class().name(),
        }
    }

    /// True for [`ConstructorCall::PreBuilt`]
    pub fn is_prebuilt(&self) -> bool {
        matches!(self, ConstructorCall::PreBuilt(_))
    }

    /// Produce the target object
    pub fn execute(self) -> ReifyResult<ObjectRef> {
        match self {
            ConstructorCall::PreBuilt(obj) => Ok(obj),
            ConstructorCall::Deferred {
                target,
                constructor,
                args,
            } => {
                let constructor = constructor
                    .ok_or_else(|| ReifyError::NotInstantiable(target.name().to_string()))?;
                tracing::debug!(target_type = target.name(), constructor = %constructor, "executing deferred construction");
                construct(&target, Some(&constructor), &args)
            }
        }
    }
}

impl fmt::Debug for ConstructorCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorCall::Deferred {
                target,
                constructor,
                args,
            } => f
                .debug_struct("Deferred")
                .field("target", &target.name())
                .field("constructor", &constructor.as_ref().map(|c| c.to_string()))
                .field("args", args)
                .finish(),
            ConstructorCall::PreBuilt(obj) => f.debug_tuple("PreBuilt").field(obj).finish(),
        }
    }
}
