//! Heap objects and construction

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::types::{
    ConstructorBody, ConstructorHandle, MethodBody, MethodInfo, Signature, TypeHandle, TypeKind,
};
use super::value::Value;
use crate::error::{ReifyError, ReifyResult, ResolutionError};
use crate::mop::{Dispatcher, StubSlot};

/// A heap object: its class, named fields, and (for stubs) the dispatcher slot
pub struct Object {
    class: TypeHandle,
    fields: RwLock<FxHashMap<String, Value>>,
    stub: Option<StubSlot>,
}

/// Shared reference to an [`Object`]
///
/// Equality is identity: two refs are equal only if they point at the same
/// allocation.
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    /// Allocate an instance with no constructor run
    pub(crate) fn allocate(class: TypeHandle) -> Self {
        let stub = class.is_synthesized().then(StubSlot::new);
        Self(Arc::new(Object {
            class,
            fields: RwLock::new(FxHashMap::default()),
            stub,
        }))
    }

    /// Runtime class
    pub fn class(&self) -> &TypeHandle {
        &self.0.class
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity hash
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Read a field
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.0.fields.read().get(name).cloned()
    }

    /// Write a field, returning the previous value
    pub fn set_field(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.fields.write().insert(name.into(), value)
    }

    /// Virtual call by exact signature
    ///
    /// Arguments are passed through as given; overload resolution and
    /// argument conversion happen in [`Reifier::invoke`](crate::Reifier::invoke).
    pub fn invoke_signature(&self, signature: &Signature, args: &[Value]) -> ReifyResult<Value> {
        let entry = self
            .class()
            .vtable_entry(signature)
            .ok_or_else(|| ReifyError::NoSuchMethod {
                type_name: self.class().name().to_string(),
                method: signature.to_string(),
            })?;
        run_body(&entry.body, &entry.method, self, args)
    }

    /// True if this object is a stub instance
    pub fn is_stub(&self) -> bool {
        self.0.stub.is_some()
    }

    pub(crate) fn stub_slot(&self) -> Option<&StubSlot> {
        self.0.stub.as_ref()
    }

    /// Attach (or swap) the dispatcher of a stub instance
    ///
    /// Returns the previously attached dispatcher. Calls already in flight
    /// finish on the dispatcher they started with; memoized results are
    /// discarded.
    pub fn attach_dispatcher(
        &self,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> ReifyResult<Option<Arc<dyn Dispatcher>>> {
        let slot = self
            .stub_slot()
            .ok_or_else(|| ReifyError::NotReified(self.class().name().to_string()))?;
        Ok(slot.attach(dispatcher))
    }

    /// Currently attached dispatcher, `None` before attachment or for plain objects
    pub fn dispatcher(&self) -> Option<Arc<dyn Dispatcher>> {
        self.stub_slot().and_then(StubSlot::dispatcher)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.class().name(), self.id())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name())
            .field("stub", &self.stub.is_some())
            .finish()
    }
}

/// Execute a method body on `this`
///
/// Opaque bodies (declared by a catalog, not executable here) return the
/// zero value of the declared return type.
pub(crate) fn run_body(
    body: &MethodBody,
    method: &MethodInfo,
    this: &ObjectRef,
    args: &[Value],
) -> ReifyResult<Value> {
    match body {
        MethodBody::Native(f) => f(this, args),
        MethodBody::Opaque => Ok(Value::zero_of(&method.return_type)),
        MethodBody::Abstract => Err(ReifyError::AbstractInvocation {
            method: method.qualified(),
        }),
    }
}

/// Allocate an instance of `class` and run its constructor chain
///
/// Superclass no-argument constructors run first, root first, then
/// `constructor` (or the class's own no-argument constructor) with `args`.
pub fn construct(
    class: &TypeHandle,
    constructor: Option<&ConstructorHandle>,
    args: &[Value],
) -> ReifyResult<ObjectRef> {
    if class.kind() != TypeKind::Class || class.modifiers().is_abstract {
        return Err(ReifyError::NotInstantiable(class.name().to_string()));
    }
    let own = match constructor {
        Some(ctor) => ctor.clone(),
        None => class
            .constructors()
            .iter()
            .find(|c| c.is_no_arg())
            .cloned()
            .ok_or_else(|| ResolutionError::NoMatch {
                type_name: class.name().to_string(),
                args: Vec::new(),
            })?,
    };
    if own.params.len() != args.len() {
        return Err(ResolutionError::NoMatch {
            type_name: class.name().to_string(),
            args: args.iter().map(Value::runtime_type).collect(),
        }
        .into());
    }

    let mut chain = Vec::new();
    let mut current = class.superclass().cloned();
    while let Some(ancestor) = current {
        current = ancestor.superclass().cloned();
        chain.push(ancestor);
    }

    let obj = ObjectRef::allocate(class.clone());
    for ancestor in chain.iter().rev() {
        if let Some(ctor) = ancestor.constructors().iter().find(|c| c.is_no_arg()) {
            run_constructor(ctor, &obj, &[])?;
        }
    }
    run_constructor(&own, &obj, args)?;
    tracing::trace!(class = class.name(), constructor = %own, "constructed");
    Ok(obj)
}

fn run_constructor(ctor: &ConstructorHandle, obj: &ObjectRef, args: &[Value]) -> ReifyResult<()> {
    match &ctor.body {
        ConstructorBody::Native(f) => f(obj, args),
        ConstructorBody::Opaque => Ok(()),
    }
}
