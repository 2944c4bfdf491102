//! Stub instance state and generated call bodies
//!
//! Every stub instance carries a [`StubSlot`]: its dispatch state and the
//! memo table for operations marked `cached`. Every eligible operation of a
//! stub type gets an interception body built by [`intercept_body`].
//!
//! ## Call flow
//!
//! 1. `returns_self` operations return the receiving stub.
//! 2. Unattached stubs run the target's own implementation.
//! 3. `cached` operations answer from the memo when filled.
//! 4. Arguments are converted to the declared parameter types.
//! 5. The dispatcher reifies the call; the result is checked against the
//!    declared return type.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use super::descriptor::{CallDescriptor, GenericBindings};
use super::dispatcher::Dispatcher;
use super::name_codec::TargetType;
use crate::error::{ReifyError, ReifyResult};
use crate::runtime::{
    run_body, MethodBody, MethodHandle, ObjectRef, Primitive, TypeHandle, TypeRegistry, Value,
    ROOT_TYPE,
};

/// Dispatch state of a stub instance
#[derive(Clone, Default)]
pub enum DispatchState {
    /// No dispatcher yet; calls run the inherited implementation
    #[default]
    Unattached,
    /// Calls are reified through the dispatcher
    Attached(Arc<dyn Dispatcher>),
}

impl fmt::Debug for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Unattached => f.write_str("Unattached"),
            DispatchState::Attached(_) => f.write_str("Attached"),
        }
    }
}

#[derive(Default)]
struct Memo {
    /// Bumped on every attach; stale writes are dropped
    epoch: u64,
    values: FxHashMap<usize, Value>,
}

/// Per-instance stub state
pub struct StubSlot {
    state: RwLock<DispatchState>,
    memo: Mutex<Memo>,
}

impl StubSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(DispatchState::Unattached),
            memo: Mutex::new(Memo::default()),
        }
    }

    /// Swap in a dispatcher, clearing memoized results
    pub(crate) fn attach(&self, dispatcher: Arc<dyn Dispatcher>) -> Option<Arc<dyn Dispatcher>> {
        let mut state = self.state.write();
        let previous = std::mem::replace(&mut *state, DispatchState::Attached(dispatcher));
        let mut memo = self.memo.lock();
        memo.epoch += 1;
        memo.values.clear();
        match previous {
            DispatchState::Attached(old) => {
                tracing::debug!("dispatcher replaced on live stub");
                Some(old)
            }
            DispatchState::Unattached => None,
        }
    }

    /// Current state
    pub fn state(&self) -> DispatchState {
        self.state.read().clone()
    }

    /// Attached dispatcher
    pub fn dispatcher(&self) -> Option<Arc<dyn Dispatcher>> {
        match &*self.state.read() {
            DispatchState::Attached(d) => Some(d.clone()),
            DispatchState::Unattached => None,
        }
    }

    /// Dispatcher with the memo epoch it belongs to
    fn snapshot(&self) -> Option<(Arc<dyn Dispatcher>, u64)> {
        let state = self.state.read();
        match &*state {
            DispatchState::Attached(d) => Some((d.clone(), self.memo.lock().epoch)),
            DispatchState::Unattached => None,
        }
    }

    fn memoized(&self, slot: usize) -> Option<Value> {
        self.memo.lock().values.get(&slot).cloned()
    }

    /// Store the first result for `slot`; returns the stored value
    fn memoize(&self, slot: usize, epoch: u64, value: Value) -> Value {
        let mut memo = self.memo.lock();
        if memo.epoch != epoch {
            return value;
        }
        memo.values.entry(slot).or_insert(value).clone()
    }
}

impl fmt::Debug for StubSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubSlot")
            .field("state", &*self.state.read())
            .finish()
    }
}

/// What the generated body of an operation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptMode {
    /// Forward to the dispatcher
    Reify,
    /// Forward once, then answer from the memo
    Cached,
    /// Return the receiving stub without reifying
    ReturnSelf,
}

impl fmt::Display for InterceptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InterceptMode::Reify => "reify",
            InterceptMode::Cached => "cached",
            InterceptMode::ReturnSelf => "self",
        })
    }
}

/// One intercepted operation of a stub type
#[derive(Debug, Clone)]
pub struct StubMethod {
    /// Operation handle passed in call descriptors
    pub method: MethodHandle,
    /// Memo index
    pub slot: usize,
    /// Generated behavior
    pub mode: InterceptMode,
}

/// Description of a synthesized stub type
#[derive(Debug)]
pub struct StubLayout {
    /// Target the stub was built for
    pub target: TargetType,
    /// Target type definition
    pub target_type: TypeHandle,
    /// Type parameter bindings
    pub bindings: Arc<GenericBindings>,
    /// Intercepted operations, in selection order
    pub methods: Vec<StubMethod>,
    /// Number of operations examined by the selector
    pub examined: usize,
}

struct Interceptor {
    stub: StubMethod,
    target_type: TypeHandle,
    /// Weak: the registry owns the stub type that owns this body
    registry: Weak<TypeRegistry>,
    bindings: Arc<GenericBindings>,
    type_vars: Vec<String>,
}

/// Generated body for one eligible operation
pub(crate) fn intercept_body(
    stub: StubMethod,
    layout_target: &TypeHandle,
    registry: &Arc<TypeRegistry>,
    bindings: &Arc<GenericBindings>,
) -> MethodBody {
    let mut type_vars: Vec<String> = layout_target.type_params().to_vec();
    if let Some(declaring) = registry.get(&stub.method.declaring_type) {
        type_vars.extend(declaring.type_params().iter().cloned());
    }
    let interceptor = Interceptor {
        stub,
        target_type: layout_target.clone(),
        registry: Arc::downgrade(registry),
        bindings: bindings.clone(),
        type_vars,
    };
    MethodBody::Native(Arc::new(move |this: &ObjectRef, args: &[Value]| {
        interceptor.call(this, args)
    }))
}

impl Interceptor {
    fn call(&self, this: &ObjectRef, args: &[Value]) -> ReifyResult<Value> {
        let method = &self.stub.method;
        if self.stub.mode == InterceptMode::ReturnSelf {
            return Ok(Value::Object(this.clone()));
        }
        let slot = this
            .stub_slot()
            .ok_or_else(|| ReifyError::NotReified(this.class().name().to_string()))?;

        let Some((dispatcher, epoch)) = slot.snapshot() else {
            return self.call_inherited(this, args);
        };

        if self.stub.mode == InterceptMode::Cached {
            if let Some(value) = slot.memoized(self.stub.slot) {
                tracing::trace!(method = %method, "memoized result");
                return Ok(value);
            }
        }

        let boxed = self.box_args(args)?;
        tracing::trace!(method = %method, args = boxed.len(), "reifying call");
        let call = CallDescriptor::new(method.clone(), boxed, self.bindings.clone());
        let result = self.adapt_return(dispatcher.reify(call)?)?;

        if self.stub.mode == InterceptMode::Cached && !result.is_null() {
            return Ok(slot.memoize(self.stub.slot, epoch, result));
        }
        Ok(result)
    }

    /// Unattached path: the target's own implementation
    fn call_inherited(&self, this: &ObjectRef, args: &[Value]) -> ReifyResult<Value> {
        let method = &self.stub.method;
        match self.target_type.vtable_entry(&method.signature) {
            Some(entry) if !entry.body.is_abstract() => run_body(&entry.body, &entry.method, this, args),
            _ => Err(ReifyError::DispatcherNotAttached {
                method: method.qualified(),
            }),
        }
    }

    fn registry(&self) -> ReifyResult<Arc<TypeRegistry>> {
        self.registry
            .upgrade()
            .ok_or_else(|| ReifyError::Native("type registry has been dropped".to_string()))
    }

    fn is_type_var(&self, name: &str) -> bool {
        self.type_vars.iter().any(|v| v == name)
    }

    fn box_args(&self, args: &[Value]) -> ReifyResult<Vec<Value>> {
        let method = &self.stub.method;
        let params = method.params();
        if args.len() != params.len() {
            return Err(ReifyError::ArgumentMismatch {
                method: method.qualified(),
                index: args.len().min(params.len()),
                expected: format!("{} argument(s)", params.len()),
                found: format!("{} argument(s)", args.len()),
            });
        }
        let registry = self.registry()?;
        params
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (formal, value))| {
                if self.is_type_var(formal) {
                    return Ok(value.clone());
                }
                registry
                    .coerce(formal, value)
                    .ok_or_else(|| ReifyError::ArgumentMismatch {
                        method: method.qualified(),
                        index,
                        expected: formal.clone(),
                        found: value.type_label(),
                    })
            })
            .collect()
    }

    fn adapt_return(&self, value: Value) -> ReifyResult<Value> {
        let method = &self.stub.method;
        if method.is_void() {
            return Ok(Value::Void);
        }
        let declared = if self.is_type_var(&method.return_type) {
            self.bindings
                .get(&method.return_type)
                .unwrap_or(ROOT_TYPE)
        } else {
            method.return_type.as_str()
        };
        let registry = self.registry()?;
        let fits = match Primitive::from_name(declared) {
            Some(p) => value.primitive() == Some(p),
            None => match &value {
                Value::Null => true,
                Value::Void => false,
                other => other
                    .runtime_type()
                    .map_or(false, |t| registry.is_assignable(declared, &t)),
            },
        };
        if fits {
            Ok(value)
        } else {
            Err(ReifyError::ReturnTypeMismatch {
                method: method.qualified(),
                expected: declared.to_string(),
                found: value.type_label(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl Dispatcher for Nop {
        fn reify(&self, _call: CallDescriptor) -> ReifyResult<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_attach_returns_previous_and_clears_memo() {
        let slot = StubSlot::new();
        assert!(matches!(slot.state(), DispatchState::Unattached));
        assert!(slot.attach(Arc::new(Nop)).is_none());

        let (_, epoch) = slot.snapshot().unwrap();
        assert_eq!(slot.memoize(0, epoch, Value::Int(1)), Value::Int(1));
        assert_eq!(slot.memoize(0, epoch, Value::Int(2)), Value::Int(1));
        assert_eq!(slot.memoized(0), Some(Value::Int(1)));

        assert!(slot.attach(Arc::new(Nop)).is_some());
        assert_eq!(slot.memoized(0), None);
        // a write from the previous epoch is dropped
        assert_eq!(slot.memoize(0, epoch, Value::Int(3)), Value::Int(3));
        assert_eq!(slot.memoized(0), None);
    }
}
