//! Dispatchers and their registry
//!
//! A dispatcher receives every intercepted call of the stubs it is attached
//! to. Dispatcher types are registered by name with a factory taking the
//! construction descriptor and extra arguments; resolved factories are cached
//! per name.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use super::descriptor::{CallDescriptor, ConstructorCall};
use crate::error::{ReifyError, ReifyResult};
use crate::runtime::{ObjectRef, Value};

/// Receiver of reified calls
pub trait Dispatcher: Send + Sync {
    /// Handle one intercepted call
    fn reify(&self, call: CallDescriptor) -> ReifyResult<Value>;
}

/// Dispatcher constructor: `(ConstructorCall, extra args)`
pub type DispatcherFactory =
    Arc<dyn Fn(ConstructorCall, &[Value]) -> ReifyResult<Arc<dyn Dispatcher>> + Send + Sync>;

/// Named dispatcher types
pub struct DispatcherRegistry {
    /// Known names; `None` marks a type without the required constructor
    declared: DashMap<String, Option<DispatcherFactory>>,
    /// Resolved constructors, write-once per name
    constructors: DashMap<String, DispatcherFactory>,
}

impl DispatcherRegistry {
    /// Registry holding the bundled [`SynchronousDispatcher`]
    pub fn new() -> Self {
        let registry = Self {
            declared: DashMap::new(),
            constructors: DashMap::new(),
        };
        registry.register(SynchronousDispatcher::NAME, SynchronousDispatcher::factory());
        registry
    }

    /// Register a dispatcher type; the first registration of a name wins
    pub fn register(&self, name: impl Into<String>, factory: DispatcherFactory) -> bool {
        self.insert(name.into(), Some(factory))
    }

    /// Record a dispatcher type that lacks the `(ConstructorCall, args)` constructor
    pub fn register_declared(&self, name: impl Into<String>) -> bool {
        self.insert(name.into(), None)
    }

    fn insert(&self, name: String, factory: Option<DispatcherFactory>) -> bool {
        match self.declared.entry(name) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(factory);
                true
            }
        }
    }

    /// True if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.declared.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Constructor for a dispatcher type, cached after the first lookup
    pub fn constructor(&self, name: &str) -> ReifyResult<DispatcherFactory> {
        if let Some(factory) = self.constructors.get(name) {
            return Ok(factory.clone());
        }
        let declared = self
            .declared
            .get(name)
            .ok_or_else(|| ReifyError::TypeNotFound(name.to_string()))?;
        let factory = declared
            .value()
            .clone()
            .ok_or_else(|| ReifyError::InvalidDispatcher {
                name: name.to_string(),
                reason: "no (ConstructorCall, Object[]) constructor".to_string(),
            })?;
        drop(declared);
        let cached = self
            .constructors
            .entry(name.to_string())
            .or_insert(factory)
            .clone();
        tracing::debug!(dispatcher = name, "cached dispatcher constructor");
        Ok(cached)
    }

    /// Build a dispatcher owning `call`
    pub fn instantiate(
        &self,
        name: &str,
        call: ConstructorCall,
        args: &[Value],
    ) -> ReifyResult<Arc<dyn Dispatcher>> {
        let factory = self.constructor(name)?;
        factory(call, args)
    }
}

impl Default for DispatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process dispatcher: builds the target on the first call, then runs
/// every call inline on it
pub struct SynchronousDispatcher {
    pending: Mutex<Option<ConstructorCall>>,
    target: OnceCell<ObjectRef>,
}

impl SynchronousDispatcher {
    /// Registered name
    pub const NAME: &'static str = "reify.SynchronousDispatcher";

    /// Dispatcher owning `call`
    pub fn new(call: ConstructorCall) -> Self {
        Self {
            pending: Mutex::new(Some(call)),
            target: OnceCell::new(),
        }
    }

    /// Factory for [`DispatcherRegistry::register`]; extra arguments are ignored
    pub fn factory() -> DispatcherFactory {
        Arc::new(|call: ConstructorCall, _args: &[Value]| {
            Ok(Arc::new(SynchronousDispatcher::new(call)) as Arc<dyn Dispatcher>)
        })
    }

    /// True once the target object exists
    pub fn is_built(&self) -> bool {
        self.target.get().is_some()
    }

    /// The target object, building it on first use
    pub fn target(&self) -> ReifyResult<ObjectRef> {
        self.target
            .get_or_try_init(|| {
                let call = self.pending.lock().take().ok_or_else(|| {
                    ReifyError::Native("construction descriptor already consumed".to_string())
                })?;
                call.execute()
            })
            .cloned()
    }
}

impl Dispatcher for SynchronousDispatcher {
    fn reify(&self, call: CallDescriptor) -> ReifyResult<Value> {
        let target = self.target()?;
        tracing::trace!(method = %call.method().signature, target = ?target, "synchronous dispatch");
        call.execute(&target)
    }
}
