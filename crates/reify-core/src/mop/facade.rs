//! Reification entry points
//!
//! [`Reifier`] ties the type registry, the stub factory and the dispatcher
//! registry together. A stub returned by `create_reified_instance` has its
//! dispatcher attached, but the real target object does not exist yet: the
//! dispatcher builds it by executing the [`ConstructorCall`] it was given.

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::descriptor::ConstructorCall;
use super::dispatcher::DispatcherRegistry;
use super::factory::StubFactory;
use super::name_codec::TargetType;
use super::resolver::Resolver;
use crate::error::{ReifyError, ReifyResult};
use crate::runtime::{ObjectRef, TypeHandle, TypeRegistry, Value};

static GLOBAL: Lazy<Reifier> = Lazy::new(Reifier::new);

/// Reification facade
pub struct Reifier {
    types: Arc<TypeRegistry>,
    stubs: StubFactory,
    dispatchers: DispatcherRegistry,
}

impl Reifier {
    /// Reifier over a fresh registry of builtin types
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TypeRegistry::new()))
    }

    /// Reifier over an existing registry
    pub fn with_registry(types: Arc<TypeRegistry>) -> Self {
        Self {
            stubs: StubFactory::new(types.clone()),
            types,
            dispatchers: DispatcherRegistry::new(),
        }
    }

    /// Process-wide reifier
    pub fn global() -> &'static Reifier {
        &GLOBAL
    }

    /// Type registry
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Stub factory
    pub fn stubs(&self) -> &StubFactory {
        &self.stubs
    }

    /// Dispatcher registry
    pub fn dispatchers(&self) -> &DispatcherRegistry {
        &self.dispatchers
    }

    /// New stub of `target_name` whose real object is built by the dispatcher
    ///
    /// The target constructor is resolved now against the runtime types of
    /// `constructor_args`, but only runs when the dispatcher executes the
    /// deferred descriptor.
    pub fn create_reified_instance(
        &self,
        target_name: &str,
        generics: &[&str],
        constructor_args: &[Value],
        dispatcher: &str,
        dispatcher_args: &[Value],
    ) -> ReifyResult<ObjectRef> {
        let target = TargetType::new(target_name, generics);
        let target_type = self.types.resolve(target_name)?;
        let stub = self.stubs.get_or_create(&target)?;
        let call = self.deferred_call(&target_type, constructor_args)?;
        let instance = self.stubs.instantiate(&stub)?;
        let dispatcher = self.dispatchers.instantiate(dispatcher, call, dispatcher_args)?;
        instance.attach_dispatcher(dispatcher)?;
        tracing::debug!(target = %target, stub = stub.name(), "created reified instance");
        Ok(instance)
    }

    /// Like [`Reifier::create_reified_instance`], but the stub is built for
    /// `stub_type_name`, a supertype of the target
    pub fn create_reified_instance_as(
        &self,
        stub_type_name: &str,
        target_name: &str,
        generics: &[&str],
        constructor_args: &[Value],
        dispatcher: &str,
        dispatcher_args: &[Value],
    ) -> ReifyResult<ObjectRef> {
        let target_type = self.types.resolve(target_name)?;
        let stub_view = self.types.resolve(stub_type_name)?;
        if !target_type.is_subtype_of(stub_type_name) {
            return Err(ReifyError::ReifiedCast {
                from: target_name.to_string(),
                to: stub_type_name.to_string(),
            });
        }
        let view_generics: &[&str] = if stub_view.type_params().len() == generics.len() {
            generics
        } else {
            &[]
        };
        let stub = self
            .stubs
            .get_or_create(&TargetType::new(stub_type_name, view_generics))?;
        let call = self.deferred_call(&target_type, constructor_args)?;
        let instance = self.stubs.instantiate(&stub)?;
        let dispatcher = self.dispatchers.instantiate(dispatcher, call, dispatcher_args)?;
        instance.attach_dispatcher(dispatcher)?;
        Ok(instance)
    }

    /// New stub of `target_name` whose dispatcher wraps `existing`
    pub fn wrap_existing_instance(
        &self,
        existing: &ObjectRef,
        target_name: &str,
        generics: &[&str],
        dispatcher: &str,
        dispatcher_args: &[Value],
    ) -> ReifyResult<ObjectRef> {
        let target = TargetType::new(target_name, generics);
        self.types.resolve(target_name)?;
        if !existing.class().is_subtype_of(target_name) {
            return Err(ReifyError::ReifiedCast {
                from: existing.class().name().to_string(),
                to: target_name.to_string(),
            });
        }
        let stub = self.stubs.get_or_create(&target)?;
        let instance = self.stubs.instantiate(&stub)?;
        let call = ConstructorCall::PreBuilt(existing.clone());
        let dispatcher = self.dispatchers.instantiate(dispatcher, call, dispatcher_args)?;
        instance.attach_dispatcher(dispatcher)?;
        tracing::debug!(target = %target, existing = ?existing, "wrapped existing instance");
        Ok(instance)
    }

    /// True if `obj` is an instance of a synthesized stub type
    pub fn is_reified(&self, obj: &ObjectRef) -> bool {
        obj.class().is_synthesized()
    }

    /// Run the reifiability checks for `target` (`pkg.Name` or `pkg.Name<A, B>`)
    pub fn check_reifiable(&self, target: &str) -> ReifyResult<()> {
        let target: TargetType = target.parse()?;
        self.stubs.check_reifiable(&target).map(|_| ())
    }

    /// New stub of `new_target_name` sharing `obj`'s dispatcher
    ///
    /// The current and requested views must be assignable in one direction
    /// or the other.
    pub fn cast_reified_view(&self, obj: &ObjectRef, new_target_name: &str) -> ReifyResult<ObjectRef> {
        let cast_error = || ReifyError::ReifiedCast {
            from: obj.class().name().to_string(),
            to: new_target_name.to_string(),
        };
        let layout = obj.class().stub_layout().ok_or_else(cast_error)?;
        let current: &TypeHandle = &layout.target_type;
        let requested = self.types.resolve(new_target_name)?;
        if !(current.is_subtype_of(new_target_name) || requested.is_subtype_of(current.name())) {
            return Err(cast_error());
        }
        let stub = self.stubs.get_or_create(&TargetType::plain(new_target_name))?;
        let view = self.stubs.instantiate(&stub)?;
        if let Some(dispatcher) = obj.dispatcher() {
            view.attach_dispatcher(dispatcher)?;
        }
        Ok(view)
    }

    /// Call a public instance method by name, resolving overloads
    pub fn invoke(&self, obj: &ObjectRef, name: &str, args: &[Value]) -> ReifyResult<Value> {
        let resolver = Resolver::new(&self.types);
        let actual: Vec<Option<String>> = args.iter().map(Value::runtime_type).collect();
        let method = resolver.resolve_method(obj.class(), name, &actual)?;
        let formals = resolver.erased_params(&method);
        let converted = formals
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (formal, value))| {
                self.types
                    .coerce(formal, value)
                    .ok_or_else(|| ReifyError::ArgumentMismatch {
                        method: method.qualified(),
                        index,
                        expected: formal.clone(),
                        found: value.type_label(),
                    })
            })
            .collect::<ReifyResult<Vec<_>>>()?;
        obj.invoke_signature(&method.signature, &converted)
    }

    fn deferred_call(&self, target_type: &TypeHandle, args: &[Value]) -> ReifyResult<ConstructorCall> {
        if target_type.is_interface() {
            return Ok(ConstructorCall::Deferred {
                target: target_type.clone(),
                constructor: None,
                args: args.to_vec(),
            });
        }
        let actual: Vec<Option<String>> = args.iter().map(Value::runtime_type).collect();
        let constructor = Resolver::new(&self.types).resolve_constructor(target_type, &actual)?;
        let converted = constructor
            .params
            .iter()
            .zip(args)
            .map(|(formal, value)| self.types.coerce(formal, value))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ReifyError::ArgumentMismatch {
                method: constructor.to_string(),
                index: 0,
                expected: constructor.params.join(", "),
                found: args
                    .iter()
                    .map(Value::type_label)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;
        Ok(ConstructorCall::Deferred {
            target: target_type.clone(),
            constructor: Some(constructor),
            args: converted,
        })
    }
}

impl Default for Reifier {
    fn default() -> Self {
        Self::new()
    }
}
