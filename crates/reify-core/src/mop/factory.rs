//! Stub synthesis and caching
//!
//! [`StubFactory::get_or_create`] is the only way stub types come into
//! existence. Lookups hit a concurrent cache first; a miss takes a per-name
//! lock, re-checks, validates the target, then builds and registers the stub
//! type. A stub already registered under the same name (by another factory on
//! the same registry) is adopted rather than rebuilt.

use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::descriptor::GenericBindings;
use super::name_codec::{self, TargetType};
use super::selector;
use super::stub::{intercept_body, InterceptMode, StubLayout, StubMethod};
use crate::error::{NotReifiableReason, ReifyError, ReifyResult};
use crate::runtime::{
    construct, DefineError, ObjectRef, TypeBuilder, TypeHandle, TypeKind, TypeOrigin,
    TypeRegistry, STUB_OBJECT_INTERFACE,
};

/// A synthesized stub type together with its target
#[derive(Debug, Clone)]
pub struct StubHandle {
    target: TargetType,
    stub_type: TypeHandle,
    layout: Arc<StubLayout>,
}

impl StubHandle {
    fn from_type(target: TargetType, stub_type: TypeHandle) -> Option<Self> {
        let layout = stub_type.stub_layout()?.clone();
        Some(Self {
            target,
            stub_type,
            layout,
        })
    }

    /// Target the stub was built for
    pub fn target(&self) -> &TargetType {
        &self.target
    }

    /// Registered stub type
    pub fn stub_type(&self) -> &TypeHandle {
        &self.stub_type
    }

    /// Registered stub name
    pub fn name(&self) -> &str {
        self.stub_type.name()
    }

    /// Generated layout
    pub fn layout(&self) -> &Arc<StubLayout> {
        &self.layout
    }

    /// Human-readable description of the generated type
    pub fn listing(&self) -> String {
        let mut out = String::new();
        let ty = &self.stub_type;
        let _ = write!(out, "class {}", ty.name());
        if let Some(sup) = ty.superclass() {
            let _ = write!(out, " extends {}", sup.name());
        }
        let ifaces: Vec<&str> = ty.interfaces().iter().map(|i| i.name()).collect();
        if !ifaces.is_empty() {
            let _ = write!(out, " implements {}", ifaces.join(", "));
        }
        out.push_str(" {\n");
        let _ = writeln!(out, "    // target: {}", self.target);
        for (param, bound) in self.layout.bindings.iter() {
            let _ = writeln!(out, "    // {} = {}", param, bound);
        }
        let _ = writeln!(
            out,
            "    // {} reified out of {}",
            self.layout.methods.len(),
            self.layout.examined
        );
        for m in &self.layout.methods {
            let _ = writeln!(
                out,
                "    {:<7}{} {}    [{}]",
                m.mode.to_string(),
                m.method.return_type,
                m.method.signature,
                m.method.declaring_type
            );
        }
        out.push('}');
        out
    }
}

/// Builds, caches and instantiates stub types
pub struct StubFactory {
    registry: Arc<TypeRegistry>,
    cache: DashMap<TargetType, StubHandle>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StubFactory {
    /// Factory registering stubs in `registry`
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Registry stubs are defined in
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Validate a target without synthesizing anything
    pub fn check_reifiable(&self, target: &TargetType) -> ReifyResult<TypeHandle> {
        let ty = self.registry.resolve(target.name())?;
        if ty.kind() == TypeKind::Primitive {
            return Err(ReifyError::not_reifiable(target.name(), NotReifiableReason::Primitive));
        }
        if ty.modifiers().is_final {
            return Err(ReifyError::not_reifiable(target.name(), NotReifiableReason::Final));
        }
        if ty.kind() == TypeKind::Class && ty.no_arg_constructor().is_none() {
            return Err(ReifyError::not_reifiable(
                target.name(),
                NotReifiableReason::NoPublicNoArgConstructor,
            ));
        }
        // Zero generic parameters is a raw use and always allowed.
        if target.is_generic() && target.generics().len() != ty.type_params().len() {
            return Err(ReifyError::not_reifiable(
                target.name(),
                NotReifiableReason::GenericArity {
                    expected: ty.type_params().len(),
                    found: target.generics().len(),
                },
            ));
        }
        for generic in target.generics() {
            self.registry.resolve(generic)?;
        }
        Ok(ty)
    }

    /// Stub for `target`, synthesizing it on first demand
    pub fn get_or_create(&self, target: &TargetType) -> ReifyResult<StubHandle> {
        if let Some(handle) = self.cache.get(target) {
            return Ok(handle.clone());
        }

        let name = name_codec::encode(target);
        let lock = self.locks.entry(name.clone()).or_default().clone();
        let _guard = lock.lock();

        if let Some(handle) = self.cache.get(target) {
            return Ok(handle.clone());
        }

        let target_type = self.check_reifiable(target)?;
        let stub_type = match self.registry.get(&name) {
            Some(existing) => self.adopt(&name, target, existing)?,
            None => self.synthesize(&name, target, &target_type)?,
        };
        let handle = StubHandle::from_type(target.clone(), stub_type).ok_or_else(|| {
            ReifyError::SynthesisFailure {
                name: name.clone(),
                reason: "registered type carries no stub layout".to_string(),
            }
        })?;
        Ok(self
            .cache
            .entry(target.clone())
            .or_insert(handle)
            .clone())
    }

    fn adopt(&self, name: &str, target: &TargetType, existing: TypeHandle) -> ReifyResult<TypeHandle> {
        match existing.stub_layout() {
            Some(layout) if &layout.target == target => {
                tracing::debug!(stub = name, "adopting registered stub type");
                Ok(existing)
            }
            _ => Err(ReifyError::SynthesisFailure {
                name: name.to_string(),
                reason: format!("name is taken by {}", existing.name()),
            }),
        }
    }

    fn synthesize(
        &self,
        name: &str,
        target: &TargetType,
        target_type: &TypeHandle,
    ) -> ReifyResult<TypeHandle> {
        let report = selector::select(target_type);
        let bindings = Arc::new(GenericBindings::new(target_type.type_params(), target.generics()));
        let methods: Vec<StubMethod> = report
            .eligible()
            .enumerate()
            .map(|(slot, method)| StubMethod {
                method: method.clone(),
                slot,
                mode: if method.markers.returns_self {
                    InterceptMode::ReturnSelf
                } else if method.markers.cached {
                    InterceptMode::Cached
                } else {
                    InterceptMode::Reify
                },
            })
            .collect();
        let layout = Arc::new(StubLayout {
            target: target.clone(),
            target_type: target_type.clone(),
            bindings: bindings.clone(),
            methods,
            examined: report.examined_count(),
        });

        let mut builder = if target_type.is_interface() {
            TypeBuilder::class(name).implements(target.name())
        } else {
            TypeBuilder::class(name).extends(target.name())
        };
        builder = builder
            .implements(STUB_OBJECT_INTERFACE)
            .origin(TypeOrigin::Synthesized(layout.clone()));
        for stub_method in &layout.methods {
            let body = intercept_body(stub_method.clone(), target_type, &self.registry, &bindings);
            builder = builder.override_slot(stub_method.method.clone(), body);
        }

        match self.registry.define(builder) {
            Ok(stub_type) => {
                tracing::debug!(
                    stub = name,
                    target = %target,
                    intercepted = layout.methods.len(),
                    "synthesized stub type"
                );
                Ok(stub_type)
            }
            Err(DefineError::Duplicate(existing)) => {
                tracing::warn!(stub = name, "lost stub definition race, adopting winner");
                self.adopt(name, target, existing)
            }
            Err(e) => Err(ReifyError::SynthesisFailure {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// New unattached stub instance; runs the target's no-argument constructor chain
    pub fn instantiate(&self, handle: &StubHandle) -> ReifyResult<ObjectRef> {
        let obj = construct(handle.stub_type(), None, &[])?;
        tracing::trace!(stub = handle.name(), "instantiated stub");
        Ok(obj)
    }

    /// Pre-synthesize stubs; each target reports its own outcome
    pub fn warm(&self, targets: &[TargetType]) -> Vec<(TargetType, ReifyResult<StubHandle>)> {
        targets
            .iter()
            .map(|t| (t.clone(), self.get_or_create(t)))
            .collect()
    }

    /// Number of cached stubs
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Cached targets, sorted
    pub fn cached_targets(&self) -> Vec<TargetType> {
        let mut targets: Vec<TargetType> = self.cache.iter().map(|e| e.key().clone()).collect();
        targets.sort();
        targets
    }
}
