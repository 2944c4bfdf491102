//! Type registry for the host runtime
//!
//! Names map to immutable [`TypeDef`] handles. Definitions are validated and
//! their virtual tables computed before insertion; insertion itself is
//! first-writer-wins, so two threads defining the same name race safely and
//! the loser gets the winner's handle back in [`DefineError::Duplicate`].

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet};

use super::primitive::Primitive;
use super::types::{
    ConstructorBuilder, MethodBody, MethodBuilder, Signature, TypeBuilder, TypeDef, TypeHandle,
    TypeKind, TypeOrigin, VTableEntry, Visibility,
};
use super::value::Value;
use crate::error::{ReifyError, ReifyResult};

/// Name of the universal root class
pub const ROOT_TYPE: &str = "Object";

/// Reserved interface every dispatcher type implements
pub const DISPATCHER_INTERFACE: &str = "reify.Dispatcher";

/// Reserved interface every synthesized stub implements
///
/// Its `attachDispatcher` and `getDispatcher` slots stay abstract: a
/// dispatcher has no [`Value`] form, so the accessors are native only, as
/// `ObjectRef::attach_dispatcher` and `ObjectRef::dispatcher`.
/// Invoking the slots by name fails with `AbstractInvocation`.
pub const STUB_OBJECT_INTERFACE: &str = "reify.StubObject";

/// Rejected type definition
#[derive(Debug, Clone, thiserror::Error)]
pub enum DefineError {
    /// The name is already taken; carries the installed definition
    #[error("type {} is already defined", .0.name())]
    Duplicate(TypeHandle),

    /// A supertype is not registered
    #[error("{type_name}: unknown supertype {supertype}")]
    UnknownSupertype {
        /// Type being defined
        type_name: String,
        /// Missing supertype
        supertype: String,
    },

    /// A supertype has the wrong kind or is final
    #[error("{type_name} cannot inherit from {supertype}: {reason}")]
    IllegalSupertype {
        /// Type being defined
        type_name: String,
        /// Offending supertype
        supertype: String,
        /// Why
        reason: &'static str,
    },

    /// A declared method overrides a final one
    #[error("{type_name}.{method} overrides a final method of {declaring}")]
    FinalOverride {
        /// Type being defined
        type_name: String,
        /// Overriding signature
        method: String,
        /// Declaring type of the final method
        declaring: String,
    },

    /// A concrete class leaves an abstract slot
    #[error("class {type_name} is not abstract and does not implement {method}")]
    UnimplementedMethod {
        /// Type being defined
        type_name: String,
        /// Abstract signature
        method: String,
    },

    /// The same signature is declared twice by one type
    #[error("{type_name} declares {method} more than once")]
    DuplicateMember {
        /// Type being defined
        type_name: String,
        /// Repeated signature
        method: String,
    },
}

/// Concurrent name → type map with builtin types pre-registered
#[derive(Debug)]
pub struct TypeRegistry {
    types: DashMap<String, TypeHandle>,
}

impl TypeRegistry {
    /// Create a registry holding the builtin types
    pub fn new() -> Self {
        let registry = Self {
            types: DashMap::new(),
        };
        registry.install_builtins();
        registry
    }

    /// Look up a type by name
    pub fn get(&self, name: &str) -> Option<TypeHandle> {
        self.types.get(name).map(|entry| entry.value().clone())
    }

    /// Look up a type by name, failing with `TypeNotFound`
    pub fn resolve(&self, name: &str) -> ReifyResult<TypeHandle> {
        self.get(name)
            .ok_or_else(|| ReifyError::TypeNotFound(name.to_string()))
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if nothing is registered (never, once builtins are installed)
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Validate and register a type definition
    ///
    /// The first definition of a name wins; later ones fail with
    /// [`DefineError::Duplicate`] carrying the installed handle.
    pub fn define(&self, builder: TypeBuilder) -> Result<TypeHandle, DefineError> {
        if let Some(existing) = self.get(&builder.name) {
            return Err(DefineError::Duplicate(existing));
        }
        let def = Arc::new(self.build(builder)?);
        match self.types.entry(def.name.clone()) {
            Entry::Occupied(entry) => Err(DefineError::Duplicate(entry.get().clone())),
            Entry::Vacant(entry) => {
                entry.insert(def.clone());
                Ok(def)
            }
        }
    }

    /// True if a value of runtime type `actual` fits a slot of type `formal`
    ///
    /// Primitive names are only assignable to themselves; boxing and
    /// widening are handled by [`TypeRegistry::coerce`].
    pub fn is_assignable(&self, formal: &str, actual: &str) -> bool {
        if formal == actual {
            return true;
        }
        match self.get(actual) {
            Some(def) => def.is_subtype_of(formal),
            None => false,
        }
    }

    /// Convert `value` for a slot of declared type `formal`
    ///
    /// Primitive formals accept boxed primitives that widen to them; reference
    /// formals accept `null` and assignable values. Returns `None` on mismatch.
    pub fn coerce(&self, formal: &str, value: &Value) -> Option<Value> {
        if let Some(p) = Primitive::from_name(formal) {
            if p == Primitive::Void {
                return None;
            }
            return value.widen_to(p);
        }
        match value {
            Value::Void => None,
            Value::Null => Some(Value::Null),
            other => {
                let actual = other.runtime_type()?;
                self.is_assignable(formal, &actual).then(|| other.clone())
            }
        }
    }

    fn build(&self, b: TypeBuilder) -> Result<TypeDef, DefineError> {
        let superclass = match &b.superclass {
            Some(name) => Some(self.supertype(&b.name, name)?),
            None => None,
        };
        if let Some(sup) = &superclass {
            if b.kind == TypeKind::Interface {
                return Err(illegal(&b.name, sup, "an interface can only extend interfaces"));
            }
            if sup.is_interface() || sup.is_primitive() {
                return Err(illegal(&b.name, sup, "not a class"));
            }
            if sup.modifiers.is_final {
                return Err(illegal(&b.name, sup, "class is final"));
            }
        }

        let mut interfaces = Vec::with_capacity(b.interfaces.len());
        for name in &b.interfaces {
            let iface = self.supertype(&b.name, name)?;
            if !iface.is_interface() {
                return Err(illegal(&b.name, &iface, "not an interface"));
            }
            interfaces.push(iface);
        }

        let mut ancestry = FxHashSet::default();
        ancestry.insert(b.name.clone());
        if b.kind != TypeKind::Primitive {
            ancestry.insert(ROOT_TYPE.to_string());
        }
        for sup in superclass.iter().chain(interfaces.iter()) {
            ancestry.extend(sup.ancestry.iter().cloned());
        }

        // Inherited slots: superclass first, then interface slots the
        // superclass chain does not already provide.
        let mut vtable: FxHashMap<Signature, VTableEntry> = superclass
            .as_ref()
            .map(|s| s.vtable.clone())
            .unwrap_or_default();
        for iface in &interfaces {
            for (sig, entry) in &iface.vtable {
                vtable.entry(sig.clone()).or_insert_with(|| entry.clone());
            }
        }

        let is_interface = b.kind == TypeKind::Interface;
        let mut methods = Vec::with_capacity(b.methods.len());
        let mut seen = FxHashSet::default();
        for builder in b.methods {
            let mut info = builder.build(&b.name);
            if is_interface && matches!(info.body, MethodBody::Opaque) {
                info.body = MethodBody::Abstract;
                info.modifiers.is_abstract = true;
            }
            if !seen.insert(info.signature.clone()) {
                return Err(DefineError::DuplicateMember {
                    type_name: b.name.clone(),
                    method: info.signature.to_string(),
                });
            }
            let info = Arc::new(info);
            if !info.modifiers.is_static {
                check_final(&b.name, &vtable, &info.signature)?;
                vtable.insert(
                    info.signature.clone(),
                    VTableEntry {
                        method: info.clone(),
                        body: info.body.clone(),
                    },
                );
            }
            methods.push(info);
        }

        for (method, body) in b.overrides {
            check_final(&b.name, &vtable, &method.signature)?;
            vtable.insert(method.signature.clone(), VTableEntry { method, body });
        }

        let synthesized = matches!(b.origin, TypeOrigin::Synthesized(_));
        if b.kind == TypeKind::Class && !b.modifiers.is_abstract && !synthesized {
            let mut missing: Vec<&Signature> = vtable
                .iter()
                .filter(|(_, e)| e.body.is_abstract())
                .map(|(sig, _)| sig)
                .collect();
            missing.sort();
            if let Some(sig) = missing.first() {
                return Err(DefineError::UnimplementedMethod {
                    type_name: b.name.clone(),
                    method: sig.to_string(),
                });
            }
        }

        let mut constructors: Vec<_> = b
            .constructors
            .into_iter()
            .map(|c| Arc::new(c.build(&b.name)))
            .collect();
        if b.kind == TypeKind::Class && constructors.is_empty() {
            constructors.push(Arc::new(ConstructorBuilder::new(&[]).build(&b.name)));
        }

        Ok(TypeDef {
            name: b.name,
            kind: b.kind,
            modifiers: b.modifiers,
            type_params: b.type_params,
            superclass,
            interfaces,
            methods,
            constructors,
            vtable,
            ancestry,
            origin: b.origin,
        })
    }

    fn supertype(&self, type_name: &str, name: &str) -> Result<TypeHandle, DefineError> {
        self.get(name).ok_or_else(|| DefineError::UnknownSupertype {
            type_name: type_name.to_string(),
            supertype: name.to_string(),
        })
    }

    fn install_builtins(&self) {
        let builtins = std::iter::once(root_type())
            .chain(Primitive::ALL.iter().map(|p| TypeBuilder::primitive(p.name())))
            .chain([
                TypeBuilder::class("String").as_final(),
                TypeBuilder::class("Number")
                    .as_abstract()
                    .method(MethodBuilder::new("intValue").returns("int").as_abstract())
                    .method(MethodBuilder::new("longValue").returns("long").as_abstract())
                    .method(MethodBuilder::new("doubleValue").returns("double").as_abstract()),
            ])
            .chain(Primitive::ALL.iter().filter_map(|p| {
                let wrapper = p.wrapper_name()?;
                let base = match p {
                    Primitive::Boolean | Primitive::Char => TypeBuilder::class(wrapper),
                    _ => TypeBuilder::class(wrapper)
                        .extends("Number")
                        .method(MethodBuilder::new("intValue").returns("int"))
                        .method(MethodBuilder::new("longValue").returns("long"))
                        .method(MethodBuilder::new("doubleValue").returns("double")),
                };
                Some(
                    base.as_final()
                        .constructor(ConstructorBuilder::new(&[p.name()])),
                )
            }))
            .chain([
                TypeBuilder::interface(DISPATCHER_INTERFACE),
                TypeBuilder::interface(STUB_OBJECT_INTERFACE)
                    .method(MethodBuilder::new("attachDispatcher").param(DISPATCHER_INTERFACE))
                    .method(MethodBuilder::new("getDispatcher").returns(DISPATCHER_INTERFACE)),
            ]);

        for builder in builtins {
            let name = builder.name().to_string();
            if let Err(e) = self.define(builder) {
                tracing::error!(type_name = %name, error = %e, "builtin type rejected");
            }
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn root_type() -> TypeBuilder {
    TypeBuilder::root()
        .method(
            MethodBuilder::new("toString")
                .returns("String")
                .body(|this, _| Ok(Value::string(format!("{}@{:x}", this.class().name(), this.id())))),
        )
        .method(
            MethodBuilder::new("equals")
                .param(ROOT_TYPE)
                .returns("boolean")
                .body(|this, args| {
                    let same = matches!(args.first(), Some(Value::Object(o)) if o.ptr_eq(this));
                    Ok(Value::Boolean(same))
                }),
        )
        .method(
            MethodBuilder::new("hashCode")
                .returns("int")
                .body(|this, _| Ok(Value::Int(this.id() as i32))),
        )
        .method(
            MethodBuilder::new("finalize")
                .visibility(Visibility::Protected)
                .body(|_, _| Ok(Value::Void)),
        )
}

fn illegal(type_name: &str, supertype: &TypeDef, reason: &'static str) -> DefineError {
    DefineError::IllegalSupertype {
        type_name: type_name.to_string(),
        supertype: supertype.name.clone(),
        reason,
    }
}

fn check_final(
    type_name: &str,
    vtable: &FxHashMap<Signature, VTableEntry>,
    signature: &Signature,
) -> Result<(), DefineError> {
    match vtable.get(signature) {
        Some(entry) if entry.method.modifiers.is_final => Err(DefineError::FinalOverride {
            type_name: type_name.to_string(),
            method: signature.to_string(),
            declaring: entry.method.declaring_type.clone(),
        }),
        _ => Ok(()),
    }
}
