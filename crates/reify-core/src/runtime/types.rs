//! Type definitions for the host runtime
//!
//! A [`TypeDef`] is the reflective view of a registered type: its kind,
//! supertypes, declared methods and constructors, and the virtual table
//! computed when the type was defined. Definitions are built with
//! [`TypeBuilder`] and installed through
//! [`TypeRegistry::define`](super::TypeRegistry::define).

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::object::ObjectRef;
use super::value::Value;
use crate::error::ReifyResult;
use crate::mop::StubLayout;

/// Shared handle to a registered type
pub type TypeHandle = Arc<TypeDef>;

/// Shared handle to a declared method
pub type MethodHandle = Arc<MethodInfo>;

/// Shared handle to a declared constructor
pub type ConstructorHandle = Arc<ConstructorInfo>;

/// Native method body: receives the receiver and the (already boxed) arguments
pub type NativeMethod = Arc<dyn Fn(&ObjectRef, &[Value]) -> ReifyResult<Value> + Send + Sync>;

/// Native constructor body: initializes a freshly allocated object
pub type NativeConstructor = Arc<dyn Fn(&ObjectRef, &[Value]) -> ReifyResult<()> + Send + Sync>;

/// Type kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Primitive types (`int`, `boolean`, ...)
    Primitive,
    /// Class types
    Class,
    /// Interface types
    Interface,
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Visible everywhere
    #[default]
    Public,
    /// Visible to subtypes
    Protected,
    /// Visible to the declaring type only
    Private,
}

/// Modifier flags for types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeModifiers {
    /// Cannot be extended
    pub is_final: bool,
    /// Cannot be instantiated
    pub is_abstract: bool,
}

/// Modifier flags for methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodModifiers {
    /// Visibility
    pub visibility: Visibility,
    /// Not bound to an instance
    pub is_static: bool,
    /// Cannot be overridden
    pub is_final: bool,
    /// No body
    pub is_abstract: bool,
}

/// Per-method markers consulted by stub generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodMarkers {
    /// The generated body returns the receiving stub, skipping reification
    pub returns_self: bool,
    /// The first non-null result is memoized per instance
    pub cached: bool,
}

/// Operation identity: name plus ordered parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    /// Operation name
    pub name: String,
    /// Parameter type names, in order
    pub params: Vec<String>,
}

impl Signature {
    /// Create a signature
    pub fn new(name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

/// Method body
#[derive(Clone)]
pub enum MethodBody {
    /// No body (interface or abstract method)
    Abstract,
    /// Declared with a body the host cannot execute (catalog types)
    Opaque,
    /// Executable native body
    Native(NativeMethod),
}

impl MethodBody {
    /// True for [`MethodBody::Abstract`]
    pub fn is_abstract(&self) -> bool {
        matches!(self, MethodBody::Abstract)
    }
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Abstract => f.write_str("Abstract"),
            MethodBody::Opaque => f.write_str("Opaque"),
            MethodBody::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// Constructor body
#[derive(Clone)]
pub enum ConstructorBody {
    /// Declared with a body the host cannot execute; runs as a no-op
    Opaque,
    /// Executable native body
    Native(NativeConstructor),
}

impl fmt::Debug for ConstructorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorBody::Opaque => f.write_str("Opaque"),
            ConstructorBody::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// Method information for reflection
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Operation identity
    pub signature: Signature,
    /// Return type name (`void` for none)
    pub return_type: String,
    /// Declaring type name
    pub declaring_type: String,
    /// Modifier flags
    pub modifiers: MethodModifiers,
    /// Stub generation markers
    pub markers: MethodMarkers,
    /// Body
    pub body: MethodBody,
}

impl MethodInfo {
    /// Operation name
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Parameter type names
    pub fn params(&self) -> &[String] {
        &self.signature.params
    }

    /// True if the method returns nothing
    pub fn is_void(&self) -> bool {
        self.return_type == "void"
    }

    /// True if the method is public
    pub fn is_public(&self) -> bool {
        self.modifiers.visibility == Visibility::Public
    }

    /// `Declaring.name(A, B)`
    pub fn qualified(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.signature)
    }
}

/// Constructor information for reflection
#[derive(Debug, Clone)]
pub struct ConstructorInfo {
    /// Declaring type name
    pub declaring_type: String,
    /// Parameter type names
    pub params: Vec<String>,
    /// Visibility
    pub visibility: Visibility,
    /// Body
    pub body: ConstructorBody,
}

impl ConstructorInfo {
    /// True if the constructor is public
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// True for the public `()` constructor
    pub fn is_no_arg(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.declaring_type, self.params.join(", "))
    }
}

/// Virtual table slot: the method a signature resolves to for a type
#[derive(Debug, Clone)]
pub struct VTableEntry {
    /// Method the slot was declared by
    pub method: MethodHandle,
    /// Body to execute
    pub body: MethodBody,
}

/// Where a type definition came from
#[derive(Debug, Clone)]
pub enum TypeOrigin {
    /// Builtin or application-declared type
    Declared,
    /// Generated by the stub factory
    Synthesized(Arc<StubLayout>),
}

/// A registered type
#[derive(Debug)]
pub struct TypeDef {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) modifiers: TypeModifiers,
    pub(crate) type_params: Vec<String>,
    pub(crate) superclass: Option<TypeHandle>,
    pub(crate) interfaces: Vec<TypeHandle>,
    pub(crate) methods: Vec<MethodHandle>,
    pub(crate) constructors: Vec<ConstructorHandle>,
    pub(crate) vtable: FxHashMap<Signature, VTableEntry>,
    /// Every supertype name, including the type itself
    pub(crate) ancestry: FxHashSet<String>,
    pub(crate) origin: TypeOrigin,
}

impl TypeDef {
    /// Qualified type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type kind
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// True for interfaces
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// True for primitive types
    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    /// Type modifiers
    pub fn modifiers(&self) -> TypeModifiers {
        self.modifiers
    }

    /// Declared type parameter names (`T`, `K`, ...)
    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    /// Direct superclass (`None` for the root, interfaces and primitives)
    pub fn superclass(&self) -> Option<&TypeHandle> {
        self.superclass.as_ref()
    }

    /// Directly implemented (or extended, for interfaces) interfaces
    pub fn interfaces(&self) -> &[TypeHandle] {
        &self.interfaces
    }

    /// Methods declared by this type, in declaration order
    pub fn declared_methods(&self) -> &[MethodHandle] {
        &self.methods
    }

    /// Constructors declared by this type
    pub fn constructors(&self) -> &[ConstructorHandle] {
        &self.constructors
    }

    /// Public no-argument constructor, if any
    pub fn no_arg_constructor(&self) -> Option<&ConstructorHandle> {
        self.constructors
            .iter()
            .find(|c| c.is_public() && c.is_no_arg())
    }

    /// Resolve a signature through the virtual table
    pub fn vtable_entry(&self, signature: &Signature) -> Option<&VTableEntry> {
        self.vtable.get(signature)
    }

    /// All virtual table slots
    pub fn vtable(&self) -> impl Iterator<Item = (&Signature, &VTableEntry)> {
        self.vtable.iter()
    }

    /// True if a value of this type may be stored in a slot of type `name`
    pub fn is_subtype_of(&self, name: &str) -> bool {
        self.ancestry.contains(name)
    }

    /// Every supertype name including the type itself
    pub fn ancestry(&self) -> impl Iterator<Item = &str> {
        self.ancestry.iter().map(String::as_str)
    }

    /// Stub layout if this type was synthesized
    pub fn stub_layout(&self) -> Option<&Arc<StubLayout>> {
        match &self.origin {
            TypeOrigin::Synthesized(layout) => Some(layout),
            TypeOrigin::Declared => None,
        }
    }

    /// True if the stub factory produced this type
    pub fn is_synthesized(&self) -> bool {
        matches!(self.origin, TypeOrigin::Synthesized(_))
    }
}

/// Builder for a method declaration
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    pub(crate) name: String,
    pub(crate) params: Vec<String>,
    pub(crate) return_type: String,
    pub(crate) modifiers: MethodModifiers,
    pub(crate) markers: MethodMarkers,
    pub(crate) body: MethodBody,
}

impl MethodBuilder {
    /// New public method returning `void` with an opaque body
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: "void".to_string(),
            modifiers: MethodModifiers::default(),
            markers: MethodMarkers::default(),
            body: MethodBody::Opaque,
        }
    }

    /// Add a parameter
    pub fn param(mut self, type_name: impl Into<String>) -> Self {
        self.params.push(type_name.into());
        self
    }

    /// Set all parameters
    pub fn params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Set return type
    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = type_name.into();
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    /// Mark as abstract (drops any body)
    pub fn as_abstract(mut self) -> Self {
        self.modifiers.is_abstract = true;
        self.body = MethodBody::Abstract;
        self
    }

    /// Set visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.modifiers.visibility = visibility;
        self
    }

    /// Generated stub body returns the stub itself
    pub fn returns_self(mut self) -> Self {
        self.markers.returns_self = true;
        self
    }

    /// Generated stub body memoizes the first non-null result
    pub fn cached(mut self) -> Self {
        self.markers.cached = true;
        self
    }

    /// Attach a native body
    pub fn body<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> ReifyResult<Value> + Send + Sync + 'static,
    {
        self.body = MethodBody::Native(Arc::new(f));
        self
    }

    pub(crate) fn build(self, declaring_type: &str) -> MethodInfo {
        MethodInfo {
            signature: Signature {
                name: self.name,
                params: self.params,
            },
            return_type: self.return_type,
            declaring_type: declaring_type.to_string(),
            modifiers: self.modifiers,
            markers: self.markers,
            body: self.body,
        }
    }
}

/// Builder for a constructor declaration
#[derive(Debug, Clone)]
pub struct ConstructorBuilder {
    pub(crate) params: Vec<String>,
    pub(crate) visibility: Visibility,
    pub(crate) body: ConstructorBody,
}

impl ConstructorBuilder {
    /// New public constructor with the given parameter types
    pub fn new(params: &[&str]) -> Self {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            visibility: Visibility::Public,
            body: ConstructorBody::Opaque,
        }
    }

    /// Set visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Attach a native body
    pub fn body<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> ReifyResult<()> + Send + Sync + 'static,
    {
        self.body = ConstructorBody::Native(Arc::new(f));
        self
    }

    pub(crate) fn build(self, declaring_type: &str) -> ConstructorInfo {
        ConstructorInfo {
            declaring_type: declaring_type.to_string(),
            params: self.params,
            visibility: self.visibility,
            body: self.body,
        }
    }
}

/// Complete definition for a type to be registered
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) modifiers: TypeModifiers,
    pub(crate) type_params: Vec<String>,
    pub(crate) superclass: Option<String>,
    pub(crate) interfaces: Vec<String>,
    pub(crate) methods: Vec<MethodBuilder>,
    pub(crate) constructors: Vec<ConstructorBuilder>,
    /// Slots whose body is replaced without declaring a new method
    pub(crate) overrides: Vec<(MethodHandle, MethodBody)>,
    pub(crate) origin: TypeOrigin,
}

impl TypeBuilder {
    /// New class extending the universal root
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name.into(), TypeKind::Class, Some(super::ROOT_TYPE.to_string()))
    }

    /// New interface
    pub fn interface(name: impl Into<String>) -> Self {
        let mut b = Self::with_kind(name.into(), TypeKind::Interface, None);
        b.modifiers.is_abstract = true;
        b
    }

    pub(crate) fn primitive(name: &str) -> Self {
        let mut b = Self::with_kind(name.to_string(), TypeKind::Primitive, None);
        b.modifiers.is_final = true;
        b
    }

    pub(crate) fn root() -> Self {
        Self::with_kind(super::ROOT_TYPE.to_string(), TypeKind::Class, None)
    }

    fn with_kind(name: String, kind: TypeKind, superclass: Option<String>) -> Self {
        Self {
            name,
            kind,
            modifiers: TypeModifiers::default(),
            type_params: Vec::new(),
            superclass,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            overrides: Vec::new(),
            origin: TypeOrigin::Declared,
        }
    }

    /// Type name being built
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented (or, for interfaces, extended) interface
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Declare a type parameter
    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    /// Mark as abstract
    pub fn as_abstract(mut self) -> Self {
        self.modifiers.is_abstract = true;
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: ConstructorBuilder) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Replace the body of an inherited slot, keeping the inherited handle
    pub(crate) fn override_slot(mut self, method: MethodHandle, body: MethodBody) -> Self {
        self.overrides.push((method, body));
        self
    }

    pub(crate) fn origin(mut self, origin: TypeOrigin) -> Self {
        self.origin = origin;
        self
    }
}
