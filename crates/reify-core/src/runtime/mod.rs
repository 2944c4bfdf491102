//! Host runtime
//!
//! A small reflective object model: types are registered at run time, objects
//! are dynamically typed, values are boxed, and calls go through per-type
//! virtual tables whose entries are native closures. The stub factory builds
//! on it the way a class-loading runtime would build on its class loader.

mod object;
mod primitive;
mod registry;
mod types;
mod value;

pub use object::{construct, Object, ObjectRef};
pub(crate) use object::run_body;
pub use primitive::{is_primitive_name, is_wrapper_name, Primitive};
pub use registry::{
    DefineError, TypeRegistry, DISPATCHER_INTERFACE, ROOT_TYPE, STUB_OBJECT_INTERFACE,
};
pub use types::{
    ConstructorBody, ConstructorBuilder, ConstructorHandle, ConstructorInfo, MethodBody,
    MethodBuilder, MethodHandle, MethodInfo, MethodMarkers, MethodModifiers, NativeConstructor,
    NativeMethod, Signature, TypeBuilder, TypeDef, TypeHandle, TypeKind, TypeModifiers,
    TypeOrigin, VTableEntry, Visibility,
};
pub use value::Value;
