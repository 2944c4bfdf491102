//! Reify: stub synthesis and call reification
//!
//! Given a target type registered in the host runtime, Reify synthesizes a
//! stub type whose instances are call-compatible with the target but forward
//! every interceptable call to a pluggable [`Dispatcher`]:
//! - **Runtime**: types, objects, values and virtual dispatch (`runtime` module)
//! - **MOP**: name codec, method selection, overload resolution, stub factory
//!   and the [`Reifier`] facade (`mop` module)
//! - **Catalog**: declarative type definitions loaded from TOML or JSON
//! - **Config**: `reify.toml` workspace settings
//!
//! # Example
//!
//! ```rust,ignore
//! use reify_core::{Reifier, SynchronousDispatcher, Value};
//!
//! let reifier = Reifier::new();
//! let account = reifier.create_reified_instance(
//!     "acme.Account",
//!     &[],
//!     &[Value::string("alice")],
//!     SynchronousDispatcher::NAME,
//!     &[],
//! )?;
//! // the real account is built on this first call
//! let balance = reifier.invoke(&account, "balance", &[])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod mop;
pub mod runtime;

pub use catalog::{Catalog, CatalogError};
pub use config::{ConfigError, ReifyConfig};
pub use error::{NotReifiableReason, ReifyError, ReifyResult, ResolutionError};
pub use mop::{
    CallDescriptor, ConstructorCall, Dispatcher, DispatcherRegistry, EligibilityReport,
    GenericBindings, Reifier, StubFactory, StubHandle, SynchronousDispatcher, TargetType,
};
pub use runtime::{ObjectRef, TypeRegistry, Value};
