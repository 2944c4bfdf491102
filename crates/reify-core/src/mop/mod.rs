//! Stub synthesis and call reification
//!
//! ## Components
//!
//! - `name_codec`: target type ↔ stub name
//! - `selector`: which operations a stub intercepts
//! - `resolver`: most specific constructor or overload
//! - `factory`: stub type synthesis, caching and instantiation
//! - `stub`: per-instance dispatch state and generated call bodies
//! - `descriptor`: call and construction descriptors
//! - `dispatcher`: the dispatcher trait, registry and the synchronous dispatcher
//! - `facade`: the [`Reifier`] entry points

mod descriptor;
mod dispatcher;
mod facade;
mod factory;
pub mod name_codec;
mod resolver;
pub mod selector;
mod stub;

pub use descriptor::{CallDescriptor, ConstructorCall, GenericBindings};
pub use dispatcher::{Dispatcher, DispatcherFactory, DispatcherRegistry, SynchronousDispatcher};
pub use facade::Reifier;
pub use factory::{StubFactory, StubHandle};
pub use name_codec::TargetType;
pub use resolver::Resolver;
pub use selector::{EligibilityReport, ExaminedMethod, Exclusion, Verdict};
pub use stub::{DispatchState, InterceptMode, StubLayout, StubMethod, StubSlot};
