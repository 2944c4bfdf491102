//! Command implementations

pub mod check;
pub mod decode;
pub mod encode;
pub mod invoke;
pub mod methods;
pub mod resolve;
pub mod stub;
pub mod warm;
