//! Callable resolution: the named-factory registry and the values it deals in.

pub mod builtins;
pub mod instance;
pub mod registry;

pub use instance::{Args, Constructor, Instance, constructor};
pub use registry::{FactoryRegistry, Resolved};
