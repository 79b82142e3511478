//! Spec layer: serde schemas for instance specs and their argument values.
//!
//! This module is intentionally separate from resolution and construction.
//! It owns:
//! - Value (argument trees, before and after materialization)
//! - InstanceSpec / SpecGraph (what to build, by name)

pub mod instance;
pub mod value;

pub use instance::{CallableRef, InstanceSpec, SpecGraph};
pub use value::{Fields, Value};
