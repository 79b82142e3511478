//! Declarative object-graph builder.
//!
//! A spec graph maps instance names to "call this with these arguments".
//! Argument strings that name other instances are replaced by those
//! instances, which are built first, once each, in dependency order.
//!
//! ```
//! use device_spinner::{DeviceSpinner, SpecGraph};
//! use device_spinner::spec::Fields;
//!
//! let specs: SpecGraph = serde_json::from_value(serde_json::json!({
//!     "settings": {"class": "builtins.dict", "kwds": {"value": "my_val"}},
//!     "my_val": {"class": "builtins.str", "args": ["hello"]}
//! }))
//! .unwrap();
//!
//! let mut spinner = DeviceSpinner::with_builtins();
//! let devices = spinner.create_devices_from_specs(&specs).unwrap();
//! let settings = devices["settings"].downcast_ref::<Fields>().unwrap();
//! assert!(settings["value"].as_instance().is_some());
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod spec;
pub mod spinner;

pub use config::Config;
pub use error::SpinError;
pub use factory::{Args, Constructor, FactoryRegistry, Instance, constructor};
pub use spec::{InstanceSpec, SpecGraph, Value};
pub use spinner::{DeviceSpinner, Devices, Result};
