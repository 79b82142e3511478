//! Instance specs: how to build one named instance.
//!
//! Shape (field names are fixed, any serde format):
//! {
//!   "my_bike": {
//!     "module": "vehicles",          // optional; otherwise `class` is a dotted path
//!     "class": "Bike",               // or "factory": "vehicles.make_bike"
//!     "constructor": "from_parts",   // optional alternate constructor, `class` only
//!     "args": ["front_wheel", "back_wheel"],
//!     "kwds": {"color": "red"},
//!     "skip_args": [],               // literals never treated as instance names
//!     "skip_kwds": []                // keywords whose values are left alone
//!   }
//! }

use crate::error::SpinError;
use crate::spec::value::{Fields, Value};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};

/// Instance name -> spec. Names are the only identity.
pub type SpecGraph = BTreeMap<String, InstanceSpec>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceSpec {
    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub class: Option<String>,

    #[serde(default)]
    pub factory: Option<String>,

    #[serde(default)]
    pub constructor: Option<String>,

    #[serde(default)]
    pub args: Vec<Value>,

    #[serde(default)]
    pub kwds: Fields,

    /// Any literal is accepted; only strings can name instances, so the rest are dropped.
    #[serde(default, deserialize_with = "deserialize_skip_literals")]
    pub skip_args: BTreeSet<String>,

    #[serde(default)]
    pub skip_kwds: BTreeSet<String>,
}

/// What a spec asks to invoke, after checking the callable fields agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableRef<'a> {
    Class {
        module: Option<&'a str>,
        class: &'a str,
        constructor: Option<&'a str>,
    },
    Factory {
        module: Option<&'a str>,
        factory: &'a str,
    },
}

impl InstanceSpec {
    pub fn class(path: impl Into<String>) -> Self {
        Self {
            class: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn factory(path: impl Into<String>) -> Self {
        Self {
            factory: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_constructor(mut self, constructor: impl Into<String>) -> Self {
        self.constructor = Some(constructor.into());
        self
    }

    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_kwd(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwds.insert(name.into(), value.into());
        self
    }

    pub fn skip_arg(mut self, literal: impl Into<String>) -> Self {
        self.skip_args.insert(literal.into());
        self
    }

    pub fn skip_kwd(mut self, name: impl Into<String>) -> Self {
        self.skip_kwds.insert(name.into());
        self
    }

    /// Check the callable fields of the spec for `name`:
    /// - exactly one of `class` / `factory`
    /// - `constructor` only alongside `class`
    pub fn callable_ref(&self, name: &str) -> Result<CallableRef<'_>, SpinError> {
        let module = self.module.as_deref();
        match (self.class.as_deref(), self.factory.as_deref()) {
            (Some(_), Some(_)) => Err(SpinError::config(
                name,
                "both `class` and `factory` are set",
            )),
            (None, None) => Err(SpinError::config(
                name,
                "missing `class` or `factory`",
            )),
            (Some(class), None) => Ok(CallableRef::Class {
                module,
                class,
                constructor: self.constructor.as_deref(),
            }),
            (None, Some(factory)) => {
                if self.constructor.is_some() {
                    return Err(SpinError::config(
                        name,
                        "`constructor` is only valid with `class`",
                    ));
                }
                Ok(CallableRef::Factory { module, factory })
            }
        }
    }
}

fn deserialize_skip_literals<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let literals = Vec::<Value>::deserialize(deserializer)?;
    Ok(literals
        .into_iter()
        .filter_map(|v| match v {
            Value::Str(s) => Some(s),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_external_field_names() {
        let spec: InstanceSpec = serde_json::from_value(json!({
            "module": "vehicles",
            "class": "Bike",
            "constructor": "from_parts",
            "args": ["front_wheel", 2],
            "kwds": {"color": "red"},
            "skip_args": ["front_wheel"],
            "skip_kwds": ["color"],
            "comment": "ignored"
        }))
        .unwrap();

        assert_eq!(
            spec.callable_ref("bike").unwrap(),
            CallableRef::Class {
                module: Some("vehicles"),
                class: "Bike",
                constructor: Some("from_parts"),
            }
        );
        assert_eq!(spec.args, vec![Value::from("front_wheel"), Value::Int(2)]);
        assert!(spec.skip_args.contains("front_wheel"));
        assert!(spec.skip_kwds.contains("color"));
    }

    #[test]
    fn non_string_skip_args_are_accepted_and_dropped() {
        let graph: SpecGraph = serde_json::from_value(json!({
            "x": {"class": "builtins.list", "args": [[0, 1]], "skip_args": [0, "y", 1.5, null]}
        }))
        .unwrap();

        let skip: Vec<&str> = graph["x"].skip_args.iter().map(String::as_str).collect();
        assert_eq!(skip, vec!["y"]);
    }

    #[test]
    fn missing_callable_is_config_error() {
        let err = InstanceSpec::default().callable_ref("empty").unwrap_err();
        assert!(matches!(err, SpinError::Config { ref name, .. } if name == "empty"));
    }

    #[test]
    fn class_and_factory_together_is_config_error() {
        let mut spec = InstanceSpec::class("pkg.A");
        spec.factory = Some("pkg.make_a".into());
        assert!(matches!(
            spec.callable_ref("a"),
            Err(SpinError::Config { .. })
        ));
    }

    #[test]
    fn constructor_requires_class() {
        let spec = InstanceSpec::factory("pkg.make_a").with_constructor("other");
        let err = spec.callable_ref("a").unwrap_err();
        assert!(err.to_string().contains("`constructor` is only valid with `class`"));
    }
}
