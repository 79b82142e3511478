//! Argument materialization: swap instance names for built instances.
//!
//! Sequences and mappings are walked recursively, keeping structure and order.
//! A string scalar is a reference only if it names an instance in the spec
//! graph and is not skipped; everything else is returned as-is.

use crate::factory::Instance;
use crate::spec::{Fields, Value};
use crate::spinner::Result;
use std::collections::BTreeSet;

/// Where referenced instances come from. The orchestrator builds on demand.
pub trait DeviceSource {
    /// True if `name` is an instance name in the graph being built.
    fn is_device_name(&self, name: &str) -> bool;

    /// The built instance for `name`, constructing it first if needed.
    fn device(&mut self, name: &str) -> Result<Instance>;
}

/// Literals that must stay literal.
#[derive(Debug, Clone, Copy)]
pub struct SkipSet<'a> {
    literals: Option<&'a BTreeSet<String>>,
    current: &'a str,
}

impl<'a> SkipSet<'a> {
    /// Skip only the name of the instance being built.
    pub fn current(current: &'a str) -> Self {
        Self {
            literals: None,
            current,
        }
    }

    /// Skip `literals` plus the name of the instance being built.
    pub fn with_literals(current: &'a str, literals: &'a BTreeSet<String>) -> Self {
        Self {
            literals: Some(literals),
            current,
        }
    }

    pub fn contains(&self, s: &str) -> bool {
        s == self.current || self.literals.is_some_and(|l| l.contains(s))
    }
}

pub fn materialize<S>(value: &Value, skip: &SkipSet<'_>, source: &mut S) -> Result<Value>
where
    S: DeviceSource + ?Sized,
{
    match value {
        Value::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(materialize(item, skip, source)?);
            }
            Ok(Value::Seq(out))
        }
        Value::Fields(fields) => {
            let mut out = Fields::new();
            for (k, v) in fields {
                out.insert(k.clone(), materialize(v, skip, source)?);
            }
            Ok(Value::Fields(out))
        }
        Value::Str(s) if source.is_device_name(s) && !skip.contains(s) => {
            Ok(Value::Instance(source.device(s)?))
        }
        other => Ok(other.clone()),
    }
}
