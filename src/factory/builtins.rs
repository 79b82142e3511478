//! Stock callables for plain data instances.
//!
//! `builtins.*` build the value types specs can express (mappings, lists,
//! strings, numbers). `to_list` collects its positional arguments into a list,
//! which is how a spec builds a list of other instances.

use crate::factory::instance::{Args, Instance, constructor};
use crate::error::SpinError;
use crate::factory::registry::FactoryRegistry;
use crate::spec::{Fields, Value};
use anyhow::{Context, bail};

pub const DICT: &str = "builtins.dict";
pub const LIST: &str = "builtins.list";
pub const STR: &str = "builtins.str";
pub const INT: &str = "builtins.int";
pub const FLOAT: &str = "builtins.float";
pub const BOOL: &str = "builtins.bool";
pub const TO_LIST: &str = "device_spinner.builtins.to_list";
pub const FACTORY_UTILS_TO_LIST: &str = "device_spinner.factory_utils.to_list";

pub(crate) fn install(registry: &mut FactoryRegistry) -> Result<(), SpinError> {
    let entries: [(&str, fn(Args) -> anyhow::Result<Instance>); 6] = [
        (DICT, dict),
        (LIST, list),
        (STR, string),
        (INT, int),
        (FLOAT, float),
        (BOOL, boolean),
    ];
    for (path, f) in entries {
        registry.register_class(path, constructor(f))?;
    }
    registry.register_constructor(DICT, "fromkeys", constructor(dict_fromkeys))?;
    registry.register_factory(TO_LIST, constructor(to_list))?;
    registry.register_factory(FACTORY_UTILS_TO_LIST, constructor(to_list))?;
    Ok(())
}

/// `dict(mapping?, **kwds)`: keywords override the optional mapping.
fn dict(args: Args) -> anyhow::Result<Instance> {
    args.expect_positional(0, 1)?;
    let (positional, keywords) = args.into_parts();
    let mut out = match positional.into_iter().next() {
        None => Fields::new(),
        Some(Value::Fields(fields)) => fields,
        Some(Value::Instance(instance)) => instance
            .downcast_ref::<Fields>()
            .cloned()
            .with_context(|| format!("cannot build a dict from {}", instance.type_name()))?,
        Some(other) => bail!("cannot build a dict from a {}", other.kind()),
    };
    out.extend(keywords);
    Ok(Instance::new(out))
}

/// `dict.fromkeys(keys, value=null)`.
fn dict_fromkeys(args: Args) -> anyhow::Result<Instance> {
    args.expect_positional(1, 2)?;
    let keys = match args.get(0) {
        Some(Value::Seq(keys)) => keys,
        Some(other) => bail!("fromkeys expects a sequence of keys, got a {}", other.kind()),
        None => bail!("fromkeys expects a sequence of keys"),
    };
    let fill = args.get(1).cloned().unwrap_or_default();

    let mut out = Fields::new();
    for key in keys {
        match key {
            Value::Str(k) => {
                out.insert(k.clone(), fill.clone());
            }
            other => bail!("dict keys must be strings, got a {}", other.kind()),
        }
    }
    Ok(Instance::new(out))
}

/// `list(sequence?)`.
fn list(args: Args) -> anyhow::Result<Instance> {
    args.expect_positional(0, 1)?;
    let items = match args.get(0) {
        None => Vec::new(),
        Some(Value::Seq(items)) => items.clone(),
        Some(Value::Instance(instance)) => instance
            .downcast_ref::<Vec<Value>>()
            .cloned()
            .with_context(|| format!("cannot build a list from {}", instance.type_name()))?,
        Some(other) => bail!("cannot build a list from a {}", other.kind()),
    };
    Ok(Instance::new(items))
}

fn string(args: Args) -> anyhow::Result<Instance> {
    args.expect_positional(0, 1)?;
    let s = match args.get(0) {
        None => String::new(),
        Some(Value::Instance(instance)) => match instance.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => format!("<{}>", instance.type_name()),
        },
        Some(v) => v.to_string(),
    };
    Ok(Instance::new(s))
}

fn int(args: Args) -> anyhow::Result<Instance> {
    args.expect_positional(0, 1)?;
    let i = match args.get(0) {
        None => 0,
        Some(Value::Int(i)) => *i,
        Some(Value::Float(f)) if !f.is_finite() => bail!("cannot convert {} to int", f),
        Some(Value::Float(f)) => f.trunc() as i64,
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::Str(s)) => s
            .trim()
            .parse::<i64>()
            .with_context(|| format!("invalid int literal {:?}", s))?,
        Some(other) => bail!("cannot build an int from a {}", other.kind()),
    };
    Ok(Instance::new(i))
}

fn float(args: Args) -> anyhow::Result<Instance> {
    args.expect_positional(0, 1)?;
    let f = match args.get(0) {
        None => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Str(s)) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("invalid float literal {:?}", s))?,
        Some(v) => match v.as_f64() {
            Some(f) => f,
            None => bail!("cannot build a float from a {}", v.kind()),
        },
    };
    Ok(Instance::new(f))
}

/// Truthiness: empty containers, zero, and null are false.
fn boolean(args: Args) -> anyhow::Result<Instance> {
    args.expect_positional(0, 1)?;
    let b = match args.get(0) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Int(i)) => *i != 0,
        Some(Value::Float(f)) => *f != 0.0,
        Some(Value::Str(s)) => !s.is_empty(),
        Some(Value::Seq(items)) => !items.is_empty(),
        Some(Value::Fields(fields)) => !fields.is_empty(),
        Some(Value::Instance(_)) => true,
    };
    Ok(Instance::new(b))
}

/// `to_list(*elements)`.
fn to_list(args: Args) -> anyhow::Result<Instance> {
    let (positional, _) = args.into_parts();
    Ok(Instance::new(positional))
}
