//! Built instances, the arguments handed to callables, and the callable type.

use crate::spec::{Fields, Value};
use anyhow::{anyhow, bail};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A built, type-erased instance. Clones share the same allocation.
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Concrete type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    /// Reference equality.
    pub fn ptr_eq(a: &Instance, b: &Instance) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Instance::ptr_eq(self, other)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_name)
    }
}

/// A resolved callable: materialized arguments in, one instance out.
pub type Constructor = Arc<dyn Fn(Args) -> anyhow::Result<Instance> + Send + Sync>;

/// Wrap a closure as a `Constructor`.
pub fn constructor<F>(f: F) -> Constructor
where
    F: Fn(Args) -> anyhow::Result<Instance> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Materialized positional and keyword arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Fields,
}

impl Args {
    pub fn new(positional: Vec<Value>, keywords: Fields) -> Self {
        Self {
            positional,
            keywords,
        }
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &Fields {
        &self.keywords
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn kwd(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    /// Positional instance at `index`, typed.
    pub fn instance<T: Send + Sync + 'static>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        let value = self
            .get(index)
            .ok_or_else(|| anyhow!("missing positional argument {}", index))?;
        typed(value, || format!("positional argument {}", index))
    }

    /// Keyword instance `name`, typed.
    pub fn kwd_instance<T: Send + Sync + 'static>(&self, name: &str) -> anyhow::Result<Arc<T>> {
        let value = self
            .kwd(name)
            .ok_or_else(|| anyhow!("missing keyword argument `{}`", name))?;
        typed(value, || format!("keyword argument `{}`", name))
    }

    /// Fail unless the positional count is within `min..=max`.
    pub fn expect_positional(&self, min: usize, max: usize) -> anyhow::Result<()> {
        let n = self.positional.len();
        if n < min || n > max {
            if min == max {
                bail!("expected {} positional arguments, got {}", min, n);
            }
            bail!("expected {} to {} positional arguments, got {}", min, max, n);
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<Value>, Fields) {
        (self.positional, self.keywords)
    }
}

fn typed<T: Send + Sync + 'static>(
    value: &Value,
    what: impl FnOnce() -> String,
) -> anyhow::Result<Arc<T>> {
    match value {
        Value::Instance(instance) => instance.downcast::<T>().ok_or_else(|| {
            anyhow!(
                "{} is a {}, expected {}",
                what(),
                instance.type_name(),
                std::any::type_name::<T>()
            )
        }),
        other => bail!("{} is a {}, expected an instance", what(), other.kind()),
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for v in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}", v)?;
        }
        for (k, v) in &self.keywords {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wheel;

    #[test]
    fn typed_access_to_instances() {
        let wheel = Instance::new(Wheel);
        let args = Args::new(vec![Value::from(wheel.clone()), Value::Int(3)], Fields::new());

        let got = args.instance::<Wheel>(0).unwrap();
        assert!(Arc::ptr_eq(&got, &wheel.downcast::<Wheel>().unwrap()));

        let err = args.instance::<Wheel>(1).unwrap_err();
        assert_eq!(err.to_string(), "positional argument 1 is a int, expected an instance");

        let err = args.instance::<String>(0).unwrap_err();
        assert!(err.to_string().contains("expected alloc::string::String"));
    }

    #[test]
    fn arity_check() {
        let args = Args::new(vec![Value::Null], Fields::new());
        assert!(args.expect_positional(1, 1).is_ok());
        assert_eq!(
            args.expect_positional(2, 3).unwrap_err().to_string(),
            "expected 2 to 3 positional arguments, got 1"
        );
    }

    #[test]
    fn displays_like_a_call() {
        let mut kwds = Fields::new();
        kwds.insert("b".into(), Value::Int(2));
        let args = Args::new(vec![Value::from("a")], kwds);
        assert_eq!(args.to_string(), "a, b=2");
    }
}
