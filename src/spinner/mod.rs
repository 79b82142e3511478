//! Graph orchestration: build every instance of a spec graph exactly once.
//!
//! Construction order is discovered lazily by depth-first recursion: before an
//! instance's callable runs, every instance its arguments name has been built
//! and cached. Callers never pre-sort the graph.
//!
//! Per instance:
//! 1) resolve the callable (`FactoryRegistry::resolve`)
//! 2) materialize `args` (skipping `skip_args` and the instance's own name)
//! 3) materialize `kwds` (skipping `skip_kwds` keywords and the own name)
//! 4) invoke and cache

pub mod materialize;

use crate::error::SpinError;
use crate::factory::{Args, FactoryRegistry, Instance};
use crate::spec::{Fields, InstanceSpec, SpecGraph};
use std::collections::BTreeMap;

pub use materialize::{DeviceSource, SkipSet, materialize};

pub type Result<T> = std::result::Result<T, SpinError>;

/// Built instances by name.
pub type Devices = BTreeMap<String, Instance>;

#[derive(Debug, Default)]
pub struct DeviceSpinner {
    factories: FactoryRegistry,
    devices: Devices,
}

impl DeviceSpinner {
    pub fn new(factories: FactoryRegistry) -> Self {
        Self {
            factories,
            devices: Devices::new(),
        }
    }

    /// Spinner over `FactoryRegistry::with_builtins()`.
    pub fn with_builtins() -> Self {
        Self::new(FactoryRegistry::with_builtins())
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn factories_mut(&mut self) -> &mut FactoryRegistry {
        &mut self.factories
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Option<&Instance> {
        self.devices.get(name)
    }

    /// Seed an already-built instance; later builds treat `name` as done.
    pub fn insert_device(&mut self, name: impl Into<String>, instance: Instance) -> Option<Instance> {
        self.devices.insert(name.into(), instance)
    }

    pub fn into_devices(self) -> Devices {
        self.devices
    }

    /// Build every name in `specs` that is not already built.
    ///
    /// Repeated calls reuse cached instances and build only new names. On
    /// error, instances finished before the failure stay in `devices()`.
    pub fn create_devices_from_specs(&mut self, specs: &SpecGraph) -> Result<&Devices> {
        for (name, spec) in specs {
            // Skip already-constructed devices.
            if self.devices.contains_key(name) {
                continue;
            }
            let mut session = Session {
                spinner: &mut *self,
                specs,
                building: Vec::new(),
            };
            session.create_device(name, spec)?;
        }
        Ok(&self.devices)
    }

    /// Build `name` (and whatever it references) from `specs`, or return it
    /// from cache.
    pub fn create_device(&mut self, name: &str, specs: &SpecGraph) -> Result<Instance> {
        let mut session = Session {
            spinner: &mut *self,
            specs,
            building: Vec::new(),
        };
        session.device(name)
    }
}

/// One top-level build: the graph plus the names currently under construction.
struct Session<'a> {
    spinner: &'a mut DeviceSpinner,
    specs: &'a SpecGraph,
    building: Vec<String>,
}

impl Session<'_> {
    fn create_device(&mut self, name: &str, spec: &InstanceSpec) -> Result<Instance> {
        if let Some(instance) = self.spinner.devices.get(name) {
            tracing::trace!(name, "reusing built instance");
            return Ok(instance.clone());
        }
        if self.building.iter().any(|b| b == name) {
            let mut chain = self.building.clone();
            chain.push(name.to_string());
            return Err(SpinError::Cycle { chain });
        }

        let resolved = self.spinner.factories.resolve(name, spec)?;

        self.building.push(name.to_string());
        let args = self.materialize_args(name, spec);
        self.building.pop();
        let args = args?;

        let depth = self.building.len();
        tracing::debug!(
            depth,
            "{}{} = {}({})",
            " ".repeat(4 * depth),
            name,
            resolved.path,
            args
        );

        let instance = (resolved.constructor)(args).map_err(|source| SpinError::Construction {
            name: name.to_string(),
            source,
        })?;
        self.spinner
            .devices
            .insert(name.to_string(), instance.clone());
        Ok(instance)
    }

    fn materialize_args(&mut self, name: &str, spec: &InstanceSpec) -> Result<Args> {
        // Positional values equal to this instance's own name stay literal.
        let skip = SkipSet::with_literals(name, &spec.skip_args);
        let mut positional = Vec::with_capacity(spec.args.len());
        for value in &spec.args {
            positional.push(materialize(value, &skip, self)?);
        }

        // Keyword values equal to this instance's own name stay literal too.
        let skip = SkipSet::current(name);
        let mut keywords = Fields::new();
        for (kwd, value) in &spec.kwds {
            let value = if spec.skip_kwds.contains(kwd) {
                value.clone()
            } else {
                materialize(value, &skip, self)?
            };
            keywords.insert(kwd.clone(), value);
        }

        Ok(Args::new(positional, keywords))
    }
}

impl DeviceSource for Session<'_> {
    fn is_device_name(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    fn device(&mut self, name: &str) -> Result<Instance> {
        let specs = self.specs;
        match specs.get(name) {
            Some(spec) => self.create_device(name, spec),
            None => Err(SpinError::config(name, "not present in the spec graph")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::constructor;
    use crate::spec::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn graph(value: serde_json::Value) -> SpecGraph {
        serde_json::from_value(value).unwrap()
    }

    /// `test.Node`: records its arguments, counts constructions.
    fn spinner(calls: Arc<AtomicUsize>) -> DeviceSpinner {
        let mut factories = FactoryRegistry::with_builtins();
        factories
            .register_class(
                "test.Node",
                constructor(move |args| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Instance::new(args))
                }),
            )
            .unwrap();
        factories
            .register_factory(
                "test.fail",
                constructor(|_| Err(anyhow::anyhow!("boom"))),
            )
            .unwrap();
        DeviceSpinner::new(factories)
    }

    #[test]
    fn shared_dependency_is_built_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut sp = spinner(calls.clone());
        let specs = graph(json!({
            "left": {"class": "test.Node", "args": ["shared"]},
            "right": {"class": "test.Node", "kwds": {"dep": "shared"}},
            "shared": {"class": "test.Node"}
        }));

        let devices = sp.create_devices_from_specs(&specs).unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let shared = &devices["shared"];
        let left = devices["left"].downcast_ref::<Args>().unwrap();
        let right = devices["right"].downcast_ref::<Args>().unwrap();
        assert!(Instance::ptr_eq(left.get(0).unwrap().as_instance().unwrap(), shared));
        assert!(Instance::ptr_eq(right.kwd("dep").unwrap().as_instance().unwrap(), shared));
    }

    #[test]
    fn rerun_builds_only_new_names() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut sp = spinner(calls.clone());
        sp.create_devices_from_specs(&graph(json!({"a": {"class": "test.Node"}})))
            .unwrap();
        let first = sp.device("a").unwrap().clone();

        sp.create_devices_from_specs(&graph(json!({
            "a": {"class": "test.Node"},
            "b": {"class": "test.Node", "args": ["a"]}
        })))
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(Instance::ptr_eq(sp.device("a").unwrap(), &first));
    }

    #[test]
    fn skipped_keyword_stays_literal() {
        let mut sp = spinner(Arc::new(AtomicUsize::new(0)));
        let specs = graph(json!({
            "dev": {"class": "test.Node", "kwds": {"port": "serial", "link": "serial"},
                    "skip_kwds": ["port"]},
            "serial": {"class": "test.Node"}
        }));

        sp.create_devices_from_specs(&specs).unwrap();
        let args = sp.device("dev").unwrap().downcast_ref::<Args>().unwrap();
        assert_eq!(args.kwd("port"), Some(&Value::from("serial")));
        assert!(args.kwd("link").unwrap().as_instance().is_some());
    }

    #[test]
    fn self_name_in_nested_keyword_is_literal() {
        let mut sp = spinner(Arc::new(AtomicUsize::new(0)));
        let specs = graph(json!({
            "me": {"class": "test.Node", "kwds": {"tags": ["me", {"id": "me"}]}}
        }));

        sp.create_devices_from_specs(&specs).unwrap();
        let args = sp.device("me").unwrap().downcast_ref::<Args>().unwrap();
        assert_eq!(
            args.kwd("tags"),
            Some(&Value::from(json!(["me", {"id": "me"}])))
        );
    }

    #[test]
    fn cycle_fails_fast_with_chain() {
        let mut sp = spinner(Arc::new(AtomicUsize::new(0)));
        let specs = graph(json!({
            "a": {"class": "test.Node", "args": ["b"]},
            "b": {"class": "test.Node", "kwds": {"next": "c"}},
            "c": {"class": "test.Node", "args": [["a"]]}
        }));

        let err = sp.create_devices_from_specs(&specs).unwrap_err();
        match err {
            SpinError::Cycle { chain } => assert_eq!(chain, vec!["a", "b", "c", "a"]),
            other => panic!("expected cycle, got {other}"),
        }
        assert!(sp.devices().is_empty());
    }

    #[test]
    fn construction_error_keeps_source_and_partial_state() {
        let mut sp = spinner(Arc::new(AtomicUsize::new(0)));
        let specs = graph(json!({
            "a_ok": {"class": "test.Node"},
            "b_bad": {"factory": "test.fail"},
            "c_user": {"class": "test.Node", "args": ["b_bad"]}
        }));

        let err = sp.create_devices_from_specs(&specs).unwrap_err();
        match &err {
            SpinError::Construction { name, source } => {
                assert_eq!(name, "b_bad");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected construction error, got {other}"),
        }
        assert!(sp.device("a_ok").is_some());
        assert!(sp.device("c_user").is_none());
    }

    #[test]
    fn missing_callable_aborts_dependents() {
        let mut sp = spinner(Arc::new(AtomicUsize::new(0)));
        let specs = graph(json!({
            "a_user": {"class": "test.Node", "args": ["z_broken"]},
            "z_broken": {"args": [1]}
        }));

        let err = sp.create_devices_from_specs(&specs).unwrap_err();
        assert!(matches!(err, SpinError::Config { ref name, .. } if name == "z_broken"));
        assert!(sp.devices().is_empty());
    }

    #[test]
    fn unresolvable_class_reports_path() {
        let mut sp = spinner(Arc::new(AtomicUsize::new(0)));
        let err = sp
            .create_devices_from_specs(&graph(json!({"x": {"class": "test.Missing"}})))
            .unwrap_err();
        assert!(err.is_resolution());
        assert!(err.to_string().contains("`test.Missing`"));
    }
}
