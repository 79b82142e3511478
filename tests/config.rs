use device_spinner::spec::Fields;
use device_spinner::{Config, DeviceSpinner, Value};
use pretty_assertions::assert_eq;
use std::fs;

const INSTRUMENT: &str = r#"
# Instrument rig.
devices:
  settings:
    class: builtins.dict
    kwds:
      exposure_ms: 12.5
      port: serial0
      stages: [x_stage, y_stage]
    skip_kwds: [port]
  serial0:
    class: builtins.str
    args: [/dev/ttyUSB0]
  x_stage:
    class: builtins.int
    args: [1]
  y_stage:
    module: builtins
    class: int
    args: ["2"]
"#;

#[test]
fn builds_devices_section_from_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instrument.yaml");
    fs::write(&path, INSTRUMENT).unwrap();

    let cfg = Config::open(&path).unwrap();
    let specs = cfg.specs(Some("devices")).unwrap();
    let mut spinner = DeviceSpinner::with_builtins();
    let devices = spinner.create_devices_from_specs(&specs).unwrap();

    assert_eq!(devices.len(), 4);
    let settings = devices["settings"].downcast_ref::<Fields>().unwrap();
    assert_eq!(settings["exposure_ms"], Value::Float(12.5));
    assert_eq!(settings["port"], Value::from("serial0"));

    let stages: Vec<i64> = settings["stages"]
        .as_seq()
        .unwrap()
        .iter()
        .map(|v| *v.as_instance().unwrap().downcast_ref::<i64>().unwrap())
        .collect();
    assert_eq!(stages, vec![1, 2]);
}

#[test]
fn toml_copy_builds_the_same_graph() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("instrument.yaml");
    fs::write(&yaml, INSTRUMENT).unwrap();

    let toml_path = dir.path().join("instrument.toml");
    Config::open(&yaml)
        .unwrap()
        .save(Some(toml_path.as_path()), false)
        .unwrap();

    let specs = Config::open(&toml_path)
        .unwrap()
        .specs(Some("devices"))
        .unwrap();
    let mut spinner = DeviceSpinner::with_builtins();
    let devices = spinner.create_devices_from_specs(&specs).unwrap();
    assert_eq!(
        devices["serial0"].downcast_ref::<String>().map(String::as_str),
        Some("/dev/ttyUSB0")
    );
}
