//! Spec files: YAML/TOML/JSON documents that can be edited, reloaded and saved.
//!
//! The document is kept as a generic tree; `specs()` turns it (or one
//! top-level section such as `devices`) into a `SpecGraph`. Comments and key
//! order are not preserved across a save.

use crate::spec::SpecGraph;
use anyhow::{Context, bail};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Format from the file suffix (case-insensitive).
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            _ => bail!(
                "config file extension not recognized: {} (expected .yaml, .yml, .toml or .json)",
                path.display()
            ),
        }
    }

    pub fn parse(self, text: &str) -> anyhow::Result<serde_json::Value> {
        Ok(match self {
            Format::Yaml => serde_yaml::from_str(text)?,
            Format::Toml => toml::from_str(text)?,
            Format::Json => serde_json::from_str(text)?,
        })
    }

    pub fn render(self, doc: &serde_json::Value) -> anyhow::Result<String> {
        Ok(match self {
            Format::Yaml => serde_yaml::to_string(doc)?,
            Format::Toml => toml::to_string_pretty(doc)?,
            Format::Json => serde_json::to_string_pretty(doc)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    doc: serde_json::Value,
    template: Option<serde_json::Value>,
}

impl Config {
    /// Load an existing config file.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("configuration file at {} does not exist", path.display());
        }
        let mut cfg = Self {
            path: path.to_path_buf(),
            doc: serde_json::Value::Null,
            template: None,
        };
        cfg.load(path)?;
        Ok(cfg)
    }

    /// New config built from `template`; `path` is where `save(None, ..)` writes.
    pub fn create(path: impl AsRef<Path>, template: serde_json::Value) -> anyhow::Result<Self> {
        let path = path.as_ref();
        tracing::info!("Creating: {} from template", path.display());
        let mut cfg = Self {
            path: path.to_path_buf(),
            doc: serde_json::Value::Null,
            template: Some(template),
        };
        cfg.load_from_template(None)?;
        Ok(cfg)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used when saving into a directory.
    pub fn doc_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn doc(&self) -> &serde_json::Value {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut serde_json::Value {
        &mut self.doc
    }

    /// Replace the document with a copy of the template (given or remembered).
    pub fn load_from_template(&mut self, template: Option<serde_json::Value>) -> anyhow::Result<()> {
        if let Some(t) = template {
            self.template = Some(t);
        }
        match &self.template {
            Some(t) => {
                self.doc = t.clone();
                Ok(())
            }
            None => bail!("no template was specified from which to create the configuration"),
        }
    }

    /// Load from `path`, which becomes the config's path.
    pub fn load(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("config does not exist at provided filepath: {}", path.display());
        }
        let format = Format::from_path(path)?;
        tracing::info!("Loading: {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        self.doc = format
            .parse(&text)
            .with_context(|| format!("parse config file {}", path.display()))?;
        self.path = path.to_path_buf();
        Ok(())
    }

    /// Reload from the file last loaded, dropping in-memory edits.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let path = self.path.clone();
        self.load(path)
    }

    /// Save to `path` (or the config's own path) in the format its suffix names.
    ///
    /// A directory target keeps the current file name. With `overwrite` false,
    /// an existing target is an error. Returns the path written.
    pub fn save(&self, path: Option<&Path>, overwrite: bool) -> anyhow::Result<PathBuf> {
        let mut target = path.map(Path::to_path_buf).unwrap_or_else(|| self.path.clone());
        if target.is_dir() {
            let name = self
                .doc_name()
                .with_context(|| format!("config path {} has no file name", self.path.display()))?;
            target = target.join(name);
        }
        let format = Format::from_path(&target)?;
        if target.exists() && !overwrite {
            bail!("refusing to overwrite {}", target.display());
        }

        let text = format
            .render(&self.doc)
            .with_context(|| format!("serialize config for {}", target.display()))?;
        fs::write(&target, text).with_context(|| format!("write config file {}", target.display()))?;
        tracing::info!("Saved: {}", target.display());
        Ok(target)
    }

    /// Spec graph from the whole document, or from its top-level `section`.
    pub fn specs(&self, section: Option<&str>) -> anyhow::Result<SpecGraph> {
        let tree = match section {
            None => &self.doc,
            Some(key) => self
                .doc
                .get(key)
                .with_context(|| format!("config has no section `{}`", key))?,
        };
        serde_json::from_value(tree.clone()).with_context(|| match section {
            Some(key) => format!("section `{}` is not a valid spec graph", key),
            None => "config is not a valid spec graph".to_string(),
        })
    }
}
