//! Pack manifests (`info.json`).
//!
//! The document keeps the raw JSON object so a rewrite only touches the
//! fields the pinner owns (`version` and `dependencies`); key order and
//! every other field survive as loaded.
use crate::version::ModVersion;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "info.json";

/// Typed view of the fields the pinner reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: ModVersion,
    pub factorio_version: String,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ManifestDocument {
    path: PathBuf,
    raw: Map<String, Value>,
    manifest: Manifest,
}

/// Accept either a manifest file or a pack directory containing one.
pub fn resolve_manifest_path(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        let candidate = path.join(MANIFEST_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(anyhow!(
            "missing {MANIFEST_FILE_NAME} in {}",
            path.display()
        ));
    }
    if path.is_file() {
        if path.file_name().and_then(|name| name.to_str()) != Some(MANIFEST_FILE_NAME) {
            return Err(anyhow!(
                "expected {MANIFEST_FILE_NAME}, got {}",
                path.display()
            ));
        }
        return Ok(path.to_path_buf());
    }
    Err(anyhow!("path not found: {}", path.display()))
}

impl ManifestDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read manifest {}", path.display()))?;
        Self::parse(path, &bytes)
    }

    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .with_context(|| format!("parse manifest JSON {}", path.display()))?;
        let Value::Object(raw) = value else {
            return Err(anyhow!(
                "manifest {} is not a JSON object",
                path.display()
            ));
        };
        let manifest: Manifest = serde_json::from_value(Value::Object(raw.clone()))
            .with_context(|| format!("invalid manifest {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            raw,
            manifest,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Replace the dependency list. The key keeps its position.
    pub fn set_dependencies(&mut self, dependencies: Vec<String>) {
        self.raw.insert(
            "dependencies".to_string(),
            Value::Array(dependencies.iter().cloned().map(Value::String).collect()),
        );
        self.manifest.dependencies = dependencies;
    }

    /// Replace the declared version. Only called for a bump, so an untouched
    /// manifest keeps its version string exactly as written.
    pub fn set_version(&mut self, version: ModVersion) {
        self.raw
            .insert("version".to_string(), Value::String(version.to_string()));
        self.manifest.version = version;
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.raw).context("serialize manifest")?;
        text.push('\n');
        Ok(text)
    }

    /// Write the document over its source file.
    ///
    /// The new content goes to a temporary file in the same directory which
    /// is then renamed over the target, so readers see either the old or the
    /// new manifest.
    pub fn write_atomic(&self) -> Result<()> {
        let text = self.to_pretty_json()?;
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(text.as_bytes())
            .with_context(|| format!("write temp manifest for {}", self.path.display()))?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(metadata.permissions())
                .with_context(|| format!("copy permissions of {}", self.path.display()))?;
        }
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("sync temp manifest for {}", self.path.display()))?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}
