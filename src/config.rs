//! Pinner settings.
//!
//! Each setting resolves in priority order: command-line flag, environment
//! variable, config file, built-in default. The config file is
//! `--config <PATH>` when given, else `<config dir>/modpin/config.json` when
//! it exists.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_FEED_URL: &str = "https://mods.factorio.com/api/mods";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const FEED_URL_ENV: &str = "MODPIN_FEED_URL";
pub const TIMEOUT_ENV: &str = "MODPIN_TIMEOUT_SECS";

/// Platform base component; its version tracks the game, not the feed.
pub const BASE_COMPONENT: &str = "base";

/// Packs of this family depend on each other in tiers; those edges are
/// maintained by hand.
pub const PACK_FAMILY: [&str; 4] = ["zz-qol-lite", "zz-qol-plus", "zz-qol-max", "zz-qol-editor"];

fn default_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Additional sibling pack names that are never feed-resolved.
    #[serde(default)]
    pub pack_names: Vec<String>,
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub feed_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub pack_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub feed_url: String,
    pub timeout: Duration,
    /// Names never sent to the feed (base component plus pack family).
    pub protected: BTreeSet<String>,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("modpin").join("config.json"))
}

/// Load the config file, if any.
///
/// An explicit path must exist; the default location is optional.
pub fn load_config_file(explicit: Option<&Path>) -> Result<Option<ConfigFile>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => path,
            None => return Ok(None),
        },
    };
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config = parse_config(&bytes).with_context(|| format!("load config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Some(config))
}

pub fn parse_config(bytes: &[u8]) -> Result<ConfigFile> {
    let config: ConfigFile = serde_json::from_slice(bytes).context("parse config JSON")?;
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    Ok(config)
}

/// Merge flags, environment and config file into effective settings.
pub fn resolve_settings<F>(
    overrides: &Overrides,
    file: Option<&ConfigFile>,
    lookup_env: F,
) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let feed_url = overrides
        .feed_url
        .clone()
        .or_else(|| lookup_env(FEED_URL_ENV))
        .or_else(|| file.and_then(|file| file.feed_url.clone()))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());

    let env_timeout = match lookup_env(TIMEOUT_ENV) {
        Some(raw) => Some(
            raw.trim()
                .parse::<u64>()
                .with_context(|| format!("parse {TIMEOUT_ENV}={raw:?}"))?,
        ),
        None => None,
    };
    let timeout_secs = overrides
        .timeout_secs
        .or(env_timeout)
        .or_else(|| file.and_then(|file| file.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(anyhow!("feed timeout must be at least one second"));
    }

    let mut protected = BTreeSet::new();
    protected.insert(BASE_COMPONENT.to_string());
    protected.extend(PACK_FAMILY.iter().map(|name| name.to_string()));
    if let Some(file) = file {
        protected.extend(file.pack_names.iter().cloned());
    }
    protected.extend(overrides.pack_names.iter().cloned());

    Ok(Settings {
        feed_url,
        timeout: Duration::from_secs(timeout_secs),
        protected,
    })
}
