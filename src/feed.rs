//! Release feed lookups against the mod portal.
//!
//! The portal answers `GET {base}/{name}` with the mod's details, including
//! every published release and the platform version each release targets.
//! Lookups are blocking and bounded by a global per-request timeout.
use crate::version::ModVersion;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// One published release of a mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: ModVersion,
    /// Platform version the release declares in its own `info.json`.
    pub factorio_version: Option<String>,
}

/// Result of a successful feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLookup {
    Found(Vec<Release>),
    /// The feed does not know the name or lists no releases for it.
    NotFound,
}

/// Source of published releases, queried once per dependency name.
///
/// `Err` means the feed itself could not be consulted (transport, status,
/// timeout or decode failure).
pub trait VersionFeed {
    fn releases(&self, name: &str) -> Result<FeedLookup>;
}

/// Pick the highest release targeting `want_factorio`, falling back to the
/// highest release overall when none target it.
pub fn select_latest(releases: &[Release], want_factorio: Option<&str>) -> Option<ModVersion> {
    let want = want_factorio.map(str::trim).filter(|value| !value.is_empty());
    let matching = match want {
        Some(want) => releases
            .iter()
            .filter(|release| release.factorio_version.as_deref().map(str::trim) == Some(want))
            .collect::<Vec<_>>(),
        None => Vec::new(),
    };
    let pool = if matching.is_empty() {
        releases.iter().collect::<Vec<_>>()
    } else {
        matching
    };
    pool.into_iter().map(|release| release.version).max()
}

#[derive(Deserialize)]
struct PortalMod {
    #[serde(default)]
    releases: Vec<PortalRelease>,
}

#[derive(Deserialize)]
struct PortalRelease {
    version: Option<String>,
    #[serde(default)]
    info_json: Option<PortalInfoJson>,
}

#[derive(Deserialize)]
struct PortalInfoJson {
    factorio_version: Option<String>,
}

/// HTTP feed backed by the mod portal API.
pub struct PortalFeed {
    agent: ureq::Agent,
    base_url: String,
}

impl PortalFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

impl VersionFeed for PortalFeed {
    fn releases(&self, name: &str) -> Result<FeedLookup> {
        let url = self.url_for(name);
        let start = Instant::now();
        let result = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .call();
        let elapsed_ms = start.elapsed().as_millis();
        let mut response = match result {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => {
                tracing::debug!(name, elapsed_ms, "feed has no entry");
                return Ok(FeedLookup::NotFound);
            }
            Err(ureq::Error::Timeout(_)) => {
                return Err(anyhow!("feed request for {name} timed out after {elapsed_ms} ms"));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("fetch {url}")));
            }
        };
        let details: PortalMod = response
            .body_mut()
            .read_json()
            .with_context(|| format!("decode feed response for {name}"))?;
        tracing::debug!(
            name,
            elapsed_ms,
            releases = details.releases.len(),
            "feed lookup complete"
        );

        let releases = details
            .releases
            .into_iter()
            .filter_map(|release| {
                let raw = release.version?;
                match raw.parse::<ModVersion>() {
                    Ok(version) => Some(Release {
                        version,
                        factorio_version: release
                            .info_json
                            .and_then(|info| info.factorio_version),
                    }),
                    Err(err) => {
                        tracing::debug!(name, version = %raw, "skip release: {err:#}");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();
        if releases.is_empty() {
            return Ok(FeedLookup::NotFound);
        }
        Ok(FeedLookup::Found(releases))
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryFeed;
