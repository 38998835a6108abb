//! Mod versions as published on the portal (`major.minor.patch`).
use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A numeric mod version. Ordering compares components numerically, so
/// `0.10.0` sorts above `0.9.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ModVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Next patch release of this version.
    pub fn bump_patch(self) -> Result<Self> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or_else(|| anyhow!("cannot bump {self}: patch component is at its maximum"))?;
        Ok(Self { patch, ..self })
    }
}

impl FromStr for ModVersion {
    type Err = anyhow::Error;

    /// Accepts one to three dot-separated unsigned integers; missing
    /// components default to zero.
    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let parts = trimmed.split('.').collect::<Vec<_>>();
        if trimmed.is_empty() || parts.len() > 3 {
            return Err(anyhow!("invalid version {raw:?}"));
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(anyhow!("invalid version {raw:?}"));
            }
            *slot = part
                .parse()
                .map_err(|err| anyhow!("invalid version {raw:?}: {err}"))?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for ModVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
