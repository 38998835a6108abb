//! Dependency pinning for one manifest.
//!
//! Every declaration is resolved independently against the feed and the
//! outcome is recorded as a value, so a single unknown or unreachable mod
//! never aborts the rest of the manifest. A declaration counts as changed
//! exactly when its rewritten string differs from the original.
use crate::dependency::{Comparator, Constraint, Dependency};
use crate::feed::{select_latest, FeedLookup, VersionFeed};
use crate::manifest::{Manifest, ManifestDocument};
use crate::version::ModVersion;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Comparator written for entries that receive a new constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    /// `>= latest`
    #[default]
    #[value(alias = "gte")]
    Add,
    /// `== latest`
    Eq,
}

impl PinMode {
    pub fn comparator(self) -> Comparator {
        match self {
            PinMode::Add => Comparator::Ge,
            PinMode::Eq => Comparator::Eq,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PinOptions {
    pub mode: PinMode,
    /// Replace existing comparators with the mode comparator.
    pub force: bool,
    /// Refresh the version of `>=`, `==` and `=` pins, keeping the comparator.
    pub upgrade: bool,
    /// Bump the manifest's patch version when any dependency changed.
    pub bump: bool,
    /// Names that are structural edges and never feed-resolved.
    pub protected: BTreeSet<String>,
}

impl PinOptions {
    fn is_protected(&self, name: &str, manifest_name: &str) -> bool {
        name == manifest_name || self.protected.contains(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Unparsable,
    /// Base component, the pack itself or a sibling pack.
    Protected,
    AlreadyPinned,
    UnsupportedComparator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Updated { latest: ModVersion },
    Current { latest: ModVersion },
    Skipped { reason: SkipReason },
    /// The feed has no releases for the name.
    Unresolved,
    /// The feed could not be consulted.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    /// Dependency name, or the raw declaration when it could not be parsed.
    pub name: String,
    pub original: String,
    pub updated: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl DependencyReport {
    fn kept(name: &str, raw: &str, outcome: Outcome) -> Self {
        Self {
            name: name.to_string(),
            original: raw.to_string(),
            updated: raw.to_string(),
            outcome,
        }
    }

    pub fn changed(&self) -> bool {
        self.original != self.updated
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinReport {
    pub manifest_path: PathBuf,
    pub name: String,
    pub factorio_version: String,
    pub version_before: ModVersion,
    pub version_after: ModVersion,
    pub dependencies: Vec<DependencyReport>,
    /// Set once the rewritten manifest is on disk.
    pub written: bool,
}

impl PinReport {
    pub fn changes(&self) -> impl Iterator<Item = &DependencyReport> {
        self.dependencies.iter().filter(|entry| entry.changed())
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &DependencyReport> {
        self.dependencies
            .iter()
            .filter(|entry| entry.outcome == Outcome::Unresolved)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DependencyReport> {
        self.dependencies
            .iter()
            .filter(|entry| matches!(entry.outcome, Outcome::Failed { .. }))
    }

    pub fn version_bumped(&self) -> bool {
        self.version_after != self.version_before
    }

    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some() || self.version_bumped()
    }

    /// Dependency list as it should be persisted, in manifest order.
    pub fn updated_dependencies(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .map(|entry| entry.updated.clone())
            .collect()
    }
}

/// Resolve every dependency of `doc` against `feed`.
///
/// Pure with respect to the document: the caller decides whether to apply
/// the report and persist it. Fails only when a requested bump cannot be
/// represented.
pub fn pin_manifest(
    doc: &ManifestDocument,
    feed: &dyn VersionFeed,
    options: &PinOptions,
) -> Result<PinReport> {
    let manifest = doc.manifest();
    tracing::info!(
        path = %doc.path().display(),
        dependencies = manifest.dependencies.len(),
        factorio_version = %manifest.factorio_version,
        "pinning manifest"
    );
    let dependencies = manifest
        .dependencies
        .iter()
        .map(|raw| pin_dependency(raw, manifest, feed, options))
        .collect::<Vec<_>>();

    let deps_changed = dependencies.iter().any(DependencyReport::changed);
    let version_after = if options.bump && deps_changed {
        manifest
            .version
            .bump_patch()
            .with_context(|| format!("bump version of {}", doc.path().display()))?
    } else {
        manifest.version
    };
    if version_after != manifest.version {
        tracing::info!(from = %manifest.version, to = %version_after, "version bump");
    }

    Ok(PinReport {
        manifest_path: doc.path().to_path_buf(),
        name: manifest.name.clone(),
        factorio_version: manifest.factorio_version.clone(),
        version_before: manifest.version,
        version_after,
        dependencies,
        written: false,
    })
}

/// Apply a report's rewritten fields to the document.
pub fn apply_report(doc: &mut ManifestDocument, report: &PinReport) {
    doc.set_dependencies(report.updated_dependencies());
    if report.version_bumped() {
        doc.set_version(report.version_after);
    }
}

fn pin_dependency(
    raw: &str,
    manifest: &Manifest,
    feed: &dyn VersionFeed,
    options: &PinOptions,
) -> DependencyReport {
    let dependency = match Dependency::parse(raw) {
        Ok(dependency) => dependency,
        Err(err) => {
            tracing::warn!(dependency = raw, "skip: {err:#}");
            return DependencyReport::kept(
                raw,
                raw,
                Outcome::Skipped {
                    reason: SkipReason::Unparsable,
                },
            );
        }
    };
    let name = dependency.name.as_str();

    if options.is_protected(name, &manifest.name) {
        tracing::debug!(name, "skip base/self/sibling pack");
        return DependencyReport::kept(
            name,
            raw,
            Outcome::Skipped {
                reason: SkipReason::Protected,
            },
        );
    }
    if let Some(reason) = pinned_skip_reason(&dependency, options) {
        tracing::debug!(name, ?reason, "skip pinned dependency");
        return DependencyReport::kept(name, raw, Outcome::Skipped { reason });
    }

    let releases = match feed.releases(name) {
        Ok(FeedLookup::Found(releases)) => releases,
        Ok(FeedLookup::NotFound) => {
            tracing::warn!(name, "no releases on the feed");
            return DependencyReport::kept(name, raw, Outcome::Unresolved);
        }
        Err(err) => {
            tracing::warn!(name, "feed lookup failed: {err:#}");
            return DependencyReport::kept(
                name,
                raw,
                Outcome::Failed {
                    error: format!("{err:#}"),
                },
            );
        }
    };
    let Some(latest) = select_latest(&releases, Some(manifest.factorio_version.as_str())) else {
        return DependencyReport::kept(name, raw, Outcome::Unresolved);
    };

    let constraint = next_constraint(dependency.constraint, latest, options);
    let updated = if Some(constraint) == dependency.constraint {
        raw.to_string()
    } else {
        dependency.with_constraint(constraint).to_string()
    };
    let outcome = if updated != raw {
        tracing::info!(name, from = raw, to = %updated, "pinned");
        Outcome::Updated { latest }
    } else {
        tracing::debug!(name, %latest, "already current");
        Outcome::Current { latest }
    };
    DependencyReport {
        name: name.to_string(),
        original: raw.to_string(),
        updated,
        outcome,
    }
}

/// Existing pins are left alone unless a flag asks to touch them.
fn pinned_skip_reason(dependency: &Dependency, options: &PinOptions) -> Option<SkipReason> {
    let constraint = dependency.constraint?;
    if options.force || options.mode == PinMode::Eq {
        return None;
    }
    if !options.upgrade {
        return Some(SkipReason::AlreadyPinned);
    }
    if !constraint.op.supports_upgrade() {
        return Some(SkipReason::UnsupportedComparator);
    }
    None
}

fn next_constraint(
    existing: Option<Constraint>,
    latest: ModVersion,
    options: &PinOptions,
) -> Constraint {
    let target = Constraint {
        op: options.mode.comparator(),
        version: latest,
    };
    match existing {
        None => target,
        Some(_) if options.force => target,
        Some(current) if options.mode == PinMode::Eq && current.version != latest => target,
        Some(current) if options.upgrade && current.op.supports_upgrade() => Constraint {
            op: current.op,
            version: latest,
        },
        Some(current) => current,
    }
}

#[cfg(test)]
#[path = "pinner_tests.rs"]
mod tests;
