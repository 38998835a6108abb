//! Human-readable and JSON renderings of a pin report.
use crate::pinner::{Outcome, PinReport};
use anyhow::{Context, Result};

pub const NO_CHANGES: &str = "No changes (already pinned or no compatible releases found).";
pub const DRY_RUN_HINT: &str = "Dry run only. Re-run with --write to apply.";

pub fn render_text(report: &PinReport) -> String {
    let path = report.manifest_path.display();
    let mut out = String::new();
    out.push_str(&format!(
        "{path}: {} dependencies (factorio_version={})\n",
        report.dependencies.len(),
        report.factorio_version
    ));
    for entry in report.changes() {
        out.push_str(&format!(
            "{path}: {}  ->  {}\n",
            entry.original, entry.updated
        ));
    }
    for entry in report.unresolved() {
        out.push_str(&format!(
            "{path}: unresolved: {} (no releases on the feed)\n",
            entry.name
        ));
    }
    for entry in &report.dependencies {
        if let Outcome::Failed { error } = &entry.outcome {
            out.push_str(&format!("{path}: failed: {}: {error}\n", entry.name));
        }
    }
    if report.version_bumped() {
        out.push_str(&format!(
            "{path}: version bump {} -> {}\n",
            report.version_before, report.version_after
        ));
    }

    if !report.has_changes() {
        out.push_str(NO_CHANGES);
        out.push('\n');
    } else if report.written {
        out.push_str(&format!("Wrote {path}.\n"));
    } else {
        out.push('\n');
        out.push_str(DRY_RUN_HINT);
        out.push('\n');
    }
    out
}

pub fn render_json(report: &PinReport) -> Result<String> {
    let mut text = serde_json::to_string_pretty(report).context("serialize pin report")?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinner::{DependencyReport, SkipReason};
    use crate::version::ModVersion;
    use std::path::PathBuf;

    fn entry(original: &str, updated: &str, outcome: Outcome) -> DependencyReport {
        DependencyReport {
            name: original.split(' ').next().unwrap_or_default().to_string(),
            original: original.to_string(),
            updated: updated.to_string(),
            outcome,
        }
    }

    fn report(dependencies: Vec<DependencyReport>, bumped: bool) -> PinReport {
        let before = ModVersion::new(1, 0, 0);
        PinReport {
            manifest_path: PathBuf::from("qol-1-lite/info.json"),
            name: "zz-qol-lite".to_string(),
            factorio_version: "2.0".to_string(),
            version_before: before,
            version_after: if bumped {
                before.bump_patch().expect("bump")
            } else {
                before
            },
            dependencies,
            written: false,
        }
    }

    #[test]
    fn dry_run_lists_changes_and_hint() {
        let latest = ModVersion::new(0, 16, 3);
        let report = report(
            vec![
                entry("flib", "flib >= 0.16.3", Outcome::Updated { latest }),
                entry("ghost-mod", "ghost-mod", Outcome::Unresolved),
                entry(
                    "base",
                    "base",
                    Outcome::Skipped {
                        reason: SkipReason::Protected,
                    },
                ),
            ],
            true,
        );

        let text = render_text(&report);

        assert_eq!(
            text,
            "qol-1-lite/info.json: 3 dependencies (factorio_version=2.0)\n\
             qol-1-lite/info.json: flib  ->  flib >= 0.16.3\n\
             qol-1-lite/info.json: unresolved: ghost-mod (no releases on the feed)\n\
             qol-1-lite/info.json: version bump 1.0.0 -> 1.0.1\n\
             \n\
             Dry run only. Re-run with --write to apply.\n"
        );
    }

    #[test]
    fn reports_failures_and_no_changes() {
        let report = report(
            vec![entry(
                "flaky-mod",
                "flaky-mod",
                Outcome::Failed {
                    error: "timed out".to_string(),
                },
            )],
            false,
        );

        let text = render_text(&report);

        assert!(text.contains("failed: flaky-mod: timed out"));
        assert!(text.ends_with(&format!("{NO_CHANGES}\n")));
    }

    #[test]
    fn written_report_names_the_file() {
        let latest = ModVersion::new(0, 16, 3);
        let mut report = report(
            vec![entry("flib", "flib >= 0.16.3", Outcome::Updated { latest })],
            false,
        );
        report.written = true;

        assert!(render_text(&report).ends_with("Wrote qol-1-lite/info.json.\n"));
    }

    #[test]
    fn json_rendering_is_parseable() {
        let report = report(Vec::new(), false);
        let text = render_json(&report).expect("render");
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(value["name"], "zz-qol-lite");
        assert_eq!(value["written"], false);
    }
}
