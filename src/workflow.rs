use crate::cli::RootArgs;
use crate::config;
use crate::feed::PortalFeed;
use crate::manifest::{resolve_manifest_path, ManifestDocument};
use crate::output;
use crate::pinner::{apply_report, pin_manifest, PinOptions};
use anyhow::{anyhow, Result};
use std::env;

/// Pin one manifest: resolve, report, and persist when `--write` is set.
///
/// Feed failures do not stop the other dependencies; they are reported and
/// then turned into a non-zero exit once everything else is done.
pub fn run_pin(args: RootArgs) -> Result<()> {
    let manifest_path = resolve_manifest_path(args.manifest_arg()?)?;
    let config_file = config::load_config_file(args.config.as_deref())?;
    let settings = config::resolve_settings(&args.overrides(), config_file.as_ref(), |key| {
        env::var(key).ok()
    })?;
    tracing::debug!(
        feed_url = %settings.feed_url,
        timeout_secs = settings.timeout.as_secs(),
        "resolved settings"
    );

    let mut doc = ManifestDocument::load(&manifest_path)?;
    let feed = PortalFeed::new(&settings.feed_url, settings.timeout);
    let options = PinOptions {
        mode: args.mode,
        force: args.force,
        upgrade: args.upgrade,
        bump: args.bump,
        protected: settings.protected,
    };
    let mut report = pin_manifest(&doc, &feed, &options)?;

    if args.write && report.has_changes() {
        apply_report(&mut doc, &report);
        doc.write_atomic()?;
        report.written = true;
        tracing::info!(path = %manifest_path.display(), "wrote manifest");
    }

    if args.json {
        print!("{}", output::render_json(&report)?);
    } else {
        print!("{}", output::render_text(&report));
    }

    let failed = report
        .failures()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>();
    if !failed.is_empty() {
        return Err(anyhow!(
            "feed lookup failed for {} dependenc{}: {}",
            failed.len(),
            if failed.len() == 1 { "y" } else { "ies" },
            failed.join(", ")
        ));
    }
    Ok(())
}
