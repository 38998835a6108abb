//! CLI argument parsing for the pinner.
//!
//! One invocation processes one manifest. Ordering across packs belongs to
//! whatever drives the tool.
use crate::config::Overrides;
use crate::pinner::PinMode;
use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "modpin",
    version,
    about = "Pin mod-pack dependency versions against the mod portal",
    after_help = "Examples:\n  modpin qol-4-editor/info.json                 Dry run for one pack\n  modpin --path qol-4-editor --write            Write changes in place\n  modpin qol-1-lite --write --mode eq --force   Pin exact versions, overriding existing pins\n  modpin qol-2-plus --write --bump              Bump the pack's patch version on change",
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Path to an info.json file (or a pack directory containing it)
    #[arg(value_name = "PATH", required_unless_present = "path_flag")]
    pub path: Option<PathBuf>,

    /// Same as the positional PATH
    #[arg(
        long = "path",
        id = "path_flag",
        value_name = "PATH",
        conflicts_with = "path"
    )]
    pub path_flag: Option<PathBuf>,

    /// Write changes in place (default: dry run)
    #[arg(long)]
    pub write: bool,

    /// Comparator for new pins: 'add' => '>= latest', 'eq' => '== latest'
    #[arg(long, value_enum, default_value = "add")]
    pub mode: PinMode,

    /// Override existing comparators
    #[arg(long)]
    pub force: bool,

    /// Refresh versions of dependencies already pinned with >=, == or =
    #[arg(long)]
    pub upgrade: bool,

    /// Increment the pack's patch version when any dependency changed
    #[arg(long)]
    pub bump: bool,

    /// Emit the change report as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit debug logging on stderr
    #[arg(long)]
    pub verbose: bool,

    /// Base URL of the release feed
    #[arg(long, value_name = "URL")]
    pub feed_url: Option<String>,

    /// Per-request feed timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Additional sibling pack name that is never pinned (repeatable)
    #[arg(long = "pack-name", value_name = "NAME")]
    pub pack_names: Vec<String>,

    /// Config file (default: <config dir>/modpin/config.json when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl RootArgs {
    pub fn manifest_arg(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .or(self.path_flag.as_deref())
            .ok_or_else(|| anyhow!("a manifest path is required"))
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            feed_url: self.feed_url.clone(),
            timeout_secs: self.timeout_secs,
            pack_names: self.pack_names.clone(),
        }
    }
}
