//! CLI argument definitions for the Trellis packager.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::pipeline::BuildOptions;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use trellis::config::ConfigOverrides;
use trellis_common::Platform;

/// Build and publish multi-platform Minecraft mod artefacts.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build and publish multi-platform Minecraft mod artefacts.\n\n",
    "Trellis compiles a shared module once, then builds one bundle per ",
    "platform variant (Fabric, Forge, NeoForge) in parallel: platform classes ",
    "are layered over the module, embedded libraries are merged in, the jar ",
    "is remapped to the platform's namespace and the canonical access widener ",
    "is translated into the platform's access rule format.\n\n",
    "A failing variant does not stop the others; the run exits with status 2 ",
    "when any variant or upload failed, after writing build-report.json.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build every variant:\n",
    "    $ trellis\n\n",
    "  Build Fabric only, overriding the version property:\n",
    "    $ trellis --platform fabric -P mod_version=0.13.1\n\n",
    "  Publish a release (credentials from NEXUS_USERNAME/NEXUS_PASSWORD):\n",
    "    $ trellis --publish --release\n\n",
    "  Preview the NeoForge access transformer:\n",
    "    $ trellis rules --platform neoforge",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Build arguments (used when no subcommand is given).
    #[command(flatten)]
    pub build: BuildArgs,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build (and optionally publish) bundles; the default.
    Build(BuildArgs),

    /// Print the access rule file a variant would carry.
    Rules(RulesArgs),
}

/// Arguments for the build command.
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "trellis.toml")]
    pub config: Utf8PathBuf,

    /// Build only this platform (can be repeated).
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Vec<Platform>,

    /// Publish to the release repository instead of the snapshot one.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    pub release: Option<bool>,

    /// Upload the bundles after building them.
    #[arg(long)]
    pub publish: bool,

    /// Plan uploads without sending them.
    #[arg(long, requires = "publish")]
    pub dry_run: bool,

    /// Local Maven repository holding dependency jars.
    #[arg(long, value_name = "DIR")]
    pub repository: Option<Utf8PathBuf>,

    /// Output directory for bundles and the build report.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<Utf8PathBuf>,

    /// Maximum number of variants built at once.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Override a configuration property (can be repeated).
    #[arg(short = 'P', value_name = "NAME=VALUE")]
    pub property: Vec<String>,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the rules command.
#[derive(Parser, Debug, Clone)]
pub struct RulesArgs {
    /// Configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "trellis.toml")]
    pub config: Utf8PathBuf,

    /// Variant whose rules are printed.
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Platform,

    /// Override a configuration property (can be repeated).
    #[arg(short = 'P', value_name = "NAME=VALUE")]
    pub property: Vec<String>,
}

impl BuildArgs {
    /// Configuration overrides carried by the flags.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            properties: self.property.clone(),
            release: self.release,
            platforms: self.platform.clone(),
            repository: self.repository.clone(),
            output: self.output.clone(),
            jobs: self.jobs,
        }
    }

    /// Run-level switches carried by the flags.
    #[must_use]
    pub const fn options(&self) -> BuildOptions {
        BuildOptions {
            publish: self.publish,
            dry_run: self.dry_run,
        }
    }
}

impl Default for BuildArgs {
    /// The arguments of a bare `trellis` invocation.
    fn default() -> Self {
        Self {
            config: Utf8PathBuf::from("trellis.toml"),
            platform: Vec::new(),
            release: None,
            publish: false,
            dry_run: false,
            repository: None,
            output: None,
            jobs: None,
            property: Vec::new(),
            quiet: false,
        }
    }
}

impl RulesArgs {
    /// Configuration overrides carried by the flags.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            properties: self.property.clone(),
            ..ConfigOverrides::default()
        }
    }
}

impl Cli {
    /// Returns the effective build arguments.
    ///
    /// If a `Build` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened build arguments.
    #[must_use]
    pub fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Some(Command::Build(args)) => args,
            Some(Command::Rules(_)) | None => &self.build,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
