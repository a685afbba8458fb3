//! Error types for the Trellis packager.
//!
//! Each stage owns a `thiserror` enum. Failures in the shared stages (module
//! compilation, canonical rule loading, identity planning) abort the run and
//! surface as [`PackagerError`]. Failures inside a variant are wrapped in a
//! [`VariantError`] tagged with the platform and do not affect the other
//! variants.

use crate::classfile::ClassFileError;
use crate::compiler::CompileError;
use crate::jar::JarError;
use crate::naming::NamingError;
use crate::remap::RemapError;
use crate::resolver::DependencyResolutionError;
use crate::rules::AccessRuleTranslationError;
use camino::Utf8PathBuf;
use thiserror::Error;
use trellis::config::ConfigError;
use trellis_common::Platform;

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two artefacts would share a coordinate, or one is unnameable.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// The shared module failed to compile.
    #[error("module build failed")]
    Compile(#[from] CompileError),

    /// The canonical access rules are unusable.
    #[error("canonical access rules are unusable")]
    Rules(#[from] AccessRuleTranslationError),

    /// A variant's mappings are unusable.
    #[error(transparent)]
    Remap(#[from] RemapError),

    /// The module's named jar could not be written.
    #[error("failed to write the module jar")]
    ModuleBundle(#[source] StageError),

    /// The build report could not be written.
    #[error("failed to write build report {path}: {reason}")]
    Report {
        /// Report path.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Publishing was requested without a `[publish]` table.
    #[error("--publish requires a [publish] table in the configuration")]
    PublishNotConfigured,

    /// The rule listing asked for a platform that is not configured.
    #[error("no {platform} variant is configured")]
    UnknownVariant {
        /// Requested platform.
        platform: Platform,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for whole-run operations.
pub type Result<T> = std::result::Result<T, PackagerError>;

/// The stage in which a variant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// Platform classes failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Dependencies could not be merged, located or bundled.
    #[error(transparent)]
    Dependencies(#[from] DependencyResolutionError),

    /// Access rules could not be validated or translated.
    #[error(transparent)]
    Rules(#[from] AccessRuleTranslationError),

    /// The remap pass failed.
    #[error(transparent)]
    Remap(#[from] RemapError),

    /// A class visible to the variant could not be indexed.
    #[error("class {entry} is malformed: {source}")]
    Index {
        /// Jar entry of the class.
        entry: String,
        /// Parser failure.
        source: ClassFileError,
    },

    /// The bundle could not be written or hashed.
    #[error("failed to write bundle: {0}")]
    Write(#[from] JarError),

    /// The bundle could not be hashed after writing.
    #[error("failed to hash {path}: {reason}")]
    Checksum {
        /// Bundle path.
        path: Utf8PathBuf,
        /// I/O failure.
        reason: String,
    },

    /// The bundle's POM could not be rendered.
    #[error("failed to render POM: {reason}")]
    Pom {
        /// Serialiser failure.
        reason: String,
    },
}

impl StageError {
    /// Short name of the failed stage, as recorded in the build report.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Compile(_) => "compile",
            Self::Dependencies(_) => "dependencies",
            Self::Rules(_) => "access-rules",
            Self::Remap(_) => "remap",
            Self::Index { .. } => "index",
            Self::Write(_) | Self::Checksum { .. } | Self::Pom { .. } => "write",
        }
    }
}

/// A variant failure tagged with its platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{platform} variant failed: {source}")]
pub struct VariantError {
    /// Platform of the failed variant.
    pub platform: Platform,
    /// What went wrong.
    #[source]
    pub source: StageError,
}

impl VariantError {
    /// Tag `source` with `platform`.
    pub fn new(platform: Platform, source: impl Into<StageError>) -> Self {
        Self {
            platform,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_errors_name_the_platform_and_cause() {
        let err = VariantError::new(
            Platform::NeoForge,
            AccessRuleTranslationError::UnknownClass {
                rule: "accessible\tclass\tnet/minecraft/Missing".to_owned(),
                class: "net/minecraft/Missing".to_owned(),
            },
        );
        let text = err.to_string();
        assert!(text.starts_with("neoforge variant failed"));
        assert!(text.contains("net/minecraft/Missing"));
    }

    #[test]
    fn publish_without_configuration_explains_the_fix() {
        assert!(PackagerError::PublishNotConfigured
            .to_string()
            .contains("[publish]"));
    }
}
