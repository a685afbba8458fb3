//! Errors raised while loading and resolving `trellis.toml`.

use camino::Utf8PathBuf;
use thiserror::Error;
use trellis_common::Platform;

/// Errors that can occur while turning a configuration file into
/// [`BuildSettings`](super::BuildSettings).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {reason}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("invalid configuration in {path}: {reason}")]
    Parse {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Message from the TOML deserialiser.
        reason: String,
    },

    /// A `${name}` placeholder names a property that is not defined.
    #[error("{field} references undefined property \"{name}\"; define it under [properties] or pass -P {name}=<value>")]
    UndefinedProperty {
        /// The missing property.
        name: String,
        /// The configuration field containing the placeholder.
        field: String,
    },

    /// A `${` has no closing brace.
    #[error("{field} has an unterminated placeholder in \"{value}\"")]
    UnterminatedPlaceholder {
        /// The configuration field.
        field: String,
        /// The raw value.
        value: String,
    },

    /// A `-P` override is not of the form `name=value`.
    #[error("invalid property override \"{value}\"; expected name=value")]
    InvalidOverride {
        /// The rejected override.
        value: String,
    },

    /// A coordinate string could not be parsed.
    #[error("{field}: {reason}")]
    InvalidCoordinate {
        /// The configuration field.
        field: String,
        /// Why the coordinate was rejected.
        reason: String,
    },

    /// The mod identifier is not a lowercase identifier.
    #[error("invalid mod_id \"{value}\"; use lowercase letters, digits, '_' or '-'")]
    InvalidModId {
        /// The rejected identifier.
        value: String,
    },

    /// No `[[variant]]` tables were configured.
    #[error("no variants configured; add at least one [[variant]] table")]
    NoVariants,

    /// Two variants target the same platform.
    #[error("platform {platform} is configured more than once")]
    DuplicatePlatform {
        /// The repeated platform.
        platform: Platform,
    },

    /// A variant refers to a mapping table that is not defined.
    #[error("variant {platform} references unknown mappings \"{name}\"")]
    UnknownMappings {
        /// The variant's platform.
        platform: Platform,
        /// The undefined mapping table name.
        name: String,
    },

    /// A platform requested on the command line has no variant.
    #[error("no variant configured for platform {platform}")]
    NoSuchVariant {
        /// The requested platform.
        platform: Platform,
    },

    /// The home directory could not be determined.
    #[error("cannot determine the home directory for the default repository")]
    HomeDirectoryUnavailable,

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },
}

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
