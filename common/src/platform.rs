//! Target mod-loader platforms and their packaging conventions.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a platform name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown platform \"{0}\"; expected one of: fabric, forge, neoforge")]
pub struct UnknownPlatform(pub String);

/// On-disk format a platform expects for access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFormat {
    /// Fabric-style access widener.
    Widener,
    /// Forge-style access transformer configuration.
    Transformer,
}

/// A loader-specific build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Fabric Loader.
    Fabric,
    /// Minecraft Forge.
    Forge,
    /// NeoForge.
    #[serde(alias = "neo-forge")]
    NeoForge,
}

impl Platform {
    /// Every supported platform, in build order.
    pub const ALL: [Self; 3] = [Self::Fabric, Self::Forge, Self::NeoForge];

    /// Lowercase identifier used in artefact names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fabric => "fabric",
            Self::Forge => "forge",
            Self::NeoForge => "neoforge",
        }
    }

    /// Access-rule format the platform's runtime reads.
    #[must_use]
    pub const fn access_format(self) -> AccessFormat {
        match self {
            Self::Fabric => AccessFormat::Widener,
            Self::Forge | Self::NeoForge => AccessFormat::Transformer,
        }
    }

    /// Jar entry the access-rule file is written to.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_common::Platform;
    ///
    /// assert_eq!(
    ///     Platform::Fabric.access_file_entry("fallingtrees"),
    ///     "fallingtrees.accesswidener"
    /// );
    /// assert_eq!(
    ///     Platform::Forge.access_file_entry("fallingtrees"),
    ///     "META-INF/accesstransformer.cfg"
    /// );
    /// ```
    #[must_use]
    pub fn access_file_entry(self, mod_id: &str) -> String {
        match self.access_format() {
            AccessFormat::Widener => widener_entry(mod_id),
            AccessFormat::Transformer => TRANSFORMER_ENTRY.to_owned(),
        }
    }
}

/// Jar entry of Forge-style access transformers.
pub const TRANSFORMER_ENTRY: &str = "META-INF/accesstransformer.cfg";

/// Jar entry of the canonical access widener for a mod.
#[must_use]
pub fn widener_entry(mod_id: &str) -> String {
    format!("{mod_id}.accesswidener")
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fabric" => Ok(Self::Fabric),
            "forge" => Ok(Self::Forge),
            "neoforge" | "neo-forge" => Ok(Self::NeoForge),
            _ => Err(UnknownPlatform(value.to_owned())),
        }
    }
}
