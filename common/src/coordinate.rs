//! Maven coordinates for modules, dependencies, and published bundles.
//!
//! A coordinate is written `group:artifact:version[:classifier]` and maps onto
//! the standard Maven repository layout.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing a coordinate string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// The string does not have three or four colon-separated parts.
    #[error("invalid coordinate \"{value}\": expected group:artifact:version[:classifier]")]
    Malformed {
        /// The rejected string.
        value: String,
    },

    /// One of the parts is empty or contains a path separator.
    #[error("invalid coordinate \"{value}\": {reason}")]
    InvalidPart {
        /// The rejected string.
        value: String,
        /// Which part failed and why.
        reason: String,
    },
}

/// A `group:artifact:version[:classifier]` coordinate.
///
/// # Examples
///
/// ```
/// use trellis_common::Coordinate;
///
/// let coordinate: Coordinate = "dev.architectury:architectury-fabric:13.0.8"
///     .parse()
///     .expect("valid coordinate");
/// assert_eq!(coordinate.artifact(), "architectury-fabric");
/// assert_eq!(
///     coordinate.repository_path(),
///     "dev/architectury/architectury-fabric/13.0.8/architectury-fabric-13.0.8.jar"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    group: String,
    artifact: String,
    version: String,
    classifier: Option<String>,
}

/// The identity of a library regardless of version.
///
/// Two declarations with the same key refer to the same library and must be
/// reconciled before assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryKey {
    group: String,
    artifact: String,
    classifier: Option<String>,
}

impl fmt::Display for LibraryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

impl Coordinate {
    /// Build a coordinate from validated parts.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidPart`] when any part is empty or
    /// contains `/`, `\` or `:`.
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, CoordinateError> {
        let coordinate = Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            classifier: None,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Return a copy of this coordinate with the given classifier.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidPart`] for an empty or malformed
    /// classifier.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Result<Self, CoordinateError> {
        self.classifier = Some(classifier.into());
        self.validate()?;
        Ok(self)
    }

    /// The group identifier, e.g. `me.pandamods`.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The artefact identifier.
    #[must_use]
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// The version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The optional classifier.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// The version-independent library key.
    #[must_use]
    pub fn key(&self) -> LibraryKey {
        LibraryKey {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
            classifier: self.classifier.clone(),
        }
    }

    /// Base file name without extension: `artifact-version[-classifier]`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!("{}-{}-{classifier}", self.artifact, self.version),
            None => format!("{}-{}", self.artifact, self.version),
        }
    }

    /// Directory of this version inside a Maven repository.
    #[must_use]
    pub fn repository_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version
        )
    }

    /// Relative path of the jar inside a Maven repository.
    #[must_use]
    pub fn repository_path(&self) -> String {
        self.repository_file("jar")
    }

    /// Relative path of a file with the given extension inside a Maven
    /// repository.
    #[must_use]
    pub fn repository_file(&self, extension: &str) -> String {
        format!("{}/{}.{extension}", self.repository_dir(), self.file_stem())
    }

    fn validate(&self) -> Result<(), CoordinateError> {
        let parts = [
            ("group", Some(self.group.as_str())),
            ("artifact", Some(self.artifact.as_str())),
            ("version", Some(self.version.as_str())),
            ("classifier", self.classifier.as_deref()),
        ];
        for (label, value) in parts {
            let Some(value) = value else { continue };
            if value.trim().is_empty() {
                return Err(self.invalid(format!("{label} is empty")));
            }
            if value.contains(['/', '\\', ':']) || value.chars().any(char::is_whitespace) {
                return Err(self.invalid(format!("{label} \"{value}\" contains a separator")));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> CoordinateError {
        CoordinateError::InvalidPart {
            value: self.to_string(),
            reason,
        }
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.trim().split(':').collect();
        match parts.as_slice() {
            [group, artifact, version] => Self::new(*group, *artifact, *version),
            [group, artifact, version, classifier] => {
                Self::new(*group, *artifact, *version)?.with_classifier(*classifier)
            }
            _ => Err(CoordinateError::Malformed {
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
