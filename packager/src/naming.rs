//! Bundle identities: `group:{mod_id}-{suffix}:version`.
//!
//! Identities for every artefact of a run are planned up front so that a
//! collision is reported before any compile step runs.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use trellis::config::BuildSettings;
use trellis_common::{Coordinate, CoordinateError, Platform};

/// Errors raised while planning identities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// The project settings do not form a valid coordinate.
    #[error("cannot name the {kind} artefact")]
    InvalidCoordinate {
        /// Artefact being named.
        kind: BundleKind,
        /// Coordinate failure.
        #[source]
        source: CoordinateError,
    },

    /// Two artefacts of one run would share a coordinate.
    #[error("the {first} and {second} artefacts would both publish as {coordinate}")]
    Duplicate {
        /// The shared coordinate.
        coordinate: Coordinate,
        /// First artefact.
        first: BundleKind,
        /// Second artefact.
        second: BundleKind,
    },
}

/// Which artefact an identity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BundleKind {
    /// The shared module's named jar.
    Module(String),
    /// A platform bundle.
    Variant(Platform),
}

impl BundleKind {
    /// Artifact-id suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        match self {
            Self::Module(name) => name,
            Self::Variant(platform) => platform.as_str(),
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(name) => write!(f, "{name} module"),
            Self::Variant(platform) => write!(f, "{platform}"),
        }
    }
}

/// The published coordinate of one artefact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleIdentity {
    /// Artefact the identity belongs to.
    pub kind: BundleKind,
    /// Maven coordinate.
    pub coordinate: Coordinate,
}

impl BundleIdentity {
    /// `group:{mod_id}-{suffix}:version` for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::InvalidCoordinate`] when the project group or
    /// version cannot appear in a coordinate.
    pub fn new(settings: &BuildSettings, kind: BundleKind) -> Result<Self, NamingError> {
        let project = &settings.project;
        let artifact = format!("{}-{}", project.mod_id, kind.suffix());
        match Coordinate::new(&project.group, artifact, &project.version) {
            Ok(coordinate) => Ok(Self { kind, coordinate }),
            Err(source) => Err(NamingError::InvalidCoordinate { kind, source }),
        }
    }

    /// Jar file name, `{artifact}-{version}.jar`.
    #[must_use]
    pub fn jar_name(&self) -> String {
        format!("{}.jar", self.coordinate.file_stem())
    }
}

/// Identities of every artefact a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPlan {
    /// The module's named jar.
    pub module: BundleIdentity,
    /// One identity per selected variant, in configuration order.
    pub variants: Vec<BundleIdentity>,
}

impl IdentityPlan {
    /// The module identity followed by the variant identities.
    pub fn iter(&self) -> impl Iterator<Item = &BundleIdentity> {
        std::iter::once(&self.module).chain(&self.variants)
    }
}

/// Plan the module artefact and every selected variant.
///
/// # Errors
///
/// Returns [`NamingError`] when a coordinate is invalid or two artefacts
/// collide.
pub fn plan_identities(settings: &BuildSettings) -> Result<IdentityPlan, NamingError> {
    let module = BundleIdentity::new(settings, BundleKind::Module(settings.module.name.clone()))?;
    let variants = settings
        .variants
        .iter()
        .map(|variant| BundleIdentity::new(settings, BundleKind::Variant(variant.platform)))
        .collect::<Result<Vec<_>, _>>()?;
    let plan = IdentityPlan { module, variants };
    let all: Vec<BundleIdentity> = plan.iter().cloned().collect();
    ensure_unique(&all)?;
    Ok(plan)
}

/// Reject identity lists in which two artefacts share a coordinate.
///
/// # Errors
///
/// Returns [`NamingError::Duplicate`] for the first collision.
pub fn ensure_unique(identities: &[BundleIdentity]) -> Result<(), NamingError> {
    let mut seen: HashMap<&Coordinate, &BundleKind> = HashMap::new();
    for identity in identities {
        if let Some(first) = seen.insert(&identity.coordinate, &identity.kind) {
            return Err(NamingError::Duplicate {
                coordinate: identity.coordinate.clone(),
                first: first.clone(),
                second: identity.kind.clone(),
            });
        }
    }
    Ok(())
}
