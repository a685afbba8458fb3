//! `build-report.json`, the machine-readable summary of a run.

use crate::assembler::AssemblyStats;
use crate::bundle::ArtifactBundle;
use crate::checksum::Sha256Digest;
use crate::error::{PackagerError, VariantError};
use crate::publish::{Channel, PublishError, PublishedBundle};
use crate::remap::RemapSummary;
use camino::Utf8Path;
use serde::Serialize;
use trellis::config::BuildSettings;

/// File name of the report inside the output directory.
pub const REPORT_FILE: &str = "build-report.json";

/// One written bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleRecord {
    /// What the bundle was built from, e.g. `common module` or `fabric`.
    pub kind: String,
    /// `group:artifact:version`.
    pub coordinate: String,
    /// Jar path.
    pub jar: String,
    /// Jar digest.
    pub sha256: Sha256Digest,
    /// POM path.
    pub pom: String,
    /// Dependencies listed in the POM, as `coordinate (scope)`.
    pub runtime_dependencies: Vec<String>,
    /// Remap statistics for remapped bundles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remap: Option<RemapSummary>,
    /// Layering statistics for variant bundles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<AssemblyStats>,
}

impl From<&ArtifactBundle> for BundleRecord {
    fn from(bundle: &ArtifactBundle) -> Self {
        Self {
            kind: bundle.identity.kind.to_string(),
            coordinate: bundle.identity.coordinate.to_string(),
            jar: bundle.jar.to_string(),
            sha256: bundle.sha256.clone(),
            pom: bundle.pom.to_string(),
            runtime_dependencies: bundle
                .runtime_dependencies
                .iter()
                .map(|(coordinate, scope)| format!("{coordinate} ({scope})"))
                .collect(),
            remap: bundle.remap.clone(),
            assembly: bundle.assembly.clone(),
        }
    }
}

/// One failed variant or upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Platform or coordinate that failed.
    pub subject: String,
    /// Stage in which it failed.
    pub stage: String,
    /// Rendered error.
    pub message: String,
}

impl From<&VariantError> for FailureRecord {
    fn from(err: &VariantError) -> Self {
        Self {
            subject: err.platform.to_string(),
            stage: err.source.stage().to_owned(),
            message: err.source.to_string(),
        }
    }
}

impl FailureRecord {
    /// A failed upload of `coordinate`.
    #[must_use]
    pub fn publish(coordinate: impl Into<String>, err: &PublishError) -> Self {
        Self {
            subject: coordinate.into(),
            stage: "publish".to_owned(),
            message: err.to_string(),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Mod identifier.
    pub mod_id: String,
    /// Resolved version.
    pub version: String,
    /// Publishing channel, when the run published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    /// Whether uploads were only planned.
    pub dry_run: bool,
    /// Written bundles, module first.
    pub bundles: Vec<BundleRecord>,
    /// Failed variants.
    pub failures: Vec<FailureRecord>,
    /// Published bundles.
    pub published: Vec<PublishedBundle>,
    /// Failed uploads.
    pub publish_failures: Vec<FailureRecord>,
}

impl BuildReport {
    /// An empty report for `settings`.
    #[must_use]
    pub fn new(settings: &BuildSettings) -> Self {
        Self {
            mod_id: settings.project.mod_id.clone(),
            version: settings.project.version.clone(),
            channel: None,
            dry_run: false,
            bundles: Vec::new(),
            failures: Vec::new(),
            published: Vec::new(),
            publish_failures: Vec::new(),
        }
    }

    /// Whether every variant built and every upload succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.publish_failures.is_empty()
    }

    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Report`] when serialisation or the write
    /// fails.
    pub fn write(&self, path: &Utf8Path) -> Result<(), PackagerError> {
        let failure = |reason: String| PackagerError::Report {
            path: path.to_owned(),
            reason,
        };
        let mut json = serde_json::to_string_pretty(self).map_err(|err| failure(err.to_string()))?;
        json.push('\n');
        std::fs::write(path, json).map_err(|err| failure(err.to_string()))
    }
}
