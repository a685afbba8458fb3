//! Finished artefacts handed from the build stages to the publisher.

use crate::assembler::AssemblyStats;
use crate::checksum::{Sha256Digest, compute_sha256};
use crate::error::StageError;
use crate::jar::JarContents;
use crate::naming::BundleIdentity;
use crate::pom::render_pom;
use crate::remap::RemapSummary;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use trellis::config::ProjectSettings;
use trellis_common::{Coordinate, DependencyScope};

/// One jar ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBundle {
    /// Published identity.
    pub identity: BundleIdentity,
    /// The jar on disk.
    pub jar: Utf8PathBuf,
    /// SHA-256 of the jar.
    pub sha256: Sha256Digest,
    /// POM next to the jar.
    pub pom: Utf8PathBuf,
    /// Dependencies consumers must provide, as listed in the POM.
    pub runtime_dependencies: Vec<(Coordinate, DependencyScope)>,
    /// Remap statistics; `None` for unremapped artefacts.
    pub remap: Option<RemapSummary>,
    /// Assembly statistics; `None` for the module's named jar.
    pub assembly: Option<AssemblyStats>,
}

/// What [`write_bundle`] persists.
#[derive(Debug)]
pub struct BundleParts<'a> {
    /// Published identity.
    pub identity: BundleIdentity,
    /// Jar entries.
    pub contents: &'a JarContents,
    /// Dependencies for the POM.
    pub runtime_dependencies: Vec<(Coordinate, DependencyScope)>,
    /// Remap statistics.
    pub remap: Option<RemapSummary>,
    /// Assembly statistics.
    pub assembly: Option<AssemblyStats>,
}

/// Write the jar and POM of `parts` into `output_dir`.
///
/// The jar is staged beside its destination and renamed into place, so a
/// failure never leaves a partial jar under the final name.
///
/// # Errors
///
/// Returns [`StageError`] when either file cannot be written or the jar
/// cannot be hashed.
pub fn write_bundle(
    project: &ProjectSettings,
    output_dir: &Utf8Path,
    parts: BundleParts<'_>,
) -> Result<ArtifactBundle, StageError> {
    let stem = parts.identity.coordinate.file_stem();
    let jar = output_dir.join(format!("{stem}.jar"));
    let pom = output_dir.join(format!("{stem}.pom"));

    parts.contents.write(&jar)?;
    let sha256 = compute_sha256(&jar).map_err(|err| StageError::Checksum {
        path: jar.clone(),
        reason: err.to_string(),
    })?;

    let text = render_pom(project, &parts.identity.coordinate, &parts.runtime_dependencies)
        .map_err(|err| StageError::Pom {
            reason: err.source.to_string(),
        })?;
    std::fs::write(&pom, text).map_err(|err| StageError::Pom {
        reason: format!("{pom}: {err}"),
    })?;

    debug!("wrote {jar} ({sha256})");
    Ok(ArtifactBundle {
        identity: parts.identity,
        jar,
        sha256,
        pom,
        runtime_dependencies: parts.runtime_dependencies,
        remap: parts.remap,
        assembly: parts.assembly,
    })
}
