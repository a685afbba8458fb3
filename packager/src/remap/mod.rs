//! The remap pass: rewrites a bundle from the source namespace into the
//! platform's runtime namespace.
//!
//! Classes are renamed through [`ClassRemapper`], entry names follow their
//! classes (including multi-release `META-INF/versions/<n>/` copies),
//! service registrations are renamed, and the bundle's access rules are
//! remapped alongside. The result is checked by
//! [`StaleBindingScanner`]; any leftover source-namespace binding fails the
//! whole pass, so callers never persist a half-remapped jar.

pub mod class_remapper;
pub mod verify;

pub use class_remapper::{ClassRemapError, ClassRemapper, RemappedClass};
pub use verify::StaleBindingScanner;

use crate::classfile::ClassFileError;
use crate::classindex::ClassIndex;
use crate::jar::{JarContents, is_class_entry};
use camino::Utf8PathBuf;
use log::debug;
use std::collections::HashMap;
use serde::Serialize;
use thiserror::Error;
use trellis::config::MappingSettings;
use trellis_common::{AccessRuleError, AccessRuleSet, MappingTable};

const SERVICES_PREFIX: &str = "META-INF/services/";
const VERSIONS_PREFIX: &str = "META-INF/versions/";

/// Errors raised by the remap pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemapError {
    /// The mapping file could not be read or parsed.
    #[error("failed to load mappings from {path}: {reason}")]
    Mappings {
        /// Mapping file.
        path: Utf8PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A class could not be remapped.
    #[error("failed to remap {entry}")]
    Class {
        /// Jar entry of the class.
        entry: String,
        /// Underlying failure.
        #[source]
        source: ClassRemapError,
    },

    /// A remapped class could not be re-read for verification.
    #[error("failed to verify {entry}")]
    Verify {
        /// Jar entry of the class.
        entry: String,
        /// Underlying failure.
        #[source]
        source: ClassFileError,
    },

    /// The access rules could not be remapped.
    #[error("failed to remap access rules")]
    Rules(#[from] AccessRuleError),

    /// Two entries remap to the same name.
    #[error("remapping {entry} collides with {previous}")]
    Collision {
        /// Entry whose remapped name was already taken.
        entry: String,
        /// Entry that produced the name first.
        previous: String,
    },

    /// Source-namespace bindings survived the pass.
    #[error("remap left {count} stale binding(s), first: {first}")]
    Partial {
        /// Number of stale bindings.
        count: usize,
        /// The first stale binding found.
        first: String,
    },
}

/// What the remap pass did, for the build report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemapSummary {
    /// Source namespace.
    pub from: String,
    /// Target namespace.
    pub to: String,
    /// Class entries processed.
    pub classes: usize,
    /// Classes whose own name changed.
    pub renamed: usize,
}

/// A remapped bundle and its remapped access rules.
#[derive(Debug, Clone)]
pub struct RemapOutcome {
    /// Remapped entries.
    pub contents: JarContents,
    /// Access rules in the target namespace.
    pub rules: Option<AccessRuleSet>,
    /// Statistics for the report.
    pub summary: RemapSummary,
}

/// Read and parse the Tiny v2 file a variant references.
///
/// # Errors
///
/// Returns [`RemapError::Mappings`] when the file is unreadable or invalid.
pub fn load_mappings(settings: &MappingSettings) -> Result<MappingTable, RemapError> {
    let failure = |reason: String| RemapError::Mappings {
        path: settings.file.clone(),
        reason,
    };
    let text = std::fs::read_to_string(&settings.file).map_err(|err| failure(err.to_string()))?;
    let table = MappingTable::parse_tiny(&text, &settings.from, &settings.to)
        .map_err(|err| failure(err.to_string()))?;
    debug!(
        "loaded {} mapping entries ({} -> {}) from {}",
        table.len(),
        settings.from,
        settings.to,
        settings.file
    );
    Ok(table)
}

/// Remap every entry of `contents` and, when given, `rules`.
///
/// `index` must describe the source-namespace class hierarchy of the bundle
/// and its classpath.
///
/// # Errors
///
/// Returns [`RemapError`] when a class cannot be rewritten, the rules cannot
/// be remapped, or the verification scan finds stale bindings.
pub fn remap_jar(
    contents: &JarContents,
    table: &MappingTable,
    index: &ClassIndex,
    rules: Option<&AccessRuleSet>,
) -> Result<RemapOutcome, RemapError> {
    let remapped_rules = rules.map(|set| set.remap(table)).transpose()?;
    let mut summary = RemapSummary {
        from: table.from_namespace().to_owned(),
        to: table.to_namespace().to_owned(),
        classes: contents.class_entries().count(),
        renamed: 0,
    };

    if table.is_identity() {
        debug!("identity mappings; copying {} entries", contents.len());
        return Ok(RemapOutcome {
            contents: contents.clone(),
            rules: remapped_rules,
            summary,
        });
    }

    let remapper = ClassRemapper::new(table, index);
    let mut output = JarContents::new();
    let mut origins: HashMap<String, &str> = HashMap::with_capacity(contents.len());
    for (name, bytes) in contents.iter() {
        let (entry, data) = if is_class_entry(name) {
            let remapped = remapper
                .remap(bytes)
                .map_err(|source| RemapError::Class {
                    entry: name.to_owned(),
                    source,
                })?;
            if remapped.renamed() {
                summary.renamed += 1;
            }
            let entry = format!("{}{}.class", version_prefix(name), remapped.name);
            (entry, remapped.bytes)
        } else if let Some(service) = name.strip_prefix(SERVICES_PREFIX) {
            (
                format!("{SERVICES_PREFIX}{}", map_binary_name(table, service)),
                remap_service_file(table, bytes),
            )
        } else {
            (name.to_owned(), bytes.to_vec())
        };
        if let Some(previous) = origins.insert(entry.clone(), name) {
            return Err(RemapError::Collision {
                entry: name.to_owned(),
                previous: previous.to_owned(),
            });
        }
        output.insert(entry, data);
    }

    let findings = StaleBindingScanner::new(table)
        .scan_jar(&output)
        .map_err(|(entry, source)| RemapError::Verify { entry, source })?;
    if let Some(first) = findings.first() {
        return Err(RemapError::Partial {
            count: findings.len(),
            first: first.clone(),
        });
    }

    debug!(
        "remapped {} classes ({} renamed) from {} to {}",
        summary.classes, summary.renamed, summary.from, summary.to
    );
    Ok(RemapOutcome {
        contents: output,
        rules: remapped_rules,
        summary,
    })
}

/// `META-INF/versions/<n>/` when `entry` is a multi-release copy.
fn version_prefix(entry: &str) -> &str {
    let Some(rest) = entry.strip_prefix(VERSIONS_PREFIX) else {
        return "";
    };
    match rest.split_once('/') {
        Some((version, _)) if version.chars().all(|c| c.is_ascii_digit()) => entry
            .get(..VERSIONS_PREFIX.len() + version.len() + 1)
            .unwrap_or_default(),
        _ => "",
    }
}

fn map_binary_name(table: &MappingTable, dotted: &str) -> String {
    let internal = dotted.replace('.', "/");
    table
        .map_class(&internal)
        .map_or_else(|| dotted.to_owned(), |mapped| mapped.replace('/', "."))
}

fn remap_service_file(table: &MappingTable, bytes: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(bytes);
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            out.push_str(line);
        } else {
            out.push_str(&map_binary_name(table, trimmed));
        }
        out.push('\n');
    }
    out.into_bytes()
}
