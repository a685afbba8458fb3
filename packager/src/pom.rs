//! Maven POM generation for published artefacts.
//!
//! Only runtime requirements are listed. Embedded dependencies are inside
//! the jar and compile-only dependencies are supplied by the mod loader, so
//! neither appears.

use serde::Serialize;
use thiserror::Error;
use trellis::config::ProjectSettings;
use trellis_common::{Coordinate, DependencyScope};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd";

/// The POM could not be serialised.
#[derive(Debug, Error)]
#[error("failed to render POM for {coordinate}")]
pub struct PomError {
    /// Artefact being described.
    pub coordinate: Coordinate,
    /// Serialiser failure.
    #[source]
    pub source: quick_xml::DeError,
}

#[derive(Debug, Serialize)]
#[serde(rename = "project", rename_all = "camelCase")]
struct Project<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,
    #[serde(rename = "@xsi:schemaLocation")]
    schema_location: &'static str,
    model_version: &'static str,
    group_id: &'a str,
    artifact_id: &'a str,
    version: &'a str,
    packaging: &'static str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<Dependencies<'a>>,
}

#[derive(Debug, Serialize)]
struct Dependencies<'a> {
    #[serde(rename = "dependency")]
    items: Vec<Dependency<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Dependency<'a> {
    group_id: &'a str,
    artifact_id: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    classifier: Option<&'a str>,
    scope: &'static str,
}

/// Maven scope a consumer sees for a dependency.
///
/// Mirrors Gradle's publication mapping: `implementation` and
/// `runtime-only` dependencies are both runtime-scoped.
#[must_use]
pub const fn maven_scope(scope: DependencyScope) -> Option<&'static str> {
    match scope {
        DependencyScope::Implementation | DependencyScope::RuntimeOnly => Some("runtime"),
        DependencyScope::CompileOnly | DependencyScope::Embedded => None,
    }
}

/// Render the POM for `coordinate`.
///
/// # Errors
///
/// Returns [`PomError`] when serialisation fails.
///
/// # Examples
///
/// ```
/// use trellis::config::ProjectSettings;
/// use trellis_packager::pom::render_pom;
///
/// let project = ProjectSettings {
///     mod_id: "fallingtrees".to_owned(),
///     group: "me.pandamods".to_owned(),
///     version: "0.13.0".to_owned(),
///     name: None,
///     description: None,
/// };
/// let coordinate = "me.pandamods:fallingtrees-fabric:0.13.0".parse().expect("coordinate");
/// let pom = render_pom(&project, &coordinate, &[]).expect("pom");
/// assert!(pom.contains("<artifactId>fallingtrees-fabric</artifactId>"));
/// ```
pub fn render_pom(
    project: &ProjectSettings,
    coordinate: &Coordinate,
    dependencies: &[(Coordinate, DependencyScope)],
) -> Result<String, PomError> {
    let items: Vec<Dependency<'_>> = dependencies
        .iter()
        .filter_map(|(dependency, scope)| {
            maven_scope(*scope).map(|scope| Dependency {
                group_id: dependency.group(),
                artifact_id: dependency.artifact(),
                version: dependency.version(),
                classifier: dependency.classifier(),
                scope,
            })
        })
        .collect();
    let document = Project {
        xmlns: POM_NAMESPACE,
        xmlns_xsi: XSI_NAMESPACE,
        schema_location: SCHEMA_LOCATION,
        model_version: "4.0.0",
        group_id: coordinate.group(),
        artifact_id: coordinate.artifact(),
        version: coordinate.version(),
        packaging: "jar",
        name: project.display_name(),
        description: project.description.as_deref(),
        dependencies: (!items.is_empty()).then_some(Dependencies { items }),
    };

    let mut out = String::from(XML_DECLARATION);
    let mut serializer = quick_xml::se::Serializer::new(&mut out);
    serializer.indent(' ', 2);
    document.serialize(serializer).map_err(|source| PomError {
        coordinate: coordinate.clone(),
        source,
    })?;
    out.push('\n');
    Ok(out)
}
