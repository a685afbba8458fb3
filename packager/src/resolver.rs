//! Dependency declaration merging and local repository lookup.
//!
//! Declarations are reconciled per library (`group:artifact[:classifier]`)
//! before any jar is touched: a variant's declaration replaces the module's,
//! while two declarations at the same level must agree. Jars are then
//! located in a Maven-layout directory; nothing is fetched over the network.

use crate::jar::{JarContents, JarError};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use trellis::config::DependencyDecl;
use trellis_common::{Coordinate, DependencyScope, LibraryKey, Platform};

/// Errors raised while reconciling or locating dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyResolutionError {
    /// One library was declared twice at the same level with different
    /// versions or scopes.
    #[error(
        "{library} is declared twice by the {origin}: {first} ({first_scope}) and {second} ({second_scope})"
    )]
    Conflict {
        /// Library key.
        library: LibraryKey,
        /// Level both declarations come from.
        origin: Origin,
        /// First declaration.
        first: Coordinate,
        /// Scope of the first declaration.
        first_scope: DependencyScope,
        /// Second declaration.
        second: Coordinate,
        /// Scope of the second declaration.
        second_scope: DependencyScope,
    },

    /// The jar is not present in the local repository.
    #[error("{coordinate} not found in the local repository (expected {path})")]
    Missing {
        /// Requested coordinate.
        coordinate: Coordinate,
        /// Where the jar was expected.
        path: Utf8PathBuf,
    },

    /// Classes of a compile-only dependency ended up in the payload.
    #[error(
        "compile-only dependency {coordinate} leaked {} class(es) into the bundle, first: {}",
        .entries.len(),
        .entries.first().map_or("", String::as_str)
    )]
    CompileOnlyLeak {
        /// The compile-only dependency.
        coordinate: Coordinate,
        /// Leaked class entries.
        entries: Vec<String>,
    },

    /// A located jar could not be read.
    #[error("failed to read {coordinate}")]
    Unreadable {
        /// Dependency being read.
        coordinate: Coordinate,
        /// Underlying failure.
        #[source]
        source: JarError,
    },
}

/// Result type for dependency resolution.
pub type Result<T> = std::result::Result<T, DependencyResolutionError>;

/// Where a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The shared module.
    Module,
    /// A platform variant.
    Variant(Platform),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module => f.write_str("module"),
            Self::Variant(platform) => write!(f, "{platform} variant"),
        }
    }
}

/// A declaration after merging, still unlocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDeclaration {
    /// The winning declaration.
    pub decl: DependencyDecl,
    /// Level the winning declaration came from.
    pub origin: Origin,
}

/// A located dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Coordinate of the jar.
    pub coordinate: Coordinate,
    /// Inclusion policy.
    pub scope: DependencyScope,
    /// Level the declaration came from.
    pub origin: Origin,
    /// Path of the jar in the local repository.
    pub jar: Utf8PathBuf,
}

impl ResolvedDependency {
    /// Read the dependency's entries.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyResolutionError::Unreadable`] for corrupt jars.
    pub fn read(&self) -> Result<JarContents> {
        JarContents::read(&self.jar).map_err(|source| DependencyResolutionError::Unreadable {
            coordinate: self.coordinate.clone(),
            source,
        })
    }
}

/// Merge module and variant declarations.
///
/// The result is ordered by library key so that classpaths and embedded
/// jars are processed deterministically.
///
/// # Errors
///
/// Returns [`DependencyResolutionError::Conflict`] when one level declares a
/// library twice with a different version or scope.
pub fn merge_declarations(
    module: &[DependencyDecl],
    variant: Option<(Platform, &[DependencyDecl])>,
) -> Result<Vec<MergedDeclaration>> {
    let mut merged = collect_level(module, Origin::Module)?;
    if let Some((platform, decls)) = variant {
        for (key, winner) in collect_level(decls, Origin::Variant(platform))? {
            if let Some(replaced) = merged.get(&key) {
                if replaced.decl != winner.decl {
                    warn!(
                        "{platform} variant overrides {} ({}) with {} ({})",
                        replaced.decl.coordinate,
                        replaced.decl.scope,
                        winner.decl.coordinate,
                        winner.decl.scope
                    );
                }
            }
            merged.insert(key, winner);
        }
    }
    Ok(merged.into_values().collect())
}

fn collect_level(
    decls: &[DependencyDecl],
    origin: Origin,
) -> Result<BTreeMap<LibraryKey, MergedDeclaration>> {
    let mut level: BTreeMap<LibraryKey, MergedDeclaration> = BTreeMap::new();
    for decl in decls {
        let key = decl.coordinate.key();
        match level.get(&key) {
            Some(existing) if existing.decl == *decl => {}
            Some(existing) => {
                return Err(DependencyResolutionError::Conflict {
                    library: key,
                    origin,
                    first: existing.decl.coordinate.clone(),
                    first_scope: existing.decl.scope,
                    second: decl.coordinate.clone(),
                    second_scope: decl.scope,
                });
            }
            None => {
                level.insert(
                    key,
                    MergedDeclaration {
                        decl: decl.clone(),
                        origin,
                    },
                );
            }
        }
    }
    Ok(level)
}

/// A Maven-layout directory of jars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    root: Utf8PathBuf,
}

impl LocalRepository {
    /// Use `root` as the repository.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of `coordinate`'s jar, when present.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyResolutionError::Missing`] when the jar does not
    /// exist.
    pub fn locate(&self, coordinate: &Coordinate) -> Result<Utf8PathBuf> {
        let path = self.root.join(coordinate.repository_path());
        if path.is_file() {
            Ok(path)
        } else {
            Err(DependencyResolutionError::Missing {
                coordinate: coordinate.clone(),
                path,
            })
        }
    }

    /// Locate every merged declaration.
    ///
    /// # Errors
    ///
    /// Returns the first [`DependencyResolutionError::Missing`].
    pub fn resolve(&self, merged: &[MergedDeclaration]) -> Result<Vec<ResolvedDependency>> {
        let resolved = merged
            .iter()
            .map(|entry| {
                Ok(ResolvedDependency {
                    jar: self.locate(&entry.decl.coordinate)?,
                    coordinate: entry.decl.coordinate.clone(),
                    scope: entry.decl.scope,
                    origin: entry.origin,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("located {} dependencies in {}", resolved.len(), self.root);
        Ok(resolved)
    }
}

/// Jars a compiler needs to see.
#[must_use]
pub fn compile_classpath(dependencies: &[ResolvedDependency]) -> Vec<Utf8PathBuf> {
    dependencies
        .iter()
        .filter(|dep| dep.scope.on_compile_classpath())
        .map(|dep| dep.jar.clone())
        .collect()
}

/// Dependencies consumers must provide at runtime, for the POM.
#[must_use]
pub fn runtime_requirements(dependencies: &[ResolvedDependency]) -> Vec<(Coordinate, DependencyScope)> {
    dependencies
        .iter()
        .filter(|dep| dep.scope.is_runtime_requirement())
        .map(|dep| (dep.coordinate.clone(), dep.scope))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn decl(coordinate: &str, scope: DependencyScope) -> DependencyDecl {
        DependencyDecl {
            coordinate: coordinate.parse().expect("valid coordinate"),
            scope,
        }
    }

    #[rstest]
    fn variant_declarations_override_the_module() {
        let module = [
            decl("org.example:lib:1.0", DependencyScope::Embedded),
            decl("org.example:api:2.0", DependencyScope::CompileOnly),
        ];
        let variant = [decl("org.example:lib:2.0", DependencyScope::Embedded)];

        let merged = merge_declarations(&module, Some((Platform::Fabric, &variant))).expect("merge");

        assert_eq!(
            merged,
            vec![
                MergedDeclaration {
                    decl: decl("org.example:api:2.0", DependencyScope::CompileOnly),
                    origin: Origin::Module,
                },
                MergedDeclaration {
                    decl: decl("org.example:lib:2.0", DependencyScope::Embedded),
                    origin: Origin::Variant(Platform::Fabric),
                },
            ]
        );
    }

    #[rstest]
    #[case(decl("org.example:lib:2.0", DependencyScope::Embedded))]
    #[case(decl("org.example:lib:1.0", DependencyScope::Implementation))]
    fn same_level_disagreements_conflict(#[case] second: DependencyDecl) {
        let module = [decl("org.example:lib:1.0", DependencyScope::Embedded), second];
        let err = merge_declarations(&module, None).expect_err("conflict");
        assert!(matches!(
            err,
            DependencyResolutionError::Conflict {
                origin: Origin::Module,
                ..
            }
        ));
    }

    #[rstest]
    fn identical_duplicates_collapse() {
        let module = [
            decl("org.example:lib:1.0", DependencyScope::Embedded),
            decl("org.example:lib:1.0", DependencyScope::Embedded),
        ];
        let merged = merge_declarations(&module, None).expect("merge");
        assert_eq!(merged.len(), 1);
    }

    #[rstest]
    fn classifiers_are_distinct_libraries() {
        let module = [
            decl("org.example:lib:1.0", DependencyScope::Embedded),
            decl("org.example:lib:1.0:sources", DependencyScope::CompileOnly),
        ];
        let merged = merge_declarations(&module, None).expect("merge");
        assert_eq!(merged.len(), 2);
    }

    #[rstest]
    fn locates_jars_in_maven_layout() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8");
        let coordinate: Coordinate = "org.example:lib:1.0".parse().expect("coordinate");
        let jar = root.join("org/example/lib/1.0/lib-1.0.jar");
        std::fs::create_dir_all(jar.parent().expect("parent")).expect("dirs");
        std::fs::write(&jar, b"").expect("jar");

        let repository = LocalRepository::new(&root);
        assert_eq!(repository.locate(&coordinate).expect("found"), jar);

        let missing: Coordinate = "org.example:other:1.0".parse().expect("coordinate");
        assert!(matches!(
            repository.locate(&missing),
            Err(DependencyResolutionError::Missing { .. })
        ));
    }

    #[rstest]
    fn classpath_and_runtime_views_follow_scopes() {
        let dep = |coordinate: &str, scope| ResolvedDependency {
            coordinate: coordinate.parse().expect("coordinate"),
            scope,
            origin: Origin::Module,
            jar: Utf8PathBuf::from(format!("/repo/{coordinate}.jar")),
        };
        let deps = [
            dep("a:compile:1", DependencyScope::CompileOnly),
            dep("a:runtime:1", DependencyScope::RuntimeOnly),
            dep("a:impl:1", DependencyScope::Implementation),
            dep("a:embed:1", DependencyScope::Embedded),
        ];
        assert_eq!(
            compile_classpath(&deps),
            vec![
                Utf8PathBuf::from("/repo/a:compile:1.jar"),
                Utf8PathBuf::from("/repo/a:impl:1.jar"),
                Utf8PathBuf::from("/repo/a:embed:1.jar"),
            ]
        );
        let runtime: Vec<String> = runtime_requirements(&deps)
            .into_iter()
            .map(|(coordinate, _)| coordinate.artifact().to_owned())
            .collect();
        assert_eq!(runtime, vec!["runtime", "impl"]);
    }
}
