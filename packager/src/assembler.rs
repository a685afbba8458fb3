//! Fat-jar assembly for one variant.
//!
//! Layering order is fixed: module entries, then platform entries (which
//! replace module entries of the same name), then every embedded dependency
//! under the merge rules of [`merge_embedded`]. The manifest is written last
//! so that no layer can replace it. The finished payload must not contain a
//! single class from a `compile-only` dependency.

use crate::jar::manifest::Manifest;
use crate::jar::merge::{MergeStats, merge_embedded};
use crate::jar::{JarContents, MANIFEST_ENTRY};
use crate::resolver::{DependencyResolutionError, ResolvedDependency, Result};
use log::{debug, warn};
use serde::Serialize;
use trellis_common::DependencyScope;

/// Everything that goes into one bundle.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    /// Name used in logs (the platform).
    pub label: &'a str,
    /// Module artefact entries.
    pub module: &'a JarContents,
    /// Platform entries.
    pub platform: &'a JarContents,
    /// Resolved dependencies of the variant.
    pub dependencies: &'a [ResolvedDependency],
    /// Manifest to store in the bundle.
    pub manifest: &'a Manifest,
}

/// Counts recorded while assembling, for the build report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Entries taken from the module.
    pub module_entries: usize,
    /// Entries taken from the platform.
    pub platform_entries: usize,
    /// Module entries replaced by platform entries.
    pub overridden: usize,
    /// Embedded dependencies, as coordinates.
    pub embedded: Vec<String>,
    /// Entries copied from embedded jars.
    pub embedded_entries: usize,
    /// Embedded entries dropped by the exclusion rules.
    pub excluded: usize,
    /// Embedded duplicates that differed from the bundled copy.
    pub conflicts: usize,
}

impl AssemblyStats {
    fn absorb(&mut self, merge: MergeStats) {
        self.embedded_entries += merge.added + merge.services_merged;
        self.excluded += merge.excluded;
        self.conflicts += merge.conflicts;
    }
}

/// The assembled payload.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Bundle entries, manifest included.
    pub contents: JarContents,
    /// What went into it.
    pub stats: AssemblyStats,
}

/// Build the fat jar for one variant.
///
/// # Errors
///
/// Returns [`DependencyResolutionError::Unreadable`] for a corrupt
/// dependency jar and [`DependencyResolutionError::CompileOnlyLeak`] when a
/// compile-only class ends up in the payload.
pub fn assemble(input: &AssemblyInput<'_>) -> Result<Assembly> {
    let mut contents = input.module.clone();
    let mut stats = AssemblyStats {
        module_entries: input.module.len(),
        platform_entries: input.platform.len(),
        ..AssemblyStats::default()
    };

    for (name, bytes) in input.platform.iter() {
        if let Some(previous) = contents.insert(name, bytes.to_vec()) {
            if previous != bytes {
                debug!("{}: platform entry {name} replaces the module copy", input.label);
            }
            stats.overridden += 1;
        }
    }

    for dependency in input
        .dependencies
        .iter()
        .filter(|dep| dep.scope.is_bundled())
    {
        let jar = dependency.read()?;
        let origin = dependency.coordinate.to_string();
        stats.absorb(merge_embedded(&mut contents, &jar, &origin));
        stats.embedded.push(origin);
    }
    if stats.conflicts > 0 {
        warn!(
            "{}: {} embedded entries conflicted with bundled copies",
            input.label, stats.conflicts
        );
    }

    check_compile_only(&contents, input.dependencies)?;

    contents.insert(MANIFEST_ENTRY, input.manifest.render());
    debug!(
        "{}: assembled {} entries ({} embedded jars)",
        input.label,
        contents.len(),
        stats.embedded.len()
    );
    Ok(Assembly { contents, stats })
}

/// Reject `payload` if it carries any class of a compile-only dependency.
///
/// # Errors
///
/// Returns [`DependencyResolutionError::CompileOnlyLeak`] naming the first
/// leaking dependency and its classes, or
/// [`DependencyResolutionError::Unreadable`] for a corrupt jar.
pub fn check_compile_only(payload: &JarContents, dependencies: &[ResolvedDependency]) -> Result<()> {
    for dependency in dependencies
        .iter()
        .filter(|dep| dep.scope == DependencyScope::CompileOnly)
    {
        let jar = dependency.read()?;
        let entries: Vec<String> = jar
            .class_entries()
            .filter(|name| payload.contains(name))
            .map(str::to_owned)
            .collect();
        if !entries.is_empty() {
            return Err(DependencyResolutionError::CompileOnlyLeak {
                coordinate: dependency.coordinate.clone(),
                entries,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Origin;
    use crate::test_utils::install_jar;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Repo {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    impl Repo {
        fn dependency(
            &self,
            coordinate: &str,
            scope: DependencyScope,
            entries: &[(&str, &[u8])],
        ) -> ResolvedDependency {
            let coordinate = coordinate.parse().expect("coordinate");
            let contents: JarContents = entries
                .iter()
                .map(|(name, bytes)| ((*name).to_owned(), bytes.to_vec()))
                .collect();
            ResolvedDependency {
                jar: install_jar(&self.root, &coordinate, &contents),
                coordinate,
                scope,
                origin: Origin::Module,
            }
        }
    }

    #[fixture]
    fn repo() -> Repo {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8");
        Repo { _dir: dir, root }
    }

    fn jar(entries: &[(&str, &[u8])]) -> JarContents {
        entries
            .iter()
            .map(|(name, bytes)| ((*name).to_owned(), bytes.to_vec()))
            .collect()
    }

    #[rstest]
    fn layers_module_platform_and_embedded_entries(repo: Repo) {
        let module = jar(&[
            ("a/Tree.class", b"module tree"),
            ("assets/fallingtrees/lang/en_us.json", b"{}"),
        ]);
        let platform = jar(&[
            ("a/Tree.class", b"platform tree"),
            ("fabric.mod.json", b"{}"),
        ]);
        let dependencies = [
            repo.dependency(
                "me.pandamods:pandalib:0.5",
                DependencyScope::Embedded,
                &[
                    ("me/pandamods/Lib.class", b"lib"),
                    ("a/Tree.class", b"shaded tree"),
                    ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n"),
                ],
            ),
            repo.dependency(
                "net.fabricmc:fabric-loader:0.16",
                DependencyScope::CompileOnly,
                &[("net/fabricmc/Loader.class", b"loader")],
            ),
            repo.dependency(
                "dev.architectury:architectury:13",
                DependencyScope::Implementation,
                &[("dev/architectury/Arch.class", b"arch")],
            ),
        ];
        let manifest = Manifest::new("fallingtrees", "0.13.0");

        let assembly = assemble(&AssemblyInput {
            label: "fabric",
            module: &module,
            platform: &platform,
            dependencies: &dependencies,
            manifest: &manifest,
        })
        .expect("assembly");

        let contents = &assembly.contents;
        assert_eq!(contents.get("a/Tree.class"), Some(b"platform tree".as_slice()));
        assert!(contents.contains("me/pandamods/Lib.class"));
        assert!(contents.contains("fabric.mod.json"));
        assert!(!contents.contains("net/fabricmc/Loader.class"));
        assert!(!contents.contains("dev/architectury/Arch.class"));
        assert_eq!(contents.get(MANIFEST_ENTRY), Some(manifest.render().as_slice()));
        assert_eq!(
            assembly.stats,
            AssemblyStats {
                module_entries: 2,
                platform_entries: 2,
                overridden: 1,
                embedded: vec!["me.pandamods:pandalib:0.5".to_owned()],
                embedded_entries: 1,
                excluded: 1,
                conflicts: 1,
            }
        );
    }

    #[rstest]
    fn compile_only_classes_in_the_payload_are_rejected(repo: Repo) {
        let module = jar(&[("net/fabricmc/Loader.class", b"copied by mistake")]);
        let dependencies = [repo.dependency(
            "net.fabricmc:fabric-loader:0.16",
            DependencyScope::CompileOnly,
            &[("net/fabricmc/Loader.class", b"loader")],
        )];
        let manifest = Manifest::new("fallingtrees", "0.13.0");

        let err = assemble(&AssemblyInput {
            label: "fabric",
            module: &module,
            platform: &JarContents::new(),
            dependencies: &dependencies,
            manifest: &manifest,
        })
        .expect_err("leak");

        assert_eq!(
            err,
            DependencyResolutionError::CompileOnlyLeak {
                coordinate: "net.fabricmc:fabric-loader:0.16".parse().expect("coordinate"),
                entries: vec!["net/fabricmc/Loader.class".to_owned()],
            }
        );
    }

    #[rstest]
    fn corrupt_dependency_jars_are_reported(repo: Repo) {
        let coordinate: trellis_common::Coordinate =
            "org.example:broken:1".parse().expect("coordinate");
        let path = repo.root.join(coordinate.repository_path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("dirs");
        std::fs::write(&path, b"not a zip").expect("write");
        let dependencies = [ResolvedDependency {
            coordinate,
            scope: DependencyScope::Embedded,
            origin: Origin::Module,
            jar: path,
        }];
        let manifest = Manifest::new("fallingtrees", "0.13.0");
        let err = assemble(&AssemblyInput {
            label: "forge",
            module: &JarContents::new(),
            platform: &JarContents::new(),
            dependencies: &dependencies,
            manifest: &manifest,
        })
        .expect_err("corrupt jar");
        assert!(matches!(err, DependencyResolutionError::Unreadable { .. }));
    }
}
