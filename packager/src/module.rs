//! The shared module stage.
//!
//! Runs once per build, before any variant: module dependencies are merged
//! and located, the module is compiled, and its output is frozen into a
//! [`ModuleArtifact`] that every variant reads. The module's own named jar
//! carries the canonical access widener so that downstream projects can
//! recompile against it.

use crate::compiler::{self, CompileError, CompileUnit};
use crate::executor::CommandExecutor;
use crate::jar::manifest::Manifest;
use crate::jar::{JarContents, MANIFEST_ENTRY};
use crate::naming::BundleIdentity;
use crate::resolver::{LocalRepository, ResolvedDependency, compile_classpath, merge_declarations};
use camino::Utf8PathBuf;
use log::info;
use trellis::config::BuildSettings;
use trellis_common::AccessRuleSet;
use trellis_common::access::widener;
use trellis_common::platform::widener_entry;

/// The compiled shared module.
#[derive(Debug, Clone)]
pub struct ModuleArtifact {
    /// Identity of the named jar.
    pub identity: BundleIdentity,
    /// Compiled classes and resources.
    pub contents: JarContents,
    /// Located module dependencies.
    pub dependencies: Vec<ResolvedDependency>,
    /// Class directory, placed on every variant's compile classpath.
    pub classes: Utf8PathBuf,
}

/// Compile the shared module.
///
/// # Errors
///
/// Returns [`CompileError`]; a module dependency that cannot be merged or
/// located is reported as [`CompileError::UnresolvedDependency`].
pub fn compile_module(
    settings: &BuildSettings,
    identity: BundleIdentity,
    executor: &dyn CommandExecutor,
    repository: &LocalRepository,
) -> Result<ModuleArtifact, CompileError> {
    let module = &settings.module;
    let unresolved = |err: crate::resolver::DependencyResolutionError| {
        CompileError::UnresolvedDependency {
            label: module.name.clone(),
            reason: err.to_string(),
        }
    };
    let merged = merge_declarations(&module.dependencies, None).map_err(unresolved)?;
    let dependencies = repository.resolve(&merged).map_err(unresolved)?;
    let classpath = compile_classpath(&dependencies);

    let contents = compiler::compile(
        executor,
        &CompileUnit {
            label: &module.name,
            command: module.compile.as_deref(),
            classes: &module.classes,
            resources: &module.resources,
            classpath: &classpath,
            cwd: &settings.root,
        },
    )?;
    info!(
        "compiled module {} ({} entries)",
        identity.coordinate,
        contents.len()
    );
    Ok(ModuleArtifact {
        identity,
        contents,
        dependencies,
        classes: module.classes.clone(),
    })
}

impl ModuleArtifact {
    /// The unshaded, unremapped jar published for recompilation, with the
    /// canonical widener at `{mod_id}.accesswidener`.
    #[must_use]
    pub fn named_jar(&self, settings: &BuildSettings, rules: Option<&AccessRuleSet>) -> JarContents {
        let mut jar = self.contents.clone();
        if let Some(rules) = rules {
            jar.insert(
                widener_entry(&settings.project.mod_id),
                widener::format(rules).into_bytes(),
            );
        }
        let manifest = Manifest::new(self.identity.coordinate.artifact(), &settings.project.version);
        jar.insert(MANIFEST_ENTRY, manifest.render());
        jar
    }
}
