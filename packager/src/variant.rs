//! The per-platform pipeline.
//!
//! One parameterised pipeline serves every platform. Given the frozen module
//! artefact and canonical rules it compiles platform classes, reconciles
//! dependencies, validates access rules against everything the variant can
//! see, assembles the fat jar, remaps it, injects the platform's rule file
//! and writes the bundle. Nothing here mutates shared state, so variants run
//! side by side.

use crate::assembler::{AssemblyInput, assemble, check_compile_only};
use crate::bundle::{ArtifactBundle, BundleParts, write_bundle};
use crate::classindex::ClassIndex;
use crate::compiler::{self, CompileUnit};
use crate::error::{StageError, VariantError};
use crate::executor::CommandExecutor;
use crate::jar::JarContents;
use crate::jar::manifest::Manifest;
use crate::module::ModuleArtifact;
use crate::naming::BundleIdentity;
use crate::remap::{self, RemapSummary};
use crate::resolver::{
    LocalRepository, ResolvedDependency, compile_classpath, merge_declarations,
    runtime_requirements,
};
use crate::rules;
use log::{debug, info};
use trellis::config::{BuildSettings, VariantSpec};
use trellis_common::platform::widener_entry;
use trellis_common::{AccessFormat, AccessRuleSet};

/// Shared, read-only inputs of every variant pipeline.
#[derive(Clone, Copy)]
pub struct VariantContext<'a> {
    /// Resolved configuration.
    pub settings: &'a BuildSettings,
    /// The compiled shared module.
    pub module: &'a ModuleArtifact,
    /// Canonical access rules, when the module declares a widener.
    pub canonical_rules: Option<&'a AccessRuleSet>,
    /// Runs compile commands.
    pub executor: &'a dyn CommandExecutor,
    /// Where dependency jars live.
    pub repository: &'a LocalRepository,
}

impl std::fmt::Debug for VariantContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantContext")
            .field("module", &self.module.identity.coordinate)
            .field("repository", &self.repository.root())
            .finish_non_exhaustive()
    }
}

/// Build one variant's bundle.
///
/// # Errors
///
/// Returns a [`VariantError`] tagged with the variant's platform.
pub fn build_variant(
    context: &VariantContext<'_>,
    spec: &VariantSpec,
    identity: BundleIdentity,
) -> Result<ArtifactBundle, VariantError> {
    let platform = spec.platform;
    run_stages(context, spec, identity).map_err(|source| VariantError::new(platform, source))
}

fn run_stages(
    context: &VariantContext<'_>,
    spec: &VariantSpec,
    identity: BundleIdentity,
) -> Result<ArtifactBundle, StageError> {
    let settings = context.settings;
    let label = spec.platform.as_str();

    let merged = merge_declarations(
        &settings.module.dependencies,
        Some((spec.platform, &spec.dependencies)),
    )?;
    let dependencies = context.repository.resolve(&merged)?;

    let mut classpath = vec![context.module.classes.clone()];
    classpath.extend(compile_classpath(&dependencies));
    let platform_contents = compiler::compile(
        context.executor,
        &CompileUnit {
            label,
            command: spec.compile.as_deref(),
            classes: &spec.classes,
            resources: &spec.resources,
            classpath: &classpath,
            cwd: &settings.root,
        },
    )?;
    // Compile-only classes must not be shadowed by the payload being indexed.
    check_compile_only(&context.module.contents, &dependencies)?;
    check_compile_only(&platform_contents, &dependencies)?;

    let index = class_index(context.module, &platform_contents, &dependencies)?;
    let rules = variant_rules(context, spec)?;
    if let Some(rules) = &rules {
        rules::validate(rules, &index)?;
        debug!("{label}: {} access rules validated", rules.len());
    }

    let manifest = Manifest::new(identity.coordinate.artifact(), &settings.project.version)
        .with("Specification-Title", settings.project.display_name())
        .with_mixin_configs(&spec.mixin_configs);
    let assembly = assemble(&AssemblyInput {
        label,
        module: &context.module.contents,
        platform: &platform_contents,
        dependencies: &dependencies,
        manifest: &manifest,
    })?;

    let (mut contents, rules, remap_summary) = match &spec.mappings {
        Some(mappings) => {
            let table = remap::load_mappings(mappings)?;
            let outcome = remap::remap_jar(&assembly.contents, &table, &index, rules.as_ref())?;
            (outcome.contents, outcome.rules, Some(outcome.summary))
        }
        None => (assembly.contents, rules, None),
    };

    if let Some(rules) = &rules {
        inject_rules(&mut contents, rules, spec, &settings.project.mod_id)?;
    }

    let bundle = write_bundle(
        &settings.project,
        &settings.output_dir,
        BundleParts {
            identity,
            contents: &contents,
            runtime_dependencies: runtime_requirements(&dependencies),
            remap: remap_summary,
            assembly: Some(assembly.stats),
        },
    )?;
    log_summary(label, &bundle, bundle.remap.as_ref());
    Ok(bundle)
}

fn class_index(
    module: &ModuleArtifact,
    platform: &JarContents,
    dependencies: &[ResolvedDependency],
) -> Result<ClassIndex, StageError> {
    let mut index = ClassIndex::new();
    let indexed = |result: Result<(), (String, crate::classfile::ClassFileError)>| {
        result.map_err(|(entry, source)| StageError::Index { entry, source })
    };
    // Platform classes shadow module classes in the bundle, so they win here.
    indexed(index.add_jar(platform))?;
    indexed(index.add_jar(&module.contents))?;
    for dependency in dependencies {
        indexed(index.add_jar(&dependency.read()?))?;
    }
    Ok(index)
}

fn variant_rules(
    context: &VariantContext<'_>,
    spec: &VariantSpec,
) -> Result<Option<AccessRuleSet>, StageError> {
    let extra = spec.access_widener.as_deref();
    let rules = match (context.canonical_rules, extra) {
        (Some(canonical), _) => Some(rules::with_extra(canonical, extra)?),
        (None, Some(path)) => Some(rules::load_rules(path)?),
        (None, None) => None,
    };
    Ok(rules)
}

fn inject_rules(
    contents: &mut JarContents,
    rules: &AccessRuleSet,
    spec: &VariantSpec,
    mod_id: &str,
) -> Result<(), StageError> {
    let rendered = rules::render(rules, spec.platform, mod_id)?;
    if spec.platform.access_format() == AccessFormat::Transformer {
        // A widener copied in from resources would contradict the transformer.
        contents.remove(&widener_entry(mod_id));
    }
    contents.insert(rendered.entry, rendered.text.into_bytes());
    Ok(())
}

fn log_summary(label: &str, bundle: &ArtifactBundle, remap: Option<&RemapSummary>) {
    match remap {
        Some(summary) => info!(
            "{label}: wrote {} ({} -> {}, {} classes renamed)",
            bundle.jar, summary.from, summary.to, summary.renamed
        ),
        None => info!("{label}: wrote {} (not remapped)", bundle.jar),
    }
}

#[cfg(test)]
#[path = "variant_tests.rs"]
mod tests;
