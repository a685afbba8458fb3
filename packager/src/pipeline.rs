//! Whole-build orchestration.
//!
//! The shared stages run first and abort the run on failure: identities are
//! planned, the module is compiled and the canonical access rules are loaded.
//! The module's named jar is written next, then every variant runs on its
//! own scoped thread, at most `jobs` at a time. Variant failures are
//! collected rather than propagated, and the build report is always written
//! once the shared stages have succeeded.

use crate::bundle::{ArtifactBundle, BundleParts, write_bundle};
use crate::error::{PackagerError, Result, StageError, VariantError};
use crate::executor::CommandExecutor;
use crate::module::{ModuleArtifact, compile_module};
use crate::naming::{BundleIdentity, plan_identities};
use crate::publish::{
    Channel, Credentials, PublishError, PublishTarget, PublishedBundle, Publisher,
    RepositoryClient, plan_uploads,
};
use crate::remap;
use crate::report::{BuildReport, BundleRecord, FailureRecord, REPORT_FILE};
use crate::resolver::{LocalRepository, runtime_requirements};
use crate::rules::{self, RenderedRules};
use crate::variant::{VariantContext, build_variant};
use camino::Utf8PathBuf;
use log::{info, warn};
use trellis::config::{BuildSettings, VariantSpec};
use trellis_common::{AccessRuleSet, Platform};

/// Run-level switches that are not part of the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Upload bundles after building them.
    pub publish: bool,
    /// Plan uploads without sending them.
    pub dry_run: bool,
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// What the run produced.
    pub report: BuildReport,
    /// Where the report was written.
    pub report_path: Utf8PathBuf,
}

/// Build every selected variant and, when requested, publish the results.
///
/// # Errors
///
/// Returns [`PackagerError`] when a shared stage fails or the report cannot
/// be written. Variant and upload failures are recorded in the report.
pub fn run_build<C: RepositoryClient>(
    settings: &BuildSettings,
    options: BuildOptions,
    executor: &dyn CommandExecutor,
    client: C,
) -> Result<BuildOutcome> {
    let publishing = Publishing::prepare(settings, options, client)?;
    let identities = plan_identities(settings)?;

    std::fs::create_dir_all(&settings.output_dir)?;
    let repository = LocalRepository::new(&settings.repository);
    let module = compile_module(settings, identities.module, executor, &repository)?;
    let canonical = settings
        .module
        .access_widener
        .as_deref()
        .map(rules::load_rules)
        .transpose()?;
    if let Some(rules) = &canonical {
        info!("loaded {} canonical access rules", rules.len());
    }

    let mut report = BuildReport::new(settings);
    report.channel = publishing.channel();
    report.dry_run = options.dry_run;

    let module_bundle = write_module_bundle(settings, &module, canonical.as_ref())
        .map_err(PackagerError::ModuleBundle)?;
    report.bundles.push(BundleRecord::from(&module_bundle));
    record_publish(&mut report, &module_bundle, publishing.publish(&module_bundle));

    let context = VariantContext {
        settings,
        module: &module,
        canonical_rules: canonical.as_ref(),
        executor,
        repository: &repository,
    };
    let work: Vec<(&VariantSpec, &BundleIdentity)> =
        settings.variants.iter().zip(&identities.variants).collect();
    for outcome in build_variants(&context, &work, settings.jobs, &publishing) {
        match outcome.bundle {
            Ok(bundle) => {
                report.bundles.push(BundleRecord::from(&bundle));
                record_publish(&mut report, &bundle, outcome.published);
            }
            Err(err) => {
                warn!("{err}");
                report.failures.push(FailureRecord::from(&err));
            }
        }
    }

    let report_path = settings.output_dir.join(REPORT_FILE);
    report.write(&report_path)?;
    Ok(BuildOutcome {
        report,
        report_path,
    })
}

fn write_module_bundle(
    settings: &BuildSettings,
    module: &ModuleArtifact,
    canonical: Option<&AccessRuleSet>,
) -> std::result::Result<ArtifactBundle, StageError> {
    let contents = module.named_jar(settings, canonical);
    write_bundle(
        &settings.project,
        &settings.output_dir,
        BundleParts {
            identity: module.identity.clone(),
            contents: &contents,
            runtime_dependencies: runtime_requirements(&module.dependencies),
            remap: None,
            assembly: None,
        },
    )
}

struct VariantOutcome {
    bundle: std::result::Result<ArtifactBundle, VariantError>,
    published: Option<std::result::Result<PublishedBundle, PublishError>>,
}

/// Run variants in batches of `jobs`, returning outcomes in input order.
fn build_variants<C: RepositoryClient>(
    context: &VariantContext<'_>,
    work: &[(&VariantSpec, &BundleIdentity)],
    jobs: usize,
    publishing: &Publishing<C>,
) -> Vec<VariantOutcome> {
    let mut outcomes = Vec::with_capacity(work.len());
    for batch in work.chunks(jobs.max(1)) {
        std::thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|&(spec, identity)| {
                    scope.spawn(move || {
                        let bundle = build_variant(context, spec, identity.clone());
                        let published = bundle
                            .as_ref()
                            .ok()
                            .and_then(|bundle| publishing.publish(bundle));
                        VariantOutcome { bundle, published }
                    })
                })
                .collect();
            for handle in handles {
                outcomes.push(
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
                );
            }
        });
    }
    outcomes
}

fn record_publish(
    report: &mut BuildReport,
    bundle: &ArtifactBundle,
    result: Option<std::result::Result<PublishedBundle, PublishError>>,
) {
    match result {
        Some(Ok(published)) => report.published.push(published),
        Some(Err(err)) => {
            warn!("publishing {} failed: {err}", bundle.identity.coordinate);
            report.publish_failures.push(FailureRecord::publish(
                bundle.identity.coordinate.to_string(),
                &err,
            ));
        }
        None => {}
    }
}

/// How bundles leave the machine, decided once per run.
enum Publishing<C> {
    Disabled,
    DryRun(PublishTarget),
    Live(Publisher<C>),
    /// Publishing was requested but cannot authenticate; every bundle
    /// records the same failure.
    Unavailable {
        channel: Channel,
        error: PublishError,
    },
}

impl<C: RepositoryClient> Publishing<C> {
    fn prepare(settings: &BuildSettings, options: BuildOptions, client: C) -> Result<Self> {
        if !options.publish {
            return Ok(Self::Disabled);
        }
        let publish = settings
            .publish
            .as_ref()
            .ok_or(PackagerError::PublishNotConfigured)?;
        let target = PublishTarget::select(publish);
        info!("publishing to the {} repository {}", target.channel, target.url);
        if options.dry_run {
            return Ok(Self::DryRun(target));
        }
        Ok(match Credentials::from_env(publish) {
            Ok(credentials) => Self::Live(Publisher::new(client, target, credentials)),
            Err(error) => Self::Unavailable {
                channel: target.channel,
                error,
            },
        })
    }

    fn channel(&self) -> Option<Channel> {
        match self {
            Self::Disabled => None,
            Self::DryRun(target) => Some(target.channel),
            Self::Live(publisher) => Some(publisher.target().channel),
            Self::Unavailable { channel, .. } => Some(*channel),
        }
    }

    fn publish(
        &self,
        bundle: &ArtifactBundle,
    ) -> Option<std::result::Result<PublishedBundle, PublishError>> {
        match self {
            Self::Disabled => None,
            Self::DryRun(target) => Some(plan_uploads(target, bundle).map(|uploads| {
                PublishedBundle {
                    coordinate: bundle.identity.coordinate.to_string(),
                    channel: target.channel,
                    urls: uploads.into_iter().map(|upload| upload.url).collect(),
                }
            })),
            Self::Live(publisher) => Some(publisher.publish(bundle)),
            Self::Unavailable { error, .. } => Some(Err(error.clone())),
        }
    }
}

/// The access rule file `platform`'s bundle would carry, without building.
///
/// Rules are remapped when the variant configures mappings; they are not
/// validated against any classes.
///
/// # Errors
///
/// Returns [`PackagerError::UnknownVariant`] when `platform` is not
/// configured, or the error of loading, remapping or translating the rules.
pub fn preview_rules(settings: &BuildSettings, platform: Platform) -> Result<Option<RenderedRules>> {
    let spec = settings
        .variants
        .iter()
        .find(|spec| spec.platform == platform)
        .ok_or(PackagerError::UnknownVariant { platform })?;
    let canonical = settings
        .module
        .access_widener
        .as_deref()
        .map(rules::load_rules)
        .transpose()?;
    let extra = spec.access_widener.as_deref();
    let rules = match (canonical, extra) {
        (Some(canonical), _) => rules::with_extra(&canonical, extra)?,
        (None, Some(path)) => rules::load_rules(path)?,
        (None, None) => return Ok(None),
    };
    let rules = match &spec.mappings {
        Some(mappings) => {
            let table = remap::load_mappings(mappings)?;
            rules
                .remap(&table)
                .map_err(rules::AccessRuleTranslationError::from)?
        }
        None => rules,
    };
    Ok(Some(rules::render(&rules, platform, &settings.project.mod_id)?))
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
