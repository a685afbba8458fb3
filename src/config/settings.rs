//! Immutable build settings resolved from [`ProjectConfig`].

use super::error::{ConfigError, Result};
use super::interpolate::Interpolator;
use super::raw::{DependencyTable, MappingTableConfig, ProjectConfig, VariantTable};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::time::Duration;
use trellis_common::{Coordinate, DependencyScope, Platform};

/// Command-line adjustments applied on top of the configuration file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    /// `name=value` property overrides (`-P`).
    pub properties: Vec<String>,
    /// Explicit release flag; `None` keeps the file's value.
    pub release: Option<bool>,
    /// Platforms to build; empty means every configured variant.
    pub platforms: Vec<Platform>,
    /// Replacement local repository.
    pub repository: Option<Utf8PathBuf>,
    /// Replacement output directory.
    pub output: Option<Utf8PathBuf>,
    /// Replacement parallelism.
    pub jobs: Option<usize>,
}

/// Everything a build needs, resolved and validated up front.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildSettings {
    /// Artefact identity shared by every bundle.
    pub project: ProjectSettings,
    /// The shared module.
    pub module: ModuleSettings,
    /// Variants selected for this run, in configuration order.
    pub variants: Vec<VariantSpec>,
    /// Publishing configuration, when present.
    pub publish: Option<PublishSettings>,
    /// Directory holding the configuration file; compile commands run here.
    pub root: Utf8PathBuf,
    /// Local Maven-layout dependency repository.
    pub repository: Utf8PathBuf,
    /// Output directory for bundles and the build report.
    pub output_dir: Utf8PathBuf,
    /// Maximum number of variants built at once.
    pub jobs: usize,
    /// Timeout for each compile command.
    pub compile_timeout: Duration,
    /// The merged property table.
    pub properties: BTreeMap<String, String>,
}

/// Identity of the project.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectSettings {
    /// Mod identifier.
    pub mod_id: String,
    /// Maven group.
    pub group: String,
    /// Artefact version.
    pub version: String,
    /// Display name.
    pub name: Option<String>,
    /// POM description.
    pub description: Option<String>,
}

impl ProjectSettings {
    /// The display name, falling back to the mod identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.mod_id)
    }
}

/// One declared dependency.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DependencyDecl {
    /// Library coordinate.
    pub coordinate: Coordinate,
    /// Inclusion policy.
    pub scope: DependencyScope,
}

/// The shared module.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModuleSettings {
    /// Artefact suffix, usually `common`.
    pub name: String,
    /// Compiled class output directory.
    pub classes: Utf8PathBuf,
    /// Resource directories.
    pub resources: Vec<Utf8PathBuf>,
    /// Compile command, if the module is compiled by Trellis.
    pub compile: Option<Vec<String>>,
    /// Canonical access widener.
    pub access_widener: Option<Utf8PathBuf>,
    /// Module dependencies.
    pub dependencies: Vec<DependencyDecl>,
}

/// Mapping table a variant is remapped with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MappingSettings {
    /// Name of the `[mappings.<name>]` table.
    pub name: String,
    /// Tiny v2 file.
    pub file: Utf8PathBuf,
    /// Source namespace.
    pub from: String,
    /// Target namespace.
    pub to: String,
}

/// One platform variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantSpec {
    /// Target platform.
    pub platform: Platform,
    /// Compiled platform classes.
    pub classes: Utf8PathBuf,
    /// Platform resource directories.
    pub resources: Vec<Utf8PathBuf>,
    /// Platform compile command.
    pub compile: Option<Vec<String>>,
    /// Platform-exclusive dependencies.
    pub dependencies: Vec<DependencyDecl>,
    /// Extra access widener merged into the canonical one.
    pub access_widener: Option<Utf8PathBuf>,
    /// Mapping table for the remap pass.
    pub mappings: Option<MappingSettings>,
    /// Mixin configuration names for the manifest.
    pub mixin_configs: Vec<String>,
}

/// Publishing endpoints and credential sources.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishSettings {
    /// Snapshot repository URL.
    pub snapshot_url: String,
    /// Release repository URL.
    pub release_url: String,
    /// Variable holding the username.
    pub username_env: String,
    /// Variable holding the password.
    pub password_env: String,
    /// Whether this run publishes releases.
    pub release: bool,
}

/// Resolve a parsed configuration against its directory and overrides.
pub(super) fn resolve(
    config: ProjectConfig,
    base_dir: &Utf8Path,
    overrides: &ConfigOverrides,
) -> Result<BuildSettings> {
    let resolver = Resolver {
        props: Interpolator::new(&config.properties, &overrides.properties)?,
        base_dir,
    };

    let project = ProjectSettings {
        mod_id: resolver.string(&config.project.mod_id, "project.mod_id")?,
        group: resolver.string(&config.project.group, "project.group")?,
        version: resolver.string(&config.project.version, "project.version")?,
        name: resolver.optional_string(config.project.name.as_deref(), "project.name")?,
        description: resolver
            .optional_string(config.project.description.as_deref(), "project.description")?,
    };
    validate_mod_id(&project.mod_id)?;

    let module = ModuleSettings {
        name: resolver.string(&config.module.name, "module.name")?,
        classes: resolver.path(&config.module.classes, "module.classes")?,
        resources: resolver.paths(&config.module.resources, "module.resources")?,
        compile: resolver.command(config.module.compile.as_deref(), "module.compile")?,
        access_widener: resolver
            .optional_path(config.module.access_widener.as_deref(), "module.access_widener")?,
        dependencies: resolver.dependencies(&config.module.dependencies, "module.dependencies")?,
    };

    let variants = resolve_variants(&resolver, &config.variants, &config.mappings, overrides)?;

    let publish = config
        .publish
        .map(|table| -> Result<PublishSettings> {
            Ok(PublishSettings {
                snapshot_url: resolver.string(&table.snapshot_url, "publish.snapshot_url")?,
                release_url: resolver.string(&table.release_url, "publish.release_url")?,
                username_env: table.username_env,
                password_env: table.password_env,
                release: overrides.release.unwrap_or(table.release),
            })
        })
        .transpose()?;

    let repository = match (&overrides.repository, &config.repository.local) {
        (Some(path), _) => path.clone(),
        (None, Some(local)) => resolver.path(local, "repository.local")?,
        (None, None) => default_repository()?,
    };
    let output_dir = match &overrides.output {
        Some(path) => path.clone(),
        None => resolver.path(&config.build.output, "build.output")?,
    };
    let jobs = match overrides.jobs.unwrap_or(config.build.jobs) {
        0 => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        jobs => jobs,
    };

    debug!(
        "resolved {} variant(s) for {}:{}",
        variants.len(),
        project.group,
        project.version
    );
    Ok(BuildSettings {
        project,
        module,
        variants,
        publish,
        root: base_dir.to_owned(),
        repository,
        output_dir,
        jobs,
        compile_timeout: Duration::from_secs(config.build.compile_timeout_secs),
        properties: resolver.props.properties().clone(),
    })
}

fn resolve_variants(
    resolver: &Resolver<'_>,
    tables: &[VariantTable],
    mappings: &BTreeMap<String, MappingTableConfig>,
    overrides: &ConfigOverrides,
) -> Result<Vec<VariantSpec>> {
    if tables.is_empty() {
        return Err(ConfigError::NoVariants);
    }
    let mut seen = BTreeSet::new();
    let mut variants = Vec::with_capacity(tables.len());
    for table in tables {
        if !seen.insert(table.platform) {
            return Err(ConfigError::DuplicatePlatform {
                platform: table.platform,
            });
        }
        variants.push(resolve_variant(resolver, table, mappings)?);
    }

    if let Some(platform) = overrides
        .platforms
        .iter()
        .find(|platform| !seen.contains(*platform))
    {
        return Err(ConfigError::NoSuchVariant {
            platform: *platform,
        });
    }
    if !overrides.platforms.is_empty() {
        variants.retain(|variant| overrides.platforms.contains(&variant.platform));
    }
    Ok(variants)
}

fn resolve_variant(
    resolver: &Resolver<'_>,
    table: &VariantTable,
    mappings: &BTreeMap<String, MappingTableConfig>,
) -> Result<VariantSpec> {
    let prefix = format!("variant.{}", table.platform);
    let default_classes = format!("{}/build/classes", table.platform);
    let classes = table.classes.as_deref().unwrap_or(&default_classes);

    let mapping = match &table.mappings {
        None => None,
        Some(name) => {
            let config = mappings
                .get(name)
                .ok_or_else(|| ConfigError::UnknownMappings {
                    platform: table.platform,
                    name: name.clone(),
                })?;
            let field = format!("mappings.{name}");
            Some(MappingSettings {
                name: name.clone(),
                file: resolver.path(&config.file, &format!("{field}.file"))?,
                from: resolver.string(&config.from, &format!("{field}.from"))?,
                to: resolver.string(&config.to, &format!("{field}.to"))?,
            })
        }
    };

    Ok(VariantSpec {
        platform: table.platform,
        classes: resolver.path(classes, &format!("{prefix}.classes"))?,
        resources: resolver.paths(&table.resources, &format!("{prefix}.resources"))?,
        compile: resolver.command(table.compile.as_deref(), &format!("{prefix}.compile"))?,
        dependencies: resolver
            .dependencies(&table.dependencies, &format!("{prefix}.dependencies"))?,
        access_widener: resolver.optional_path(
            table.access_widener.as_deref(),
            &format!("{prefix}.access_widener"),
        )?,
        mappings: mapping,
        mixin_configs: table
            .mixin_configs
            .iter()
            .map(|name| resolver.string(name, &format!("{prefix}.mixin_configs")))
            .collect::<Result<_>>()?,
    })
}

fn validate_mod_id(mod_id: &str) -> Result<()> {
    let valid = !mod_id.is_empty()
        && mod_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidModId {
            value: mod_id.to_owned(),
        })
    }
}

fn home_dir() -> Result<Utf8PathBuf> {
    let dirs = directories_next::BaseDirs::new().ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Utf8PathBuf::from_path_buf(dirs.home_dir().to_path_buf()).map_err(|path| {
        ConfigError::NonUtf8Path {
            path: path.display().to_string(),
        }
    })
}

fn default_repository() -> Result<Utf8PathBuf> {
    Ok(home_dir()?.join(".m2").join("repository"))
}

struct Resolver<'a> {
    props: Interpolator,
    base_dir: &'a Utf8Path,
}

impl Resolver<'_> {
    fn string(&self, value: &str, field: &str) -> Result<String> {
        self.props.expand(value, field)
    }

    fn optional_string(&self, value: Option<&str>, field: &str) -> Result<Option<String>> {
        value.map(|raw| self.string(raw, field)).transpose()
    }

    fn path(&self, value: &str, field: &str) -> Result<Utf8PathBuf> {
        let expanded = self.string(value, field)?;
        if let Some(rest) = expanded.strip_prefix("~/") {
            return Ok(home_dir()?.join(rest));
        }
        let path = Utf8PathBuf::from(expanded);
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.base_dir.join(path))
        }
    }

    fn optional_path(&self, value: Option<&str>, field: &str) -> Result<Option<Utf8PathBuf>> {
        value.map(|raw| self.path(raw, field)).transpose()
    }

    fn paths(&self, values: &[String], field: &str) -> Result<Vec<Utf8PathBuf>> {
        values.iter().map(|value| self.path(value, field)).collect()
    }

    fn command(&self, value: Option<&[String]>, field: &str) -> Result<Option<Vec<String>>> {
        value
            .filter(|argv| !argv.is_empty())
            .map(|argv| argv.iter().map(|arg| self.string(arg, field)).collect())
            .transpose()
    }

    fn dependencies(&self, tables: &[DependencyTable], field: &str) -> Result<Vec<DependencyDecl>> {
        tables
            .iter()
            .enumerate()
            .map(|(index, table)| {
                let label = format!("{field}[{index}]");
                let text = self.string(&table.coordinate, &label)?;
                let coordinate =
                    text.parse::<Coordinate>()
                        .map_err(|err| ConfigError::InvalidCoordinate {
                            field: label,
                            reason: err.to_string(),
                        })?;
                Ok(DependencyDecl {
                    coordinate,
                    scope: table.scope,
                })
            })
            .collect()
    }
}
