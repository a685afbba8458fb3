//! Serde model of `trellis.toml` before placeholder expansion.

use serde::Deserialize;
use std::collections::BTreeMap;
use trellis_common::{DependencyScope, Platform};

/// The configuration file as written.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Identity shared by every artefact.
    pub project: ProjectTable,
    /// Free-form properties referenced as `${name}`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// The shared module.
    #[serde(default)]
    pub module: ModuleTable,
    /// Named mapping tables that variants refer to.
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingTableConfig>,
    /// One table per target platform.
    #[serde(default, rename = "variant")]
    pub variants: Vec<VariantTable>,
    /// Publishing endpoints and credential variables.
    #[serde(default)]
    pub publish: Option<PublishTable>,
    /// Output and execution settings.
    #[serde(default)]
    pub build: BuildTable,
    /// Local dependency repository.
    #[serde(default)]
    pub repository: RepositoryTable,
}

/// `[project]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectTable {
    /// Mod identifier used in artefact names.
    pub mod_id: String,
    /// Maven group of every artefact.
    pub group: String,
    /// Version of every artefact.
    pub version: String,
    /// Human-readable name written to the manifest and POM.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional description for the POM.
    #[serde(default)]
    pub description: Option<String>,
}

/// `[module]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleTable {
    /// Artefact suffix of the shared module.
    pub name: String,
    /// Compiled class output directory.
    pub classes: String,
    /// Resource directories copied verbatim.
    pub resources: Vec<String>,
    /// Compile command; absent means the classes are prebuilt.
    pub compile: Option<Vec<String>>,
    /// Canonical access widener.
    pub access_widener: Option<String>,
    /// Module dependencies.
    pub dependencies: Vec<DependencyTable>,
}

impl Default for ModuleTable {
    fn default() -> Self {
        Self {
            name: "common".to_owned(),
            classes: "common/build/classes".to_owned(),
            resources: Vec::new(),
            compile: None,
            access_widener: None,
            dependencies: Vec::new(),
        }
    }
}

/// One dependency declaration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DependencyTable {
    /// `group:artifact:version[:classifier]`, placeholders allowed.
    pub coordinate: String,
    /// Inclusion policy.
    pub scope: DependencyScope,
}

/// `[mappings.<name>]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MappingTableConfig {
    /// Tiny v2 file.
    pub file: String,
    /// Namespace the compiled classes use.
    #[serde(default = "default_from_namespace")]
    pub from: String,
    /// Namespace the platform runtime uses.
    pub to: String,
}

fn default_from_namespace() -> String {
    "named".to_owned()
}

/// `[[variant]]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VariantTable {
    /// Target platform.
    pub platform: Platform,
    /// Compiled platform classes; defaults to `<platform>/build/classes`.
    #[serde(default)]
    pub classes: Option<String>,
    /// Platform resource directories.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Platform compile command.
    #[serde(default)]
    pub compile: Option<Vec<String>>,
    /// Platform-exclusive dependencies.
    #[serde(default)]
    pub dependencies: Vec<DependencyTable>,
    /// Extra access widener merged into the canonical one.
    #[serde(default)]
    pub access_widener: Option<String>,
    /// Name of a `[mappings.<name>]` table.
    #[serde(default)]
    pub mappings: Option<String>,
    /// Mixin configuration files listed in the manifest.
    #[serde(default)]
    pub mixin_configs: Vec<String>,
}

/// `[publish]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PublishTable {
    /// Snapshot repository URL.
    pub snapshot_url: String,
    /// Release repository URL.
    pub release_url: String,
    /// Environment variable holding the username.
    #[serde(default = "default_username_env")]
    pub username_env: String,
    /// Environment variable holding the password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Release flag used when the command line does not set one.
    #[serde(default)]
    pub release: bool,
}

fn default_username_env() -> String {
    "NEXUS_USERNAME".to_owned()
}

fn default_password_env() -> String {
    "NEXUS_PASSWORD".to_owned()
}

/// `[build]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildTable {
    /// Directory receiving bundles and the build report.
    pub output: String,
    /// Parallel variant builds; `0` means one per available CPU.
    pub jobs: usize,
    /// Timeout applied to each compile command.
    pub compile_timeout_secs: u64,
}

impl Default for BuildTable {
    fn default() -> Self {
        Self {
            output: "build/trellis".to_owned(),
            jobs: 0,
            compile_timeout_secs: 600,
        }
    }
}

/// `[repository]`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryTable {
    /// Maven-layout directory holding dependency jars.
    pub local: Option<String>,
}
