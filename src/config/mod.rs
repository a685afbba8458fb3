//! Loader for `trellis.toml`.
//!
//! The file is deserialised into [`ProjectConfig`] exactly as written, then
//! resolved into [`BuildSettings`]: `${name}` placeholders are expanded from
//! `[properties]` overlaid by `-P` overrides, relative paths are anchored at
//! the file's directory, coordinates are parsed, and variant tables are
//! validated. Every pipeline stage receives the resulting value by reference
//! and never consults the environment for build properties.

mod error;
mod interpolate;
mod raw;
mod settings;

pub use error::{ConfigError, Result};
pub use interpolate::Interpolator;
pub use raw::{
    BuildTable, DependencyTable, MappingTableConfig, ModuleTable, ProjectConfig, ProjectTable,
    PublishTable, RepositoryTable, VariantTable,
};
pub use settings::{
    BuildSettings, ConfigOverrides, DependencyDecl, MappingSettings, ModuleSettings,
    ProjectSettings, PublishSettings, VariantSpec,
};

use camino::Utf8Path;
use log::debug;

impl BuildSettings {
    /// Read and resolve a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, is not valid
    /// configuration, or fails validation.
    pub fn load(path: &Utf8Path, overrides: &ConfigOverrides) -> Result<Self> {
        debug!("loading configuration from {path}");
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
        Self::from_toml(&text, path, base_dir, overrides)
    }

    /// Resolve configuration text; `path` is used in error messages only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid TOML or failed validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use trellis::config::{BuildSettings, ConfigOverrides};
    ///
    /// let text = r#"
    /// [project]
    /// mod_id = "fallingtrees"
    /// group = "me.pandamods"
    /// version = "${mod_version}"
    ///
    /// [properties]
    /// mod_version = "0.13.0"
    ///
    /// [[variant]]
    /// platform = "fabric"
    ///
    /// [repository]
    /// local = "repo"
    /// "#;
    /// let settings = BuildSettings::from_toml(
    ///     text,
    ///     Utf8Path::new("trellis.toml"),
    ///     Utf8Path::new("/work"),
    ///     &ConfigOverrides::default(),
    /// )
    /// .expect("valid configuration");
    /// assert_eq!(settings.project.version, "0.13.0");
    /// assert_eq!(settings.repository, Utf8Path::new("/work/repo"));
    /// ```
    pub fn from_toml(
        text: &str,
        path: &Utf8Path,
        base_dir: &Utf8Path,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let config: ProjectConfig = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        settings::resolve(config, base_dir, overrides)
    }

    /// The variant for `platform`, if selected.
    #[must_use]
    pub fn variant(&self, platform: trellis_common::Platform) -> Option<&VariantSpec> {
        self.variants
            .iter()
            .find(|variant| variant.platform == platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use trellis_common::{DependencyScope, Platform};

    #[fixture]
    fn source() -> &'static str {
        r#"
[project]
mod_id = "fallingtrees"
group = "me.pandamods"
version = "${mod_version}+${minecraft_version}"
name = "Falling Trees"

[properties]
mod_version = "0.13.0"
minecraft_version = "1.21.1"
pandalib_version = "0.5.2"

[module]
classes = "common/build/classes"
access_widener = "common/src/main/resources/fallingtrees.accesswidener"
dependencies = [
    { coordinate = "me.pandamods:pandalib-common:${pandalib_version}", scope = "compile-only" },
]

[mappings.intermediary]
file = "mappings/mappings.tiny"
to = "intermediary"

[[variant]]
platform = "fabric"
mappings = "intermediary"
dependencies = [
    { coordinate = "me.pandamods:pandalib-fabric:${pandalib_version}", scope = "embedded" },
]

[[variant]]
platform = "neoforge"
mixin_configs = ["fallingtrees.mixins.json"]

[publish]
snapshot_url = "https://maven.example.org/snapshots"
release_url = "https://maven.example.org/releases"

[repository]
local = "/srv/m2"
"#
    }

    fn resolve(text: &str, overrides: &ConfigOverrides) -> Result<BuildSettings> {
        BuildSettings::from_toml(
            text,
            Utf8Path::new("trellis.toml"),
            Utf8Path::new("/work"),
            overrides,
        )
    }

    #[rstest]
    fn resolves_properties_paths_and_dependencies(source: &str) {
        let settings = resolve(source, &ConfigOverrides::default()).expect("valid");
        assert_eq!(settings.project.version, "0.13.0+1.21.1");
        assert_eq!(settings.project.display_name(), "Falling Trees");
        assert_eq!(settings.module.name, "common");
        assert_eq!(
            settings.module.classes,
            Utf8Path::new("/work/common/build/classes")
        );
        let dependency = settings.module.dependencies.first().expect("dependency");
        assert_eq!(dependency.coordinate.version(), "0.5.2");
        assert_eq!(dependency.scope, DependencyScope::CompileOnly);
        assert_eq!(settings.repository, Utf8Path::new("/srv/m2"));
        assert_eq!(settings.output_dir, Utf8Path::new("/work/build/trellis"));
    }

    #[rstest]
    fn variants_default_their_class_directory(source: &str) {
        let settings = resolve(source, &ConfigOverrides::default()).expect("valid");
        let neoforge = settings.variant(Platform::NeoForge).expect("neoforge");
        assert_eq!(neoforge.classes, Utf8Path::new("/work/neoforge/build/classes"));
        assert_eq!(neoforge.mixin_configs, vec!["fallingtrees.mixins.json".to_owned()]);
        let fabric = settings.variant(Platform::Fabric).expect("fabric");
        let mappings = fabric.mappings.as_ref().expect("mappings");
        assert_eq!(mappings.from, "named");
        assert_eq!(mappings.to, "intermediary");
    }

    #[rstest]
    fn release_flag_defaults_to_snapshot(source: &str) {
        let settings = resolve(source, &ConfigOverrides::default()).expect("valid");
        assert!(!settings.publish.expect("publish").release);
    }

    #[rstest]
    fn overrides_apply_to_properties_release_and_platforms(source: &str) {
        let overrides = ConfigOverrides {
            properties: vec!["mod_version=0.14.0".to_owned()],
            release: Some(true),
            platforms: vec![Platform::Fabric],
            jobs: Some(3),
            ..ConfigOverrides::default()
        };
        let settings = resolve(source, &overrides).expect("valid");
        assert_eq!(settings.project.version, "0.14.0+1.21.1");
        assert!(settings.publish.expect("publish").release);
        assert_eq!(settings.variants.len(), 1);
        assert_eq!(settings.jobs, 3);
    }

    #[rstest]
    fn rejects_platform_without_variant(source: &str) {
        let overrides = ConfigOverrides {
            platforms: vec![Platform::Forge],
            ..ConfigOverrides::default()
        };
        assert_eq!(
            resolve(source, &overrides),
            Err(ConfigError::NoSuchVariant {
                platform: Platform::Forge
            })
        );
    }

    #[rstest]
    fn rejects_duplicate_platforms(source: &str) {
        let text = format!("{source}\n[[variant]]\nplatform = \"fabric\"\n");
        assert_eq!(
            resolve(&text, &ConfigOverrides::default()),
            Err(ConfigError::DuplicatePlatform {
                platform: Platform::Fabric
            })
        );
    }

    #[rstest]
    fn rejects_unknown_mapping_reference(source: &str) {
        let text = source.replace("mappings = \"intermediary\"", "mappings = \"srg\"");
        assert!(matches!(
            resolve(&text, &ConfigOverrides::default()),
            Err(ConfigError::UnknownMappings { .. })
        ));
    }

    #[rstest]
    fn rejects_unknown_fields(source: &str) {
        let text = source.replace("[project]", "[project]\nflavour = \"oak\"");
        assert!(matches!(
            resolve(&text, &ConfigOverrides::default()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[rstest]
    #[case("Falling Trees")]
    #[case("")]
    fn rejects_invalid_mod_ids(source: &str, #[case] mod_id: &str) {
        let text = source.replace("\"fallingtrees\"", &format!("\"{mod_id}\""));
        assert!(matches!(
            resolve(&text, &ConfigOverrides::default()),
            Err(ConfigError::InvalidModId { .. })
        ));
    }

    #[rstest]
    fn rejects_empty_variant_list() {
        let text = "[project]\nmod_id = \"m\"\ngroup = \"g\"\nversion = \"1\"\n";
        assert_eq!(
            resolve(text, &ConfigOverrides::default()),
            Err(ConfigError::NoVariants)
        );
    }

    #[rstest]
    fn load_anchors_paths_at_the_file(source: &str) {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8");
        let path = root.join("trellis.toml");
        std::fs::write(&path, source).expect("config");

        let settings = BuildSettings::load(&path, &ConfigOverrides::default()).expect("valid");
        assert_eq!(settings.root, root);
        assert_eq!(settings.module.classes, root.join("common/build/classes"));
    }

    #[rstest]
    fn load_reports_unreadable_files() {
        let path = Utf8Path::new("/nonexistent/trellis.toml");
        assert!(matches!(
            BuildSettings::load(path, &ConfigOverrides::default()),
            Err(ConfigError::Read { path: ref reported, .. }) if reported == path
        ));
    }

    #[rstest]
    fn repository_defaults_to_the_maven_home(source: &str) {
        let text = source.replace("[repository]\nlocal = \"/srv/m2\"\n", "");
        let settings = temp_env::with_var("HOME", Some("/home/builder"), || {
            resolve(&text, &ConfigOverrides::default())
        })
        .expect("valid");
        assert_eq!(
            settings.repository,
            Utf8Path::new("/home/builder/.m2/repository")
        );
    }
}
