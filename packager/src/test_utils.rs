//! Shared test utilities for the packager crate.

use crate::classfile::{Attribute, ClassFile, Constant, ConstantPool, Member};
use crate::executor::CommandExecutor;
use crate::jar::JarContents;
use crate::publish::{Credentials, PublishError, RepositoryClient};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::VecDeque;
use std::io;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use trellis::config::{
    BuildSettings, ConfigOverrides, DependencyDecl, MappingSettings, VariantSpec,
};
use trellis_common::{DependencyScope, Platform};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// A three-platform project used by unit tests.
pub const SAMPLE_CONFIG: &str = r#"
[project]
mod_id = "fallingtrees"
group = "me.pandamods"
version = "${mod_version}"
name = "Falling Trees"

[properties]
mod_version = "0.13.0"

[module]
access_widener = "common/src/main/resources/fallingtrees.accesswidener"

[[variant]]
platform = "fabric"

[[variant]]
platform = "forge"

[[variant]]
platform = "neoforge"

[publish]
snapshot_url = "https://repo.example.com/snapshots"
release_url = "https://repo.example.com/releases"

[repository]
local = "repo"
"#;

/// [`SAMPLE_CONFIG`] resolved against `/work`.
///
/// # Panics
///
/// Panics if the sample stops being valid configuration.
#[must_use]
pub fn sample_settings() -> BuildSettings {
    BuildSettings::from_toml(
        SAMPLE_CONFIG,
        Utf8Path::new("trellis.toml"),
        Utf8Path::new("/work"),
        &ConfigOverrides::default(),
    )
    .expect("sample configuration is valid")
}

/// Write `contents` as the jar of `coordinate` in a Maven-layout repository
/// rooted at `root` and return its path.
///
/// # Panics
///
/// Panics if the jar cannot be written.
#[must_use]
pub fn install_jar(
    root: &Utf8Path,
    coordinate: &trellis_common::Coordinate,
    contents: &JarContents,
) -> Utf8PathBuf {
    let path = root.join(coordinate.repository_path());
    contents.write(&path).expect("install jar");
    path
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "javac").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

impl ExpectedCall {
    /// Expect `cmd` with `args` and answer with `result`.
    #[must_use]
    pub fn new(cmd: &str, args: &[&str], result: io::Result<Output>) -> Self {
        Self {
            cmd: cmd.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            result,
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: Mutex<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: Mutex::new(expected.into()),
        }
    }

    /// An executor that must never be called.
    #[must_use]
    pub fn unused() -> Self {
        Self::new(Vec::new())
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let expected = self.expected.lock().expect("stub executor lock poisoned");
        assert!(expected.is_empty(), "expected no further command invocations");
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], _cwd: &Utf8Path) -> io::Result<Output> {
        let mut expected = self.expected.lock().expect("stub executor lock poisoned");
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args, args);

        call.result
    }
}

/// Assembles minimal class files for tests.
///
/// Member references, strings and lambdas only populate the constant pool;
/// no bytecode refers to them, which is all the remapper and the class index
/// look at.
#[derive(Debug)]
pub struct ClassBuilder {
    class: ClassFile,
    bootstrap_methods: Vec<(u16, Vec<u16>)>,
}

impl ClassBuilder {
    /// Start a public class with an optional superclass.
    ///
    /// # Panics
    ///
    /// Panics if the constant pool overflows.
    #[must_use]
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut pool = ConstantPool::default();
        let this_class = class_entry(&mut pool, name);
        let super_class = super_name.map_or(0, |parent| class_entry(&mut pool, parent));
        Self {
            class: ClassFile {
                minor_version: 0,
                major_version: 65,
                pool,
                access: 0x0021,
                this_class,
                super_class,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
            },
            bootstrap_methods: Vec::new(),
        }
    }

    fn utf8(&mut self, value: &str) -> u16 {
        self.class.pool.intern_utf8(value).expect("pool has room")
    }

    fn push(&mut self, constant: Constant) -> u16 {
        self.class.pool.push(constant).expect("pool has room")
    }

    fn class_ref(&mut self, name: &str) -> u16 {
        class_entry(&mut self.class.pool, name)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        self.class
            .pool
            .intern_name_and_type(name, descriptor)
            .expect("pool has room")
    }

    fn attribute(&mut self, name: &str, data: Vec<u8>) -> Attribute {
        Attribute {
            name: self.utf8(name),
            data,
        }
    }

    /// Implement an interface.
    #[must_use]
    pub fn interface(mut self, name: &str) -> Self {
        let index = self.class_ref(name);
        self.class.interfaces.push(index);
        self
    }

    /// Declare a field.
    #[must_use]
    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        let member = Member {
            access: 0x0001,
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
            attributes: Vec::new(),
        };
        self.class.fields.push(member);
        self
    }

    /// Declare a method without code.
    #[must_use]
    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        let member = Member {
            access: 0x0001,
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
            attributes: Vec::new(),
        };
        self.class.methods.push(member);
        self
    }

    /// Declare a method whose `Code` attribute carries one local variable
    /// table entry.
    #[must_use]
    pub fn method_with_local(
        mut self,
        name: &str,
        descriptor: &str,
        local_name: &str,
        local_descriptor: &str,
    ) -> Self {
        let mut table = Vec::new();
        let name_index = self.utf8(local_name);
        let descriptor_index = self.utf8(local_descriptor);
        put(&mut table, &[1, 0, 1, name_index, descriptor_index, 0]);
        let lvt = self.attribute("LocalVariableTable", table);

        let mut code = Vec::new();
        put(&mut code, &[1, 1]);
        code.extend_from_slice(&1_u32.to_be_bytes());
        code.push(0xB1);
        put(&mut code, &[0, 1, lvt.name]);
        code.extend_from_slice(&u32::try_from(lvt.data.len()).expect("small").to_be_bytes());
        code.extend_from_slice(&lvt.data);
        let code_attribute = self.attribute("Code", code);

        let member = Member {
            access: 0x0001,
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
            attributes: vec![code_attribute],
        };
        self.class.methods.push(member);
        self
    }

    /// Reference a field of another class.
    #[must_use]
    pub fn field_ref(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        let class = self.class_ref(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.push(Constant::FieldRef {
            class,
            name_and_type,
        });
        self
    }

    /// Reference a method of another class.
    #[must_use]
    pub fn method_ref(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        let class = self.class_ref(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.push(Constant::MethodRef {
            class,
            name_and_type,
        });
        self
    }

    /// Add a string literal.
    #[must_use]
    pub fn string_constant(mut self, value: &str) -> Self {
        let index = self.utf8(value);
        self.push(Constant::String(index));
        self
    }

    /// Add a long literal.
    #[must_use]
    pub fn long_constant(mut self, value: u64) -> Self {
        self.push(Constant::Long(value));
        self
    }

    /// Attach a class `Signature` attribute.
    #[must_use]
    pub fn signature(mut self, signature: &str) -> Self {
        let index = self.utf8(signature);
        let attribute = self.attribute("Signature", index.to_be_bytes().to_vec());
        self.class.attributes.push(attribute);
        self
    }

    /// Attach a runtime-visible annotation with no elements.
    #[must_use]
    pub fn annotation(mut self, type_descriptor: &str) -> Self {
        let type_index = self.utf8(type_descriptor);
        let mut data = Vec::new();
        put(&mut data, &[1, type_index, 0]);
        let attribute = self.attribute("RuntimeVisibleAnnotations", data);
        self.class.attributes.push(attribute);
        self
    }

    /// Attach a runtime-visible type annotation on the superclass
    /// (`CLASS_EXTENDS`) with no elements.
    #[must_use]
    pub fn extends_type_annotation(mut self, type_descriptor: &str) -> Self {
        let type_index = self.utf8(type_descriptor);
        let mut data = Vec::new();
        put(&mut data, &[1]);
        data.push(0x10);
        put(&mut data, &[0xFFFF]);
        data.push(0);
        put(&mut data, &[type_index, 0]);
        let attribute = self.attribute("RuntimeVisibleTypeAnnotations", data);
        self.class.attributes.push(attribute);
        self
    }

    /// Record an `InnerClasses` entry.
    #[must_use]
    pub fn inner_class(mut self, inner: &str, outer: &str, simple_name: &str) -> Self {
        let inner_index = self.class_ref(inner);
        let outer_index = self.class_ref(outer);
        let name_index = self.utf8(simple_name);
        let mut data = Vec::new();
        put(&mut data, &[1, inner_index, outer_index, name_index, 0x0009]);
        let attribute = self.attribute("InnerClasses", data);
        self.class.attributes.push(attribute);
        self
    }

    /// Add a `LambdaMetafactory` call site producing `interface` whose
    /// functional method is `sam_name` with `sam_descriptor`.
    #[must_use]
    pub fn lambda(mut self, interface: &str, sam_name: &str, sam_descriptor: &str) -> Self {
        let factory = self.class_ref("java/lang/invoke/LambdaMetafactory");
        let factory_nat = self.name_and_type(
            "metafactory",
            "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
        );
        let factory_ref = self.push(Constant::MethodRef {
            class: factory,
            name_and_type: factory_nat,
        });
        let handle = self.push(Constant::MethodHandle {
            kind: 6,
            reference: factory_ref,
        });
        let sam_type_utf8 = self.utf8(sam_descriptor);
        let sam_type = self.push(Constant::MethodType(sam_type_utf8));
        let bootstrap = u16::try_from(self.bootstrap_methods.len()).expect("small");
        self.bootstrap_methods.push((handle, vec![sam_type, sam_type]));
        let call_site = self.name_and_type(sam_name, &format!("()L{interface};"));
        self.push(Constant::InvokeDynamic {
            bootstrap,
            name_and_type: call_site,
        });
        self
    }

    /// Encode the class.
    ///
    /// # Panics
    ///
    /// Panics if the class cannot be encoded.
    #[must_use]
    pub fn build(mut self) -> Vec<u8> {
        if !self.bootstrap_methods.is_empty() {
            let methods = std::mem::take(&mut self.bootstrap_methods);
            let mut data = Vec::new();
            put(&mut data, &[u16::try_from(methods.len()).expect("small")]);
            for (handle, args) in methods {
                put(&mut data, &[handle, u16::try_from(args.len()).expect("small")]);
                put(&mut data, &args);
            }
            let attribute = self.attribute("BootstrapMethods", data);
            self.class.attributes.push(attribute);
        }
        self.class.to_bytes().expect("encodable class")
    }
}

fn class_entry(pool: &mut ConstantPool, name: &str) -> u16 {
    let name_index = pool.intern_utf8(name).expect("pool has room");
    let existing = pool.iter().find_map(|(index, constant)| {
        (*constant == Constant::Class(name_index)).then_some(index)
    });
    existing.unwrap_or_else(|| pool.push(Constant::Class(name_index)).expect("pool has room"))
}

fn put(out: &mut Vec<u8>, values: &[u16]) {
    for value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Internal name of the Minecraft class the sample project's rules target.
pub const SAMPLE_BLOCK: &str = "net/minecraft/world/level/block/Block";
/// Internal name of the sample module class extending [`SAMPLE_BLOCK`].
pub const SAMPLE_TREE_BLOCK: &str = "me/pandamods/fallingtrees/TreeBlock";
/// Internal name of the Fabric entrypoint in the sample project.
pub const SAMPLE_ENTRYPOINT: &str = "me/pandamods/fallingtrees/fabric/FallingTreesFabric";
/// Internal name of the embedded library class.
pub const SAMPLE_LIBRARY_CLASS: &str = "me/pandamods/pandalib/PandaLib";

/// Tiny v2 mappings used by the sample Fabric variant.
pub const SAMPLE_MAPPINGS: &str = "tiny\t2\t0\tnamed\tintermediary\n\
c\tnet/minecraft/world/level/block/Block\tnet/minecraft/class_2248\n\
\tm\t()V\tonRemove\tmethod_9536\n";

/// [`SAMPLE_CONFIG`] laid out on disk with prebuilt classes.
///
/// The module compiles against a compile-only Minecraft jar and embeds a
/// library; Fabric remaps to intermediary and Forge declares a mixin
/// configuration. No compile commands are configured, so builds never spawn
/// processes.
#[derive(Debug)]
pub struct SampleProject {
    _dir: tempfile::TempDir,
    /// Project root.
    pub root: Utf8PathBuf,
    /// Resolved settings pointing into [`Self::root`].
    pub settings: BuildSettings,
}

impl SampleProject {
    /// Lay out the sample project in a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the project cannot be written.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let mut settings = sample_settings();
        settings.root = root.clone();
        settings.repository = root.join("repo");
        settings.output_dir = root.join("build/trellis");
        settings.module.classes = root.join("common/classes");
        settings.module.dependencies = vec![
            sample_dependency("net.minecraft:minecraft-merged:1.21.1", DependencyScope::CompileOnly),
            sample_dependency("me.pandamods:pandalib:0.5.1", DependencyScope::Embedded),
        ];

        let widener = root.join("common/fallingtrees.accesswidener");
        write_file(
            &widener,
            format!(
                "accessWidener v1 named\nextendable class {SAMPLE_BLOCK}\naccessible method {SAMPLE_BLOCK} onRemove ()V\n"
            )
            .as_bytes(),
        );
        settings.module.access_widener = Some(widener);

        let mappings = root.join("mappings/intermediary.tiny");
        write_file(&mappings, SAMPLE_MAPPINGS.as_bytes());
        for spec in &mut settings.variants {
            spec.classes = root.join(format!("{}/classes", spec.platform));
            std::fs::create_dir_all(&spec.classes).expect("platform classes");
            match spec.platform {
                Platform::Fabric => {
                    spec.mappings = Some(MappingSettings {
                        name: "intermediary".to_owned(),
                        file: mappings.clone(),
                        from: "named".to_owned(),
                        to: "intermediary".to_owned(),
                    });
                }
                Platform::Forge => spec.mixin_configs = vec!["fallingtrees.mixins.json".to_owned()],
                Platform::NeoForge => {}
            }
        }

        let project = Self {
            _dir: dir,
            root,
            settings,
        };
        project.write_class(
            &project.settings.module.classes,
            SAMPLE_TREE_BLOCK,
            ClassBuilder::new(SAMPLE_TREE_BLOCK, Some(SAMPLE_BLOCK))
                .method("onRemove", "()V")
                .method_ref(SAMPLE_TREE_BLOCK, "onRemove", "()V")
                .build(),
        );
        project.write_class(
            &project.root.join("fabric/classes"),
            SAMPLE_ENTRYPOINT,
            ClassBuilder::new(SAMPLE_ENTRYPOINT, Some("java/lang/Object"))
                .method_ref(SAMPLE_TREE_BLOCK, "onRemove", "()V")
                .build(),
        );
        project.install(
            "net.minecraft:minecraft-merged:1.21.1",
            &[(
                &format!("{SAMPLE_BLOCK}.class"),
                ClassBuilder::new(SAMPLE_BLOCK, Some("java/lang/Object"))
                    .method("onRemove", "()V")
                    .build(),
            )],
        );
        project.install(
            "me.pandamods:pandalib:0.5.1",
            &[(&format!("{SAMPLE_LIBRARY_CLASS}.class"), sample_library("0.5.1"))],
        );
        project
    }

    /// Install a jar holding `entries` into the project's repository.
    ///
    /// # Panics
    ///
    /// Panics if `coordinate` is invalid or the jar cannot be written.
    pub fn install(&self, coordinate: &str, entries: &[(&str, Vec<u8>)]) {
        let contents: JarContents = entries
            .iter()
            .map(|(name, bytes)| ((*name).to_owned(), bytes.clone()))
            .collect();
        let _jar = install_jar(
            &self.settings.repository,
            &coordinate.parse().expect("valid coordinate"),
            &contents,
        );
    }

    /// Write `bytes` as class `name` below `dir`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_class(&self, dir: &Utf8Path, name: &str, bytes: Vec<u8>) {
        write_file(&dir.join(format!("{name}.class")), &bytes);
    }

    /// The configured variant for `platform`.
    ///
    /// # Panics
    ///
    /// Panics if the variant is not configured.
    #[must_use]
    pub fn variant(&self, platform: Platform) -> &VariantSpec {
        self.settings
            .variants
            .iter()
            .find(|spec| spec.platform == platform)
            .expect("configured variant")
    }

    /// Mutable access to the configured variant for `platform`.
    ///
    /// # Panics
    ///
    /// Panics if the variant is not configured.
    pub fn variant_mut(&mut self, platform: Platform) -> &mut VariantSpec {
        self.settings
            .variants
            .iter_mut()
            .find(|spec| spec.platform == platform)
            .expect("configured variant")
    }

    /// Path the bundle jar of `platform` is written to.
    #[must_use]
    pub fn bundle_path(&self, platform: Platform) -> Utf8PathBuf {
        self.settings
            .output_dir
            .join(format!("fallingtrees-{platform}-0.13.0.jar"))
    }
}

impl Default for SampleProject {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded library class, tagged with `marker` so versions differ.
#[must_use]
pub fn sample_library(marker: &str) -> Vec<u8> {
    ClassBuilder::new(SAMPLE_LIBRARY_CLASS, Some("java/lang/Object"))
        .string_constant(marker)
        .build()
}

/// A dependency declaration.
///
/// # Panics
///
/// Panics if `coordinate` is invalid.
#[must_use]
pub fn sample_dependency(coordinate: &str, scope: DependencyScope) -> DependencyDecl {
    DependencyDecl {
        coordinate: coordinate.parse().expect("valid coordinate"),
        scope,
    }
}

/// Username placed in the environment by [`with_credentials`].
pub const SAMPLE_USERNAME: &str = "deployer";
/// Password placed in the environment by [`with_credentials`].
pub const SAMPLE_PASSWORD: &str = "hunter2";

/// Run `f` with the default credential variables set to
/// [`SAMPLE_USERNAME`] and [`SAMPLE_PASSWORD`].
pub fn with_credentials<R>(f: impl FnOnce() -> R) -> R {
    temp_env::with_vars(
        [
            ("NEXUS_USERNAME", Some(SAMPLE_USERNAME)),
            ("NEXUS_PASSWORD", Some(SAMPLE_PASSWORD)),
        ],
        f,
    )
}

/// A [`RepositoryClient`] that records every upload instead of sending it.
///
/// URLs listed in `rejected` answer with HTTP 401.
#[derive(Debug, Default)]
pub struct RecordingClient {
    uploads: Mutex<Vec<(String, usize)>>,
    rejected: Vec<String>,
}

impl RecordingClient {
    /// A client that rejects uploads to any URL containing one of `fragments`.
    #[must_use]
    pub fn rejecting(fragments: &[&str]) -> Self {
        Self {
            uploads: Mutex::default(),
            rejected: fragments.iter().map(|&fragment| fragment.to_owned()).collect(),
        }
    }

    /// URLs uploaded so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if a previous upload panicked while holding the record.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.uploads
            .lock()
            .expect("upload record")
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

impl RepositoryClient for &RecordingClient {
    fn put(&self, url: &str, body: &[u8], _credentials: &Credentials) -> Result<(), PublishError> {
        if self.rejected.iter().any(|fragment| url.contains(fragment.as_str())) {
            return Err(PublishError::Unauthorized {
                url: url.to_owned(),
                status: 401,
            });
        }
        self.uploads
            .lock()
            .expect("upload record")
            .push((url.to_owned(), body.len()));
        Ok(())
    }
}

fn write_file(path: &Utf8Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("parent directory");
    }
    std::fs::write(path, bytes).expect("write file");
}
