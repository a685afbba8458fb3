//! Compile steps for the shared module and each platform variant.
//!
//! Trellis does not drive a Java compiler itself. A configured argv is run
//! through a [`CommandExecutor`] after expanding the `{classes}` and
//! `{classpath}` placeholders; the class output directory plus resource
//! directories are then collected into [`JarContents`]. Without a command
//! the class directory is taken as prebuilt.

use crate::executor::CommandExecutor;
use crate::jar::{JarContents, JarError};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::io;
use thiserror::Error;

/// Lines of compiler stderr kept in a [`CompileError::Failed`].
const STDERR_TAIL_LINES: usize = 20;

#[cfg(windows)]
const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const CLASSPATH_SEPARATOR: &str = ":";

/// Errors raised while compiling or collecting a unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The compile command could not be started.
    #[error("failed to run the compile command for {label}: {reason}")]
    Spawn {
        /// Unit being compiled.
        label: String,
        /// Description of the spawn failure.
        reason: String,
    },

    /// The compile command exited unsuccessfully.
    #[error("compile command for {label} failed with {status}:\n{stderr}")]
    Failed {
        /// Unit being compiled.
        label: String,
        /// Exit status description.
        status: String,
        /// Tail of the command's stderr.
        stderr: String,
    },

    /// The compile command exceeded its time limit.
    #[error("compile command for {label} timed out")]
    TimedOut {
        /// Unit being compiled.
        label: String,
    },

    /// The class output directory does not exist.
    #[error("no compiled classes for {label} at {path}")]
    MissingOutput {
        /// Unit being compiled.
        label: String,
        /// Expected class directory.
        path: Utf8PathBuf,
    },

    /// A dependency needed on the compile classpath could not be located.
    #[error("cannot compile {label}: {reason}")]
    UnresolvedDependency {
        /// Unit being compiled.
        label: String,
        /// Resolution failure.
        reason: String,
    },

    /// Compiled output could not be read.
    #[error("failed to collect output for {label}")]
    Collect {
        /// Unit being compiled.
        label: String,
        /// Underlying failure.
        #[source]
        source: JarError,
    },
}

/// Result type for compile operations.
pub type Result<T> = std::result::Result<T, CompileError>;

/// One compile invocation.
#[derive(Debug, Clone, Copy)]
pub struct CompileUnit<'a> {
    /// Name used in logs and errors (`common`, `fabric`, ...).
    pub label: &'a str,
    /// Command argv, or `None` when the classes are prebuilt.
    pub command: Option<&'a [String]>,
    /// Directory the compiler writes classes to.
    pub classes: &'a Utf8Path,
    /// Resource directories copied into the output.
    pub resources: &'a [Utf8PathBuf],
    /// Jars and directories on the compile classpath.
    pub classpath: &'a [Utf8PathBuf],
    /// Working directory for the command.
    pub cwd: &'a Utf8Path,
}

impl CompileUnit<'_> {
    fn expand(&self, arg: &str) -> String {
        let classpath = self
            .classpath
            .iter()
            .map(|path| path.as_str())
            .collect::<Vec<_>>()
            .join(CLASSPATH_SEPARATOR);
        arg.replace("{classes}", self.classes.as_str())
            .replace("{classpath}", &classpath)
    }
}

/// Compile `unit` (when it has a command) and collect its output.
///
/// # Errors
///
/// Returns [`CompileError`] when the command fails to start, exits with a
/// failure status, times out, or leaves no class directory behind.
pub fn compile(executor: &dyn CommandExecutor, unit: &CompileUnit<'_>) -> Result<JarContents> {
    if let Some(argv) = unit.command {
        run_command(executor, unit, argv)?;
    } else {
        debug!("{}: using prebuilt classes from {}", unit.label, unit.classes);
    }

    if !unit.classes.is_dir() {
        return Err(CompileError::MissingOutput {
            label: unit.label.to_owned(),
            path: unit.classes.to_owned(),
        });
    }

    let collect = |source: JarError| CompileError::Collect {
        label: unit.label.to_owned(),
        source,
    };
    let mut contents = JarContents::from_directory(unit.classes).map_err(collect)?;
    for resources in unit.resources {
        contents.add_directory(resources).map_err(collect)?;
    }
    debug!(
        "{}: collected {} entries ({} classes)",
        unit.label,
        contents.len(),
        contents.class_entries().count()
    );
    Ok(contents)
}

fn run_command(
    executor: &dyn CommandExecutor,
    unit: &CompileUnit<'_>,
    argv: &[String],
) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        return Err(CompileError::Spawn {
            label: unit.label.to_owned(),
            reason: "empty command".to_owned(),
        });
    };
    let program = unit.expand(program);
    let args: Vec<String> = args.iter().map(|arg| unit.expand(arg)).collect();
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    debug!("{}: running {program} {}", unit.label, args.join(" "));

    let output = executor
        .run(&program, &arg_refs, unit.cwd)
        .map_err(|err| match err.kind() {
            io::ErrorKind::TimedOut => CompileError::TimedOut {
                label: unit.label.to_owned(),
            },
            _ => CompileError::Spawn {
                label: unit.label.to_owned(),
                reason: err.to_string(),
            },
        })?;

    if output.status.success() {
        return Ok(());
    }
    Err(CompileError::Failed {
        label: unit.label.to_owned(),
        status: output.status.to_string(),
        stderr: stderr_tail(&output.stderr),
    })
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines.get(start..).unwrap_or_default().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        root: Utf8PathBuf,
        classes: Utf8PathBuf,
        resources: Vec<Utf8PathBuf>,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let classes = root.join("classes");
        let resources = root.join("resources");
        std::fs::create_dir_all(classes.join("a")).expect("classes dir");
        std::fs::create_dir_all(&resources).expect("resources dir");
        std::fs::write(classes.join("a/Tree.class"), [0xCA, 0xFE]).expect("class");
        std::fs::write(resources.join("fallingtrees.mixins.json"), b"{}").expect("resource");
        Workspace {
            _dir: dir,
            root,
            classes,
            resources: vec![resources],
        }
    }

    fn unit<'a>(
        workspace: &'a Workspace,
        command: Option<&'a [String]>,
        classpath: &'a [Utf8PathBuf],
    ) -> CompileUnit<'a> {
        CompileUnit {
            label: "common",
            command,
            classes: &workspace.classes,
            resources: &workspace.resources,
            classpath,
            cwd: &workspace.root,
        }
    }

    #[rstest]
    fn prebuilt_classes_are_collected_with_resources(workspace: Workspace) {
        let executor = StubExecutor::unused();
        let contents = compile(&executor, &unit(&workspace, None, &[])).expect("collect");
        assert!(contents.contains("a/Tree.class"));
        assert!(contents.contains("fallingtrees.mixins.json"));
        executor.assert_finished();
    }

    #[rstest]
    fn placeholders_are_expanded(workspace: Workspace) {
        let classpath = vec![Utf8PathBuf::from("/repo/a.jar"), Utf8PathBuf::from("/repo/b.jar")];
        let argv = vec![
            "javac".to_owned(),
            "-d".to_owned(),
            "{classes}".to_owned(),
            "-cp".to_owned(),
            "{classpath}".to_owned(),
        ];
        let expected_classpath = format!("/repo/a.jar{CLASSPATH_SEPARATOR}/repo/b.jar");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "javac",
            &["-d", workspace.classes.as_str(), "-cp", &expected_classpath],
            Ok(success_output()),
        )]);

        compile(&executor, &unit(&workspace, Some(&argv), &classpath)).expect("compile");
        executor.assert_finished();
    }

    #[rstest]
    fn failing_commands_report_stderr(workspace: Workspace) {
        let argv = vec!["javac".to_owned()];
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "javac",
            &[],
            Ok(failure_output("Tree.java:3: error: ';' expected")),
        )]);
        let err = compile(&executor, &unit(&workspace, Some(&argv), &[])).expect_err("failure");
        match err {
            CompileError::Failed { label, stderr, .. } => {
                assert_eq!(label, "common");
                assert_eq!(stderr, "Tree.java:3: error: ';' expected");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn timeouts_are_distinguished(workspace: Workspace) {
        let argv = vec!["gradle".to_owned()];
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "gradle",
            &[],
            Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
        )]);
        let err = compile(&executor, &unit(&workspace, Some(&argv), &[])).expect_err("timeout");
        assert_eq!(
            err,
            CompileError::TimedOut {
                label: "common".to_owned()
            }
        );
    }

    #[rstest]
    fn missing_class_output_is_an_error(workspace: Workspace) {
        let classes = workspace.root.join("nowhere");
        let executor = StubExecutor::unused();
        let mut missing = unit(&workspace, None, &[]);
        missing.classes = &classes;
        let err = compile(&executor, &missing).expect_err("missing output");
        assert!(matches!(err, CompileError::MissingOutput { path, .. } if path == classes));
    }

    #[test]
    fn stderr_is_truncated_to_its_tail() {
        let stderr: String = (0..30).map(|line| format!("line {line}\n")).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.starts_with("line 10"));
    }
}
