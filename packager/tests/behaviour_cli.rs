//! End-to-end CLI behaviour tests for `trellis`.
//!
//! These scenarios invoke the binary against a temporary project whose
//! classes are prebuilt, so no compiler is needed.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use trellis_packager::test_utils::ClassBuilder;

const TREE_BLOCK: &str = "me/pandamods/fallingtrees/TreeBlock";

const PROJECT_CONFIG: &str = r#"
[project]
mod_id = "fallingtrees"
group = "me.pandamods"
version = "${mod_version}"

[properties]
mod_version = "0.13.0"

[module]
access_widener = "common/fallingtrees.accesswidener"

[[variant]]
platform = "fabric"

[[variant]]
platform = "forge"

[repository]
local = "repo"
"#;

#[derive(Default)]
struct CliWorld {
    args: RefCell<Vec<String>>,
    output: RefCell<Option<Output>>,
    // Keep the project alive for the lifetime of the scenario.
    project: RefCell<Option<TempDir>>,
}

#[fixture]
fn cli_world() -> CliWorld {
    CliWorld::default()
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

fn write(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    std::fs::write(path, bytes).expect("write project file");
}

#[given("a prebuilt project")]
fn given_prebuilt_project(cli_world: &CliWorld) {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    write(root, "trellis.toml", PROJECT_CONFIG.as_bytes());
    write(
        root,
        "common/fallingtrees.accesswidener",
        format!("accessWidener v1 named\nextendable class {TREE_BLOCK}\n").as_bytes(),
    );
    write(
        root,
        &format!("common/build/classes/{TREE_BLOCK}.class"),
        &ClassBuilder::new(TREE_BLOCK, Some("java/lang/Object")).build(),
    );
    for platform in ["fabric", "forge"] {
        std::fs::create_dir_all(root.join(format!("{platform}/build/classes")))
            .expect("platform classes");
    }
    cli_world.project.replace(Some(dir));
}

#[given("the arguments {args}")]
fn given_arguments(cli_world: &CliWorld, args: String) {
    cli_world
        .args
        .replace(unquote(&args).split_whitespace().map(str::to_owned).collect());
}

#[when("the trellis CLI is run")]
fn when_trellis_cli_run(cli_world: &CliWorld) {
    let args = cli_world.args.borrow();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_trellis"));
    cmd.args(args.iter()).env_remove("RUST_LOG");
    if let Some(project) = cli_world.project.borrow().as_ref() {
        cmd.current_dir(project.path());
    }

    let output = cmd.output().expect("failed to run trellis");
    cli_world.output.replace(Some(output));
}

/// Helper function to retrieve the command output from the CLI world.
fn get_output(cli_world: &CliWorld) -> std::cell::Ref<'_, Output> {
    let output = cli_world.output.borrow();
    std::cell::Ref::map(output, |opt| opt.as_ref().expect("output not set"))
}

#[then("the CLI exits with code {code}")]
fn then_cli_exits_with(cli_world: &CliWorld, code: i32) {
    let output = get_output(cli_world);
    assert_eq!(
        output.status.code(),
        Some(code),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[then("stdout mentions {text}")]
fn then_stdout_mentions(cli_world: &CliWorld, text: String) {
    let output = get_output(cli_world);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(unquote(&text)), "stdout: {stdout}");
}

#[then("stderr mentions {text}")]
fn then_stderr_mentions(cli_world: &CliWorld, text: String) {
    let output = get_output(cli_world);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(unquote(&text)), "stderr: {stderr}");
}

#[then("the project contains {path}")]
fn then_project_contains(cli_world: &CliWorld, path: String) {
    let project = cli_world.project.borrow();
    let root = project.as_ref().expect("project not set").path();
    assert!(root.join(unquote(&path)).is_file());
}

// Do not reorder scenarios in tests/features/cli.feature; bindings are
// index-based.
#[scenario(path = "tests/features/cli.feature", index = 0)]
fn scenario_help(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 1)]
fn scenario_missing_configuration(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 2)]
fn scenario_dry_run_requires_publish(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 3)]
fn scenario_build_prebuilt_project(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 4)]
fn scenario_forge_rules_preview(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 5)]
fn scenario_unknown_platform_preview(cli_world: CliWorld) {
    let _ = cli_world;
}
