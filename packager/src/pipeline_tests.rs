//! Unit tests for whole-build orchestration.

use super::*;
use crate::compiler::CompileError;
use crate::jar::JarContents;
use crate::naming::NamingError;
use crate::publish::client::MockRepositoryClient;
use crate::test_utils::{ExpectedCall, SampleProject, StubExecutor, failure_output};
use rstest::{fixture, rstest};

#[fixture]
fn project() -> SampleProject {
    SampleProject::new()
}

fn offline() -> MockRepositoryClient {
    let mut client = MockRepositoryClient::new();
    client.expect_put().never();
    client
}

fn build(project: &SampleProject, options: BuildOptions) -> Result<BuildOutcome> {
    run_build(&project.settings, options, &StubExecutor::unused(), offline())
}

#[rstest]
fn writes_every_bundle_and_the_report(project: SampleProject) {
    let outcome = build(&project, BuildOptions::default()).expect("build");
    let report = &outcome.report;
    assert!(report.is_complete());
    let coordinates: Vec<&str> = report
        .bundles
        .iter()
        .map(|bundle| bundle.coordinate.as_str())
        .collect();
    assert_eq!(
        coordinates,
        vec![
            "me.pandamods:fallingtrees-common:0.13.0",
            "me.pandamods:fallingtrees-fabric:0.13.0",
            "me.pandamods:fallingtrees-forge:0.13.0",
            "me.pandamods:fallingtrees-neoforge:0.13.0",
        ]
    );
    assert!(report.channel.is_none());
    assert_eq!(
        outcome.report_path,
        project.settings.output_dir.join("build-report.json")
    );
    assert!(outcome.report_path.exists());

    let named = JarContents::read(
        &project
            .settings
            .output_dir
            .join("fallingtrees-common-0.13.0.jar"),
    )
    .expect("module jar");
    let widener = String::from_utf8(
        named
            .get("fallingtrees.accesswidener")
            .expect("canonical widener")
            .to_vec(),
    )
    .expect("utf-8");
    assert!(widener.starts_with("accessWidener\tv1\tnamed\n"));
}

#[rstest]
fn variant_failures_are_reported_not_raised(mut project: SampleProject) {
    let extra = project.root.join("forge/extra.accesswidener");
    std::fs::write(
        &extra,
        "accessWidener v1 named\naccessible class net/minecraft/Missing\n",
    )
    .expect("extra widener");
    project.variant_mut(Platform::Forge).access_widener = Some(extra);
    project.settings.jobs = 1;

    let outcome = build(&project, BuildOptions::default()).expect("build");
    let report = &outcome.report;
    assert!(!report.is_complete());
    assert_eq!(report.bundles.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subject, "forge");
    assert_eq!(report.failures[0].stage, "access-rules");
    assert!(project.bundle_path(Platform::NeoForge).exists());
}

#[rstest]
fn duplicate_identities_fail_before_compiling(mut project: SampleProject) {
    project.settings.module.name = "fabric".to_owned();
    let err = build(&project, BuildOptions::default()).expect_err("duplicate");
    assert!(matches!(
        err,
        PackagerError::Naming(NamingError::Duplicate { .. })
    ));
    assert!(!project.settings.output_dir.exists());
}

#[rstest]
fn module_failures_abort_the_run(mut project: SampleProject) {
    project.settings.module.compile = Some(vec!["javac".to_owned()]);
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "javac",
        &[],
        Ok(failure_output("error: cannot find symbol")),
    )]);
    let err = run_build(
        &project.settings,
        BuildOptions::default(),
        &executor,
        offline(),
    )
    .expect_err("module failure");
    assert!(matches!(err, PackagerError::Compile(CompileError::Failed { .. })));
    assert!(!project.settings.output_dir.join("build-report.json").exists());
    executor.assert_finished();
}

#[rstest]
fn publishing_requires_a_publish_table(mut project: SampleProject) {
    project.settings.publish = None;
    let options = BuildOptions {
        publish: true,
        dry_run: false,
    };
    let err = build(&project, options).expect_err("no publish table");
    assert!(matches!(err, PackagerError::PublishNotConfigured));
}

#[rstest]
fn dry_runs_plan_every_upload(project: SampleProject) {
    let options = BuildOptions {
        publish: true,
        dry_run: true,
    };
    let report = build(&project, options).expect("build").report;
    assert_eq!(report.channel, Some(Channel::Snapshot));
    assert!(report.dry_run);
    assert_eq!(report.published.len(), 4);
    assert!(report.published.iter().all(|bundle| bundle.urls.len() == 6));
}

#[rstest]
fn live_runs_upload_with_environment_credentials(mut project: SampleProject) {
    project
        .settings
        .publish
        .as_mut()
        .expect("publish table")
        .release = true;
    let mut client = MockRepositoryClient::new();
    client
        .expect_put()
        .withf(|url, _, credentials| {
            url.starts_with("https://repo.example.com/releases/")
                && credentials.username() == "deployer"
        })
        .times(24)
        .returning(|_, _, _| Ok(()));

    let options = BuildOptions {
        publish: true,
        dry_run: false,
    };
    let report = temp_env::with_vars(
        [
            ("NEXUS_USERNAME", Some("deployer")),
            ("NEXUS_PASSWORD", Some("hunter2")),
        ],
        || run_build(&project.settings, options, &StubExecutor::unused(), client),
    )
    .expect("build")
    .report;
    assert_eq!(report.channel, Some(Channel::Release));
    assert_eq!(report.published.len(), 4);
    assert!(report.is_complete());
}

#[rstest]
fn missing_credentials_fail_each_upload(project: SampleProject) {
    let options = BuildOptions {
        publish: true,
        dry_run: false,
    };
    let report = temp_env::with_vars_unset(["NEXUS_USERNAME", "NEXUS_PASSWORD"], || {
        build(&project, options)
    })
    .expect("build")
    .report;
    assert_eq!(report.bundles.len(), 4);
    assert_eq!(report.publish_failures.len(), 4);
    assert!(
        report
            .publish_failures
            .iter()
            .all(|failure| failure.message.contains("NEXUS_USERNAME"))
    );
}

#[rstest]
#[case(Platform::Fabric, "fallingtrees.accesswidener", "net/minecraft/class_2248")]
#[case(
    Platform::NeoForge,
    "META-INF/accesstransformer.cfg",
    "public-f net.minecraft.world.level.block.Block"
)]
fn previews_render_the_platform_file(
    project: SampleProject,
    #[case] platform: Platform,
    #[case] entry: &str,
    #[case] needle: &str,
) {
    let rendered = preview_rules(&project.settings, platform)
        .expect("preview")
        .expect("rules configured");
    assert_eq!(rendered.entry, entry);
    assert!(rendered.text.contains(needle), "{}", rendered.text);
}

#[rstest]
fn previews_reject_unconfigured_platforms(mut project: SampleProject) {
    project
        .settings
        .variants
        .retain(|spec| spec.platform == Platform::Fabric);
    let err = preview_rules(&project.settings, Platform::Forge).expect_err("not configured");
    assert!(matches!(
        err,
        PackagerError::UnknownVariant {
            platform: Platform::Forge
        }
    ));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(8)]
fn batches_keep_variant_order(mut project: SampleProject, #[case] jobs: usize) {
    project.settings.jobs = jobs;
    let outcome = build(&project, BuildOptions::default()).expect("build");
    let kinds: Vec<&str> = outcome
        .report
        .bundles
        .iter()
        .map(|bundle| bundle.kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["common module", "fabric", "forge", "neoforge"]);
}
