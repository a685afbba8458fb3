//! Behaviour-driven tests for the multi-target packaging pipeline.

use std::cell::{Cell, RefCell};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use trellis_common::{DependencyScope, Platform};
use trellis_packager::error::PackagerError;
use trellis_packager::jar::JarContents;
use trellis_packager::pipeline::{BuildOptions, BuildOutcome, run_build};
use trellis_packager::test_utils::{
    RecordingClient, SampleProject, StubExecutor, sample_dependency, sample_library,
    with_credentials,
};

struct PackagingWorld {
    project: RefCell<SampleProject>,
    client: RefCell<RecordingClient>,
    release: Cell<bool>,
    outcome: RefCell<Option<Result<BuildOutcome, PackagerError>>>,
}

#[fixture]
fn world() -> PackagingWorld {
    PackagingWorld {
        project: RefCell::new(SampleProject::new()),
        client: RefCell::new(RecordingClient::default()),
        release: Cell::new(false),
        outcome: RefCell::new(None),
    }
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

fn platform(value: &str) -> Platform {
    unquote(value).parse().expect("known platform")
}

fn build(world: &PackagingWorld, publish: bool) {
    let mut project = world.project.borrow_mut();
    if let Some(settings) = project.settings.publish.as_mut() {
        settings.release = world.release.get();
    }
    let client = world.client.borrow();
    let options = BuildOptions {
        publish,
        dry_run: false,
    };
    let result = with_credentials(|| {
        run_build(
            &project.settings,
            options,
            &StubExecutor::unused(),
            &*client,
        )
    });
    world.outcome.borrow_mut().replace(result);
}

fn with_outcome<R>(world: &PackagingWorld, f: impl FnOnce(&BuildOutcome) -> R) -> R {
    let outcome = world.outcome.borrow();
    let outcome = outcome
        .as_ref()
        .expect("build should have run")
        .as_ref()
        .expect("build should succeed");
    f(outcome)
}

fn bundle_contents(world: &PackagingWorld, platform: Platform) -> JarContents {
    JarContents::read(&world.project.borrow().bundle_path(platform)).expect("readable bundle")
}

#[given("the sample project")]
fn given_sample_project(world: &PackagingWorld) {
    assert!(world.project.borrow().root.exists());
}

#[given("the {platform} variant embeds {coordinate}")]
fn given_variant_dependency(world: &PackagingWorld, platform: String, coordinate: String) {
    let coordinate = unquote(&coordinate);
    let marker = coordinate.rsplit(':').next().expect("version");
    let mut project = world.project.borrow_mut();
    project.install(
        coordinate,
        &[(
            "me/pandamods/pandalib/PandaLib.class",
            sample_library(marker),
        )],
    );
    project.variant_mut(self::platform(&platform)).dependencies =
        vec![sample_dependency(coordinate, DependencyScope::Embedded)];
}

#[given("the run is a release")]
fn given_release(world: &PackagingWorld) {
    world.release.set(true);
}

#[given("the repository rejects {fragment}")]
fn given_rejecting_repository(world: &PackagingWorld, fragment: String) {
    world
        .client
        .replace(RecordingClient::rejecting(&[unquote(&fragment)]));
}

#[given("the {platform} variant widens the unknown class {class}")]
fn given_unknown_class_rule(world: &PackagingWorld, platform: String, class: String) {
    let platform = self::platform(&platform);
    let mut project = world.project.borrow_mut();
    let extra = project.root.join(format!("{platform}/extra.accesswidener"));
    std::fs::write(
        &extra,
        format!("accessWidener v1 named\naccessible class {}\n", unquote(&class)),
    )
    .expect("extra widener");
    project.variant_mut(platform).access_widener = Some(extra);
}

#[given("the mappings declare the wrong namespaces")]
fn given_wrong_namespaces(world: &PackagingWorld) {
    let project = world.project.borrow();
    std::fs::write(
        project.root.join("mappings/intermediary.tiny"),
        "tiny\t2\t0\tofficial\tintermediary\n",
    )
    .expect("mappings");
}

#[given("the module is named {name}")]
fn given_module_name(world: &PackagingWorld, name: String) {
    world.project.borrow_mut().settings.module.name = unquote(&name).to_owned();
}

#[when("the project is built")]
fn when_built(world: &PackagingWorld) {
    build(world, false);
}

#[when("the project is built and published")]
fn when_built_and_published(world: &PackagingWorld) {
    build(world, true);
}

#[then("the build writes {count} bundles")]
fn then_bundle_count(world: &PackagingWorld, count: usize) {
    with_outcome(world, |outcome| assert_eq!(outcome.report.bundles.len(), count));
}

#[then("the {platform} bundle omits {entry}")]
fn then_bundle_omits(world: &PackagingWorld, platform: String, entry: String) {
    let contents = bundle_contents(world, self::platform(&platform));
    assert!(!contents.contains(unquote(&entry)));
}

#[then("the {platform} bundle contains {entry}")]
fn then_bundle_contains(world: &PackagingWorld, platform: String, entry: String) {
    let contents = bundle_contents(world, self::platform(&platform));
    assert!(contents.contains(unquote(&entry)));
}

#[then("the {platform} bundle embeds {coordinate}")]
fn then_bundle_embeds(world: &PackagingWorld, platform: String, coordinate: String) {
    let kind = unquote(&platform).to_owned();
    let coordinate = unquote(&coordinate).to_owned();
    with_outcome(world, |outcome| {
        let record = outcome
            .report
            .bundles
            .iter()
            .find(|bundle| bundle.kind == kind)
            .expect("bundle recorded");
        let embedded = &record.assembly.as_ref().expect("assembly stats").embedded;
        assert_eq!(embedded, &vec![coordinate.clone()]);
    });
    let version = coordinate.rsplit(':').next().expect("version");
    let contents = bundle_contents(world, self::platform(&platform));
    assert_eq!(
        contents.get("me/pandamods/pandalib/PandaLib.class"),
        Some(sample_library(version).as_slice()),
        "{kind} bundle carries the wrong library build"
    );
}

#[then("{count} uploads are sent")]
fn then_upload_count(world: &PackagingWorld, count: usize) {
    assert_eq!(world.client.borrow().urls().len(), count);
}

#[then("every upload targets {prefix}")]
fn then_uploads_target(world: &PackagingWorld, prefix: String) {
    let prefix = unquote(&prefix);
    let urls = world.client.borrow().urls();
    assert!(urls.iter().all(|url| url.starts_with(prefix)), "{urls:?}");
}

#[then("the report records a publish failure for {coordinate}")]
fn then_publish_failure(world: &PackagingWorld, coordinate: String) {
    let coordinate = unquote(&coordinate).to_owned();
    with_outcome(world, |outcome| {
        let subjects: Vec<&str> = outcome
            .report
            .publish_failures
            .iter()
            .map(|failure| failure.subject.as_str())
            .collect();
        assert_eq!(subjects, vec![coordinate.as_str()]);
        assert_eq!(outcome.report.published.len(), 3);
    });
}

#[then("the {platform} variant fails in the {stage} stage")]
fn then_variant_fails(world: &PackagingWorld, platform: String, stage: String) {
    let subject = unquote(&platform).to_owned();
    let stage = unquote(&stage).to_owned();
    with_outcome(world, |outcome| {
        let failure = outcome
            .report
            .failures
            .iter()
            .find(|failure| failure.subject == subject)
            .expect("variant failure recorded");
        assert_eq!(failure.stage, stage);
        assert!(!outcome.report.is_complete());
    });
}

#[then("no {platform} bundle is written")]
fn then_no_bundle(world: &PackagingWorld, platform: String) {
    let platform = self::platform(&platform);
    let path = world.project.borrow().bundle_path(platform);
    assert!(!path.exists());
    let staged: Vec<_> = std::fs::read_dir(path.parent().expect("output dir"))
        .expect("output dir")
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.starts_with(".tmp") || name.contains(platform.as_str())
        })
        .collect();
    assert!(staged.is_empty(), "{staged:?}");
}

#[then("the run fails before compiling")]
fn then_run_fails(world: &PackagingWorld) {
    let outcome = world.outcome.borrow();
    let result = outcome.as_ref().expect("build should have run");
    assert!(matches!(result, Err(PackagerError::Naming(_))));
    let project = world.project.borrow();
    assert!(!project.settings.output_dir.exists());
}

#[scenario(path = "tests/features/packaging.feature", index = 0)]
fn scenario_compile_only_exclusion(world: PackagingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 1)]
fn scenario_variant_override(world: PackagingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 2)]
fn scenario_release_endpoint(world: PackagingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 3)]
fn scenario_rejected_upload(world: PackagingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 4)]
fn scenario_unknown_class_rule(world: PackagingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 5)]
fn scenario_remap_atomicity(world: PackagingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 6)]
fn scenario_distinct_identities(world: PackagingWorld) {
    let _ = world;
}
