//! Trellis CLI entrypoint.
//!
//! This binary builds one bundle per configured platform variant, writes
//! `build-report.json`, and optionally publishes the bundles to a Maven
//! repository.

use clap::Parser;
use log::LevelFilter;
use std::io::Write;
use trellis::config::BuildSettings;
use trellis_packager::cli::{BuildArgs, Cli, Command, RulesArgs};
use trellis_packager::error::Result;
use trellis_packager::executor::SystemCommandExecutor;
use trellis_packager::output::{build_summary, error_chain, write_stderr_line};
use trellis_packager::pipeline::{preview_rules, run_build};
use trellis_packager::publish::HttpRepositoryClient;

/// How a run that did not hit a fatal error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Complete,
    Partial,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install `env_logger`; `-v` flags raise the level and `RUST_LOG` refines it.
fn init_logging(verbosity: u8) {
    env_logger::Builder::new()
        .filter_level(level_for_verbosity(verbosity))
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

const fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<RunStatus> {
    match &cli.command {
        Some(Command::Rules(args)) => print_rules(args, stderr),
        Some(Command::Build(args)) => build(args, stderr),
        None => build(&cli.build, stderr),
    }
}

fn build(args: &BuildArgs, stderr: &mut dyn Write) -> Result<RunStatus> {
    let settings = BuildSettings::load(&args.config, &args.overrides())?;
    if !args.quiet {
        let platforms: Vec<&str> = settings
            .variants
            .iter()
            .map(|spec| spec.platform.as_str())
            .collect();
        write_stderr_line(
            stderr,
            format!(
                "Building {} {} for {}...",
                settings.project.mod_id,
                settings.project.version,
                platforms.join(", ")
            ),
        );
    }

    let executor = SystemCommandExecutor::new(settings.compile_timeout);
    let outcome = run_build(&settings, args.options(), &executor, HttpRepositoryClient)?;

    let complete = outcome.report.is_complete();
    if !args.quiet || !complete {
        for line in build_summary(&outcome.report, &outcome.report_path) {
            write_stderr_line(stderr, line);
        }
    }
    Ok(if complete {
        RunStatus::Complete
    } else {
        RunStatus::Partial
    })
}

fn print_rules(args: &RulesArgs, stderr: &mut dyn Write) -> Result<RunStatus> {
    let settings = BuildSettings::load(&args.config, &args.overrides())?;
    match preview_rules(&settings, args.platform)? {
        Some(rendered) => {
            write_stderr_line(stderr, format!("# {}", rendered.entry));
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.text.as_bytes())?;
            stdout.flush()?;
        }
        None => write_stderr_line(
            stderr,
            format!("the {} variant carries no access rules", args.platform),
        ),
    }
    Ok(RunStatus::Complete)
}

fn exit_code_for_run_result(result: Result<RunStatus>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(RunStatus::Complete) => 0,
        Ok(RunStatus::Partial) => 2,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}", error_chain(&err)));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use trellis::config::ConfigError;
    use trellis_packager::error::PackagerError;

    #[rstest]
    #[case(0, LevelFilter::Warn)]
    #[case(1, LevelFilter::Info)]
    #[case(2, LevelFilter::Debug)]
    #[case(5, LevelFilter::Trace)]
    fn verbosity_raises_the_log_level(#[case] verbosity: u8, #[case] level: LevelFilter) {
        assert_eq!(level_for_verbosity(verbosity), level);
    }

    #[rstest]
    #[case(RunStatus::Complete, 0)]
    #[case(RunStatus::Partial, 2)]
    fn exit_codes_reflect_variant_outcomes(#[case] status: RunStatus, #[case] code: i32) {
        let mut stderr = Vec::new();
        assert_eq!(exit_code_for_run_result(Ok(status), &mut stderr), code);
        assert!(stderr.is_empty());
    }

    #[test]
    fn fatal_errors_print_and_return_one() {
        let err = PackagerError::Config(ConfigError::NoVariants);
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error: "));
    }

    #[test]
    fn missing_configuration_is_fatal() {
        let cli = Cli::parse_from(["trellis", "--config", "/nonexistent/trellis.toml"]);
        let mut stderr = Vec::new();
        assert!(run(&cli, &mut stderr).is_err());
    }
}
