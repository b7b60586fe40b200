mod logging;

use anyhow::Context;
use dumbc_conformance_core as core;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Set to `1` to emit CI annotation lines in the summary
const ANNOTATIONS_ENV: &str = "GITHUB_ANNOTATIONS";
/// Set to `1` when the host can't run target binaries and they must go through the emulator
const CROSS_COMPILE_ENV: &str = "CROSS_COMPILE";

#[derive(Debug, clap::Parser)]
#[command(about = "Differential conformance tests for the dumbc compiler")]
struct Args {
    /// How the reference toolchain picks the target: native-hosted or cross-targeted
    #[arg(long, value_name = "STYLE", default_value = "native-hosted")]
    arch_style: String,

    /// Only check whether the compiler accepts or rejects each case, skip building and
    /// comparing the emitted assembly
    #[arg(long)]
    disable_compile: bool,

    /// Command running the compiler under test, the case and `--arch <ARCH>` are appended.
    /// Split on whitespace, so none of its words may contain spaces
    #[arg(long, value_name = "CMD", default_value = core::DEFAULT_COMPILER)]
    compiler: String,

    /// Reference C compiler
    #[arg(long, value_name = "CC", default_value = core::DEFAULT_REFERENCE_CC)]
    reference_cc: String,

    /// Emulator for target binaries, defaults to qemu-<ARCH>
    #[arg(long, value_name = "EMULATOR")]
    emulator: Option<String>,

    #[arg(long, value_name = "DIR", default_value = core::DEFAULT_TESTS_DIR)]
    tests_dir: PathBuf,

    #[arg(long, value_name = "EXAMPLES_DIR", default_value = core::DEFAULT_EXAMPLES_DIR)]
    examples_dir: PathBuf,

    /// Only run the given stage, may be repeated
    #[arg(long = "stage", value_name = "N")]
    stages: Vec<u32>,

    /// Target architecture, may be repeated
    #[arg(long = "arch", value_name = "ARCH", default_value = core::DEFAULT_ARCH)]
    archs: Vec<String>,

    /// Number of cases evaluated at once
    #[arg(long, short, default_value_t = 1)]
    jobs: usize,

    /// Kill any single external program after this long
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Never color the report or the log, colors are also off when not writing to a terminal
    #[arg(long)]
    no_color: bool,
}

fn flag(env: &impl Fn(&str) -> Option<String>, name: &str) -> bool {
    env(name).map_or(false, |value| value == "1")
}

fn config(args: &Args, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<core::RunConfig> {
    let arch_style = args.arch_style.parse::<core::ArchStyle>()?;

    let compiler = core::Invocation::parse(&args.compiler)
        .context("--compiler needs at least a program name")?;

    if args.jobs == 0 {
        anyhow::bail!("--jobs must be at least 1");
    }

    Ok(core::RunConfig {
        arch_style,
        compile_enabled: !args.disable_compile,
        ci_annotations: flag(&env, ANNOTATIONS_ENV),
        emulate: flag(&env, CROSS_COMPILE_ENV),
        compiler,
        reference_cc: args.reference_cc.clone(),
        emulator: args.emulator.clone(),
        tests_dir: args.tests_dir.clone(),
        examples_dir: args.examples_dir.clone(),
        stages: (!args.stages.is_empty()).then(|| args.stages.clone()),
        archs: args.archs.clone(),
        jobs: args.jobs,
        timeout: args.timeout.map(Duration::from_secs),
    })
}

fn main() -> anyhow::Result<ExitCode> {
    use clap::Parser;
    use std::io::IsTerminal;

    let args = Args::parse();
    logging::init(
        logging::level(args.verbose, args.quiet),
        !args.no_color && std::io::stderr().is_terminal(),
    );

    let config = config(&args, |name| std::env::var(name).ok())?;
    log::debug!("{config:?}");

    let style = if args.no_color || !std::io::stdout().is_terminal() {
        core::Style::Plain
    } else {
        core::Style::Colored
    };
    let mut reporter = core::Reporter::new(std::io::stdout().lock(), style, config.ci_annotations);
    let launcher = core::SystemLauncher::new(config.timeout);

    let summaries = core::run_suite(&config, &launcher, &mut reporter)
        .with_context(|| format!("aborted while testing {}", config.tests_dir.display()))?;

    Ok(ExitCode::from(core::exit_status(&summaries)))
}
