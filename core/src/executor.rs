use crate::{
    arch, Error, Expectation, Invocation, InvocationResult, Launcher, Result, RunConfig, TestCase,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the two built programs compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonVerdict {
    pub outputs_match: bool,
    pub exit_codes_match: bool,
}

impl ComparisonVerdict {
    pub fn between(reference: &InvocationResult, candidate: &InvocationResult) -> Self {
        Self {
            outputs_match: reference.stdout == candidate.stdout,
            exit_codes_match: reference.exit_code == candidate.exit_code,
        }
    }

    pub fn passed(self) -> bool {
        self.outputs_match && self.exit_codes_match
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The compiler under test accepted an invalid case
    ShouldFail,
    /// The compiler under test rejected a valid case
    ShouldSucceed { stdout: Vec<u8>, stderr: Vec<u8> },
    MissingFiles { source: PathBuf, artifact: PathBuf },
    /// The reference toolchain couldn't build either the source or the emitted assembly
    BuildFailed { command: Invocation, stderr: Vec<u8> },
    Mismatch {
        verdict: ComparisonVerdict,
        reference: InvocationResult,
        candidate: InvocationResult,
    },
    TimedOut { program: String, after: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    /// Passed, and the emitted assembly behaved like the reference build
    Matched,
    /// Rejected by the compiler under test but waived by the skip policy
    Skipped,
    Failed(Failure),
}

impl CaseOutcome {
    /// Skipped cases count as passes
    pub fn is_pass(&self) -> bool {
        !matches!(self, CaseOutcome::Failed(_))
    }
}

/// Runs one case end to end.
///
/// `Err` means the run itself can't go on (a tool failed to launch, the filesystem broke);
/// anything the case did wrong is an `Ok(CaseOutcome::Failed(..))`.
pub fn evaluate(case: &TestCase, config: &RunConfig, launcher: &dyn Launcher) -> Result<CaseOutcome> {
    match classify(case, config, launcher) {
        Err(Error::Timeout { program, after }) => {
            Ok(CaseOutcome::Failed(Failure::TimedOut { program, after }))
        }
        other => other,
    }
}

fn classify(case: &TestCase, config: &RunConfig, launcher: &dyn Launcher) -> Result<CaseOutcome> {
    let compiler = config
        .compiler
        .clone()
        .arg(&case.path)
        .arg("--arch")
        .arg(&case.arch);
    let compiled = launcher.run(&compiler)?;

    let outcome = match (case.expectation, compiled.success()) {
        (Expectation::Fail, false) => CaseOutcome::Passed,
        (Expectation::Fail, true) => CaseOutcome::Failed(Failure::ShouldFail),
        (Expectation::Succeed, false) if case.skip_on_failure => CaseOutcome::Skipped,
        (Expectation::Succeed, false) => CaseOutcome::Failed(Failure::ShouldSucceed {
            stdout: compiled.stdout,
            stderr: compiled.stderr,
        }),
        (Expectation::Succeed, true) if config.compile_enabled => compare(case, config, launcher)?,
        (Expectation::Succeed, true) => CaseOutcome::Passed,
    };

    Ok(outcome)
}

fn compare(case: &TestCase, config: &RunConfig, launcher: &dyn Launcher) -> Result<CaseOutcome> {
    let source = &case.path;
    let artifact = case.artifact_path();
    if !source.is_file() || !artifact.is_file() {
        return Ok(CaseOutcome::Failed(Failure::MissingFiles {
            source: source.clone(),
            artifact,
        }));
    }

    // both guards are declared before either build so every exit below removes both binaries
    let reference_bin = TempArtifact::new(binary_path(source, "c", &case.arch));
    let candidate_bin = TempArtifact::new(binary_path(&artifact, "s", &case.arch));

    let reference = match build_and_run(source, &reference_bin, case, config, launcher)? {
        Ok(result) => result,
        Err(failure) => return Ok(CaseOutcome::Failed(failure)),
    };
    let candidate = match build_and_run(&artifact, &candidate_bin, case, config, launcher)? {
        Ok(result) => result,
        Err(failure) => return Ok(CaseOutcome::Failed(failure)),
    };

    let verdict = ComparisonVerdict::between(&reference, &candidate);
    if verdict.passed() {
        Ok(CaseOutcome::Matched)
    } else {
        Ok(CaseOutcome::Failed(Failure::Mismatch {
            verdict,
            reference,
            candidate,
        }))
    }
}

type Built = std::result::Result<InvocationResult, Failure>;

fn build_and_run(
    input: &Path,
    binary: &TempArtifact,
    case: &TestCase,
    config: &RunConfig,
    launcher: &dyn Launcher,
) -> Result<Built> {
    let build = arch::reference_command(
        &config.reference_cc,
        input,
        &binary.path,
        &case.arch,
        config.arch_style,
    );
    let built = launcher.run(&build)?;
    if !built.success() {
        return Ok(Err(Failure::BuildFailed {
            command: build,
            stderr: built.stderr,
        }));
    }

    let run = arch::run_command(&binary.path, &case.arch, config);
    Ok(Ok(launcher.run(&run)?))
}

/// `<stem>.<arch>.<kind>.bin` beside `input`, unique per case and architecture
fn binary_path(input: &Path, kind: &str, arch: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.{arch}.{kind}.bin"))
}

// A built binary that's removed again when the evaluation that made it is done with it
struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to delete {}: {err}", self.path.display());
        }
    }
}
