use crate::{Error, Invocation, InvocationResult, Launcher, Result, RunConfig};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub(crate) const COMPILER: &str = "dumbc";
pub(crate) const EMULATOR: &str = "qemu-aarch64";

/// For `#[test_case(.. => using assert_eq(expected))]`, so mismatches get pretty diffs
pub(crate) fn assert_eq<T, U>(expected: T) -> impl Fn(U)
where
    T: std::fmt::Debug,
    U: PartialEq<T> + std::fmt::Debug,
{
    move |actual| pretty_assertions::assert_eq!(actual, expected)
}

pub(crate) fn config_for(root: &Path) -> RunConfig {
    RunConfig {
        compiler: Invocation::new(COMPILER),
        tests_dir: root.join("testsuite"),
        examples_dir: root.join("examples"),
        ..RunConfig::default()
    }
}

pub(crate) fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

/// Stands in for the compiler under test, clang, the emulator and the binaries they produce.
///
/// Sources are tiny scripts. Containing `reject` makes the compiler under test exit 1,
/// `hang` makes it time out, `broken` makes clang fail. Otherwise the first line is what the
/// built binary prints and the second its exit code. Building copies the source verbatim.
#[derive(Default)]
pub(crate) struct FakeToolchain {
    calls: Mutex<Vec<String>>,
}

impl FakeToolchain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Launcher for FakeToolchain {
    fn run(&self, invocation: &Invocation) -> Result<InvocationResult> {
        self.calls.lock().unwrap().push(invocation.to_string());

        let args: Vec<PathBuf> = invocation.args.iter().map(PathBuf::from).collect();
        match invocation.program.to_str() {
            Some(COMPILER) => compile(&args[0]),
            Some("clang") => build(&args),
            Some(EMULATOR) => execute(&invocation.program_name(), &args[0]),
            _ => execute(&invocation.program_name(), Path::new(&invocation.program)),
        }
    }
}

fn exited(exit_code: i32, stdout: &str, stderr: &str) -> InvocationResult {
    InvocationResult {
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
        exit_code,
    }
}

fn compile(source: &Path) -> Result<InvocationResult> {
    let text = std::fs::read_to_string(source)?;
    if text.contains("hang") {
        Err(Error::Timeout {
            program: COMPILER.into(),
            after: std::time::Duration::from_secs(1),
        })
    } else if text.contains("reject") {
        Ok(exited(1, "tokens: [...]\n", "error: rejected\n"))
    } else {
        Ok(exited(0, "Program(...)\n", ""))
    }
}

fn build(args: &[PathBuf]) -> Result<InvocationResult> {
    let output = args
        .iter()
        .position(|arg| arg.as_os_str() == "-o")
        .map(|i| &args[i + 1])
        .unwrap();
    let source = args.last().unwrap();

    let text = std::fs::read_to_string(source)?;
    if text.contains("broken") {
        return Ok(exited(1, "", "clang: error: broken input\n"));
    }

    std::fs::write(output, text)?;
    Ok(exited(0, "", ""))
}

fn execute(program: &str, binary: &Path) -> Result<InvocationResult> {
    let text = std::fs::read_to_string(binary).map_err(|source| Error::Launch {
        program: program.into(),
        source,
    })?;

    let mut lines = text.lines();
    let stdout = lines.next().unwrap_or_default();
    let exit_code = lines.next().and_then(|code| code.trim().parse().ok()).unwrap_or(0);
    Ok(exited(exit_code, &format!("{stdout}\n"), ""))
}
