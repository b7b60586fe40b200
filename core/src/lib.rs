mod arch;
mod config;
mod corpus;
mod executor;
mod process;
mod report;
mod skip;
mod suite;
mod summary;

#[cfg(test)]
mod testing;

pub use arch::{reference_command, run_command, ArchStyle};
pub use config::RunConfig;
pub use corpus::{discover, Expectation, TestCase};
pub use executor::{evaluate, CaseOutcome, ComparisonVerdict, Failure};
pub use process::{Invocation, InvocationResult, Launcher, SystemLauncher};
pub use report::{Reporter, Style};
pub use skip::{is_tolerant, SKIP_MARKER, SKIP_SIDECAR_EXTENSION};
pub use suite::{exit_status, run_suite};
pub use summary::SuiteSummary;

/*****************************************************************************************
 * Error Types
 */

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The run was configured with something the harness cannot act on
    Configuration(String),
    /// A required external program could not be started at all
    Launch {
        program: String,
        source: std::io::Error,
    },
    /// A child process outlived the configured per-invocation timeout
    Timeout {
        program: String,
        after: std::time::Duration,
    },
    /// Discovery found nothing to run for an architecture
    EmptyCorpus { arch: String },
    IOError(std::io::Error),
    WalkError(walkdir::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Configuration(msg) => {
                write!(f, "Configuration error: {msg}")
            }
            Error::Launch { program, source } => {
                write!(f, "Failed to launch `{program}`: {source}")
            }
            Error::Timeout { program, after } => {
                write!(f, "`{program}` did not finish within {}s", after.as_secs_f64())
            }
            Error::EmptyCorpus { arch } => {
                write!(f, "No test files found for architecture {arch}")
            }
            Error::IOError(inner) => {
                write!(f, "IOError: {inner}")
            }
            Error::WalkError(inner) => {
                write!(f, "Failed to walk test corpus: {inner}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Launch { source, .. } => Some(source),
            Error::IOError(inner) => Some(inner),
            Error::WalkError(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(inner: std::io::Error) -> Self {
        Self::IOError(inner)
    }
}

impl From<walkdir::Error> for Error {
    fn from(inner: walkdir::Error) -> Self {
        Self::WalkError(inner)
    }
}

/*****************************************************************************************
 * Common Types / Constants
 */

pub const DEFAULT_ARCH: &str = "aarch64";
pub const DEFAULT_TESTS_DIR: &str = "testsuite";
pub const DEFAULT_EXAMPLES_DIR: &str = "examples";
pub const DEFAULT_REFERENCE_CC: &str = "clang";
pub const DEFAULT_COMPILER: &str = "cargo run --quiet --";

/// Extension of test sources
pub const SOURCE_EXTENSION: &str = "c";
/// Extension of the assembly the compiler under test emits beside each source
pub const ARTIFACT_EXTENSION: &str = "s";
