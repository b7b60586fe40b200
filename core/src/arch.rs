use crate::{Error, Invocation, RunConfig};
use std::path::Path;

/// The only host architecture `NativeHosted` builds for
const NATIVE_HOST_ARCH: &str = "arm64";

/// How the reference toolchain is told which architecture to build for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchStyle {
    /// Host native flag (`-arch arm64`), ignores the requested architecture
    #[default]
    NativeHosted,
    /// Explicit cross target triple (`--target=<arch>-linux-gnu`)
    CrossTargeted,
}

impl ArchStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchStyle::NativeHosted => "native-hosted",
            ArchStyle::CrossTargeted => "cross-targeted",
        }
    }
}

impl std::str::FromStr for ArchStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native-hosted" | "mac" => Ok(ArchStyle::NativeHosted),
            "cross-targeted" | "gnu" => Ok(ArchStyle::CrossTargeted),
            other => Err(Error::Configuration(format!(
                "Unsupported arch style: {other:?}. Expected 'native-hosted' or 'cross-targeted'."
            ))),
        }
    }
}

impl std::fmt::Display for ArchStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments for the reference toolchain to build `source` into the executable `output`
pub fn reference_command(
    cc: &str,
    source: &Path,
    output: &Path,
    arch: &str,
    style: ArchStyle,
) -> Invocation {
    let cmd = Invocation::new(cc);
    let cmd = match style {
        ArchStyle::NativeHosted => cmd.args(["-arch", NATIVE_HOST_ARCH]),
        ArchStyle::CrossTargeted => cmd.arg(format!("--target={arch}-linux-gnu")),
    };
    cmd.arg("-o").arg(output).arg(source)
}

/// How to execute a built binary, going through the emulator when the host can't run it
pub fn run_command(binary: &Path, arch: &str, config: &RunConfig) -> Invocation {
    if config.emulate {
        Invocation::new(config.emulator_for(arch)).arg(binary)
    } else {
        Invocation::new(binary)
    }
}
