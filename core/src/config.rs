use crate::{
    ArchStyle, Invocation, DEFAULT_ARCH, DEFAULT_COMPILER, DEFAULT_EXAMPLES_DIR,
    DEFAULT_REFERENCE_CC, DEFAULT_TESTS_DIR,
};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a run needs to know, decided once at startup.
///
/// Nothing below the binary's `main` reads arguments or the environment directly, it all flows
/// through here.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub arch_style: ArchStyle,
    /// Build and run both the reference and the emitted assembly for valid cases
    pub compile_enabled: bool,
    /// Emit `::error`/`::notice` lines for CI log ingestion
    pub ci_annotations: bool,
    /// The host can't run target binaries, go through the emulator
    pub emulate: bool,
    /// Compiler under test, the case path and `--arch <arch>` are appended
    pub compiler: Invocation,
    pub reference_cc: String,
    /// Emulator override, `qemu-<arch>` otherwise
    pub emulator: Option<String>,
    pub tests_dir: PathBuf,
    pub examples_dir: PathBuf,
    /// Only run these stages, all discovered stages if `None`
    pub stages: Option<Vec<u32>>,
    pub archs: Vec<String>,
    /// Upper bound on cases evaluated at once
    pub jobs: usize,
    pub timeout: Option<Duration>,
}

impl RunConfig {
    pub fn emulator_for(&self, arch: &str) -> String {
        match &self.emulator {
            Some(emulator) => emulator.clone(),
            None => format!("qemu-{arch}"),
        }
    }

    pub fn includes_stage(&self, stage: u32) -> bool {
        match &self.stages {
            Some(stages) => stages.contains(&stage),
            None => true,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            arch_style: ArchStyle::default(),
            compile_enabled: true,
            ci_annotations: false,
            emulate: false,
            compiler: Invocation::parse(DEFAULT_COMPILER).unwrap_or_else(|| Invocation::new("cargo")),
            reference_cc: DEFAULT_REFERENCE_CC.into(),
            emulator: None,
            tests_dir: DEFAULT_TESTS_DIR.into(),
            examples_dir: DEFAULT_EXAMPLES_DIR.into(),
            stages: None,
            archs: vec![DEFAULT_ARCH.into()],
            jobs: 1,
            timeout: None,
        }
    }
}
