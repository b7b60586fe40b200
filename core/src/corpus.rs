use crate::{skip, Result, RunConfig, ARTIFACT_EXTENSION, SOURCE_EXTENSION};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const STAGE_PREFIX: &str = "stage_";
const VALID_DIR: &str = "valid";
const INVALID_DIR: &str = "invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Succeed,
    Fail,
}

/// One source file to feed the compiler under test, for one architecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub path: PathBuf,
    /// `None` for cases from the examples directory
    pub stage: Option<u32>,
    pub expectation: Expectation,
    pub arch: String,
    pub skip_on_failure: bool,
}

impl TestCase {
    pub fn new(
        path: impl Into<PathBuf>,
        stage: Option<u32>,
        expectation: Expectation,
        arch: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let skip_on_failure = expectation == Expectation::Succeed && skip::is_tolerant(&path);
        Self {
            path,
            stage,
            expectation,
            arch: arch.into(),
            skip_on_failure,
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        match self.path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => self.path.to_string_lossy(),
        }
    }

    /// Where the compiler under test leaves its assembly for this case
    pub fn artifact_path(&self) -> PathBuf {
        self.path.with_extension(ARTIFACT_EXTENSION)
    }
}

/// Every case for `arch`: examples first, then each stage's valid and invalid cases in order.
///
/// Order is stable across runs of an unchanged corpus.
pub fn discover(config: &RunConfig, arch: &str) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();

    for path in sources_in(&config.examples_dir, false)? {
        cases.push(TestCase::new(path, None, Expectation::Succeed, arch));
    }

    for (stage, dir) in stage_dirs(&config.tests_dir)? {
        if !config.includes_stage(stage) {
            continue;
        }

        for path in sources_in(&dir.join(VALID_DIR), true)? {
            cases.push(TestCase::new(path, Some(stage), Expectation::Succeed, arch));
        }
        for path in sources_in(&dir.join(INVALID_DIR), true)? {
            cases.push(TestCase::new(path, Some(stage), Expectation::Fail, arch));
        }
    }

    log::debug!("discovered {} cases for {arch}", cases.len());

    Ok(cases)
}

fn parse_stage(dir_name: &str) -> Option<u32> {
    dir_name.strip_prefix(STAGE_PREFIX)?.parse().ok()
}

fn stage_dirs(tests_dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    if !tests_dir.is_dir() {
        log::debug!("no test directory at {}", tests_dir.display());
        return Ok(Vec::new());
    }

    let mut stages = Vec::new();
    for entry in std::fs::read_dir(tests_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(stage) = parse_stage(&entry.file_name().to_string_lossy()) {
            stages.push((stage, entry.path()));
        }
    }
    stages.sort();

    Ok(stages)
}

fn is_source(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == SOURCE_EXTENSION)
}

fn sources_in(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut sources = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_source(entry.path()) {
            sources.push(entry.into_path());
        }
    }

    Ok(sources)
}
