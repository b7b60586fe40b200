use std::path::{Path, PathBuf};

/// File name prefix marking a valid case as allowed to fail compilation
pub const SKIP_MARKER: &str = "skip_on_failure";

/// A `<file name>.skip` file next to a case marks it the same way as the prefix
pub const SKIP_SIDECAR_EXTENSION: &str = "skip";

fn has_skip_marker(file_name: &str) -> bool {
    file_name.starts_with(SKIP_MARKER)
}

fn sidecar_path(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_string_lossy();
    Some(path.with_file_name(format!("{file_name}.{SKIP_SIDECAR_EXTENSION}")))
}

/// Whether the case at `path` tolerates being rejected by the compiler under test
pub fn is_tolerant(path: &Path) -> bool {
    let by_name = path
        .file_name()
        .map(|name| has_skip_marker(&name.to_string_lossy()))
        .unwrap_or(false);

    by_name || sidecar_path(path).map_or(false, |sidecar| sidecar.is_file())
}
