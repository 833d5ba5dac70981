use std::path::{Path, PathBuf};

/// Deletes a file on drop unless [`TempFileGuard::keep`] was called.
///
/// Used both for scratch files and for outputs that must not survive a failed job.
#[derive(Debug)]
pub(crate) struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self(Some(path.into()))
    }

    /// Disarm: the file stays.
    pub(crate) fn keep(mut self) -> Option<PathBuf> {
        self.0.take()
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take()
            && path.exists()
        {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed file"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove file"),
            }
        }
    }
}

/// Hidden scratch path next to `path`: `<dir>/.<stem>.<tag>-<uuid>.<ext>`.
pub(crate) fn sibling_temp_path(path: &Path, tag: &str, ext: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let id = uuid::Uuid::new_v4().simple().to_string();
    let name = format!(".{stem}.{tag}-{}.{ext}", &id[..12]);
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}
