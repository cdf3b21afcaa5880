use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mailimport_error::PipelineError;
use tracing::{debug, warn};

/// Run-scoped scratch directory. Remembers everything the run wrote so
/// cleanup can remove it regardless of how the run ended.
#[derive(Debug)]
pub struct Scratch {
    root: PathBuf,
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    pub removed: usize,
    pub missing: usize,
    pub failed: usize,
}

impl Scratch {
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| PipelineError::io(format!("create {}: {e}", root.display())))?;
        debug!(root = %root.display(), "scratch directory ready");
        Ok(Self {
            root,
            files: Vec::new(),
            dirs: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn track_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn track_dir(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.dirs.contains(&path) {
            self.dirs.push(path);
        }
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.files.iter().any(|p| p == path)
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.files
    }

    /// Best effort: a missing file is fine, any other failure is only logged.
    pub fn cleanup(&mut self) -> CleanupSummary {
        let mut summary = CleanupSummary::default();

        for path in self.files.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(file = %path.display(), "file has been deleted");
                    summary.removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => summary.missing += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to delete file");
                    summary.failed += 1;
                }
            }
        }

        for dir in self.dirs.drain(..).rev() {
            match fs::remove_dir_all(&dir) {
                Ok(()) => debug!(dir = %dir.display(), "directory has been deleted"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to delete directory");
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// Final path segment of an untrusted file name, or `None` if nothing usable remains.
pub(crate) fn sanitize_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
