use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use mailimport_domain::{ArchiveFailure, FileKind};
use mailimport_error::PipelineError;
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use crate::scratch::Scratch;

#[derive(Debug, Default)]
pub struct Normalized {
    pub files: Vec<PathBuf>,
    pub failures: Vec<ArchiveFailure>,
}

/// Replaces every ZIP in `paths` with the CSV entries it contains.
///
/// Output order: the plain CSV paths in input order, followed by the
/// extracted CSVs grouped per archive (archives in input order, entries in
/// listing order). A broken archive only loses its own entries.
pub fn normalize(paths: Vec<PathBuf>, scratch: &mut Scratch) -> Normalized {
    let (archives, csvs): (Vec<_>, Vec<_>) = paths
        .into_iter()
        .partition(|p| FileKind::from_path(p) == Some(FileKind::Zip));

    let mut out = Normalized {
        files: csvs,
        failures: Vec::new(),
    };

    for archive in archives {
        match extract_csv_entries(&archive, scratch) {
            Ok(extracted) => {
                info!(
                    archive = %archive.display(),
                    count = extracted.len(),
                    "archive extracted"
                );
                out.files.extend(extracted);
            }
            Err(e) => {
                error!(archive = %archive.display(), error = %e, "failed to extract archive");
                out.failures.push(ArchiveFailure {
                    archive,
                    error: e.to_string(),
                });
            }
        }
    }

    out
}

fn extract_csv_entries(archive_path: &Path, scratch: &mut Scratch) -> Result<Vec<PathBuf>, PipelineError> {
    let file = File::open(archive_path)
        .map_err(|e| PipelineError::io(format!("open {}: {e}", archive_path.display())))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| PipelineError::archive(format!("{}: {e}", archive_path.display())))?;

    let archive_name = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("archive");
    let dest = scratch.root().join(format!("{archive_name}.d"));
    // A directory that predates the run may hold files we must not remove.
    if !dest.exists() {
        scratch.track_dir(&dest);
    }

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| PipelineError::archive(format!("{}: entry {i}: {e}", archive_path.display())))?;

        if entry.is_dir() {
            continue;
        }
        let Some(rel) = entry.enclosed_name() else {
            warn!(archive = %archive_path.display(), entry = entry.name(), "unsafe entry path, skipped");
            continue;
        };
        if FileKind::from_path(&rel) != Some(FileKind::Csv) {
            debug!(archive = %archive_path.display(), entry = entry.name(), "non-csv entry skipped");
            continue;
        }

        let out_path = dest.join(&rel);
        if scratch.is_tracked(&out_path) || out_path.exists() {
            warn!(file = %out_path.display(), "entry already extracted, skipped");
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PipelineError::io(format!("mkdir {}: {e}", parent.display())))?;
        }

        scratch.track_file(&out_path);
        let mut out = File::create(&out_path)
            .map_err(|e| PipelineError::io(format!("create {}: {e}", out_path.display())))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| PipelineError::archive(format!("{}: {e}", out_path.display())))?;

        debug!(file = %out_path.display(), "entry extracted");
        extracted.push(out_path);
    }

    Ok(extracted)
}
