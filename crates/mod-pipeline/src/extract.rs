use std::fs;
use std::path::PathBuf;

use mailimport_domain::MailMessage;
use mailimport_error::PipelineError;
use tracing::{debug, info, warn};

use crate::scratch::{sanitize_name, Scratch};

/// Saves every `.csv`/`.zip` attachment of `messages` into scratch storage.
///
/// Paths come back in message order, then part order. A file already present
/// at the target path is never overwritten; it is adopted by the run instead.
/// A second attachment with a name already saved during this run is dropped.
pub fn save_attachments(
    messages: &[MailMessage],
    scratch: &mut Scratch,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut saved: Vec<PathBuf> = Vec::new();

    for message in messages {
        for part in message.body.attachments() {
            let raw_name = part.file_name.as_deref().unwrap_or_default();
            let Some(kind) = part.kind() else {
                debug!(message = %message.id, file = raw_name, "unsupported attachment skipped");
                continue;
            };
            let Some(name) = sanitize_name(raw_name) else {
                warn!(message = %message.id, file = raw_name, "attachment name unusable, skipped");
                continue;
            };

            let path = scratch.root().join(&name);
            if saved.contains(&path) {
                debug!(message = %message.id, file = %name, "duplicate attachment name, skipped");
                continue;
            }

            scratch.track_file(&path);
            saved.push(path.clone());

            if path.exists() {
                info!(file = %name, "file already present in scratch storage, not overwritten");
            } else {
                fs::write(&path, &part.payload)
                    .map_err(|e| PipelineError::io(format!("write {}: {e}", path.display())))?;
                debug!(
                    message = %message.id,
                    file = %name,
                    %kind,
                    bytes = part.payload.len(),
                    "attachment saved"
                );
            }
        }
    }

    Ok(saved)
}
