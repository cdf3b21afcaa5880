use std::path::Path;

use async_trait::async_trait;
use mailimport_error::PipelineError;

use crate::entities::{ImportEntry, ImportTarget, MailMessage, ProcessId};

/// Source of unread mail. Fetching is expected to mark messages as seen.
#[async_trait]
pub trait MailboxPort: Send + Sync {
    async fn unseen_messages(&self) -> Result<Vec<MailMessage>, PipelineError>;
}

#[async_trait]
pub trait ImportPort: Send + Sync {
    async fn list_imports(&self) -> Result<Vec<ImportEntry>, PipelineError>;

    /// Uploads `file` to the import and returns the remote process id.
    async fn run_import(
        &self,
        target: &ImportTarget,
        file: &Path,
        action: &str,
        comment: Option<&str>,
    ) -> Result<ProcessId, PipelineError>;
}
