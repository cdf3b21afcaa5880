use std::path::PathBuf;
use std::sync::Arc;

use mailimport_domain::{ImportPort, ImportTarget, MailboxPort, RunReport};
use mailimport_error::PipelineError;
use tracing::{info, warn};

use crate::archive::normalize;
use crate::dispatch::{dispatch_all, resolve_import};
use crate::extract::save_attachments;
use crate::filter::SubjectFilter;
use crate::scratch::Scratch;

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub import_name: String,
    pub import_action: String,
    pub comment: Option<String>,
    pub subject: SubjectFilter,
    pub scratch_dir: PathBuf,
}

/// Mailbox to import pipeline. Stateless between runs; all inputs are explicit.
pub struct ImportService {
    mailbox: Arc<dyn MailboxPort>,
    importer: Arc<dyn ImportPort>,
    settings: RunSettings,
}

impl ImportService {
    pub fn new(
        mailbox: Arc<dyn MailboxPort>,
        importer: Arc<dyn ImportPort>,
        settings: RunSettings,
    ) -> Self {
        Self {
            mailbox,
            importer,
            settings,
        }
    }

    /// One full run. Fatal errors come back as `Err`; per-file failures are
    /// recorded in the report. Scratch files are removed either way.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        info!(import = %self.settings.import_name, "starting run");

        let target = resolve_import(self.importer.as_ref(), &self.settings.import_name).await?;
        info!(import = %target, "import found");

        let mut scratch = Scratch::create(&self.settings.scratch_dir)?;
        let result = self.process(&target, &mut scratch).await;

        let cleanup = scratch.cleanup();
        if cleanup.failed > 0 {
            warn!(failed = cleanup.failed, "some scratch files could not be deleted");
        }

        if let Ok(report) = &result {
            info!(
                matched = report.matched_messages,
                outcome = %report.outcome(),
                "run has been completed"
            );
        }
        result
    }

    async fn process(
        &self,
        target: &ImportTarget,
        scratch: &mut Scratch,
    ) -> Result<RunReport, PipelineError> {
        let unseen = self.mailbox.unseen_messages().await?;
        let unseen_count = unseen.len();
        let matched = self.settings.subject.select(unseen);
        info!(unseen = unseen_count, matched = matched.len(), "unread messages checked");

        if matched.is_empty() {
            info!("no unread messages match the subject pattern");
            return Ok(RunReport::default());
        }

        let saved = save_attachments(&matched, scratch)?;
        let normalized = normalize(saved, scratch);
        if normalized.files.is_empty() {
            info!("matching messages carry no csv data");
        }

        let dispatched = dispatch_all(
            self.importer.as_ref(),
            target,
            &normalized.files,
            &self.settings.import_action,
            self.settings.comment.as_deref(),
        )
        .await;

        Ok(RunReport {
            matched_messages: matched.len(),
            dispatched,
            archive_failures: normalized.failures,
        })
    }
}
