use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mailimport_domain::*;
use mailimport_error::PipelineError;

pub fn attachment(name: &str, payload: &[u8]) -> MimeNode {
    MimeNode::Part(MimePart {
        content_type: "application/octet-stream".into(),
        disposition: Some(format!("attachment; filename=\"{name}\"")),
        file_name: Some(name.into()),
        payload: payload.to_vec(),
    })
}

pub fn text_body(text: &str) -> MimeNode {
    MimeNode::Part(MimePart {
        content_type: "text/plain".into(),
        disposition: None,
        file_name: None,
        payload: text.as_bytes().to_vec(),
    })
}

pub fn message(id: &str, subject: &str, attachments: Vec<MimeNode>) -> MailMessage {
    let mut parts = vec![text_body("see attached")];
    parts.extend(attachments);
    MailMessage {
        id: id.into(),
        subject: subject.into(),
        sender: "reports@example.com".into(),
        timestamp: 1_700_000_000,
        body: MimeNode::Multipart(parts),
    }
}

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

pub fn write_file(path: &Path, data: &[u8]) -> PathBuf {
    fs::write(path, data).unwrap();
    path.to_path_buf()
}

/// Mailbox holding `(seen, message)` pairs; hands out only unseen ones.
#[derive(Default)]
pub struct FakeMailbox {
    pub messages: Vec<(bool, MailMessage)>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeMailbox {
    pub fn unseen(messages: Vec<MailMessage>) -> Self {
        Self {
            messages: messages.into_iter().map(|m| (false, m)).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailboxPort for FakeMailbox {
    async fn unseen_messages(&self) -> Result<Vec<MailMessage>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PipelineError::login("authentication failed"));
        }
        Ok(self
            .messages
            .iter()
            .filter(|(seen, _)| !seen)
            .map(|(_, m)| m.clone())
            .collect())
    }
}

/// Records each upload with the file contents seen at upload time.
#[derive(Default)]
pub struct FakeImporter {
    pub catalog: Vec<ImportEntry>,
    pub catalog_error: bool,
    pub reject: Vec<String>,
    pub uploads: Mutex<Vec<Upload>>,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file: PathBuf,
    pub contents: Vec<u8>,
    pub action: String,
    pub comment: Option<String>,
}

impl FakeImporter {
    pub fn with_import(name: &str, id: &str) -> Self {
        Self {
            catalog: vec![
                ImportEntry {
                    id: ImportId("1".into()),
                    name: "Other".into(),
                },
                ImportEntry {
                    id: ImportId(id.into()),
                    name: name.into(),
                },
            ],
            ..Default::default()
        }
    }

    pub fn rejecting(mut self, file_name: &str) -> Self {
        self.reject.push(file_name.into());
        self
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads()
            .iter()
            .filter_map(|u| u.file.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ImportPort for FakeImporter {
    async fn list_imports(&self) -> Result<Vec<ImportEntry>, PipelineError> {
        if self.catalog_error {
            return Err(PipelineError::api("failed to get import", "503 unavailable"));
        }
        Ok(self.catalog.clone())
    }

    async fn run_import(
        &self,
        target: &ImportTarget,
        file: &Path,
        action: &str,
        comment: Option<&str>,
    ) -> Result<ProcessId, PipelineError> {
        let contents = fs::read(file).unwrap_or_default();
        let count = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(Upload {
                file: file.to_path_buf(),
                contents,
                action: action.into(),
                comment: comment.map(str::to_string),
            });
            uploads.len()
        };
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if self.reject.iter().any(|r| r == name) {
            return Err(PipelineError::api("failed to start import", "invalid file"));
        }
        Ok(ProcessId(format!("{}-{count}", target.id)))
    }
}
