use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// File types the pipeline accepts. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Zip,
}

impl FileKind {
    pub const ALL: [FileKind; 2] = [FileKind::Csv, FileKind::Zip];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => ".csv",
            Self::Zip => ".zip",
        }
    }

    /// Case-insensitive suffix check against the closed extension set.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| lower.len() > kind.extension().len() && lower.ends_with(kind.extension()))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::from_name)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Zip => write!(f, "zip"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub timestamp: i64,
    pub body: MimeNode,
}

impl MailMessage {
    pub fn date(&self) -> Option<DateTime<Utc>> {
        if self.timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

impl fmt::Display for MailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.subject.chars().take(80).collect();
        let suffix = if self.subject.chars().count() > 80 {
            "..."
        } else {
            ""
        };
        write!(f, "[{}] {}", self.id, self.sender)?;
        if let Some(date) = self.date() {
            write!(f, " ({})", date.format("%Y-%m-%d %H:%M"))?;
        }
        write!(f, ": {preview}{suffix}")
    }
}

/// Structural view of a MIME body: containers hold parts, leaves hold payloads.
#[derive(Debug, Clone)]
pub enum MimeNode {
    Part(MimePart),
    Multipart(Vec<MimeNode>),
}

#[derive(Debug, Clone, Default)]
pub struct MimePart {
    pub content_type: String,
    pub disposition: Option<String>,
    pub file_name: Option<String>,
    pub payload: Vec<u8>,
}

impl MimePart {
    /// A leaf counts as an attachment only with both a disposition and a name.
    pub fn is_attachment(&self) -> bool {
        let has_disposition = self
            .disposition
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        let has_name = self
            .file_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        has_disposition && has_name
    }

    pub fn kind(&self) -> Option<FileKind> {
        self.file_name.as_deref().and_then(FileKind::from_name)
    }
}

impl MimeNode {
    /// Attachment leaves in document order.
    pub fn attachments(&self) -> Vec<&MimePart> {
        let mut out = Vec::new();
        collect_attachments(self, &mut out);
        out
    }
}

fn collect_attachments<'a>(node: &'a MimeNode, out: &mut Vec<&'a MimePart>) {
    match node {
        MimeNode::Part(part) if part.is_attachment() => out.push(part),
        MimeNode::Part(_) => {}
        MimeNode::Multipart(children) => {
            for child in children {
                collect_attachments(child, out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ImportId(pub String);

impl fmt::Display for ImportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the remote import catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub id: ImportId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportTarget {
    pub id: ImportId,
    pub name: String,
}

impl fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProcessId(pub String);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DispatchStatus {
    Started { process_id: ProcessId },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub file: PathBuf,
    #[serde(flatten)]
    pub status: DispatchStatus,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DispatchStatus::Started { .. })
    }
}

/// An archive that could not be opened or extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveFailure {
    pub archive: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub matched_messages: usize,
    pub dispatched: Vec<DispatchResult>,
    pub archive_failures: Vec<ArchiveFailure>,
}

impl RunReport {
    pub fn imported(&self) -> usize {
        self.dispatched.iter().filter(|d| d.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.dispatched.len() - self.imported() + self.archive_failures.len()
    }

    pub fn outcome(&self) -> RunOutcome {
        let imported = self.imported();
        let failed = self.failed();
        if failed > 0 {
            RunOutcome::PartialFailure { imported, failed }
        } else if imported == 0 {
            RunOutcome::NoInput
        } else {
            RunOutcome::Imported { files: imported }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RunOutcome {
    NoInput,
    Imported { files: usize },
    PartialFailure { imported: usize, failed: usize },
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        !matches!(self, Self::PartialFailure { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInput => write!(f, "no matching input"),
            Self::Imported { files } => write!(f, "imported {files} file(s)"),
            Self::PartialFailure { imported, failed } => {
                write!(f, "imported {imported} file(s), {failed} failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(disposition: Option<&str>, name: Option<&str>) -> MimeNode {
        MimeNode::Part(MimePart {
            content_type: "application/octet-stream".into(),
            disposition: disposition.map(str::to_string),
            file_name: name.map(str::to_string),
            payload: b"x".to_vec(),
        })
    }

    #[test]
    fn file_kind_is_case_insensitive_suffix() {
        assert_eq!(FileKind::from_name("report.csv"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_name("REPORT.CSV"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_name("batch.Zip"), Some(FileKind::Zip));
        assert_eq!(FileKind::from_name("report.csv.txt"), None);
        assert_eq!(FileKind::from_name("my.csvfile"), None);
        assert_eq!(FileKind::from_name(".csv"), None);
        assert_eq!(FileKind::from_path(Path::new("dir.zip/inner.csv")), Some(FileKind::Csv));
    }

    #[test]
    fn attachments_walk_nested_containers_in_order() {
        let tree = MimeNode::Multipart(vec![
            part(None, None),
            MimeNode::Multipart(vec![
                part(Some("attachment"), Some("a.csv")),
                part(Some("inline"), Some("b.zip")),
            ]),
            part(Some("attachment"), Some("c.pdf")),
        ]);
        let names: Vec<_> = tree
            .attachments()
            .iter()
            .filter_map(|p| p.file_name.clone())
            .collect();
        assert_eq!(names, ["a.csv", "b.zip", "c.pdf"]);
    }

    #[test]
    fn part_without_name_or_disposition_is_not_attachment() {
        let tree = MimeNode::Multipart(vec![
            part(Some("attachment"), None),
            part(Some("attachment"), Some("  ")),
            part(None, Some("orphan.csv")),
        ]);
        assert!(tree.attachments().is_empty());
    }

    #[test]
    fn outcome_distinguishes_noop_success_and_partial_failure() {
        let ok = |n: &str| DispatchResult {
            file: PathBuf::from(n),
            status: DispatchStatus::Started {
                process_id: ProcessId("1".into()),
            },
        };
        let failed = |n: &str| DispatchResult {
            file: PathBuf::from(n),
            status: DispatchStatus::Failed {
                error: "rejected".into(),
            },
        };

        assert_eq!(RunReport::default().outcome(), RunOutcome::NoInput);

        let report = RunReport {
            matched_messages: 1,
            dispatched: vec![ok("a.csv"), ok("b.csv")],
            archive_failures: vec![],
        };
        assert_eq!(report.outcome(), RunOutcome::Imported { files: 2 });

        let report = RunReport {
            matched_messages: 1,
            dispatched: vec![ok("a.csv"), failed("b.csv")],
            archive_failures: vec![ArchiveFailure {
                archive: PathBuf::from("c.zip"),
                error: "bad header".into(),
            }],
        };
        let outcome = report.outcome();
        assert_eq!(
            outcome,
            RunOutcome::PartialFailure {
                imported: 1,
                failed: 2
            }
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn zero_timestamp_has_no_date() {
        let msg = MailMessage {
            id: "1".into(),
            subject: "s".into(),
            sender: "a@b.c".into(),
            timestamp: 0,
            body: MimeNode::Multipart(vec![]),
        };
        assert!(msg.date().is_none());
        let msg = MailMessage {
            timestamp: 1_700_000_000,
            ..msg
        };
        assert_eq!(msg.date().map(|d| d.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn display_shows_date_only_when_known() {
        let msg = MailMessage {
            id: "7".into(),
            subject: "Weekly DocuSign Report".into(),
            sender: "dse@docusign.net".into(),
            timestamp: 1_700_000_000,
            body: MimeNode::Multipart(vec![]),
        };
        assert_eq!(
            msg.to_string(),
            "[7] dse@docusign.net (2023-11-14 22:13): Weekly DocuSign Report"
        );
        let undated = MailMessage { timestamp: 0, ..msg };
        assert_eq!(undated.to_string(), "[7] dse@docusign.net: Weekly DocuSign Report");
    }
}
