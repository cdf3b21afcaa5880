use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("failed to login: {0}")]
    Login(String),

    #[error("failed to select mailbox: {0}")]
    Select(String),

    #[error("failed to get unread mails: {0}")]
    Search(String),

    #[error("failed to get message: {0}")]
    Fetch(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{message}")]
    Api { message: String, detail: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Where an error sits in the run's failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connectivity,
    Resolution,
    PerFile,
    Config,
    Internal,
}

impl ErrorKind {
    /// Per-file errors are recorded and the run goes on; everything else aborts it.
    pub fn is_fatal(self) -> bool {
        self != Self::PerFile
    }
}

impl PipelineError {
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }

    pub fn login(msg: impl Into<String>) -> Self {
        Self::Login(msg.into())
    }

    pub fn select(msg: impl Into<String>) -> Self {
        Self::Select(msg.into())
    }

    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn api(msg: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            detail: detail.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Raw diagnostic payload, e.g. the remote response body.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect(_)
            | Self::Login(_)
            | Self::Select(_)
            | Self::Search(_)
            | Self::Fetch(_)
            | Self::Network(_) => ErrorKind::Connectivity,
            Self::NotFound(_) => ErrorKind::Resolution,
            Self::Api { .. } | Self::Archive(_) | Self::Io(_) => ErrorKind::PerFile,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub kind: ErrorKind,
    pub fatal: bool,
}

impl From<&PipelineError> for ErrorReport {
    fn from(err: &PipelineError) -> Self {
        let code = match err {
            PipelineError::Connect(_) => "MAIL_CONNECT",
            PipelineError::Login(_) => "MAIL_LOGIN",
            PipelineError::Select(_) => "MAIL_SELECT",
            PipelineError::Search(_) => "MAIL_SEARCH",
            PipelineError::Fetch(_) => "MAIL_FETCH",
            PipelineError::Network(_) => "NETWORK_ERROR",
            PipelineError::Api { .. } => "API_ERROR",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::Archive(_) => "ARCHIVE_ERROR",
            PipelineError::Io(_) => "IO_ERROR",
            PipelineError::Config(_) => "CONFIG_ERROR",
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        };
        Self {
            code,
            message: err.to_string(),
            detail: err.detail().map(str::to_string),
            kind: err.kind(),
            fatal: err.kind().is_fatal(),
        }
    }
}

impl ErrorReport {
    pub fn to_compact(&self) -> String {
        let mut parts = vec![format!("[{}] {}", self.code, self.message)];
        if let Some(d) = &self.detail {
            parts.push(format!("Detail: {d}"));
        }
        parts.join(" | ")
    }
}
