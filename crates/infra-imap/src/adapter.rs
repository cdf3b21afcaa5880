use std::sync::Arc;

use async_trait::async_trait;
use mailimport_domain::{MailMessage, MailboxPort, MimeNode, MimePart};
use mailimport_error::PipelineError;
use mailparse::{MailHeaderMap, ParsedMail};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub folder: String,
}

/// Reads unseen mail over IMAPS. Every call opens one session and logs out
/// before returning.
pub struct ImapMailbox {
    config: Arc<MailConfig>,
}

impl ImapMailbox {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

type ImapSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

fn imap_connect(config: &MailConfig) -> Result<ImapSession, PipelineError> {
    let tls = native_tls::TlsConnector::builder()
        .build()
        .map_err(|e| PipelineError::connect(format!("TLS init: {e}")))?;

    let client = imap::connect((config.host.as_str(), config.port), &config.host, &tls)
        .map_err(|e| PipelineError::connect(format!("{}:{}: {e}", config.host, config.port)))?;

    client
        .login(&config.username, &config.password)
        .map_err(|(e, _)| PipelineError::login(format!("{}: {e}", config.username)))
}

fn fetch_unseen(config: &MailConfig) -> Result<Vec<MailMessage>, PipelineError> {
    let mut session = imap_connect(config)?;
    info!(host = %config.host, user = %config.username, "connected to mailbox");

    let result = read_unseen(&mut session, &config.folder);

    if let Err(e) = session.logout() {
        debug!("IMAP logout: {e}");
    }
    result
}

fn read_unseen(session: &mut ImapSession, folder: &str) -> Result<Vec<MailMessage>, PipelineError> {
    session
        .select(folder)
        .map_err(|e| PipelineError::select(format!("{folder}: {e}")))?;

    let mut seqs: Vec<u32> = session
        .search("UNSEEN")
        .map_err(|e| PipelineError::search(e.to_string()))?
        .into_iter()
        .collect();
    seqs.sort_unstable();
    debug!(folder, count = seqs.len(), "unseen messages found");

    let mut messages = Vec::with_capacity(seqs.len());
    for seq in seqs {
        // RFC822 (not BODY.PEEK) so the server flags the message as seen.
        let fetches = session
            .fetch(seq.to_string(), "RFC822")
            .map_err(|e| PipelineError::fetch(format!("message {seq}: {e}")))?;
        let raw = fetches
            .iter()
            .next()
            .and_then(|f| f.body())
            .ok_or_else(|| PipelineError::fetch(format!("no body for message {seq}")))?;

        let message = parse_message(&seq.to_string(), raw)?;
        debug!(message = %message, "message fetched");
        messages.push(message);
    }

    Ok(messages)
}

pub(crate) fn parse_message(id: &str, raw: &[u8]) -> Result<MailMessage, PipelineError> {
    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| PipelineError::fetch(format!("message {id}: {e}")))?;
    let headers = parsed.get_headers();

    let subject = headers.get_first_value("Subject").unwrap_or_default();
    let sender = headers
        .get_first_value("From")
        .unwrap_or_else(|| "unknown".to_string());
    let timestamp = headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .unwrap_or(0);

    Ok(MailMessage {
        id: id.to_string(),
        subject,
        sender,
        timestamp,
        body: to_mime_node(&parsed),
    })
}

fn to_mime_node(part: &ParsedMail<'_>) -> MimeNode {
    if part.ctype.mimetype.starts_with("multipart/") {
        return MimeNode::Multipart(part.subparts.iter().map(to_mime_node).collect());
    }

    let content_type = part.ctype.mimetype.clone();
    let disposition = part.get_headers().get_first_value("Content-Disposition");
    let file_name = part
        .get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|n| decode_mime_str(n));

    MimeNode::Part(match part.get_body_raw() {
        Ok(payload) => MimePart {
            content_type,
            disposition,
            file_name,
            payload,
        },
        Err(e) => {
            warn!(file = ?file_name, "undecodable MIME part skipped: {e}");
            MimePart {
                content_type,
                ..Default::default()
            }
        }
    })
}

fn decode_mime_str(raw: &str) -> String {
    if !raw.contains("=?") {
        return raw.to_string();
    }
    let fake = format!("X: {raw}");
    match mailparse::parse_header(fake.as_bytes()) {
        Ok((hdr, _)) => hdr.get_value(),
        Err(_) => raw.to_string(),
    }
}

#[async_trait]
impl MailboxPort for ImapMailbox {
    async fn unseen_messages(&self) -> Result<Vec<MailMessage>, PipelineError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || fetch_unseen(&config))
            .await
            .map_err(|e| PipelineError::internal(format!("spawn: {e}")))?
    }
}
