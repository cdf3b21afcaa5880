use mailimport_domain::MailMessage;
use mailimport_error::PipelineError;
use regex::{Regex, RegexBuilder};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SubjectFilter {
    re: Regex,
}

impl SubjectFilter {
    pub fn new(pattern: &str, case_insensitive: bool) -> Result<Self, PipelineError> {
        if pattern.is_empty() {
            return Err(PipelineError::config("subject pattern cannot be empty"));
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| PipelineError::config(format!("subject pattern '{pattern}': {e}")))?;
        Ok(Self { re })
    }

    pub fn matches(&self, subject: &str) -> bool {
        self.re.is_match(subject)
    }

    /// Keeps matching messages in their original order.
    pub fn select(&self, messages: Vec<MailMessage>) -> Vec<MailMessage> {
        messages
            .into_iter()
            .filter(|m| {
                let keep = self.matches(&m.subject);
                if !keep {
                    debug!(message = %m, "subject does not match, skipped");
                }
                keep
            })
            .collect()
    }
}
