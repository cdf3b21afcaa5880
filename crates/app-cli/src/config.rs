use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mailimport_error::PipelineError;
use mailimport_imap::MailConfig;
use mailimport_pipeline::{RunSettings, SubjectFilter};
use mailimport_rest::RemoteConfig;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub remote: RemoteSettings,
    pub mail: MailSettings,
    pub import: ImportSettings,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub subject: String,
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default)]
    pub case_insensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportSettings {
    pub name: String,
    pub action: String,
}

/// Per-run values handed over by the scheduler.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    #[serde(default)]
    pub process_id: Option<Value>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub integration_name: Option<String>,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("import_files")
}

fn default_port() -> u16 {
    993
}

fn default_folder() -> String {
    "INBOX".to_string()
}

pub fn load_settings(path: &Path) -> Result<Settings, PipelineError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| PipelineError::config(format!("read {}: {e}", path.display())))?;
    Settings::from_json(&raw)
}

/// A missing parameters file is not an error; the run just has no comment.
pub fn load_parameters(path: &Path) -> Result<Option<RunParameters>, PipelineError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PipelineError::config(format!("read {}: {e}", path.display())));
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| PipelineError::config(format!("{}: {e}", path.display())))
}

impl Settings {
    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        let settings: Settings = serde_json::from_str(raw)
            .map_err(|e| PipelineError::config(format!("incorrect value in the settings file: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        let required = [
            ("remote.url", &self.remote.url),
            ("remote.accessKey", &self.remote.access_key),
            ("remote.secretKey", &self.remote.secret_key),
            ("mail.host", &self.mail.host),
            ("mail.username", &self.mail.username),
            ("mail.password", &self.mail.password),
            ("mail.subject", &self.mail.subject),
            ("mail.folder", &self.mail.folder),
            ("import.name", &self.import.name),
            ("import.action", &self.import.action),
        ];
        for (key, val) in required {
            if val.trim().is_empty() {
                return Err(PipelineError::config(format!("{key} cannot be empty")));
            }
        }
        if self.mail.port == 0 {
            return Err(PipelineError::config("mail.port cannot be 0"));
        }
        SubjectFilter::new(&self.mail.subject, self.mail.case_insensitive)?;
        Ok(())
    }

    pub fn mail_config(&self) -> MailConfig {
        MailConfig {
            host: self.mail.host.clone(),
            port: self.mail.port,
            username: self.mail.username.clone(),
            password: self.mail.password.clone(),
            folder: self.mail.folder.clone(),
        }
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            url: self.remote.url.clone(),
            access_key: self.remote.access_key.clone(),
            secret_key: self.remote.secret_key.clone(),
        }
    }

    pub fn run_settings(&self, comment: Option<String>) -> Result<RunSettings, PipelineError> {
        Ok(RunSettings {
            import_name: self.import.name.clone(),
            import_action: self.import.action.clone(),
            comment,
            subject: SubjectFilter::new(&self.mail.subject, self.mail.case_insensitive)?,
            scratch_dir: self.scratch_dir.clone(),
        })
    }
}

impl RunParameters {
    /// `"<integration> (process <id>)"`, or whichever half is known.
    pub fn comment(&self) -> Option<String> {
        let process = self.process_id.as_ref().and_then(|v| match v {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        });
        let name = self
            .integration_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        match (name, process) {
            (Some(name), Some(id)) => Some(format!("{name} (process {id})")),
            (Some(name), None) => Some(name.to_string()),
            (None, Some(id)) => Some(format!("process {id}")),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SETTINGS: &str = r#"{
        "remote": { "url": "https://acme.onevizion.com/", "accessKey": "ak", "secretKey": "sk" },
        "mail": { "host": "imap.gmail.com", "username": "ops@acme.com", "password": "pw", "subject": "DocuSign" },
        "import": { "name": "Envelopes", "action": "INSERT_UPDATE" }
    }"#;

    #[test]
    fn defaults_are_applied() {
        let settings = Settings::from_json(SETTINGS).unwrap();
        assert_eq!(settings.mail.port, 993);
        assert_eq!(settings.mail.folder, "INBOX");
        assert!(!settings.mail.case_insensitive);
        assert_eq!(settings.scratch_dir, PathBuf::from("import_files"));

        let mail = settings.mail_config();
        assert_eq!(mail.host, "imap.gmail.com");
        let run = settings.run_settings(None).unwrap();
        assert_eq!(run.import_name, "Envelopes");
        assert!(run.subject.matches("Weekly DocuSign Report"));
    }

    #[test]
    fn empty_required_value_is_rejected() {
        let raw = SETTINGS.replace("\"Envelopes\"", "\"  \"");
        let err = Settings::from_json(&raw).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: import.name cannot be empty");
    }

    #[test]
    fn invalid_subject_pattern_is_rejected() {
        let raw = SETTINGS.replace("\"DocuSign\"", "\"Docu(Sign\"");
        assert!(matches!(Settings::from_json(&raw), Err(PipelineError::Config(_))));
    }

    #[test]
    fn missing_section_is_rejected() {
        let err = Settings::from_json(r#"{"remote": {}}"#).unwrap_err();
        assert!(err.to_string().contains("incorrect value in the settings file"));
    }

    #[test]
    fn parameters_file_is_optional() {
        let tmp = TempDir::new().unwrap();
        assert!(load_parameters(&tmp.path().join("absent.json")).unwrap().is_none());

        let path = tmp.path().join("run_parameters.json");
        fs::write(
            &path,
            r#"{"processId": 1001, "logLevel": "Debug", "integrationName": "DocuSign import"}"#,
        )
        .unwrap();
        let params = load_parameters(&path).unwrap().unwrap();
        assert_eq!(params.log_level.as_deref(), Some("Debug"));
        assert_eq!(params.comment().as_deref(), Some("DocuSign import (process 1001)"));
    }

    #[test]
    fn comment_uses_whatever_is_known() {
        let params = RunParameters {
            process_id: Some(Value::String("abc".into())),
            ..Default::default()
        };
        assert_eq!(params.comment().as_deref(), Some("process abc"));
        assert_eq!(RunParameters::default().comment(), None);
    }
}
