mod config;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use mailimport_domain::RunOutcome;
use mailimport_error::{ErrorReport, PipelineError};
use mailimport_imap::ImapMailbox;
use mailimport_pipeline::ImportService;
use mailimport_rest::ImportClient;
use tracing::{debug, error, info, warn};

use crate::config::RunParameters;

const EXIT_ABORTED: i32 = 1;
const EXIT_PARTIAL_FAILURE: i32 = 2;
const EXIT_NO_INPUT: i32 = 3;

fn init_tracing(log_level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_directive(log_level))),
        )
        .compact()
        .init();
}

/// Maps the scheduler's log level names onto a filter directive.
fn log_directive(log_level: Option<&str>) -> String {
    let level = match log_level.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warning" | "warn") => "warn",
        Some("error") => "error",
        _ => "info",
    };
    format!("mailimport={level}")
}

fn exit_code(outcome: RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Imported { .. } => 0,
        RunOutcome::NoInput => EXIT_NO_INPUT,
        RunOutcome::PartialFailure { .. } => EXIT_PARTIAL_FAILURE,
    }
}

fn path_from_env(var: &str, default: &str) -> PathBuf {
    env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

async fn run(params: Option<RunParameters>) -> Result<RunOutcome, PipelineError> {
    let settings_path = path_from_env("MAILIMPORT_SETTINGS", "settings.json");
    let settings = config::load_settings(&settings_path)?;
    debug!(settings = %settings_path.display(), "settings loaded");

    let comment = params.as_ref().and_then(RunParameters::comment);
    let service = ImportService::new(
        Arc::new(ImapMailbox::new(settings.mail_config())),
        Arc::new(ImportClient::new(settings.remote_config())),
        settings.run_settings(comment)?,
    );

    let report = service.run().await?;
    for failure in &report.archive_failures {
        warn!(archive = %failure.archive.display(), error = %failure.error, "archive skipped");
    }
    if let Ok(json) = serde_json::to_string(&report) {
        debug!(report = %json, "run report");
    }
    Ok(report.outcome())
}

fn print_help() {
    eprintln!("mailimport: import CSV attachments from unread mail");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  mailimport          Run once");
    eprintln!("  mailimport help     Show this help");
    eprintln!();
    eprintln!("Environment variables:");
    eprintln!("  MAILIMPORT_SETTINGS    Settings file (default: settings.json)");
    eprintln!("  MAILIMPORT_PARAMETERS  Run parameters file (default: run_parameters.json)");
    eprintln!("  RUST_LOG               Log filter (default: mailimport=<logLevel or info>)");
    eprintln!();
    eprintln!("Exit status: 0 imported, 1 aborted, 2 some files failed, 3 nothing to import");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        None | Some("run") => {}
        Some("help" | "--help" | "-h") => {
            print_help();
            return;
        }
        Some(unknown) => {
            eprintln!("Unknown command: {unknown}");
            eprintln!("Run `mailimport help` for usage");
            std::process::exit(EXIT_ABORTED);
        }
    }

    let params_path = path_from_env("MAILIMPORT_PARAMETERS", "run_parameters.json");
    let params = config::load_parameters(&params_path);
    let log_level = params
        .as_ref()
        .ok()
        .and_then(|p| p.as_ref())
        .and_then(|p| p.log_level.clone());
    init_tracing(log_level.as_deref());

    let result = match params {
        Ok(params) => run(params).await,
        Err(e) => Err(e),
    };

    let code = match result {
        Ok(outcome) => {
            if outcome.is_success() {
                info!(%outcome, "finished");
            } else {
                error!(%outcome, "finished with failures");
            }
            exit_code(outcome)
        }
        Err(e) => {
            let report = ErrorReport::from(&e);
            error!(
                code = report.code,
                kind = ?report.kind,
                detail = report.detail.as_deref().unwrap_or_default(),
                "{}",
                report.to_compact()
            );
            EXIT_ABORTED
        }
    };

    std::process::exit(code);
}
