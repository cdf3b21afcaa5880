use std::path::PathBuf;

use mailimport_domain::{DispatchResult, DispatchStatus, ImportPort, ImportTarget};
use mailimport_error::PipelineError;
use tracing::{error, info};

/// Looks the import up by exact name in the remote catalog.
pub async fn resolve_import(
    importer: &dyn ImportPort,
    import_name: &str,
) -> Result<ImportTarget, PipelineError> {
    let catalog = importer.list_imports().await?;
    catalog
        .into_iter()
        .find(|entry| entry.name == import_name)
        .map(|entry| ImportTarget {
            id: entry.id,
            name: entry.name,
        })
        .ok_or_else(|| PipelineError::not_found(format!("import \"{import_name}\"")))
}

/// Submits every file in order. A failed file never stops the ones after it.
pub async fn dispatch_all(
    importer: &dyn ImportPort,
    target: &ImportTarget,
    files: &[PathBuf],
    action: &str,
    comment: Option<&str>,
) -> Vec<DispatchResult> {
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        let status = match importer.run_import(target, file, action, comment).await {
            Ok(process_id) => {
                info!(
                    import = %target.name,
                    file = %file.display(),
                    %process_id,
                    "import has been started"
                );
                DispatchStatus::Started { process_id }
            }
            Err(e) => {
                error!(
                    import = %target.name,
                    file = %file.display(),
                    error = %e,
                    detail = e.detail().unwrap_or_default(),
                    "failed to start import"
                );
                DispatchStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        results.push(DispatchResult {
            file: file.clone(),
            status,
        });
    }

    results
}
