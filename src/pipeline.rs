// src/pipeline.rs
use std::path::PathBuf;
use std::time::Duration;
use crate::document;
use crate::extractors::{Orchestrator, RunResult, TaskRegistry};
use crate::llm::InferenceClient;
use crate::storage::StorageManager;
use crate::utils::AppError;

/// Everything a run needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub model: String,
    pub request_delay: Duration,
    pub summary_path: Option<PathBuf>,
    pub debug_dir: Option<PathBuf>,
}

/// Load → extract every section → write the workbook.
///
/// Only a document load failure or a write failure is returned as an error;
/// per-section failures end up as empty sheets.
pub async fn run_pipeline<C: InferenceClient>(
    config: &ExtractorConfig,
    registry: &TaskRegistry,
    client: &C,
) -> Result<RunResult, AppError> {
    // Fails before any inference call and before the output is touched
    let text = document::load_pdf_text(&config.input_path).await?;
    tracing::info!("Document loaded. Starting extraction of {} sections...", registry.len());

    let orchestrator = Orchestrator::new(client, registry, config.request_delay)
        .with_debug_dir(config.debug_dir.clone());
    let run = orchestrator.run(&text).await;

    tracing::info!("Saving consolidated workbook...");
    let storage = StorageManager::new(&config.output_path);
    storage.save_workbook(&run)?;

    if let Some(summary_path) = &config.summary_path {
        // The workbook is the deliverable; a missing summary is not fatal
        if let Err(e) = storage.save_run_summary(&run, summary_path, &config.model, &config.input_path) {
            tracing::error!("Failed to save run summary: {}", e);
        }
    }

    Ok(run)
}
