// src/main.rs
mod document;
mod extractors;
mod llm;
mod pipeline;
mod storage;
mod utils;

use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;
use extractors::TaskRegistry;
use llm::{GeminiClient, GeminiSettings};
use pipeline::ExtractorConfig;
use utils::AppError;

/// Extracts the institution tables of the Chilean "Nómina de Operadores de
/// Importancia Vital" decree into a multi-sheet Excel workbook.
///
/// Every option has a default, so running with no arguments processes the
/// decree in the working directory.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF
    #[arg(short, long, env = "OIV_PDF_PATH",
          default_value = "CVE 2743431-NÓMINA DE OPERADORES DE IMPORTANCIA VITAL.pdf")]
    input: PathBuf,

    /// Output workbook, overwritten on each run
    #[arg(short, long, env = "OIV_EXCEL_OUTPUT", default_value = "Nomina_OIV_Extraccion_Corregida.xlsx")]
    output: PathBuf,

    /// Gemini model identifier
    #[arg(short, long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = llm::client::DEFAULT_BASE_URL)]
    base_url: String,

    /// Retries per section after the first attempt (transient errors only)
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Pause after each section, in milliseconds
    #[arg(long, env = "OIV_DELAY_MS", default_value_t = 1000)]
    delay_ms: u64,

    /// JSON file with [{"id", "description"}, ...] replacing the built-in sections
    #[arg(long)]
    tasks_file: Option<PathBuf>,

    /// Write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Save each raw model response into this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

impl Args {
    fn gemini_settings(&self) -> Result<GeminiSettings, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Config("GOOGLE_API_KEY is not set".to_string()))?;

        Ok(GeminiSettings {
            api_key: api_key.to_string(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_backoff: llm::client::DEFAULT_RETRY_BACKOFF,
        })
    }

    fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            input_path: self.input.clone(),
            output_path: self.output.clone(),
            model: self.model.clone(),
            request_delay: Duration::from_millis(self.delay_ms),
            summary_path: self.summary.clone(),
            debug_dir: self.debug_dir.clone(),
        }
    }

    fn registry(&self) -> Result<TaskRegistry, AppError> {
        match &self.tasks_file {
            Some(path) => TaskRegistry::from_json_file(path),
            None => Ok(TaskRegistry::builtin()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Resolve configuration; everything is fixed from here on
    let args = Args::parse();
    tracing::debug!("Input: {}, output: {}", args.input.display(), args.output.display());

    let settings = args.gemini_settings()?;
    let config = args.extractor_config();
    let registry = args.registry()?;

    // 3. Build the inference client
    let client = GeminiClient::new(settings)?;
    tracing::info!("Using model {} for {} sections", config.model, registry.len());

    // 4. Run the pipeline once
    let run = pipeline::run_pipeline(&config, &registry, &client).await?;

    let degraded = run.degraded_count();
    if degraded > 0 {
        tracing::warn!("{} of {} sections could not be extracted and were left empty", degraded, run.sections.len());
    }
    tracing::info!(
        "Process finished. {} records written to {}",
        run.record_count(),
        config.output_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_arguments() {
        let args = Args::try_parse_from(["oiv_extractor", "--api-key", "k"]).unwrap();

        assert_eq!(args.output, PathBuf::from("Nomina_OIV_Extraccion_Corregida.xlsx"));
        assert_eq!(args.max_retries, 2);

        let config = args.extractor_config();
        assert_eq!(config.request_delay, Duration::from_secs(1));
        assert_eq!(args.registry().unwrap().len(), 7);
        assert_eq!(args.gemini_settings().unwrap().timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_blank_api_key_is_config_error() {
        let args = Args::try_parse_from(["oiv_extractor", "--api-key", "  "]).unwrap();
        assert!(matches!(args.gemini_settings(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "oiv_extractor",
            "--api-key", "k",
            "--delay-ms", "0",
            "--model", "gemini-2.0-flash",
            "--summary", "out/summary.json",
        ])
        .unwrap();

        let config = args.extractor_config();
        assert!(config.request_delay.is_zero());
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.summary_path, Some(PathBuf::from("out/summary.json")));
    }
}
