// src/extractors/orchestrator.rs
use std::path::PathBuf;
use std::time::Duration;
use serde::Serialize;
use crate::extractors::schema::{self, SectionResult};
use crate::extractors::tasks::{ExtractionTask, TaskRegistry};
use crate::llm::{InferenceClient, Prompt};
use crate::utils::error::TaskError;
use crate::utils::response_debug;

const SYSTEM_INSTRUCTION: &str = "Eres un experto en extracción de datos legales exactos.";

/// Terminal state of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    Populated,
    Empty { reason: String },
}

/// Result for one task, whether it succeeded or degraded.
#[derive(Debug, Clone)]
pub struct SectionReport {
    pub task: ExtractionTask,
    pub result: SectionResult,
    pub status: SectionStatus,
}

impl SectionReport {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, SectionStatus::Empty { .. })
    }
}

/// Every section of a run, in registry order.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub sections: Vec<SectionReport>,
}

impl RunResult {
    #[cfg(test)]
    pub fn get(&self, task_id: &str) -> Option<&SectionResult> {
        self.sections.iter().find(|s| s.task.id == task_id).map(|s| &s.result)
    }

    pub fn degraded_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_degraded()).count()
    }

    pub fn record_count(&self) -> usize {
        self.sections.iter().map(|s| s.result.len()).sum()
    }
}

/// Runs one inference-and-validate cycle per task, sequentially.
pub struct Orchestrator<'a, C> {
    client: &'a C,
    registry: &'a TaskRegistry,
    delay: Duration,
    debug_dir: Option<PathBuf>,
}

impl<'a, C: InferenceClient> Orchestrator<'a, C> {
    pub fn new(client: &'a C, registry: &'a TaskRegistry, delay: Duration) -> Self {
        Self { client, registry, delay, debug_dir: None }
    }

    /// Also dump every raw model response into `dir`.
    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    /// Extracts every section from `document_text`. Never fails: a section
    /// whose call or validation fails is recorded as empty.
    pub async fn run(&self, document_text: &str) -> RunResult {
        let format_instructions = schema::format_instructions();
        let total = self.registry.len();
        let mut run = RunResult::default();

        for (idx, task) in self.registry.tasks().iter().enumerate() {
            tracing::info!("--- Processing [{}/{}]: {} ---", idx + 1, total, task.id);

            let prompt = build_prompt(task, document_text, &format_instructions);
            let report = match self.extract_section(task, &prompt).await {
                Ok(result) => {
                    if result.is_empty() {
                        tracing::warn!("{}: model returned no records for this section", task.id);
                    } else {
                        tracing::info!("{}: extracted {} records", task.id, result.len());
                    }
                    SectionReport { task: task.clone(), result, status: SectionStatus::Populated }
                }
                Err(e) => {
                    tracing::error!("{}: extraction failed, writing empty sheet: {}", task.id, e);
                    SectionReport {
                        task: task.clone(),
                        result: SectionResult::empty(),
                        status: SectionStatus::Empty { reason: e.to_string() },
                    }
                }
            };
            run.sections.push(report);

            // Pace requests to the backend, whatever the outcome
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        tracing::info!(
            "Extraction finished: {} sections, {} records, {} degraded",
            run.sections.len(),
            run.record_count(),
            run.degraded_count()
        );
        run
    }

    async fn extract_section(&self, task: &ExtractionTask, prompt: &Prompt) -> Result<SectionResult, TaskError> {
        let raw = self.client.generate(prompt).await?;

        if let Some(dir) = &self.debug_dir {
            if let Err(e) = response_debug::save_raw_response(dir, &task.id, &raw) {
                tracing::warn!("Failed to save raw response for {}: {}", task.id, e);
            }
        }

        let result = schema::parse_section_result(&raw)?;
        Ok(result)
    }
}

/// Renders the prompt for one section over the full document text.
pub fn build_prompt(task: &ExtractionTask, document_text: &str, format_instructions: &str) -> Prompt {
    let user = format!(
        r#"Analiza el texto del documento adjunto.
Tu ÚNICO objetivo es extraer la tabla correspondiente a la sección:

**"{description}"**

Instrucciones Críticas:
1. Extrae TODAS las filas de esta sección específica.
2. No inventes datos. Si el texto está cortado, intenta reconstruirlo lógicamente.
3. Ignora encabezados y pies de página.
4. Devuelve SOLO el JSON estructurado según se solicita.

{format_instructions}

--- TEXTO DEL DOCUMENTO ---
{document_text}"#,
        description = task.description,
        format_instructions = format_instructions,
        document_text = document_text,
    );

    Prompt { system: SYSTEM_INSTRUCTION.to_string(), user }
}
