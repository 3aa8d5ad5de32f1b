// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};
use rust_xlsxwriter::{Format, Workbook};
use crate::extractors::schema::COLUMNS;
use crate::extractors::RunResult;
use crate::utils::error::StorageError;

// Column widths for numero, razon_social, rut, domicilio
const COLUMN_WIDTHS: [f64; 4] = [8.0, 50.0, 16.0, 60.0];

/// Writes run results to disk.
pub struct StorageManager {
    output_path: PathBuf,
}

impl StorageManager {
    pub fn new<P: AsRef<Path>>(output_path: P) -> Self {
        Self { output_path: output_path.as_ref().to_path_buf() }
    }

    /// Saves one sheet per section, in run order, overwriting any existing file.
    /// Degraded sections still get a sheet with the header row.
    pub fn save_workbook(&self, run: &RunResult) -> Result<PathBuf, StorageError> {
        ensure_parent_dir(&self.output_path)?;

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        for section in &run.sections {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(section.task.id.as_str())?;

            for (col, (title, width)) in COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
                let col = col as u16;
                worksheet.write_string_with_format(0, col, *title, &header_format)?;
                worksheet.set_column_width(col, width)?;
            }

            for (row, record) in section.result.items.iter().enumerate() {
                let row = row as u32 + 1;
                for (col, value) in record.cells().iter().enumerate() {
                    // Leave absent values as blank cells
                    if !value.is_empty() {
                        worksheet.write_string(row, col as u16, *value)?;
                    }
                }
            }

            tracing::debug!("Wrote sheet {} with {} rows", section.task.id, section.result.len());
        }

        workbook.save(&self.output_path)?;
        tracing::info!("Saved workbook to {}", self.output_path.display());

        Ok(self.output_path.clone())
    }

    /// Saves a JSON summary of the run next to (or apart from) the workbook.
    pub fn save_run_summary(&self, run: &RunResult, summary_path: &Path, model: &str, input: &Path) -> Result<PathBuf, StorageError> {
        ensure_parent_dir(summary_path)?;

        let sections: Vec<serde_json::Value> = run
            .sections
            .iter()
            .map(|section| {
                let mut entry = serde_json::json!({
                    "id": section.task.id,
                    "description": section.task.description,
                    "records": section.result.len(),
                });
                if let (Some(obj), Ok(serde_json::Value::Object(status))) =
                    (entry.as_object_mut(), serde_json::to_value(&section.status))
                {
                    obj.extend(status);
                }
                entry
            })
            .collect();

        let summary = serde_json::json!({
            "input": input.display().to_string(),
            "output": self.output_path.display().to_string(),
            "model": model,
            "total_records": run.record_count(),
            "degraded_sections": run.degraded_count(),
            "sections": sections,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let summary_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(summary_path, summary_str)?;
        tracing::info!("Saved run summary to {}", summary_path.display());

        Ok(summary_path.to_path_buf())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
