// src/extractors/tasks.rs
use std::collections::HashSet;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::utils::AppError;

// Excel limits sheet names to 31 characters and forbids these.
const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// One section of the nómina: its sheet name and the heading the model
/// should look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTask {
    pub id: String,
    pub description: String,
}

impl ExtractionTask {
    pub fn new(id: &str, description: &str) -> Self {
        Self { id: id.to_string(), description: description.to_string() }
    }
}

// The seven sections of the decree, in document order.
const BUILTIN_TASKS: [(&str, &str); 7] = [
    (
        "I_Sector_Electrico",
        "I. Instituciones que proveen servicios de generación, transmisión o distribución eléctrica y el Coordinador Eléctrico Nacional",
    ),
    (
        "II_Telecomunicaciones",
        "II. Instituciones que prestan servicios de telecomunicaciones",
    ),
    (
        "III_Digital",
        "III. Instituciones que realizan actividades de infraestructura digital, servicios digitales y servicios de tecnología de la información",
    ),
    (
        "IV_Financiero",
        "IV. Instituciones que realizan actividades de banca, servicios financieros y medios de pago",
    ),
    (
        "V_Salud",
        "V. Instituciones que realizan servicios de prestación institucional de salud",
    ),
    (
        "VI_EmpresasEstado",
        "VI. Empresas del Estado y del sector estatal",
    ),
    (
        "VII_OrganismosEstado",
        "VII. Organismos de la Administración del Estado",
    ),
];

/// Ordered, read-only list of sections to extract. Order is sheet order.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<ExtractionTask>,
}

impl TaskRegistry {
    pub fn builtin() -> Self {
        let tasks = BUILTIN_TASKS
            .iter()
            .map(|(id, description)| ExtractionTask::new(id, description))
            .collect();
        Self { tasks }
    }

    /// Builds a registry from an explicit list, rejecting ids that cannot
    /// serve as sheet names.
    pub fn from_tasks(tasks: Vec<ExtractionTask>) -> Result<Self, AppError> {
        if tasks.is_empty() {
            return Err(AppError::Config("Task list is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for task in &tasks {
            validate_sheet_name(&task.id)?;
            if task.description.trim().is_empty() {
                return Err(AppError::Config(format!("Task '{}' has an empty description", task.id)));
            }
            if !seen.insert(task.id.to_lowercase()) {
                // Excel compares sheet names case-insensitively
                return Err(AppError::Config(format!("Duplicate task id '{}'", task.id)));
            }
        }

        Ok(Self { tasks })
    }

    /// Loads a JSON array of `{"id", "description"}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let tasks: Vec<ExtractionTask> = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("Invalid task file {}: {}", path.display(), e))
        })?;
        tracing::info!("Loaded {} tasks from {}", tasks.len(), path.display());
        Self::from_tasks(tasks)
    }

    pub fn tasks(&self) -> &[ExtractionTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

fn validate_sheet_name(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::Config("Task id is empty".to_string()));
    }
    if id.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(AppError::Config(format!(
            "Task id '{}' is longer than {} characters",
            id, MAX_SHEET_NAME_LEN
        )));
    }
    if id.contains(FORBIDDEN_SHEET_CHARS) || id.starts_with('\'') || id.ends_with('\'') {
        return Err(AppError::Config(format!("Task id '{}' is not a valid sheet name", id)));
    }
    Ok(())
}
