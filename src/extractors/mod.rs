// src/extractors/mod.rs
pub mod orchestrator;
pub mod schema;
pub mod tasks;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use orchestrator::{Orchestrator, RunResult, SectionReport, SectionStatus};
#[allow(unused_imports)]
pub use schema::{Record, SectionResult};
#[allow(unused_imports)]
pub use tasks::{ExtractionTask, TaskRegistry};
