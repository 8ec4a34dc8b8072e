//! Line ingestion and archival scheduling.

pub mod ingest;
pub mod scheduler;

// Re-export commonly used items
pub use ingest::{Collaborators, IngestPipeline, LineOutcome, PipelineConfig};
pub use scheduler::UploadScheduler;
