pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod state;

pub use orchestrator::{PipelineOrchestrator, Services};
pub use output::{assemble_document, write_document};
pub use state::{RunStatus, RunSummary};
