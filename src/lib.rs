//! Motor por lotes para eliminar metadata identificativa de imágenes, PDFs,
//! documentos Office y archivos de audio/video sin modificar nunca el original.

pub mod atomic;
pub mod config;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod planner;
pub mod registry;
pub mod report;
pub mod result;

pub use config::ScrubOptions;
pub use orchestrator::{BatchOrchestrator, BatchOutcome, CancelToken};
pub use result::{BatchSummary, ErrorCategory, ResultKind, ScrubRecord};
