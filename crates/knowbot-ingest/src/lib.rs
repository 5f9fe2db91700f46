//! Knowbot Ingest - document uploads and the simulated scan lifecycle.
//!
//! This crate provides:
//! - Reading text files into uploads (the upload surface)
//! - The shared knowledge base handle that schedules scan timers

mod error;
pub mod reader;
mod scanner;

pub use error::{IngestError, IngestResult};
pub use reader::{read_path, UploadedFile};
pub use scanner::{KnowledgeBase, ScanWindow};
