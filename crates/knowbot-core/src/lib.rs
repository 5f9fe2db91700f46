//! Knowbot Core - Core types and the document store for the Knowbot knowledge bot.

mod error;
mod store;
mod types;

pub use error::{Error, Result};
pub use store::{DocumentStore, StoreCounts, EMPTY_CONTENT_PLACEHOLDER};
pub use types::*;
