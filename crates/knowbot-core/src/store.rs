//! In-memory document store.
//!
//! Holds uploaded documents in insertion order together with their scan
//! status. Timers that drive the `SCANNING -> ACTIVE` transition live in
//! `knowbot-ingest`; this type only applies the transitions.

use crate::types::{Document, DocumentStatus};
use serde::Serialize;
use tracing::{debug, info};

/// Content stored when an upload arrives with no text at all.
pub const EMPTY_CONTENT_PLACEHOLDER: &str = "Sample extracted text content.";

/// Per-status document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub total: usize,
    pub scanning: usize,
    pub active: usize,
    pub error: usize,
}

impl StoreCounts {
    /// Whether at least one document can ground answers.
    pub fn is_ready(&self) -> bool {
        self.active > 0
    }
}

/// Ordered collection of uploaded documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new document in `SCANNING` state and return a copy of it.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Document {
        let mut content = raw_content.into();
        if content.is_empty() {
            content = EMPTY_CONTENT_PLACEHOLDER.to_string();
        }

        let document = Document::new(name, mime_type, content);
        info!("Added document {} ({})", document.name, document.short_id());
        self.documents.push(document.clone());
        document
    }

    /// Remove a document. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let index = self.documents.iter().position(|d| d.id == id)?;
        let removed = self.documents.remove(index);
        info!("Removed document {} ({})", removed.name, removed.short_id());
        Some(removed)
    }

    /// Move a scanning document to `ACTIVE`.
    ///
    /// Returns `false` when the id is unknown or the document is not
    /// scanning; a document never leaves `ACTIVE` or `ERROR`.
    pub fn mark_active(&mut self, id: &str) -> bool {
        self.transition(id, DocumentStatus::Active)
    }

    /// Move a scanning document to `ERROR`.
    pub fn mark_error(&mut self, id: &str) -> bool {
        self.transition(id, DocumentStatus::Error)
    }

    fn transition(&mut self, id: &str, to: DocumentStatus) -> bool {
        match self.documents.iter_mut().find(|d| d.id == id) {
            Some(doc) if doc.status == DocumentStatus::Scanning => {
                doc.status = to;
                info!("Document {} is now {}", doc.name, to);
                true
            }
            Some(doc) => {
                debug!("Ignoring {} transition for {} in state {}", to, doc.name, doc.status);
                false
            }
            None => {
                debug!("Ignoring {} transition for unknown document {}", to, id);
                false
            }
        }
    }

    /// Documents eligible for grounding, in insertion order.
    pub fn active_subset(&self) -> Vec<&Document> {
        self.documents.iter().filter(|d| d.is_active()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Find the single document whose id starts with `prefix`.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Document> {
        if prefix.is_empty() {
            return None;
        }
        let mut matches = self.documents.iter().filter(|d| d.id.starts_with(prefix));
        let first = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    pub fn counts(&self) -> StoreCounts {
        self.documents
            .iter()
            .fold(StoreCounts::default(), |mut counts, doc| {
                counts.total += 1;
                match doc.status {
                    DocumentStatus::Scanning => counts.scanning += 1,
                    DocumentStatus::Active => counts.active += 1,
                    DocumentStatus::Error => counts.error += 1,
                }
                counts
            })
    }
}
