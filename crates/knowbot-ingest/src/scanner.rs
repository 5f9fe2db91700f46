//! Shared knowledge base with simulated security scans.
//!
//! Every upload starts in `SCANNING`. A timer task, one per document, waits a
//! random delay and then flips the document to `ACTIVE`. Removing a document
//! aborts its timer.

use crate::error::{IngestError, IngestResult};
use knowbot_config::ScanConfig;
use knowbot_core::{Document, DocumentId, DocumentStore, StoreCounts};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Range the scan delay is drawn from, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    min: Duration,
    max: Duration,
}

impl ScanWindow {
    pub fn new(min: Duration, max: Duration) -> IngestResult<Self> {
        if min > max {
            return Err(IngestError::InvalidScanWindow {
                min_ms: min.as_millis() as u64,
                max_ms: max.as_millis() as u64,
            });
        }
        Ok(Self { min, max })
    }

    pub fn from_config(config: &ScanConfig) -> IngestResult<Self> {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// A fixed delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw one delay. Equal bounds always give that bound.
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(2000),
            max: Duration::from_millis(5000),
        }
    }
}

/// Cloneable handle to the document store and its pending scans.
#[derive(Clone)]
pub struct KnowledgeBase {
    store: Arc<RwLock<DocumentStore>>,
    timers: Arc<Mutex<HashMap<DocumentId, AbortHandle>>>,
    window: ScanWindow,
}

impl KnowledgeBase {
    pub fn new(window: ScanWindow) -> Self {
        Self {
            store: Arc::new(RwLock::new(DocumentStore::new())),
            timers: Arc::new(Mutex::new(HashMap::new())),
            window,
        }
    }

    /// Add a document and schedule its scan.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn upload(
        &self,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Document {
        let document = self.store.write().await.add(name, mime_type, content);
        let delay = self.window.sample();
        debug!("Scanning {} for {:?}", document.name, delay);

        let mut timers = self.timers.lock().await;
        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.timers);
        let id = document.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.write().await.mark_active(&id);
            pending.lock().await.remove(&id);
        });
        timers.insert(document.id.clone(), handle.abort_handle());

        document
    }

    /// Remove a document and cancel its scan if one is pending.
    pub async fn remove(&self, id: &str) -> Option<Document> {
        if let Some(timer) = self.timers.lock().await.remove(id) {
            timer.abort();
            debug!("Cancelled scan for {}", id);
        }
        self.store.write().await.remove(id)
    }

    /// Fail a scanning document, cancelling its timer.
    pub async fn mark_error(&self, id: &str) -> bool {
        if let Some(timer) = self.timers.lock().await.remove(id) {
            timer.abort();
        }
        self.store.write().await.mark_error(id)
    }

    /// Snapshot of every document in insertion order.
    pub async fn documents(&self) -> Vec<Document> {
        self.store.read().await.documents().to_vec()
    }

    /// Snapshot of the documents eligible for grounding.
    pub async fn active_subset(&self) -> Vec<Document> {
        self.store
            .read()
            .await
            .active_subset()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<Document> {
        self.store.read().await.get(id).cloned()
    }

    /// Look up a document by full id or unique id prefix.
    pub async fn find(&self, id_or_prefix: &str) -> Option<Document> {
        let store = self.store.read().await;
        store
            .get(id_or_prefix)
            .or_else(|| store.find_by_prefix(id_or_prefix))
            .cloned()
    }

    pub async fn counts(&self) -> StoreCounts {
        self.store.read().await.counts()
    }

    /// Number of scan timers still pending.
    pub async fn pending_scans(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Wait until no document is scanning. Returns `false` on timeout.
    pub async fn wait_until_settled(&self, timeout: Duration) -> bool {
        let settle = async {
            loop {
                if self.counts().await.scanning == 0 {
                    return;
                }
                tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, settle).await.is_ok()
    }

    /// Drop every document and cancel all pending scans.
    pub async fn clear(&self) {
        let mut timers = self.timers.lock().await;
        for (_, timer) in timers.drain() {
            timer.abort();
        }
        drop(timers);

        self.store.write().await.clear();
        info!("Knowledge base cleared");
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(ScanWindow::default())
    }
}
