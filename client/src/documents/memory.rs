//! Embedded in-memory document store.
//!
//! Wraps the engine's deterministic database with the watcher plumbing the
//! stores need: every successful mutation re-runs the queries of watchers on
//! the same collection and fans out fresh snapshots. Server-timestamp
//! sentinels resolve against this store's clock at commit time, which makes
//! it the backend of record in tests and offline runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use wardline_engine::{CollectionPath, Database, Document, DocumentId, Query, WriteDoc};

use super::{Delivery, DocumentError, DocumentStore, Snapshot, Subscription};

/// Sender half of a watcher's delivery channel.
type DeliverySender = mpsc::UnboundedSender<Delivery>;

/// A registered watcher.
#[derive(Debug)]
struct Watcher {
    query: Query,
    sender: DeliverySender,
}

#[derive(Debug, Default)]
struct MemoryInner {
    db: Mutex<Database>,
    /// Active watchers, keyed by watch id.
    watchers: DashMap<u64, Watcher>,
    next_watch_id: AtomicU64,
}

/// In-memory [`DocumentStore`].
///
/// Cheap to clone; clones share the same database and watcher registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active watchers.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.len()
    }

    /// Raw read of a stored document. Test accessor.
    pub fn document(&self, path: &CollectionPath, id: &str) -> Option<Document> {
        self.db().get(path, id)
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.inner.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver the current result set to every watcher of `path`, pruning
    /// watchers whose receiving side is gone.
    fn fan_out(&self, path: &CollectionPath) {
        let db = self.db();
        let mut recipients = 0usize;
        let mut dead = Vec::new();

        for entry in self.inner.watchers.iter() {
            let watcher = entry.value();
            if watcher.query.path != *path {
                continue;
            }

            let snapshot = Snapshot {
                documents: db.execute(&watcher.query),
            };
            if watcher.sender.send(Ok(snapshot)).is_ok() {
                recipients += 1;
            } else {
                dead.push(*entry.key());
            }
        }
        drop(db);

        for watch_id in dead {
            self.inner.watchers.remove(&watch_id);
            tracing::debug!(watch_id, "Pruned dead watcher");
        }

        tracing::debug!(path = %path, recipients, "Fanned out snapshot");
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, path: &CollectionPath, doc: WriteDoc) -> Result<DocumentId, DocumentError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.db().insert(path, id.clone(), &doc, Utc::now())?;

        tracing::debug!(path = %path, id = %id, "Document added");
        self.fan_out(path);
        Ok(id)
    }

    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        patch: WriteDoc,
    ) -> Result<(), DocumentError> {
        self.db().update(path, id, &patch, Utc::now())?;

        tracing::debug!(path = %path, id = %id, "Document updated");
        self.fan_out(path);
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), DocumentError> {
        let removed = self.db().remove(path, id);

        if removed {
            tracing::debug!(path = %path, id = %id, "Document deleted");
            self.fan_out(path);
        }
        Ok(())
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<Document>, DocumentError> {
        Ok(self.db().execute(query))
    }

    fn watch(&self, query: &Query) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let watch_id = self.inner.next_watch_id.fetch_add(1, Ordering::Relaxed);

        // Initial snapshot and registration happen under the database lock,
        // so the first delivery is ordered ahead of any concurrent fan-out.
        {
            let db = self.db();
            let snapshot = Snapshot {
                documents: db.execute(query),
            };
            let _ = tx.send(Ok(snapshot));
            self.inner.watchers.insert(
                watch_id,
                Watcher {
                    query: query.clone(),
                    sender: tx,
                },
            );
        }

        tracing::debug!(watch_id, path = %query.path, "Watcher registered");

        let inner = Arc::clone(&self.inner);
        Subscription::new(rx, move || {
            inner.watchers.remove(&watch_id);
            tracing::debug!(watch_id, "Watcher unregistered");
        })
    }
}
