//! Document store client boundary.
//!
//! Stores talk to the backing document store through [`DocumentStore`] only,
//! so the same synchronization logic runs against the embedded memory
//! backend and against test fakes. Watching a query yields a [`Subscription`]:
//! a cancelable stream of full-collection snapshots.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use wardline_engine::{CollectionPath, Document, DocumentId, Query, WriteDoc};

mod memory;

pub use memory::MemoryStore;

/// Errors from the document store boundary.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("document data error: {0}")]
    Data(#[from] wardline_engine::Error),
}

/// One full-collection delivery for a watched query.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Every document currently matching the query, in query order.
    pub documents: Vec<Document>,
}

/// What a watcher receives.
pub type Delivery = Result<Snapshot, DocumentError>;

type CancelFn = Box<dyn FnOnce() + Send>;

/// A live watch on a query.
///
/// Yields deliveries in order as a [`Stream`]. Dropping the subscription
/// cancels it at the source; [`Subscription::cancel`] is idempotent.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Delivery>,
    cancel: Option<CancelFn>,
}

impl Subscription {
    /// Wrap a delivery channel and the closure that detaches it.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Delivery>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop the subscription at the source. Already-queued deliveries can
    /// still be drained; no new ones arrive.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.receiver.close();
    }
}

impl Stream for Subscription {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Asynchronous document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Add a document with a store-assigned id. Returns the id.
    async fn add(&self, path: &CollectionPath, doc: WriteDoc) -> Result<DocumentId, DocumentError>;

    /// Patch an existing document. Fields not named are kept.
    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        patch: WriteDoc,
    ) -> Result<(), DocumentError>;

    /// Delete a document. Idempotent.
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), DocumentError>;

    /// One-shot query.
    async fn fetch(&self, query: &Query) -> Result<Vec<Document>, DocumentError>;

    /// Watch a query. The first delivery is the current result set; every
    /// later mutation of the collection delivers a fresh snapshot.
    fn watch(&self, query: &Query) -> Subscription;
}
