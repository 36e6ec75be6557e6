//! The entity seam and the selection rules every store shares.
//!
//! An [`Entity`] knows how to decode itself from a wire document, which
//! owner-filtered query its store subscribes to, and how its cache is
//! ordered. Selection resolution is pure so the invariant - a selection is
//! `None` or an id present in the cache - can be checked without a store.

use crate::document::{CollectionPath, Document};
use crate::query::Query;
use crate::{DocumentId, UserId};
use chrono::{DateTime, Utc};

/// A synchronized entity.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Store-assigned id.
    fn id(&self) -> &DocumentId;

    /// The collection this entity lives in.
    fn collection() -> CollectionPath;

    /// Decode a wire document. Lenient: never fails. Missing fields take
    /// their documented defaults and timestamps fall back to `now`.
    fn decode(doc: &Document, owner: &UserId, now: DateTime<Utc>) -> Self;

    /// The owner-filtered query this entity's store subscribes to.
    /// Deliberately unordered; ordering happens locally via [`Entity::sort`].
    fn query(owner: &UserId) -> Query;

    /// Store-defined local ordering. Must be stable: equal keys keep
    /// snapshot order.
    fn sort(items: &mut Vec<Self>);
}

/// Re-resolve a selection after the cache was replaced by a snapshot.
///
/// Keeps the previous selection when it survived, else falls back to the
/// first element of the sorted cache, else clears.
pub fn resolve_selection<E: Entity>(previous: Option<&str>, items: &[E]) -> Option<DocumentId> {
    if let Some(prev) = previous {
        if items.iter().any(|item| item.id() == prev) {
            return Some(prev.to_string());
        }
    }
    items.first().map(|item| item.id().clone())
}

/// Selection after a local removal: first survivor when the removed entity
/// was selected, otherwise unchanged.
pub fn selection_after_removal<E: Entity>(
    removed: &str,
    selected: Option<&str>,
    survivors: &[E],
) -> Option<DocumentId> {
    match selected {
        Some(sel) if sel == removed => survivors.first().map(|item| item.id().clone()),
        Some(sel) => Some(sel.to_string()),
        None => None,
    }
}
