//! Patient board store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::watch;
use wardline_engine::{
    DocumentId, Entity, Patient, PatientDraft, PatientNote, PatientUpdate, UserId,
};

use crate::auth::AuthProvider;
use crate::documents::DocumentStore;
use crate::error::{Result, StoreError};

use super::task::SubscriptionHandle;

/// Published state of the patient board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientState {
    /// Confirmed patients with any pending transfers overlaid, in snapshot
    /// order.
    pub patients: Vec<Patient>,
    pub loading: bool,
    pub error: Option<String>,
}

/// An optimistic room move awaiting its confirming snapshot.
#[derive(Debug, Clone)]
struct PendingTransfer {
    room_number: String,
    updated_at: DateTime<Utc>,
}

/// Confirmed snapshot data plus optimistic overlays. Mutations and publishes
/// happen under this cache's lock, so merges are ordered.
#[derive(Default)]
struct PatientCache {
    confirmed: Vec<Patient>,
    pending: HashMap<DocumentId, PendingTransfer>,
}

impl PatientCache {
    /// Confirmed patients with pending rooms overlaid.
    fn merged(&self) -> Vec<Patient> {
        self.confirmed
            .iter()
            .map(|patient| match self.pending.get(&patient.id) {
                Some(transfer) => {
                    let mut moved = patient.clone();
                    moved.room_number = transfer.room_number.clone();
                    moved.updated_at = transfer.updated_at;
                    moved
                }
                None => patient.clone(),
            })
            .collect()
    }

    /// Drop pending moves the snapshot confirmed, and moves whose patient
    /// is gone.
    fn prune_confirmed(&mut self) {
        let confirmed = &self.confirmed;
        self.pending.retain(|id, transfer| {
            confirmed
                .iter()
                .find(|patient| patient.id == *id)
                .is_some_and(|patient| patient.room_number != transfer.room_number)
        });
    }
}

struct PatientShared {
    state: watch::Sender<PatientState>,
    subscription: SubscriptionHandle,
    cache: Mutex<PatientCache>,
}

impl PatientShared {
    fn cache(&self) -> MutexGuard<'_, PatientCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, epoch: u64, mutate: impl FnOnce(&mut PatientState)) {
        self.state.send_if_modified(|state| {
            if !self.subscription.is_current(epoch) {
                return false;
            }
            mutate(state);
            true
        });
    }
}

/// Store for the ward's bed board.
///
/// Room transfers are two-phase: the move is overlaid on the published view
/// immediately and kept as pending until a snapshot confirms the new room,
/// or rolled back when the write fails. Admission probes room occupancy;
/// transfers do not.
#[derive(Clone)]
pub struct PatientStore {
    documents: Arc<dyn DocumentStore>,
    auth: AuthProvider,
    shared: Arc<PatientShared>,
}

impl PatientStore {
    pub fn new(documents: Arc<dyn DocumentStore>, auth: AuthProvider) -> Self {
        let (state, _) = watch::channel(PatientState::default());
        Self {
            documents,
            auth,
            shared: Arc::new(PatientShared {
                state,
                subscription: SubscriptionHandle::default(),
                cache: Mutex::new(PatientCache::default()),
            }),
        }
    }

    /// Subscribe to the signed-in user's patients, replacing any previous
    /// subscription. Signed out, the board resets and stays quiet.
    pub async fn load(&self) {
        let Some(user) = self.auth.current_user() else {
            self.shared.subscription.stop();
            *self.shared.cache() = PatientCache::default();
            self.shared.state.send_replace(PatientState::default());
            return;
        };

        let epoch = self.shared.subscription.begin();
        self.shared.apply(epoch, |state| {
            state.loading = true;
            state.error = None;
        });

        let mut subscription = self.documents.watch(&Patient::query(&user));
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            while let Some(delivery) = subscription.next().await {
                match delivery {
                    Ok(snapshot) => {
                        let now = Utc::now();
                        let mut decoded: Vec<Patient> = snapshot
                            .documents
                            .iter()
                            .map(|doc| Patient::decode(doc, &user, now))
                            .collect();
                        Patient::sort(&mut decoded);

                        let mut cache = shared.cache();
                        if !shared.subscription.is_current(epoch) {
                            continue;
                        }
                        cache.confirmed = decoded;
                        cache.prune_confirmed();
                        let merged = cache.merged();
                        shared.apply(epoch, |state| {
                            state.patients = merged;
                            state.loading = false;
                        });
                        drop(cache);
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Patient delivery failed");
                        shared.apply(epoch, |state| {
                            state.error = Some(error.to_string());
                            state.loading = false;
                        });
                    }
                }
            }
        });
        self.shared.subscription.attach(epoch, task);
    }

    /// Admit a patient. Fails with [`StoreError::RoomOccupied`] when an
    /// active patient of the same user already holds the room.
    pub async fn add_patient(&self, draft: &PatientDraft) -> Result<DocumentId> {
        let user = self.require_user()?;

        let probe = Patient::room_query(&user, &draft.room_number);
        let occupied = match self.documents.fetch(&probe).await {
            Ok(matches) => !matches.is_empty(),
            Err(error) => return Err(self.record_error(error.into())),
        };
        if occupied {
            return Err(self.record_error(StoreError::RoomOccupied(draft.room_number.clone())));
        }

        let doc = Patient::create_doc(&user, draft);
        match self.documents.add(&Patient::collection(), doc).await {
            Ok(id) => Ok(id),
            Err(error) => Err(self.record_error(error.into())),
        }
    }

    /// Patch a patient's editable fields. Signed out this is a silent no-op.
    pub async fn update_patient(&self, id: &str, update: &PatientUpdate) -> Result<()> {
        if self.auth.current_user().is_none() {
            return Ok(());
        }
        let doc = Patient::update_doc(update);
        if let Err(error) = self.documents.update(&Patient::collection(), id, doc).await {
            return Err(self.record_error(error.into()));
        }
        Ok(())
    }

    /// Remove a patient. The confirming snapshot takes them off the board
    /// and drops any pending transfer they had. Signed out this is a silent
    /// no-op.
    pub async fn delete_patient(&self, id: &str) -> Result<()> {
        if self.auth.current_user().is_none() {
            return Ok(());
        }
        if let Err(error) = self.documents.delete(&Patient::collection(), id).await {
            return Err(self.record_error(error.into()));
        }
        Ok(())
    }

    /// Move a patient to `room_number`.
    ///
    /// The move shows up on the board before the write is attempted. On a
    /// write failure it is rolled back and the failure recorded. Signed out
    /// this is a silent no-op. Transfers skip the occupancy probe; only
    /// admission checks it.
    pub async fn transfer_patient(&self, id: &str, room_number: &str) -> Result<()> {
        if self.auth.current_user().is_none() {
            return Ok(());
        }

        {
            let mut cache = self.shared.cache();
            cache.pending.insert(
                id.to_string(),
                PendingTransfer {
                    room_number: room_number.to_string(),
                    updated_at: Utc::now(),
                },
            );
            let merged = cache.merged();
            self.shared.state.send_modify(|state| state.patients = merged);
        }

        let doc = Patient::transfer_doc(room_number);
        if let Err(error) = self.documents.update(&Patient::collection(), id, doc).await {
            let mut cache = self.shared.cache();
            // A later transfer owns the slot now; leave it alone
            let ours = cache
                .pending
                .get(id)
                .is_some_and(|t| t.room_number == room_number);
            if ours {
                cache.pending.remove(id);
                let merged = cache.merged();
                self.shared.state.send_modify(|state| state.patients = merged);
            }
            drop(cache);
            return Err(self.record_error(error.into()));
        }
        Ok(())
    }

    /// Append a timeline entry to a patient, stamped with the client clock.
    /// Signed out this is a silent no-op.
    pub async fn add_note(&self, id: &str, content: &str, kind: &str) -> Result<()> {
        let Some(user) = self.auth.current_user() else {
            return Ok(());
        };

        let note = PatientNote::new(content, kind, &user, Utc::now());
        let doc = Patient::append_note_doc(&note);
        if let Err(error) = self.documents.update(&Patient::collection(), id, doc).await {
            return Err(self.record_error(error.into()));
        }
        Ok(())
    }

    /// Stop the live subscription. State keeps its last value.
    pub fn cleanup(&self) {
        self.shared.subscription.stop();
    }

    /// Current state snapshot.
    pub fn state(&self) -> PatientState {
        self.shared.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<PatientState> {
        self.shared.state.subscribe()
    }

    fn require_user(&self) -> Result<UserId> {
        self.auth.current_user().ok_or(StoreError::AuthRequired)
    }

    fn record_error(&self, error: StoreError) -> StoreError {
        tracing::warn!(%error, "Patient operation failed");
        self.shared.state.send_modify(|state| {
            state.error = Some(error.to_string());
            state.loading = false;
        });
        error
    }
}
