//! Per-assistant generation lease.
//!
//! One operator at a time should generate or repair an assistant. The lease
//! is a document at `assistants/{id}/locks/generation` naming its holder and
//! expiry. Acquisition is read-then-write without compare-and-swap, so two
//! operators starting within the same instant can both succeed; the lease
//! narrows the window, it does not close it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use temario_core::locks_collection;
use temario_error::{PersistenceError, PersistenceErrorKind, TemarioResult};
use temario_interface::{DocumentStore, WriteMode};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const LEASE_ID: &str = "generation";

/// Stored lease document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    /// Holder identity
    pub holder: String,
    /// When the lease was taken
    pub acquired_at: DateTime<Utc>,
    /// When the lease lapses
    pub expires_at: DateTime<Utc>,
}

/// Lease handle for one process.
#[derive(Clone)]
pub struct GenerationLease {
    store: Arc<dyn DocumentStore>,
    holder: String,
    ttl: Duration,
}

impl std::fmt::Debug for GenerationLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationLease")
            .field("holder", &self.holder)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl GenerationLease {
    /// Create a handle with a random holder id.
    pub fn new(store: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
        Self::with_holder(store, ttl, format!("temario-{}", Uuid::new_v4()))
    }

    /// Create a handle with an explicit holder id.
    pub fn with_holder(store: Arc<dyn DocumentStore>, ttl: Duration, holder: impl Into<String>) -> Self {
        Self {
            store,
            holder: holder.into(),
            ttl,
        }
    }

    /// Holder id written into the lease document.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Take the lease for `assistant_id`.
    ///
    /// Succeeds when no lease exists, the existing one expired, or this
    /// holder already owns it (the expiry is then extended).
    #[instrument(skip(self), fields(holder = %self.holder))]
    pub async fn acquire(&self, assistant_id: &str) -> TemarioResult<LeaseRecord> {
        let collection = locks_collection(assistant_id);
        let now = Utc::now();

        if let Some(current) = self.current(assistant_id).await? {
            if current.holder != self.holder && current.expires_at > now {
                warn!(other = %current.holder, expires_at = %current.expires_at, "Lease held");
                return Err(PersistenceError::new(PersistenceErrorKind::LeaseHeld {
                    assistant: assistant_id.to_string(),
                    holder: current.holder,
                    expires_at: current.expires_at.to_rfc3339(),
                })
                .into());
            }
        }

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(1));
        let record = LeaseRecord {
            holder: self.holder.clone(),
            acquired_at: now,
            expires_at: now + ttl,
        };
        let document = serde_json::to_value(&record).map_err(|e| {
            PersistenceError::new(PersistenceErrorKind::Serialization {
                path: format!("{}/{}", collection, LEASE_ID),
                message: e.to_string(),
            })
        })?;
        self.store
            .set(&collection, LEASE_ID, document, WriteMode::Overwrite)
            .await?;
        info!(expires_at = %record.expires_at, "Lease acquired");
        Ok(record)
    }

    /// Drop the lease if this holder owns it.
    #[instrument(skip(self), fields(holder = %self.holder))]
    pub async fn release(&self, assistant_id: &str) -> TemarioResult<()> {
        match self.current(assistant_id).await? {
            Some(current) if current.holder == self.holder => {
                self.store
                    .delete(&locks_collection(assistant_id), LEASE_ID)
                    .await?;
                info!("Lease released");
            }
            Some(current) => warn!(other = %current.holder, "Lease owned by another holder"),
            None => {}
        }
        Ok(())
    }

    /// The stored lease, if any.
    pub async fn current(&self, assistant_id: &str) -> TemarioResult<Option<LeaseRecord>> {
        let collection = locks_collection(assistant_id);
        match self.store.get(&collection, LEASE_ID).await? {
            Some(data) => serde_json::from_value(data).map(Some).map_err(|e| {
                PersistenceError::new(PersistenceErrorKind::Serialization {
                    path: format!("{}/{}", collection, LEASE_ID),
                    message: e.to_string(),
                })
                .into()
            }),
            None => Ok(None),
        }
    }
}
