//! In-process TTL store for credential bundles
//!
//! The store maps generated [`SessionHandle`]s to [`CredentialRecord`]s. It
//! never inspects the bundle bytes. Expiry is enforced lazily on every read,
//! so an expired record is unreadable whether or not the sweep has run; the
//! sweep only reclaims memory.
//!
//! Consumers receive the store by constructor injection (an `Arc` held in
//! application state), never through a process-global.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::identity::CredentialBundle;

use super::{CredentialRecord, SessionHandle};

/// Concurrency-safe TTL cache for opaque credential bundles
///
/// All operations are linearizable per handle: a `get` racing a `delete`
/// observes either the live record or its absence, never a torn state.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<SessionHandle, CredentialRecord>,
    // Min-queue on expiry instant so the sweep pops only due entries.
    // Entries for deleted records go stale and fall out harmlessly.
    expiry: BinaryHeap<Reverse<(DateTime<Utc>, SessionHandle)>>,
}

impl CredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a bundle under a freshly generated handle
    ///
    /// The handle is generated internally and returned to the caller; an
    /// existing record is never overwritten (the generator retries on the
    /// negligible collision).
    pub fn put(&self, bundle: CredentialBundle, ttl: Duration) -> SessionHandle {
        let record = CredentialRecord::new(bundle, ttl);
        let mut inner = self.inner.write();

        let handle = loop {
            let candidate = SessionHandle::generate();
            if !inner.records.contains_key(&candidate) {
                break candidate;
            }
        };

        tracing::debug!(handle = %handle, expires_at = %record.expires_at, "credential record stored");
        inner
            .expiry
            .push(Reverse((record.expires_at, handle.clone())));
        inner.records.insert(handle.clone(), record);
        handle
    }

    /// Look up the bundle for a handle
    ///
    /// Returns `None` for unknown handles and for expired records alike;
    /// the two are indistinguishable to callers. Reading never extends the
    /// record's lifetime.
    #[must_use]
    pub fn get(&self, handle: &SessionHandle) -> Option<CredentialBundle> {
        let inner = self.inner.read();
        match inner.records.get(handle) {
            Some(record) if record.is_expired() => {
                tracing::debug!(handle = %handle, "credential record expired");
                None
            }
            Some(record) => Some(record.bundle.clone()),
            None => {
                tracing::debug!(handle = %handle, "credential record not found");
                None
            }
        }
    }

    /// Remove the record for a handle
    ///
    /// Returns whether a record was actually removed. Deleting an absent
    /// handle is a no-op; the boolean exists for logging, not control flow.
    pub fn delete(&self, handle: &SessionHandle) -> bool {
        let removed = self.inner.write().records.remove(handle).is_some();
        tracing::debug!(handle = %handle, removed, "credential record deleted");
        removed
    }

    /// Remove every expired record and return how many were reclaimed
    ///
    /// Correctness never depends on this running: `get` re-checks expiry on
    /// every read. The sweep exists so abandoned sessions do not accumulate
    /// for the life of the process.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.write();
        let mut reclaimed = 0;

        while inner
            .expiry
            .peek()
            .is_some_and(|Reverse((expiry, _))| *expiry <= now)
        {
            let Some(Reverse((_, handle))) = inner.expiry.pop() else {
                break;
            };
            // Stale entries for already-deleted handles remove nothing.
            if inner.records.remove(&handle).is_some() {
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            tracing::debug!(reclaimed, "expired credential records swept");
        }
        reclaimed
    }

    /// Number of records currently held, including expired ones not yet swept
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the store holds no records at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }
}
