//! Single-flight resolution.
//!
//! Collapses concurrent resolutions of the same cache key into one call to
//! the resolution primitive. Every caller that arrives while the call is
//! outstanding awaits the same shared outcome.

use super::{AddressCache, AddressRecord, RecordSet};
use crate::base::neterror::{LookupError, ResolverCode};
use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

type Outcome = Result<Arc<RecordSet>, LookupError>;
type SharedResolution = Shared<BoxFuture<'static, Outcome>>;

#[derive(Clone)]
struct Pending {
    id: u64,
    resolution: SharedResolution,
}

/// Removes a pending entry when dropped, unless a newer resolution owns the key.
struct PendingGuard {
    pending: Arc<DashMap<String, Pending>>,
    key: String,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.remove_if(&self.key, |_, p| p.id == self.id);
    }
}

/// Map of in-flight resolutions keyed by cache key.
#[derive(Clone, Default)]
pub struct SingleFlight {
    pending: Arc<DashMap<String, Pending>>,
    next_id: Arc<AtomicU64>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resolutions currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Resolve `key` at most once at a time.
    ///
    /// On a fresh call, `call` is spawned onto the runtime so it runs to
    /// completion even if every waiter stops awaiting. A successful,
    /// non-empty result is written to `cache` before the pending entry is
    /// cleared. An empty result becomes a not-found error and is never
    /// cached; no-data class failures are normalized to not-found.
    ///
    /// The pending entry is cleared however the resolution ends, including
    /// a panicking primitive or a runtime that shuts down mid-query.
    pub async fn resolve_once<F, Fut>(
        &self,
        key: &str,
        hostname: &str,
        cache: &AddressCache,
        call: F,
    ) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<AddressRecord>, LookupError>> + Send + 'static,
    {
        let (resolution, started) = match self.pending.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                tracing::trace!(key = %key, "joining in-flight resolution");
                (entry.get().resolution.clone(), None)
            }
            Entry::Vacant(entry) => {
                // A resolution that settled between our cache miss and now
                // has already written the cache; its pending entry is gone.
                if let Some(records) = cache.get(key) {
                    tracing::trace!(key = %key, "cache filled by a resolution that just settled");
                    return Ok(records);
                }

                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel();
                let resolution = outcome_of(rx, hostname);
                entry.insert(Pending {
                    id,
                    resolution: resolution.clone(),
                });
                (resolution, Some((id, tx)))
            }
        };

        // The shard lock is released here, so the primitive may freely
        // consult this map while building its query.
        if let Some((id, tx)) = started {
            self.start(id, key, hostname, cache, call, tx);
        }

        resolution.await
    }

    fn start<F, Fut>(
        &self,
        id: u64,
        key: &str,
        hostname: &str,
        cache: &AddressCache,
        call: F,
        tx: oneshot::Sender<Outcome>,
    ) where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<AddressRecord>, LookupError>> + Send + 'static,
    {
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            key: key.to_string(),
            id,
        };
        let cache = cache.clone();
        let hostname = hostname.to_string();
        let call = call();

        tokio::spawn(async move {
            let outcome = match call.await {
                Ok(records) => match cache.set(&guard.key, records) {
                    Some(stored) => {
                        tracing::debug!(key = %guard.key, count = stored.len(), "resolution cached");
                        Ok(stored)
                    }
                    None => Err(LookupError::not_found(hostname)),
                },
                Err(e) => Err(e.normalize()),
            };
            drop(guard);
            // Every waiter may have gone away.
            let _ = tx.send(outcome);
        });
    }
}

/// Shared outcome fed by the spawned resolution task.
fn outcome_of(rx: oneshot::Receiver<Outcome>, hostname: &str) -> SharedResolution {
    let hostname = hostname.to_string();
    async move {
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(host = %hostname, "resolution task ended without an outcome");
                Err(LookupError::upstream(ResolverCode::Cancelled, hostname))
            }
        }
    }
    .boxed()
    .shared()
}

impl std::fmt::Debug for SingleFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("pending", &self.pending.len())
            .finish()
    }
}
