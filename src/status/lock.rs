//! Per-entity lock coordination.
//!
//! Process-local, in-memory, session-scoped locks with a bounded TTL. At most
//! one live lock exists per entity id; this is the mutual-exclusion guarantee
//! the transition engine depends on. Locks are never persisted, so a process
//! restart starts clean.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

struct LockEntry {
    session_id: String,
    expires_at: Instant,
    /// Outstanding acquisitions by the holding session. The entry is freed
    /// only when the count reaches zero, so an inner acquire/release pair
    /// never drops an outer hold.
    reentrancy: u32,
}

/// Proof of acquisition, consumed by `release`. Release with a handle whose
/// lock has expired and been taken over by another session is a no-op.
#[derive(Debug)]
pub struct LockHandle {
    entity_id: Uuid,
    session_id: String,
}

pub struct LockCoordinator {
    state: Mutex<HashMap<Uuid, LockEntry>>,
    cond: Condvar,
    ttl: Duration,
}

impl LockCoordinator {
    /// `ttl` bounds how long an abandoned lock can stall other sessions: an
    /// expired entry may be force-acquired by anyone.
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            cond: Condvar::new(),
            ttl,
        }
    }

    /// Acquire the lock for `entity_id`, waiting up to `timeout` on
    /// contention. Returns `None` when the timeout elapses first.
    ///
    /// Re-acquisition by the session already holding the lock succeeds
    /// immediately, refreshes the TTL, and increments the hold count; each
    /// handle must be released, and only the outermost release frees the
    /// entry.
    pub fn acquire(
        &self,
        entity_id: Uuid,
        session_id: &str,
        timeout: Duration,
    ) -> Option<LockHandle> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().expect("lock table poisoned");

        loop {
            let now = Instant::now();
            let acquired = match state.get_mut(&entity_id) {
                Some(entry) if entry.session_id == session_id => {
                    entry.reentrancy += 1;
                    entry.expires_at = now + self.ttl;
                    true
                }
                Some(entry) if entry.expires_at > now => false,
                _ => {
                    state.insert(
                        entity_id,
                        LockEntry {
                            session_id: session_id.to_string(),
                            expires_at: now + self.ttl,
                            reentrancy: 1,
                        },
                    );
                    true
                }
            };

            if acquired {
                return Some(LockHandle {
                    entity_id,
                    session_id: session_id.to_string(),
                });
            }

            if now >= deadline {
                return None;
            }

            // Bound each wait so a holder's TTL expiry is observed even
            // though expiry never notifies.
            let wait = (deadline - now).min(Duration::from_millis(50));
            state = self
                .cond
                .wait_timeout(state, wait)
                .expect("lock table poisoned")
                .0;
        }
    }

    /// Like `acquire`, wrapped in a guard that releases on drop.
    pub fn acquire_guard(
        &self,
        entity_id: Uuid,
        session_id: &str,
        timeout: Duration,
    ) -> Option<LockGuard<'_>> {
        self.acquire(entity_id, session_id, timeout)
            .map(|handle| LockGuard {
                coordinator: self,
                handle: Some(handle),
            })
    }

    /// Release one held acquisition. The entry is freed when the holding
    /// session's last outstanding handle is released. No-op if the handle's
    /// session no longer holds the entry (TTL expiry followed by a
    /// force-acquire).
    pub fn release(&self, handle: LockHandle) {
        let mut state = self.state.lock().expect("lock table poisoned");
        let freed = match state.get_mut(&handle.entity_id) {
            Some(entry) if entry.session_id == handle.session_id => {
                if entry.reentrancy > 1 {
                    entry.reentrancy -= 1;
                    false
                } else {
                    true
                }
            }
            _ => false,
        };
        if freed {
            state.remove(&handle.entity_id);
        }
        drop(state);
        self.cond.notify_all();
    }

    /// Whether a live (unexpired) lock exists for `entity_id`.
    pub fn is_held(&self, entity_id: Uuid) -> bool {
        let state = self.state.lock().expect("lock table poisoned");
        state
            .get(&entity_id)
            .map(|entry| entry.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

/// RAII wrapper guaranteeing release on every exit path, including panics.
pub struct LockGuard<'a> {
    coordinator: &'a LockCoordinator,
    handle: Option<LockHandle>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.coordinator.release(handle);
        }
    }
}
