use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;

use crate::errors::{BotError, BotResult};
use crate::session::Session;

/// Id of the chat message hosting a session's view
pub type SessionKey = u64;

struct Slot {
    session: Arc<AsyncMutex<Session>>,
    last_active: Instant,
}

/// In-memory sessions with idle eviction.
///
/// Each session sits behind its own async mutex. `checkout` never waits for it:
/// if a transition already holds the lock the caller gets `Busy`, so two events
/// for one session are never interleaved.
pub struct SessionStore {
    slots: Mutex<HashMap<SessionKey, Slot>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<SessionKey, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, key: SessionKey, session: Session) {
        let mut slots = self.slots();
        Self::sweep_locked(&mut slots, self.timeout);
        slots.insert(
            key,
            Slot {
                session: Arc::new(AsyncMutex::new(session)),
                last_active: Instant::now(),
            },
        );
    }

    /// Exclusive access to a live session
    pub fn checkout(&self, key: SessionKey) -> BotResult<OwnedMutexGuard<Session>> {
        let mut slots = self.slots();
        Self::sweep_locked(&mut slots, self.timeout);
        let slot = slots.get(&key).ok_or(BotError::Expired)?;
        slot.session
            .clone()
            .try_lock_owned()
            .map_err(|_| BotError::Busy)
    }

    /// Restart the inactivity timer after an accepted event
    pub fn touch(&self, key: SessionKey) {
        if let Some(slot) = self.slots().get_mut(&key) {
            slot.last_active = Instant::now();
        }
    }

    pub fn contains(&self, key: SessionKey) -> bool {
        let mut slots = self.slots();
        Self::sweep_locked(&mut slots, self.timeout);
        slots.contains_key(&key)
    }

    pub fn remove(&self, key: SessionKey) -> bool {
        self.slots().remove(&key).is_some()
    }

    /// Drop idle sessions. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        Self::sweep_locked(&mut self.slots(), self.timeout)
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_locked(slots: &mut HashMap<SessionKey, Slot>, timeout: Duration) -> usize {
        let before = slots.len();
        let now = Instant::now();
        // A checked-out session is mid-transition and stays until released
        slots.retain(|_, slot| {
            Arc::strong_count(&slot.session) > 1 || now.duration_since(slot.last_active) < timeout
        });
        let evicted = before - slots.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EntitySummary, MediaKind};

    fn session() -> Session {
        Session::create(
            vec![EntitySummary {
                name: "Alien".into(),
                year: Some("1979".into()),
                rating: Some(8.5),
                catalog_id: 348,
                kind: MediaKind::Movie,
            }],
            1,
            "alien",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_second_checkout_is_busy() {
        let store = SessionStore::new(Duration::from_secs(300));
        store.insert(10, session());
        let guard = store.checkout(10).unwrap();
        assert_eq!(store.checkout(10).unwrap_err(), BotError::Busy);
        drop(guard);
        assert!(store.checkout(10).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_key_is_expired() {
        let store = SessionStore::new(Duration::from_secs(300));
        assert_eq!(store.checkout(99).unwrap_err(), BotError::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::new(Duration::from_secs(300));
        store.insert(1, session());
        store.insert(2, session());
        tokio::time::advance(Duration::from_secs(200)).await;
        store.touch(2);
        tokio::time::advance(Duration::from_secs(150)).await;
        assert_eq!(store.checkout(1).unwrap_err(), BotError::Expired);
        assert!(store.checkout(2).is_ok());
        assert_eq!(store.len(), 1);
    }
}
