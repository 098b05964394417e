//! In-memory session store.
//!
//! Holds at most one active session per address. A single mutex covers the
//! whole map; the engine takes the guard for the duration of one event so
//! get→mutate→put for an address can never interleave with another handler.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::conversation::session::Session;

/// Keyed session map behind one mutual-exclusion domain.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, Session>>,
}

/// Exclusive view over the session map, held across one event.
pub struct Sessions<'a> {
    map: MutexGuard<'a, HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the store lock.
    pub async fn lock(&self) -> Sessions<'_> {
        Sessions {
            map: self.inner.lock().await,
        }
    }

    /// Remove sessions idle longer than `max_idle`. Returns how many were
    /// evicted.
    pub async fn prune_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, session| now - session.last_activity <= max_idle);
        before - map.len()
    }
}

impl Sessions<'_> {
    pub fn get(&self, address: &str) -> Option<&Session> {
        self.map.get(address)
    }

    pub fn put(&mut self, session: Session) {
        self.map.insert(session.address.clone(), session);
    }

    pub fn delete(&mut self, address: &str) -> Option<Session> {
        self.map.remove(address)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Spawn the periodic idle-session sweep.
///
/// The source behavior this service replaces never expired sessions; the
/// sweep is opt-out via a zero TTL.
pub fn spawn_idle_sweep(
    store: Arc<SessionStore>,
    max_idle: Duration,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = store.prune_idle(max_idle, Utc::now()).await;
            if evicted > 0 {
                info!(evicted, "Pruned idle sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(address: &str, last_activity: DateTime<Utc>) -> Session {
        Session::new(address, None, last_activity)
    }

    #[tokio::test]
    async fn put_get_delete() {
        let store = SessionStore::new();
        let mut sessions = store.lock().await;
        assert!(sessions.get("111").is_none());

        sessions.put(session("111", Utc::now()));
        assert_eq!(sessions.get("111").unwrap().address, "111");
        assert_eq!(sessions.len(), 1);

        sessions.delete("111");
        assert!(sessions.get("111").is_none());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn put_replaces_existing_session_for_address() {
        let store = SessionStore::new();
        let mut sessions = store.lock().await;

        sessions.put(session("111", Utc::now()));
        let mut replacement = session("111", Utc::now());
        replacement.name = Some("John Doe".into());
        sessions.put(replacement);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.get("111").unwrap().name.as_deref(), Some("John Doe"));
    }

    #[tokio::test]
    async fn prune_evicts_only_stale_sessions() {
        let store = SessionStore::new();
        let now = Utc::now();
        {
            let mut sessions = store.lock().await;
            sessions.put(session("old", now - Duration::minutes(45)));
            sessions.put(session("fresh", now - Duration::minutes(5)));
        }

        let evicted = store.prune_idle(Duration::minutes(30), now).await;
        assert_eq!(evicted, 1);

        let sessions = store.lock().await;
        assert!(sessions.get("old").is_none());
        assert!(sessions.get("fresh").is_some());
    }
}
