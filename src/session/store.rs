use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a server-side session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn random() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0[..8.min(self.0.len())])
    }
}

struct Entry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// In-memory sessions that expire after a period of inactivity.
///
/// The lock is only held inside [`SessionStore::with`], which takes a plain
/// closure, so it can never be held across an `.await`.
pub struct SessionStore<T> {
    sessions: Mutex<HashMap<SessionId, Entry<T>>>,
    ttl: Duration,
}

impl<T> SessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Entry<T>>> {
        // A panic elsewhere leaves each session internally consistent.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new session, pruning any that have expired.
    pub fn insert(&self, value: T) -> SessionId {
        let now = Utc::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {pruned} expired sessions");
        }

        let mut id = SessionId::random();
        while sessions.contains_key(&id) {
            id = SessionId::random();
        }
        sessions.insert(
            id.clone(),
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
        id
    }

    /// Run `f` on a live session and extend its lifetime.
    /// Returns `None` if the session is unknown or has expired.
    pub fn with<R>(&self, id: &SessionId, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let now = Utc::now();
        let mut sessions = self.lock();
        let expired = match sessions.get_mut(id) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                return Some(f(&mut entry.value));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(id);
        }
        None
    }

    /// Arm a guard that runs `reset` on the session when dropped, unless
    /// [`ResetOnDrop::disarm`] is called first.
    ///
    /// Held across a remote call so that a request dropped mid-call (e.g. the
    /// client went away) cannot leave its session stuck in an in-flight state.
    pub fn reset_on_drop<'a>(&'a self, id: &'a SessionId, reset: fn(&mut T)) -> ResetOnDrop<'a, T> {
        ResetOnDrop {
            store: self,
            id,
            reset: Some(reset),
        }
    }

    pub fn remove(&self, id: &SessionId) -> Option<T> {
        self.lock().remove(id).map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// See [`SessionStore::reset_on_drop`].
#[must_use = "the reset runs as soon as the guard is dropped"]
pub struct ResetOnDrop<'a, T> {
    store: &'a SessionStore<T>,
    id: &'a SessionId,
    reset: Option<fn(&mut T)>,
}

impl<T> ResetOnDrop<'_, T> {
    /// The call completed; leave the session alone.
    pub fn disarm(mut self) {
        self.reset = None;
    }
}

impl<T> Drop for ResetOnDrop<'_, T> {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.take() {
            debug!("Request for session {} dropped mid-call, resetting it", self.id);
            self.store.with(self.id, reset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_independent() {
        let store = SessionStore::new(Duration::minutes(5));
        let a = store.insert(1);
        let b = store.insert(10);
        assert_ne!(a, b);

        store.with(&a, |n| *n += 1).unwrap();
        assert_eq!(store.with(&a, |n| *n), Some(2));
        assert_eq!(store.with(&b, |n| *n), Some(10));

        assert_eq!(store.remove(&a), Some(2));
        assert_eq!(store.with(&a, |n| *n), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_sessions_vanish() {
        let store = SessionStore::new(Duration::seconds(-1));
        let id = store.insert("gone");
        assert_eq!(store.with(&id, |s| *s), None);
        assert!(store.is_empty());

        store.insert("also gone");
        store.insert("pruned the previous one");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reset_runs_unless_disarmed() {
        let store = SessionStore::new(Duration::minutes(5));
        let id = store.insert(1);

        let guard = store.reset_on_drop(&id, |n| *n = 0);
        store.with(&id, |n| *n = 7);
        guard.disarm();
        assert_eq!(store.with(&id, |n| *n), Some(7));

        {
            let _guard = store.reset_on_drop(&id, |n| *n = 0);
        }
        assert_eq!(store.with(&id, |n| *n), Some(0));
    }
}
