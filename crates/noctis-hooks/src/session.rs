// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session bookkeeping with TTL eviction.
//!
//! State here is ephemeral and rebuilt on restart. The host serializes hook
//! invocations per session, so a plain mutex around the map is enough; the
//! sweep runs lazily on access, throttled so an O(n) scan happens at most
//! once per sweep interval.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct SessionState {
    /// Core memories have been injected for this session.
    pub bootstrapped: bool,
    /// Ids of core memories injected so far; a mid-session refresh compares
    /// against the current core set.
    pub injected_core_ids: HashSet<String>,
    pub last_seen: Option<Instant>,
}

struct Inner {
    sessions: HashMap<String, SessionState>,
    last_sweep: Instant,
}

pub struct SessionTracker {
    inner: Mutex<Inner>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl SessionTracker {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
            sweep_interval,
        }
    }

    /// Run `f` against the session's state, creating it if absent. Bumps
    /// the last-seen stamp and opportunistically sweeps expired sessions.
    pub fn with_session<T>(&self, session_key: &str, f: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        if now.duration_since(inner.last_sweep) >= self.sweep_interval {
            let ttl = self.ttl;
            inner
                .sessions
                .retain(|_, state| match state.last_seen {
                    Some(seen) => now.duration_since(seen) < ttl,
                    None => true,
                });
            inner.last_sweep = now;
        }
        let state = inner.sessions.entry(session_key.to_string()).or_default();
        state.last_seen = Some(now);
        f(state)
    }

    /// Drop a session's bookkeeping (session end, compaction).
    pub fn reset(&self, session_key: &str) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.sessions.remove(session_key);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .sessions
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_created_on_first_touch() {
        let tracker = SessionTracker::new(Duration::from_secs(60), Duration::from_secs(5));
        let bootstrapped = tracker.with_session("s1", |state| {
            let was = state.bootstrapped;
            state.bootstrapped = true;
            was
        });
        assert!(!bootstrapped);
        assert!(tracker.with_session("s1", |state| state.bootstrapped));
    }

    #[test]
    fn reset_clears_state() {
        let tracker = SessionTracker::new(Duration::from_secs(60), Duration::from_secs(5));
        tracker.with_session("s1", |state| state.bootstrapped = true);
        tracker.reset("s1");
        assert!(!tracker.with_session("s1", |state| state.bootstrapped));
    }

    #[test]
    fn expired_sessions_are_swept() {
        // Zero TTL and zero sweep interval force eviction on every touch.
        let tracker = SessionTracker::new(Duration::ZERO, Duration::ZERO);
        tracker.with_session("old", |_| {});
        tracker.with_session("new", |_| {});
        // "old" was expired by the sweep that ran while touching "new".
        assert_eq!(tracker.len(), 1);
    }
}
