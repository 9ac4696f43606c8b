//! Pending login attempts.
//!
//! Every login start binds its CSRF state to a pending attempt. A callback
//! is accepted only for a state that is still pending and unexpired, and
//! the attempt is consumed on first use, so a replayed state fails.
//!
//! The registry is bounded: once it holds `max_pending` attempts, binding
//! purges expired ones and then evicts the oldest.

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use time::OffsetDateTime;

/// Phases of a login attempt, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    /// State issued, redirect sent.
    Started,
    /// Code and state returned by the provider.
    CallbackReceived,
    /// Provider token obtained.
    Exchanged,
    /// External subject resolved.
    Identified,
    /// Local tokens minted.
    Issued,
    Failed,
}

impl LoginPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::CallbackReceived => "callback_received",
            Self::Exchanged => "exchanged",
            Self::Identified => "identified",
            Self::Issued => "issued",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LoginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A login attempt waiting for its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub provider: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl PendingLogin {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Default cap on pending attempts.
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// Registry of pending login attempts keyed by CSRF state.
#[derive(Debug)]
pub struct LoginAttempts {
    pending: DashMap<String, PendingLogin>,
    ttl: Duration,
    max_pending: usize,
}

impl LoginAttempts {
    /// Creates a registry whose attempts expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    /// Caps the number of pending attempts. A cap of zero is treated as one.
    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    /// Binds `state` to a new pending attempt for `provider`.
    pub fn bind(&self, state: impl Into<String>, provider: impl Into<String>) -> PendingLogin {
        if self.pending.len() >= self.max_pending {
            self.make_room();
        }

        let now = OffsetDateTime::now_utc();
        let attempt = PendingLogin {
            provider: provider.into(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.pending.insert(state.into(), attempt.clone());
        attempt
    }

    /// Removes and returns the attempt bound to `state`.
    ///
    /// Returns `None` if the state is unknown, already consumed or expired.
    /// An expired attempt is removed as well.
    pub fn consume(&self, state: &str) -> Option<PendingLogin> {
        let (_, attempt) = self.pending.remove(state)?;
        if attempt.is_expired_at(OffsetDateTime::now_utc()) {
            return None;
        }
        Some(attempt)
    }

    fn make_room(&self) {
        let purged = self.purge_expired();
        if self.pending.len() < self.max_pending {
            tracing::debug!(purged, "Pending login cap reached, purged expired attempts");
            return;
        }

        let oldest = self
            .pending
            .iter()
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.key().clone());
        if let Some(state) = oldest {
            self.pending.remove(&state);
            tracing::warn!(
                max_pending = self.max_pending,
                "Pending login cap reached, evicted oldest attempt"
            );
        }
    }

    /// Drops expired attempts and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut removed = 0;
        self.pending.retain(|_, attempt| {
            let keep = !attempt.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
