//! # Replay Guard
//!
//! A bounded, thread-safe record of recently seen nonces. A token or
//! response is accepted at most once: the first `check_and_register` for a
//! nonce inside the time window returns `true`, every later call returns
//! `false`.
//!
//! ## Window
//!
//! ```text
//!        now - max_age                 now        now + skew
//!   ─────────┼────────────────────────────┼───────────┼─────────►
//!   rejected │◄─────── accepted ─────────►│◄─────────►│ rejected
//! ```
//!
//! Both edges are inclusive: a timestamp exactly `max_age` old, or exactly
//! `skew` ahead, still passes.
//!
//! ## Memory
//!
//! Each entry stores the nonce's *own* timestamp, not the time we first saw
//! it. A prune at time `p` drops exactly the entries older than
//! `p - max_age`, and from then on every timestamp below that floor is
//! rejected outright. The floor only ever rises, so a clock that steps
//! backwards cannot let a pruned nonce back in. Pruning runs lazily on the
//! check path at most once every half window, which keeps the map bounded
//! by the number of distinct nonces seen in roughly 1.5 windows.
//!
//! The clock read, the window check, the prune and the check-then-insert
//! all happen inside one critical section under a `parking_lot::Mutex`:
//! two threads racing on the same nonce get exactly one `true` between
//! them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::{ProtocolConfig, NONCE_LENGTH, REPLAY_FUTURE_SKEW, REPLAY_MAX_AGE};

/// A protocol nonce as the guard keys it.
pub type Nonce = [u8; NONCE_LENGTH];

struct ReplayState {
    /// nonce -> the timestamp it was presented with.
    seen: HashMap<Nonce, i64>,
    /// Clock reading at the last prune. Never decreases.
    last_prune: i64,
}

impl ReplayState {
    /// Oldest timestamp that can still be in `seen`; anything below it may
    /// have been pruned.
    fn floor(&self, max_age_ms: i64) -> i64 {
        self.last_prune.saturating_sub(max_age_ms)
    }
}

/// Thread-safe replay detector. Share it behind an `Arc`.
pub struct ReplayGuard {
    state: Mutex<ReplayState>,
    max_age_ms: i64,
    future_skew_ms: i64,
    clock: Arc<dyn Clock>,
}

impl ReplayGuard {
    /// Guard with the default window (5 minutes back, 30 seconds ahead)
    /// on the system clock.
    pub fn new() -> Self {
        Self::with_clock(
            REPLAY_MAX_AGE.as_millis() as i64,
            REPLAY_FUTURE_SKEW.as_millis() as i64,
            Arc::new(SystemClock),
        )
    }

    /// Guard with an explicit window and clock.
    ///
    /// Negative window sizes are clamped to zero.
    pub fn with_clock(max_age_ms: i64, future_skew_ms: i64, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();
        Self {
            state: Mutex::new(ReplayState {
                seen: HashMap::new(),
                last_prune: now,
            }),
            max_age_ms: max_age_ms.max(0),
            future_skew_ms: future_skew_ms.max(0),
            clock,
        }
    }

    /// Guard whose window comes from a [`ProtocolConfig`].
    pub fn from_config(config: &ProtocolConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(config.replay_max_age_ms, config.replay_future_skew_ms, clock)
    }

    /// Maximum accepted age, ms.
    pub fn max_age_ms(&self) -> i64 {
        self.max_age_ms
    }

    /// Maximum accepted future skew, ms.
    pub fn future_skew_ms(&self) -> i64 {
        self.future_skew_ms
    }

    /// `true` iff `timestamp_ms` falls inside the window around `now`.
    fn in_window(&self, timestamp_ms: i64, now: i64) -> bool {
        let age = now.saturating_sub(timestamp_ms);
        let ahead = timestamp_ms.saturating_sub(now);
        age <= self.max_age_ms && ahead <= self.future_skew_ms
    }

    /// Accept `nonce` at most once.
    ///
    /// Returns `false` if the timestamp is outside the window or the nonce
    /// has already been registered. Returns `true` (and records the nonce)
    /// otherwise.
    pub fn check_and_register(&self, nonce: &Nonce, timestamp_ms: i64) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now_millis();

        if !self.in_window(timestamp_ms, now) || timestamp_ms < state.floor(self.max_age_ms) {
            debug!(
                nonce = %hex::encode(nonce),
                timestamp_ms,
                now,
                "replay guard: timestamp outside window"
            );
            return false;
        }

        self.maybe_prune(&mut state, now);

        if state.seen.contains_key(nonce) {
            debug!(nonce = %hex::encode(nonce), "replay guard: nonce already seen");
            return false;
        }
        state.seen.insert(*nonce, timestamp_ms);
        trace!(nonce = %hex::encode(nonce), tracked = state.seen.len(), "nonce registered");
        true
    }

    fn maybe_prune(&self, state: &mut ReplayState, now: i64) {
        if now.saturating_sub(state.last_prune) <= self.max_age_ms / 2 {
            return;
        }
        let before = state.seen.len();
        let max_age = self.max_age_ms;
        state
            .seen
            .retain(|_, ts| now.saturating_sub(*ts) <= max_age);
        state.last_prune = now;
        let pruned = before - state.seen.len();
        if pruned > 0 {
            debug!(pruned, remaining = state.seen.len(), "replay guard pruned expired nonces");
        }
    }

    /// Forget every nonce.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.seen.clear();
        state.last_prune = state.last_prune.max(self.clock.now_millis());
    }

    /// Number of nonces currently tracked.
    pub fn len(&self) -> usize {
        self.state.lock().seen.len()
    }

    /// `true` when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("tracked", &self.len())
            .field("max_age_ms", &self.max_age_ms)
            .field("future_skew_ms", &self.future_skew_ms)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
