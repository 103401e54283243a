//! Push/poll state machine.
//!
//! At start and after every (re)connect the push path gets a grace window.
//! If no event arrives within it the dashboard switches to polling; the
//! first live event switches it back. Polling never closes the push subscription.
//! All transitions take the current [`Instant`] as an argument.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Default grace window after a (re)connect.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// How the dashboard is currently kept fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Live events are arriving.
    Push,
    /// Periodic full refetch.
    Poll,
}

/// Tracks [`SyncMode`] transitions.
#[derive(Debug, Clone)]
pub struct ModeTracker {
    mode: SyncMode,
    grace: Duration,
    armed_at: Option<Instant>,
    last_event: Option<Instant>,
}

impl ModeTracker {
    /// Starts in push mode with no window armed.
    #[must_use]
    pub const fn new(grace: Duration) -> Self {
        Self {
            mode: SyncMode::Push,
            grace,
            armed_at: None,
            last_event: None,
        }
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Time of the last live event.
    #[must_use]
    pub const fn last_event(&self) -> Option<Instant> {
        self.last_event
    }

    /// Deadline of the armed grace window, if any.
    #[must_use]
    pub fn grace_deadline(&self) -> Option<Instant> {
        self.armed_at.map(|at| at + self.grace)
    }

    /// Arms the grace window starting at `now`.
    pub fn arm(&mut self, now: Instant) {
        self.armed_at = Some(now);
    }

    /// The push connection is up: arm the grace window.
    pub fn on_connected(&mut self, now: Instant) {
        self.arm(now);
    }

    /// The push connection dropped. Returns the new mode if it changed.
    pub fn on_disconnected(&mut self) -> Option<SyncMode> {
        self.armed_at = None;
        self.switch(SyncMode::Poll)
    }

    /// A live event arrived. Returns the new mode if it changed.
    pub fn on_event(&mut self, now: Instant) -> Option<SyncMode> {
        self.last_event = Some(now);
        self.armed_at = None;
        self.switch(SyncMode::Push)
    }

    /// Switches to poll mode if the armed window has elapsed without an
    /// event. Fires at most once per armed window.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.grace_deadline() else {
            return false;
        };
        if now < deadline {
            return false;
        }
        self.armed_at = None;
        self.switch(SyncMode::Poll).is_some()
    }

    fn switch(&mut self, mode: SyncMode) -> Option<SyncMode> {
        if self.mode == mode {
            return None;
        }
        self.mode = mode;
        Some(mode)
    }
}

impl Default for ModeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}
