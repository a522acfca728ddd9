//! Cumulative uptime counter per node.
//!
//! The counter only grows. While a node is running the live session is
//! part of the effective value, so Stop folding the session into
//! `accumulated` never changes what a settlement sees.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UptimeTracker {
    /// Seconds from closed sessions.
    pub accumulated: u64,
    /// Start of the open session, if running.
    pub running_since: Option<u64>,
}

impl UptimeTracker {
    /// Open a session. Returns false if one is already open.
    pub fn start(&mut self, now: u64) -> bool {
        if self.running_since.is_some() {
            return false;
        }
        self.running_since = Some(now);
        true
    }

    /// Close the open session and fold it into the counter.
    /// Returns the session length, 0 if nothing was open.
    pub fn stop(&mut self, now: u64) -> u64 {
        match self.running_since.take() {
            Some(since) => {
                let session = now.saturating_sub(since);
                self.accumulated = self.accumulated.saturating_add(session);
                session
            }
            None => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Counter value at `now`, including the open session.
    pub fn effective(&self, now: u64) -> u64 {
        self.accumulated.saturating_add(self.session(now))
    }

    /// Length of the open session, 0 while stopped.
    pub fn session(&self, now: u64) -> u64 {
        self.running_since
            .map(|since| now.saturating_sub(since))
            .unwrap_or(0)
    }

    /// Uptime accrued since a staker's watermark.
    pub fn since(&self, watermark: u64, now: u64) -> u64 {
        self.effective(now).saturating_sub(watermark)
    }
}
