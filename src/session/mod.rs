//! # Session Module
//!
//! Session lifecycle: segmenting the continuous stream of crank events into
//! discrete rides.
//!
//! This module handles:
//! - The durable [`Session`] record (start time, end time, revolutions)
//! - The [`SessionManager`] state machine over {idle, one active session}
//! - The minimum-duration gate that discards accidental taps
//!
//! Idle-timeout detection itself lives in the task layer
//! ([`crate::tasks`]); the manager only exposes the transitions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::SessionStore;

/// A single recorded ride.
///
/// `start_time` doubles as the session's unique identifier: the idle-timeout
/// and minimum-duration policies guarantee two persisted sessions are always
/// at least the minimum duration apart. Timestamps are device-epoch seconds;
/// the sync layer converts to Unix epoch at the wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Device-epoch seconds when the session began (unique identifier)
    pub start_time: u32,
    /// Device-epoch seconds of the most recent activity (>= start_time)
    pub end_time: u32,
    /// Total crank revolutions in this session (does not wrap)
    pub revolutions: u32,
}

impl Session {
    /// Create a session starting now, with no revolutions yet
    pub fn started_at(now_secs: u32) -> Self {
        Self {
            start_time: now_secs,
            end_time: now_secs,
            revolutions: 0,
        }
    }

    /// Elapsed session time in seconds
    pub fn duration_secs(&self) -> u32 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// Manages session lifecycle and persistence.
///
/// At most one session is active at a time. An active session only becomes
/// durable once it has passed the minimum-duration gate on a save.
pub struct SessionManager {
    store: SessionStore,
    min_duration_secs: u32,
    current: Option<Session>,
}

impl SessionManager {
    /// Create a manager over the given store.
    ///
    /// # Arguments
    ///
    /// * `store` - Record store for persisting ended/active sessions
    /// * `min_duration_secs` - Sessions shorter than this are discarded
    pub fn new(store: SessionStore, min_duration_secs: u32) -> Self {
        Self {
            store,
            min_duration_secs,
            current: None,
        }
    }

    /// Record a crank revolution at the given wall-clock time.
    ///
    /// Starts a new session if none is active, then increments the
    /// revolution count and advances `end_time`.
    pub fn record_revolution(&mut self, now_secs: u32) {
        let session = self.current.get_or_insert_with(|| {
            info!(start_time = now_secs, "Started session");
            Session::started_at(now_secs)
        });

        session.revolutions += 1;
        session.end_time = now_secs;

        debug!(
            start_time = session.start_time,
            revolutions = session.revolutions,
            "Session revolution"
        );
    }

    /// Persist the active session if it has met the minimum duration.
    ///
    /// Called from the periodic-save loop and from [`end_session`]. The
    /// duration gate uses `end_time - start_time`, i.e. time spanned by
    /// actual activity: a session closed by the idle timeout is not
    /// stretched to cover the idle period. A session below the minimum
    /// duration is skipped silently (`Ok(false)`) — that is a policy
    /// rejection, not an error. I/O failures propagate to the caller but
    /// leave the in-memory session untouched, so the next tick retries.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Session written to storage
    /// * `Ok(false)` - Nothing to save (idle) or below minimum duration
    ///
    /// [`end_session`]: SessionManager::end_session
    pub fn maybe_persist(&mut self) -> Result<bool> {
        let Some(session) = self.current.as_ref() else {
            return Ok(false);
        };

        let duration = session.duration_secs();
        if duration < self.min_duration_secs {
            debug!(
                start_time = session.start_time,
                duration,
                min = self.min_duration_secs,
                "Skipping save of short session"
            );
            return Ok(false);
        }

        self.store.save(session)?;
        Ok(true)
    }

    /// End the active session.
    ///
    /// Saves it if it met the minimum-duration bar, then clears the active
    /// slot regardless of the save outcome and returns to idle. A failed
    /// final save is logged; the periodic-save loop will already have
    /// persisted any long-running session, so at most the tail is lost.
    ///
    /// # Returns
    ///
    /// * `Some(Session)` - The session that was active
    /// * `None` - No session was active
    pub fn end_session(&mut self) -> Option<Session> {
        self.current?;

        match self.maybe_persist() {
            Ok(true) => {}
            Ok(false) => {
                let s = self.current.as_ref()?;
                info!(
                    start_time = s.start_time,
                    duration = s.duration_secs(),
                    "Discarding session below minimum duration"
                );
            }
            Err(e) => {
                warn!("Failed to save session on end: {}", e);
            }
        }

        let ended = self.current.take();
        if let Some(s) = &ended {
            info!(
                start_time = s.start_time,
                revolutions = s.revolutions,
                duration = s.duration_secs(),
                "Ended session"
            );
        }
        ended
    }

    /// Whether a session is currently active
    pub fn has_active_session(&self) -> bool {
        self.current.is_some()
    }

    /// Snapshot of the active session, if any
    pub fn current(&self) -> Option<Session> {
        self.current
    }

    /// The backing record store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}
