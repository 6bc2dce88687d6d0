//! # Application State
//!
//! Single aggregate owning all mutable runtime state, passed by handle into
//! every task. Replaces module-level globals: there is exactly one shared
//! instance, and all mutation goes through it.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::Clock;
use crate::session::SessionManager;
use crate::telemetry::TelemetryManager;

/// Mutable application state container
pub struct AppState {
    /// Live crank telemetry for CSC notifications
    pub telemetry: TelemetryManager,
    /// Session lifecycle state machine
    pub sessions: SessionManager,
    clock: Box<dyn Clock>,
}

impl AppState {
    pub fn new(sessions: SessionManager, clock: Box<dyn Clock>) -> Self {
        Self {
            telemetry: TelemetryManager::new(),
            sessions,
            clock,
        }
    }

    /// Record one crank revolution in both the live telemetry and the
    /// active session.
    ///
    /// This is the critical section shared with the sensor interrupt: both
    /// field groups are updated under one lock acquisition so no reader
    /// ever sees a counter without its matching timestamps. On the
    /// single-threaded runtime the lock is uncontended; on a parallel
    /// runtime it is the required guard.
    pub fn record_revolution(&mut self) {
        let now_ms = self.clock.ticks_ms();
        let now_secs = self.clock.now_secs();

        self.telemetry.record_revolution(now_ms);
        self.sessions.record_revolution(now_secs);
    }

    /// Current wall-clock time in device-epoch seconds
    pub fn now_secs(&self) -> u32 {
        self.clock.now_secs()
    }

    /// Monotonic milliseconds since boot
    pub fn ticks_ms(&self) -> u64 {
        self.clock.ticks_ms()
    }
}

/// Shared handle to the application state
pub type SharedState = Arc<Mutex<AppState>>;

/// Wrap state for sharing across tasks
pub fn shared(state: AppState) -> SharedState {
    Arc::new(Mutex::new(state))
}

/// Lock the shared state.
///
/// A poisoned lock means a task panicked mid-update; the state cannot be
/// trusted, so this propagates the panic.
pub fn lock(state: &SharedState) -> MutexGuard<'_, AppState> {
    state.lock().expect("application state lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mocks::ManualClock;
    use crate::storage::SessionStore;
    use tempfile::TempDir;

    fn app_state(clock: ManualClock) -> (SharedState, TempDir) {
        let dir = TempDir::new().unwrap();
        let manager = SessionManager::new(SessionStore::new(dir.path()), 300);
        (shared(AppState::new(manager, Box::new(clock))), dir)
    }

    #[test]
    fn test_record_revolution_updates_both_managers() {
        let clock = ManualClock::new(1000, 5_000);
        let (state, _dir) = app_state(clock.clone());

        lock(&state).record_revolution();
        clock.advance_secs(2);
        lock(&state).record_revolution();

        let guard = lock(&state);
        assert_eq!(guard.telemetry.telemetry().cumulative_revolutions, 2);
        assert_eq!(guard.telemetry.last_physical_time_ms(), 7_000);

        let session = guard.sessions.current().unwrap();
        assert_eq!(session.start_time, 1000);
        assert_eq!(session.end_time, 1002);
        assert_eq!(session.revolutions, 2);
    }

    #[test]
    fn test_session_counter_is_independent_of_wire_wrap() {
        // Telemetry wraps at 16 bits; the session count must not
        let clock = ManualClock::new(1000, 0);
        let dir = TempDir::new().unwrap();
        let manager = SessionManager::new(SessionStore::new(dir.path()), 300);
        let mut state = AppState::new(manager, Box::new(clock));

        for _ in 0..65_540 {
            state.record_revolution();
        }

        assert_eq!(state.telemetry.telemetry().cumulative_revolutions, 4);
        assert_eq!(state.sessions.current().unwrap().revolutions, 65_540);
    }
}
