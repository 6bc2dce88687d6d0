//! # Background Tasks
//!
//! All cooperative loops are defined here, which keeps the concurrent
//! structure of the application visible in one place.
//!
//! Loops:
//! - [`sensor_loop`] - consumes debounced crank edges (the interrupt side)
//! - [`idle_timeout_loop`] - ends sessions after sustained inactivity
//! - [`periodic_save_loop`] - persists the active session on an interval
//! - [`notify_loop`] - broadcasts CSC measurements to subscribers
//! - [`sync_loop`] - answers pull requests from companion apps
//!
//! The loops never signal each other directly; all coordination goes
//! through the shared [`AppState`](crate::state::AppState). Each loop
//! catches its own per-iteration failures, logs them, and keeps running.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::ble::{CadenceSink, SyncTransport};
use crate::sensor::CrankSensor;
use crate::state::{lock, SharedState};
use crate::sync::process_sync_request;

/// Interval between idle-timeout checks
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Delay before the idle monitor starts checking, to let the system settle
const IDLE_STARTUP_GRACE: Duration = Duration::from_secs(10);

/// Backoff after a sync transport failure
const SYNC_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Consume crank sensor edges and record revolutions.
///
/// One iteration per debounced edge, in interrupt order. The combined
/// telemetry + session update happens under a single lock acquisition; see
/// [`AppState::record_revolution`](crate::state::AppState::record_revolution).
/// Exits when the sensor source closes (process shutdown).
pub async fn sensor_loop<S: CrankSensor>(state: SharedState, mut sensor: S) {
    info!("Sensor loop started");

    while sensor.next_edge().await.is_some() {
        lock(&state).record_revolution();
    }

    info!("Sensor source closed, sensor loop exiting");
}

/// Monitor for idle periods and automatically end sessions.
///
/// Checks elapsed time since the last crank event on a fixed interval. The
/// check reads a possibly-just-updated snapshot, which is fine: time only
/// moves forward, and a session ended one interval late loses nothing.
pub async fn idle_timeout_loop(state: SharedState, idle_timeout_ms: u64) {
    info!("Idle timeout task started");

    sleep(IDLE_STARTUP_GRACE).await;

    loop {
        sleep(IDLE_CHECK_INTERVAL).await;

        let mut guard = lock(&state);
        if !guard.sessions.has_active_session() {
            continue;
        }

        let last_event_ms = guard.telemetry.last_physical_time_ms();
        if last_event_ms == 0 {
            // Session restored without any event this boot; nothing to age
            continue;
        }

        let elapsed_ms = guard.ticks_ms().saturating_sub(last_event_ms);
        if elapsed_ms >= idle_timeout_ms {
            info!(elapsed_ms, "Idle timeout reached, ending session");
            guard.sessions.end_session();
        }
    }
}

/// Periodically persist the active session.
///
/// Ensures a long ride survives a power loss. Save failures are logged and
/// retried on the next tick; the in-memory session is never dropped by a
/// failed save.
pub async fn periodic_save_loop(state: SharedState, save_interval: Duration) {
    info!("Periodic save task started");

    loop {
        sleep(save_interval).await;

        let mut guard = lock(&state);
        if !guard.sessions.has_active_session() {
            continue;
        }

        match guard.sessions.maybe_persist() {
            Ok(true) => debug!("Periodic save completed"),
            Ok(false) => debug!("Periodic save skipped (below minimum duration)"),
            Err(e) => warn!("Periodic save failed, will retry: {}", e),
        }
    }
}

/// Broadcast CSC measurements on a fixed interval.
///
/// Notifies continuously, including while idle, so clients can show 0 RPM
/// and detect the connection going stale. Notify failures (e.g. no
/// subscriber right now) are logged at debug and do not stop the loop.
pub async fn notify_loop<C: CadenceSink>(
    state: SharedState,
    mut sink: C,
    notify_interval: Duration,
) {
    info!("CSC notify task started");

    loop {
        sleep(notify_interval).await;

        let measurement = lock(&state).telemetry.to_measurement();
        if let Err(e) = sink.notify(&measurement).await {
            debug!("CSC notify failed: {}", e);
        }
    }
}

/// Answer sync pull requests from companion apps.
///
/// Awaits the next write on the session-data characteristic, runs the pure
/// request handler against the record store, and writes the response back.
/// Transport errors back off briefly and continue; the loop only exits when
/// the transport shuts down.
pub async fn sync_loop<T: SyncTransport>(state: SharedState, mut transport: T) {
    info!("Sync responder task started");

    while let Some(request) = transport.next_request().await {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                warn!("Sync transport read failed: {}", e);
                sleep(SYNC_ERROR_BACKOFF).await;
                continue;
            }
        };

        let store = lock(&state).sessions.store().clone();
        let response = process_sync_request(&request, &store);

        if let Err(e) = transport.respond(&response).await {
            warn!("Sync response write failed: {}", e);
            sleep(SYNC_ERROR_BACKOFF).await;
        }
    }

    info!("Sync transport closed, sync loop exiting");
}
