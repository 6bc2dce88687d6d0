//! # Telemetry Module
//!
//! Live crank telemetry for CSC notifications.
//!
//! This module handles:
//! - Counting crank revolutions with 16-bit wraparound
//! - Tracking the last crank event time in both wire units and raw ticks
//! - Producing the CSC Measurement packet for the notify loop
//!
//! Telemetry is transient: it resets to zero on every power cycle and is
//! never persisted. Session accounting is independent (see
//! [`crate::session`]) and does not wrap.

use tracing::debug;

use crate::clock::ms_to_event_time;
use crate::csc::encoder::encode_csc_measurement;
use crate::csc::protocol::CSC_MEASUREMENT_LEN;

/// Live crank telemetry state
///
/// Mutated exclusively by [`TelemetryManager::record_revolution`]; read by
/// the CSC notify loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrankTelemetry {
    /// Total crank revolutions, wraps at 16 bits per the CSC wire format
    pub cumulative_revolutions: u16,
    /// Last crank event time in 1/1024-second units, wraps at 16 bits
    pub last_event_time: u16,
    /// Monotonic tick timestamp (ms) of the most recent event; 0 = none yet
    pub last_physical_time_ms: u64,
}

/// Manages telemetry state for CSC notifications
#[derive(Debug, Default)]
pub struct TelemetryManager {
    telemetry: CrankTelemetry,
}

impl TelemetryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a crank revolution at the given monotonic tick time.
    ///
    /// Always succeeds; the only effect is the in-place update of the
    /// revolution counter and event timestamps. Callers must hold the
    /// state lock for the duration of the update so readers never observe
    /// a counter without its matching timestamp.
    pub fn record_revolution(&mut self, now_ms: u64) {
        self.telemetry.cumulative_revolutions =
            self.telemetry.cumulative_revolutions.wrapping_add(1);
        self.telemetry.last_event_time = ms_to_event_time(now_ms);
        self.telemetry.last_physical_time_ms = now_ms;

        debug!(
            revolutions = self.telemetry.cumulative_revolutions,
            now_ms, "Recorded crank revolution"
        );
    }

    /// Current telemetry snapshot
    pub fn telemetry(&self) -> CrankTelemetry {
        self.telemetry
    }

    /// Monotonic tick time of the last crank event (0 if none since boot)
    pub fn last_physical_time_ms(&self) -> u64 {
        self.telemetry.last_physical_time_ms
    }

    /// Encode the current state as a CSC Measurement packet
    pub fn to_measurement(&self) -> [u8; CSC_MEASUREMENT_LEN] {
        encode_csc_measurement(
            self.telemetry.cumulative_revolutions,
            self.telemetry.last_event_time,
        )
    }
}
