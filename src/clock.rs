//! # Clock and Epoch Utilities
//!
//! Conversions between the device's time bases:
//! - The wall clock counts seconds since the device epoch (2000-01-01),
//!   while the sync protocol speaks Unix epoch (1970-01-01).
//! - The monotonic tick counter is in milliseconds; the CSC wire format
//!   wants 1/1024-second units.

use std::time::Instant;

use chrono::Utc;

/// Seconds between the Unix epoch (1970-01-01) and the device epoch (2000-01-01)
pub const DEVICE_EPOCH_OFFSET_SECS: u32 = 946_684_800;

/// Convert a Unix-epoch timestamp to device-epoch seconds.
///
/// Saturates at 0 for timestamps before 2000-01-01 (e.g. a client syncing
/// for the first time sends marker 0).
pub fn unix_to_device_secs(unix_secs: u32) -> u32 {
    unix_secs.saturating_sub(DEVICE_EPOCH_OFFSET_SECS)
}

/// Convert device-epoch seconds to a Unix-epoch timestamp.
pub fn device_to_unix_secs(device_secs: u32) -> u32 {
    device_secs + DEVICE_EPOCH_OFFSET_SECS
}

/// Convert a millisecond tick value to CSC event time (1/1024-second units).
///
/// Integer division truncates toward zero; the result wraps at 16 bits per
/// the wire format. Clients only ever difference consecutive values, so
/// truncation and wraparound are both acceptable.
pub fn ms_to_event_time(ms: u64) -> u16 {
    (ms * 1024 / 1000) as u16
}

/// Time sources used by the session and telemetry layers.
///
/// Abstracted so tests can drive both clocks by hand instead of sleeping.
pub trait Clock: Send {
    /// Current wall-clock time in device-epoch seconds
    fn now_secs(&self) -> u32;

    /// Monotonic milliseconds since boot
    fn ticks_ms(&self) -> u64;
}

/// Production clock: wall time from `chrono`, ticks from a process-start
/// [`Instant`].
pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> u32 {
        // NTP has run by the time sessions are recorded, so the wall clock
        // is trusted here. Pre-2000 readings clamp to the device epoch.
        let unix = Utc::now().timestamp().max(0) as u64;
        unix_to_device_secs(unix.min(u32::MAX as u64) as u32)
    }

    fn ticks_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }
}
