//! # CSC Protocol Constants
//!
//! Constants from the Bluetooth Cycling Speed and Cadence profile.
//!
//! Reference: <https://www.bluetooth.com/specifications/specs/cycling-speed-and-cadence-profile-1-0/>

/// Cycling Speed and Cadence service UUID (16-bit, SIG assigned)
pub const CSC_SERVICE_UUID: u16 = 0x1816;

/// CSC Measurement characteristic UUID (16-bit, SIG assigned)
pub const CSC_MEASUREMENT_UUID: u16 = 0x2A5B;

/// Flags byte bit 1: crank revolution data present
pub const CSC_FLAG_CRANK_DATA: u8 = 0x02;

/// Total length of a crank-only CSC measurement packet:
/// flags (1) + cumulative revolutions (2) + last event time (2)
pub const CSC_MEASUREMENT_LEN: usize = 5;

/// Cumulative crank revolutions wrap at this modulus (uint16 field)
pub const CSC_REVOLUTION_MODULUS: u32 = 65_536;
