//! # CSC Measurement Encoder
//!
//! Encodes crank telemetry into CSC Measurement packets.

use bytes::BufMut;

use super::protocol::*;

/// Encode a crank-only CSC Measurement packet
///
/// # Arguments
///
/// * `cumulative_revolutions` - Wrapped 16-bit revolution counter
/// * `last_event_time` - Last crank event time in 1/1024-second units
///
/// # Returns
///
/// * `[u8; 5]` - Complete measurement: flags + revolutions (LE) + event time (LE)
///
/// # Examples
///
/// ```
/// use bike_tracker::csc::encoder::encode_csc_measurement;
///
/// let packet = encode_csc_measurement(0x0102, 0x0304);
/// assert_eq!(packet, [0x02, 0x02, 0x01, 0x04, 0x03]);
/// ```
pub fn encode_csc_measurement(
    cumulative_revolutions: u16,
    last_event_time: u16,
) -> [u8; CSC_MEASUREMENT_LEN] {
    let mut packet = [0u8; CSC_MEASUREMENT_LEN];
    let mut buf = &mut packet[..];

    buf.put_u8(CSC_FLAG_CRANK_DATA);
    buf.put_u16_le(cumulative_revolutions);
    buf.put_u16_le(last_event_time);

    packet
}
