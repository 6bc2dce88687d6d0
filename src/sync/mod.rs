//! # Sync Protocol Module
//!
//! Pull-based session synchronization for companion apps.
//!
//! The protocol is a single request/response exchange over one
//! write-with-response characteristic:
//!
//! - Request: 4-byte little-endian `u32` — the client's last-synced session
//!   marker in Unix-epoch seconds.
//! - Response: UTF-8 JSON with the single next unsynced session (lowest
//!   `start_time` strictly greater than the marker) and a count of how many
//!   more remain after it, or `{"session": null, "remaining_sessions": 0}`
//!   when caught up, or `{"error": "..."}` on malformed input.
//!
//! The handler is stateless: the client alone tracks its cursor by
//! remembering the `start_time` of the last session it received. This makes
//! the protocol safe for multiple independent clients and resilient to
//! device storage resets, since session keys are wall-clock timestamps and
//! are never reused.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{device_to_unix_secs, unix_to_device_secs};
use crate::error::{Result, TrackerError};
use crate::session::Session;
use crate::storage::SessionStore;

/// Expected sync request length: one u32 little-endian marker
pub const SYNC_REQUEST_LEN: usize = 4;

/// Session as it appears on the wire (Unix-epoch timestamps)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSession {
    pub start_time: u32,
    pub end_time: u32,
    pub revolutions: u32,
}

impl From<Session> for WireSession {
    fn from(session: Session) -> Self {
        Self {
            start_time: device_to_unix_secs(session.start_time),
            end_time: device_to_unix_secs(session.end_time),
            revolutions: session.revolutions,
        }
    }
}

/// Successful sync response payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub session: Option<WireSession>,
    pub remaining_sessions: usize,
}

/// Error response payload for malformed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncError {
    pub error: String,
}

/// Parse the last-synced marker from request bytes.
///
/// The client sends Unix-epoch seconds; the result is converted to the
/// device epoch for comparison against stored session ids.
///
/// # Errors
///
/// Returns [`TrackerError::SyncRequest`] if the request is not exactly
/// 4 bytes.
pub fn parse_last_synced_marker(request: &[u8]) -> Result<u32> {
    let bytes: [u8; SYNC_REQUEST_LEN] = request.try_into().map_err(|_| {
        TrackerError::SyncRequest(format!(
            "Invalid request length: {} (expected {} bytes)",
            request.len(),
            SYNC_REQUEST_LEN
        ))
    })?;

    Ok(unix_to_device_secs(u32::from_le_bytes(bytes)))
}

/// Build the response for a marker, given the sessions newer than it.
///
/// `sessions` must be sorted ascending by `start_time`; the first one is
/// returned and the rest are counted.
pub fn build_sync_response(sessions: &[Session]) -> SyncResponse {
    SyncResponse {
        session: sessions.first().copied().map(WireSession::from),
        remaining_sessions: sessions.len().saturating_sub(1),
    }
}

/// Process one sync request and produce the JSON response bytes.
///
/// Pure transform over the store's query-by-timestamp operation: nothing on
/// the device is mutated by answering, so repeating a request with the same
/// marker returns the same session. Malformed input yields a structured
/// error payload rather than failing the connection.
pub fn process_sync_request(request: &[u8], store: &SessionStore) -> Vec<u8> {
    let marker = match parse_last_synced_marker(request) {
        Ok(marker) => marker,
        Err(e) => {
            warn!("Sync request parse error: {}", e);
            return encode_error(&e.to_string());
        }
    };

    debug!(marker, "Sync request");

    let sessions = match store.load_since(marker) {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!("Sync query failed: {}", e);
            return encode_error("storage unavailable");
        }
    };

    let response = build_sync_response(&sessions);
    match &response.session {
        Some(session) => info!(
            start_time = session.start_time,
            remaining = response.remaining_sessions,
            "Returning session to sync client"
        ),
        None => debug!("No more sessions to sync"),
    }

    // A response this small always serializes
    serde_json::to_vec(&response).unwrap_or_else(|_| encode_error("encoding failure"))
}

fn encode_error(message: &str) -> Vec<u8> {
    format!(r#"{{"error":"{message}"}}"#).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DEVICE_EPOCH_OFFSET_SECS;
    use tempfile::TempDir;

    fn store_with(ids: &[u32]) -> (SessionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        for &id in ids {
            store
                .save(&Session {
                    start_time: id,
                    end_time: id + 600,
                    revolutions: 100,
                })
                .unwrap();
        }
        (store, dir)
    }

    fn request(unix_marker: u32) -> Vec<u8> {
        unix_marker.to_le_bytes().to_vec()
    }

    fn decode(response: &[u8]) -> SyncResponse {
        serde_json::from_slice(response).unwrap()
    }

    #[test]
    fn test_parse_marker_converts_epoch() {
        let marker = parse_last_synced_marker(&request(DEVICE_EPOCH_OFFSET_SECS + 1000)).unwrap();
        assert_eq!(marker, 1000);
    }

    #[test]
    fn test_parse_marker_zero_means_everything() {
        assert_eq!(parse_last_synced_marker(&request(0)).unwrap(), 0);
    }

    #[test]
    fn test_parse_marker_rejects_wrong_length() {
        for bad in [&[][..], &[1, 2][..], &[1, 2, 3, 4, 5][..]] {
            match parse_last_synced_marker(bad) {
                Err(TrackerError::SyncRequest(msg)) => {
                    assert!(msg.contains("length"), "unexpected message: {}", msg);
                }
                other => panic!("Expected SyncRequest error, got: {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_store_returns_null_session() {
        let (store, _dir) = store_with(&[]);
        let response = decode(&process_sync_request(&request(0), &store));
        assert_eq!(response.session, None);
        assert_eq!(response.remaining_sessions, 0);
    }

    #[test]
    fn test_returns_oldest_unsynced_with_remaining_count() {
        // Two stored rides at device times 1000 and 2000
        let (store, _dir) = store_with(&[1000, 2000]);

        let marker = DEVICE_EPOCH_OFFSET_SECS + 500;
        let response = decode(&process_sync_request(&request(marker), &store));
        let session = response.session.unwrap();
        assert_eq!(session.start_time, DEVICE_EPOCH_OFFSET_SECS + 1000);
        assert_eq!(response.remaining_sessions, 1);

        let marker = DEVICE_EPOCH_OFFSET_SECS + 1000;
        let response = decode(&process_sync_request(&request(marker), &store));
        let session = response.session.unwrap();
        assert_eq!(session.start_time, DEVICE_EPOCH_OFFSET_SECS + 2000);
        assert_eq!(response.remaining_sessions, 0);

        let marker = DEVICE_EPOCH_OFFSET_SECS + 2000;
        let response = decode(&process_sync_request(&request(marker), &store));
        assert_eq!(response.session, None);
        assert_eq!(response.remaining_sessions, 0);
    }

    #[test]
    fn test_timestamps_are_unix_epoch_on_the_wire() {
        let (store, _dir) = store_with(&[1000]);
        let response = decode(&process_sync_request(&request(0), &store));
        let session = response.session.unwrap();
        assert_eq!(session.start_time, DEVICE_EPOCH_OFFSET_SECS + 1000);
        assert_eq!(session.end_time, DEVICE_EPOCH_OFFSET_SECS + 1600);
        assert_eq!(session.revolutions, 100);
    }

    #[test]
    fn test_sync_is_idempotent() {
        // Answering a read never advances any server-side cursor
        let (store, _dir) = store_with(&[1000, 2000, 3000]);
        let first = process_sync_request(&request(0), &store);
        let second = process_sync_request(&request(0), &store);
        assert_eq!(first, second);
    }

    #[test]
    fn test_client_loop_walks_all_sessions() {
        let (store, _dir) = store_with(&[1000, 2000, 3000]);

        let mut marker = 0u32;
        let mut seen = Vec::new();
        loop {
            let response = decode(&process_sync_request(&request(marker), &store));
            match response.session {
                Some(session) => {
                    seen.push(session.start_time);
                    marker = session.start_time;
                }
                None => break,
            }
        }

        let expected: Vec<u32> = [1000, 2000, 3000]
            .iter()
            .map(|id| DEVICE_EPOCH_OFFSET_SECS + id)
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_malformed_request_yields_error_json() {
        let (store, _dir) = store_with(&[1000]);
        let response = process_sync_request(b"xyz", &store);

        let value: serde_json::Value = serde_json::from_slice(&response).unwrap();
        assert!(value["error"].as_str().unwrap().contains("length"));
    }

    #[test]
    fn test_corrupt_record_does_not_break_sync() {
        let (store, dir) = store_with(&[1000, 3000]);
        std::fs::write(dir.path().join("2000.json"), b"garbage").unwrap();

        let response = decode(&process_sync_request(&request(0), &store));
        let session = response.session.unwrap();
        assert_eq!(session.start_time, DEVICE_EPOCH_OFFSET_SECS + 1000);
        // The corrupt record is skipped, not counted
        assert_eq!(response.remaining_sessions, 1);
    }

    #[test]
    fn test_build_sync_response_counts_rest() {
        let sessions: Vec<Session> = (1..=4)
            .map(|i| Session {
                start_time: i * 1000,
                end_time: i * 1000 + 600,
                revolutions: 10,
            })
            .collect();

        let response = build_sync_response(&sessions);
        assert_eq!(response.session.unwrap().revolutions, 10);
        assert_eq!(response.remaining_sessions, 3);

        let empty = build_sync_response(&[]);
        assert_eq!(empty.session, None);
        assert_eq!(empty.remaining_sessions, 0);
    }
}
