//! # BLE Boundary Module
//!
//! Trait abstractions over the peripheral-link stack.
//!
//! The BLE stack itself (advertising, connections, GATT registration) is an
//! external collaborator; the core only consumes two primitives:
//! - a notify sink for CSC measurements
//! - a write-then-respond channel for sync requests
//!
//! Mock implementations live in [`mocks`] for task tests.

use async_trait::async_trait;
use std::io;

/// Custom sync service UUID (128-bit)
pub const SYNC_SERVICE_UUID: &str = "0000FF00-0000-1000-8000-00805f9b34fb";

/// Session Data characteristic UUID (16-bit, write with response)
pub const SESSION_DATA_UUID: u16 = 0xFF01;

/// Notify primitive for the CSC Measurement characteristic
#[async_trait]
pub trait CadenceSink: Send {
    /// Notify all subscribed clients with a measurement packet
    async fn notify(&mut self, measurement: &[u8]) -> io::Result<()>;
}

/// Request/response primitive for the Session Data characteristic
#[async_trait]
pub trait SyncTransport: Send {
    /// Await the next incoming write from a client.
    ///
    /// Returns `None` when the transport has shut down.
    async fn next_request(&mut self) -> Option<io::Result<Vec<u8>>>;

    /// Write the response back for the client to read
    async fn respond(&mut self, response: &[u8]) -> io::Result<()>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Mock notify sink that records every packet
    #[derive(Clone)]
    pub struct MockCadenceSink {
        pub notified: Arc<Mutex<Vec<Vec<u8>>>>,
        pub notify_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockCadenceSink {
        pub fn new() -> Self {
            Self {
                notified: Arc::new(Mutex::new(Vec::new())),
                notify_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn get_notified(&self) -> Vec<Vec<u8>> {
            self.notified.lock().unwrap().clone()
        }

        pub fn set_notify_error(&self, error: io::ErrorKind) {
            *self.notify_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl CadenceSink for MockCadenceSink {
        async fn notify(&mut self, measurement: &[u8]) -> io::Result<()> {
            if let Some(error) = self.notify_error.lock().unwrap().take() {
                return Err(io::Error::new(error, "Mock notify error"));
            }
            self.notified.lock().unwrap().push(measurement.to_vec());
            Ok(())
        }
    }

    /// Channel-backed mock sync transport
    pub struct MockSyncTransport {
        requests: mpsc::UnboundedReceiver<Vec<u8>>,
        pub responses: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MockSyncTransport {
        /// Returns the transport and a sender for injecting client writes
        pub fn new() -> (Self, mpsc::UnboundedSender<Vec<u8>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Self {
                    requests: rx,
                    responses: Arc::new(Mutex::new(Vec::new())),
                },
                tx,
            )
        }

        pub fn responses_handle(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
            Arc::clone(&self.responses)
        }
    }

    #[async_trait]
    impl SyncTransport for MockSyncTransport {
        async fn next_request(&mut self) -> Option<io::Result<Vec<u8>>> {
            self.requests.recv().await.map(Ok)
        }

        async fn respond(&mut self, response: &[u8]) -> io::Result<()> {
            self.responses.lock().unwrap().push(response.to_vec());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_service_uuids() {
        assert!(SYNC_SERVICE_UUID.starts_with("0000FF00"));
        assert_eq!(SESSION_DATA_UUID, 0xFF01);
    }

    #[tokio::test]
    async fn test_mock_sink_records_notifications() {
        let mut sink = mocks::MockCadenceSink::new();
        sink.notify(&[1, 2, 3]).await.unwrap();
        assert_eq!(sink.get_notified(), vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_mock_transport_round_trip() {
        let (mut transport, tx) = mocks::MockSyncTransport::new();
        tx.send(vec![0, 0, 0, 0]).unwrap();

        let request = transport.next_request().await.unwrap().unwrap();
        assert_eq!(request, vec![0, 0, 0, 0]);

        transport.respond(b"{}").await.unwrap();
        assert_eq!(transport.responses.lock().unwrap().len(), 1);

        drop(tx);
        assert!(transport.next_request().await.is_none());
    }
}
