//! # Bike Tracker
//!
//! Firmware core for a battery-powered bicycle cadence tracker.
//!
//! On hardware the crank edges come from a debounced reed-switch interrupt
//! and the two BLE characteristics come from the platform's peripheral
//! stack. This binary runs the same task set against host-side stand-ins
//! for bench testing: stdin lines act as debounced crank edges, CSC
//! measurements are logged, and the sync protocol is served on a local TCP
//! socket for a companion-app client to exercise.

use std::io;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use bike_tracker::ble::{CadenceSink, SyncTransport};
use bike_tracker::clock::SystemClock;
use bike_tracker::config::Config;
use bike_tracker::sensor::ChannelCrankSensor;
use bike_tracker::session::SessionManager;
use bike_tracker::state::{lock, shared, AppState, SharedState};
use bike_tracker::storage::SessionStore;
use bike_tracker::sync::SYNC_REQUEST_LEN;
use bike_tracker::tasks;

/// Default configuration file path (overridable as first argument)
const DEFAULT_CONFIG_PATH: &str = "tracker.toml";

/// Local address serving the sync protocol in the bench harness
const SYNC_LISTEN_ADDR: &str = "127.0.0.1:9816";

/// Cadence sink that logs measurements instead of notifying BLE clients
struct LogCadenceSink;

#[async_trait]
impl CadenceSink for LogCadenceSink {
    async fn notify(&mut self, measurement: &[u8]) -> io::Result<()> {
        debug!("CSC measurement: {:02X?}", measurement);
        Ok(())
    }
}

/// Sync transport over one TCP connection.
///
/// Mirrors the write-with-response characteristic: the client writes a
/// 4-byte marker, the server answers with one JSON object per line.
struct TcpSyncTransport {
    stream: TcpStream,
}

#[async_trait]
impl SyncTransport for TcpSyncTransport {
    async fn next_request(&mut self) -> Option<io::Result<Vec<u8>>> {
        let mut buf = [0u8; SYNC_REQUEST_LEN];
        match self.stream.read_exact(&mut buf).await {
            Ok(_) => Some(Ok(buf.to_vec())),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }

    async fn respond(&mut self, response: &[u8]) -> io::Result<()> {
        self.stream.write_all(response).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await
    }
}

/// Feed one sensor edge per stdin line (bench stand-in for the reed switch)
async fn stdin_edge_producer(edges: UnboundedSender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(_)) = lines.next_line().await {
        if edges.send(()).is_err() {
            break;
        }
    }

    info!("Edge input closed");
}

/// Accept sync clients one at a time and serve the pull protocol
async fn sync_acceptor(state: SharedState, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("Sync client connected: {}", peer);
                tasks::sync_loop(state.clone(), TcpSyncTransport { stream }).await;
                info!("Sync client disconnected: {}", peer);
            }
            Err(e) => {
                warn!("Sync accept failed: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Main entry point
///
/// Brings up the full cooperative task set on a single-threaded runtime:
/// the sensor consumer, the idle-timeout and periodic-save monitors, the
/// CSC notify loop, and the sync responder. Shuts down on Ctrl+C, ending
/// any active session so its final state is persisted.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Bike Tracker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;
    info!(
        "Device '{}': idle timeout {}ms, save interval {}s, min duration {}s",
        config.device.name,
        config.session.idle_timeout_ms,
        config.session.save_interval_secs,
        config.session.min_duration_secs,
    );

    let store = SessionStore::new(&config.storage.sessions_dir);
    store.ensure_dir()?;
    info!(
        "Sessions directory '{}' ready ({} stored sessions)",
        config.storage.sessions_dir,
        store.list_ids()?.len()
    );

    let manager = SessionManager::new(store, config.session.min_duration_secs);
    let state = shared(AppState::new(manager, Box::new(SystemClock::new())));

    let (sensor, edges) = ChannelCrankSensor::new();
    tokio::spawn(stdin_edge_producer(edges));
    tokio::spawn(tasks::idle_timeout_loop(
        state.clone(),
        config.session.idle_timeout_ms,
    ));
    tokio::spawn(tasks::periodic_save_loop(
        state.clone(),
        Duration::from_secs(config.session.save_interval_secs),
    ));
    tokio::spawn(tasks::notify_loop(
        state.clone(),
        LogCadenceSink,
        Duration::from_secs(config.csc.notify_interval_secs),
    ));

    let listener = TcpListener::bind(SYNC_LISTEN_ADDR).await?;
    info!("Sync protocol listening on {}", SYNC_LISTEN_ADDR);
    tokio::spawn(sync_acceptor(state.clone(), listener));

    tokio::select! {
        _ = tasks::sensor_loop(state.clone(), sensor) => {
            info!("Sensor input ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    // Final save of whatever ride was in flight
    if let Some(session) = lock(&state).sessions.end_session() {
        info!(
            "Closed session {} with {} revolutions",
            session.start_time, session.revolutions
        );
    }

    Ok(())
}
