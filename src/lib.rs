//! # Bike Tracker
//!
//! Firmware core for a battery-powered bicycle cadence tracker.
//!
//! A reed switch on the crank produces one edge per revolution; the core
//! broadcasts live cadence as standard BLE CSC measurements, segments the
//! event stream into discrete riding sessions, persists them crash-safely
//! as one JSON record per session, and serves them to companion apps over
//! a pull-based sync protocol.

pub mod ble;
pub mod clock;
pub mod config;
pub mod csc;
pub mod error;
pub mod sensor;
pub mod session;
pub mod state;
pub mod storage;
pub mod sync;
pub mod tasks;
pub mod telemetry;
