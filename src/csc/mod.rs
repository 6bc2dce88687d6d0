//! # CSC Protocol Module
//!
//! Cycling Speed and Cadence (CSC) measurement encoding.
//!
//! This module handles:
//! - CSC service/characteristic constants per the Bluetooth SIG spec
//! - Encoding crank telemetry into the 5-byte measurement packet

pub mod encoder;
pub mod protocol;
