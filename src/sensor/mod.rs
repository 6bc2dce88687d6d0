//! # Crank Sensor Boundary
//!
//! Trait abstraction over the debounced reed-switch edge source.
//!
//! GPIO setup, interrupt wiring, and debounce timing are external
//! collaborators; the core consumes a stream of clean edges, one per crank
//! revolution.

use async_trait::async_trait;

/// Source of debounced crank sensor edges
#[async_trait]
pub trait CrankSensor: Send {
    /// Await the next crank revolution edge.
    ///
    /// Returns `None` when the source has shut down.
    async fn next_edge(&mut self) -> Option<()>;
}

/// Channel-backed sensor source.
///
/// The platform's interrupt handler (or a simulator) pushes edges into the
/// sender half; the sensor loop consumes them here. The channel hand-off is
/// what makes the hardware-interrupt producer safe against the cooperative
/// tasks: state mutation happens on the consumer side, under the state
/// lock.
pub struct ChannelCrankSensor {
    edges: tokio::sync::mpsc::UnboundedReceiver<()>,
}

impl ChannelCrankSensor {
    /// Returns the sensor and the sender half for the edge producer
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedSender<()>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { edges: rx }, tx)
    }
}

#[async_trait]
impl CrankSensor for ChannelCrankSensor {
    async fn next_edge(&mut self) -> Option<()> {
        self.edges.recv().await
    }
}
