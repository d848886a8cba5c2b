//! The visualizer seam.
//!
//! Plotting the freshly acquired waveforms is a courtesy to the operator,
//! never required for correctness: the engine calls the renderer after a
//! successful readout and ignores whatever it does. The capability is
//! injected explicitly into the engine, there is no process-wide renderer
//! registry.

use tracing::debug;

use crate::coordinate::Coordinate;

/// Capability of displaying the waveforms of one just-read position.
pub trait Renderer {
    /// Called after all files of `coordinate`'s position have been written.
    /// Fire-and-forget: there is nothing to return.
    fn draw_position(&mut self, coordinate: &Coordinate);
}

/// A renderer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw_position(&mut self, coordinate: &Coordinate) {
        debug!(%coordinate, "no renderer attached, skipping plot");
    }
}
