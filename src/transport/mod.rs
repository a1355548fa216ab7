//! Shared-texture transport boundary.
//!
//! Input frames arrive from some other process and output frames are
//! published back the same way. The daemon only needs the three
//! operations below; the concrete sharing mechanism lives behind them.

use crate::error::Result;
use crate::pipeline::Frame;

pub mod memory;

/// External frame transport contract.
pub trait TextureTransport: Send {
    /// Polls for a new input frame.
    ///
    /// `Ok(None)` means no new frame has arrived since the last poll; the
    /// generation loop keeps working from the last frame it received.
    fn receive_frame(&mut self) -> Result<Option<Frame>>;

    /// Delivers one output frame.
    fn send_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Tears down and re-establishes both directions of the transport.
    fn reconnect(&mut self) -> Result<()>;
}
