//! Texture connection restart handling.

use std::sync::Arc;

use crate::error::Result;
use crate::state::ControlState;
use crate::transport::TextureTransport;

/// Restarts the texture transport on request.
///
/// Only invoked from the generation loop's cycle boundary, so the
/// transport is never mid-call when it is torn down.
pub struct ConnectionSupervisor {
    state: Arc<ControlState>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor logging at the shared verbosity.
    pub fn new(state: Arc<ControlState>) -> Self {
        Self { state }
    }

    /// Tears down and re-establishes the transport connections.
    ///
    /// On failure the connections stay torn down; the next restart
    /// request retries from that state.
    pub fn restart<T>(&self, transport: &mut T) -> Result<()>
    where
        T: TextureTransport + ?Sized,
    {
        if self.state.verbosity() >= 1 {
            eprintln!("Restarting texture connections...");
        }

        match transport.reconnect() {
            Ok(()) => {
                if self.state.verbosity() >= 1 {
                    eprintln!("Texture connections restarted");
                }
                Ok(())
            }
            Err(e) => {
                if self.state.verbosity() >= 1 {
                    eprintln!("Texture restart failed: {}", e);
                }
                Err(e)
            }
        }
    }
}
