//! In-memory texture transport.
//!
//! Backs the daemon when no shared-texture system is attached, and gives
//! tests a transport they can feed and observe. Clones share the same
//! queues, so a handle kept by the caller still sees frames sent by a
//! clone moved into the generation worker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::pipeline::Frame;

use super::TextureTransport;

/// Transport holding frames in process-local queues.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    receiver_name: String,
    sender_name: String,
    incoming: VecDeque<Frame>,
    sent: Vec<Frame>,
    reconnects: u64,
    #[cfg(test)]
    fail_receives: bool,
    #[cfg(test)]
    fail_sends: bool,
    #[cfg(test)]
    fail_reconnects: bool,
}

impl MemoryTransport {
    /// Creates a transport with the given endpoint names.
    pub fn new(receiver_name: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                receiver_name: receiver_name.into(),
                sender_name: sender_name.into(),
                incoming: VecDeque::new(),
                sent: Vec::new(),
                reconnects: 0,
                #[cfg(test)]
                fail_receives: false,
                #[cfg(test)]
                fail_sends: false,
                #[cfg(test)]
                fail_reconnects: false,
            })),
        }
    }

    /// Name of the input endpoint.
    pub fn receiver_name(&self) -> String {
        self.inner.lock().unwrap().receiver_name.clone()
    }

    /// Name of the output endpoint.
    pub fn sender_name(&self) -> String {
        self.inner.lock().unwrap().sender_name.clone()
    }

    /// Queues a frame for the next [`TextureTransport::receive_frame`].
    pub fn inject_frame(&self, frame: Frame) {
        self.inner.lock().unwrap().incoming.push_back(frame);
    }

    /// Number of frames delivered so far.
    pub fn sent_count(&self) -> usize {
        self.inner.lock().unwrap().sent.len()
    }

    /// Copies of all frames delivered so far.
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of reconnects performed so far.
    pub fn reconnect_count(&self) -> u64 {
        self.inner.lock().unwrap().reconnects
    }

    /// Makes subsequent receive polls fail.
    #[cfg(test)]
    pub fn set_fail_receives(&self, fail: bool) {
        self.inner.lock().unwrap().fail_receives = fail;
    }

    /// Makes subsequent sends fail.
    #[cfg(test)]
    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.lock().unwrap().fail_sends = fail;
    }

    /// Makes subsequent reconnects fail.
    #[cfg(test)]
    pub fn set_fail_reconnects(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reconnects = fail;
    }
}

impl TextureTransport for MemoryTransport {
    fn receive_frame(&mut self) -> Result<Option<Frame>> {
        let mut inner = self.inner.lock().unwrap();

        #[cfg(test)]
        if inner.fail_receives {
            return Err(crate::error::DaemonError::transport_receive(
                "injected receive failure",
            ));
        }

        Ok(inner.incoming.pop_front())
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        #[cfg(test)]
        if inner.fail_sends {
            return Err(crate::error::DaemonError::transport_send(
                "injected send failure",
            ));
        }

        inner.sent.push(frame.clone());
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        #[cfg(test)]
        if inner.fail_reconnects {
            return Err(crate::error::DaemonError::reconnect_failed(
                "injected reconnect failure",
            ));
        }

        // Pending input frames belong to the torn-down connection.
        inner.incoming.clear();
        inner.reconnects += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_drains_injected_frames_in_order() {
        let mut transport = MemoryTransport::new("in", "out");
        transport.inject_frame(Frame::black(1, 1));
        transport.inject_frame(Frame::black(2, 2));

        assert_eq!(transport.receive_frame().unwrap().unwrap().width, 1);
        assert_eq!(transport.receive_frame().unwrap().unwrap().width, 2);
        assert!(transport.receive_frame().unwrap().is_none());
    }

    #[test]
    fn send_records_frames() {
        let mut transport = MemoryTransport::new("in", "out");
        transport.send_frame(&Frame::black(4, 4)).unwrap();
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(transport.sent_frames()[0].width, 4);
    }

    #[test]
    fn clones_share_queues() {
        let mut transport = MemoryTransport::new("in", "out");
        let observer = transport.clone();
        observer.inject_frame(Frame::black(1, 1));
        assert!(transport.receive_frame().unwrap().is_some());
        transport.send_frame(&Frame::black(1, 1)).unwrap();
        assert_eq!(observer.sent_count(), 1);
    }

    #[test]
    fn reconnect_drops_pending_input() {
        let mut transport = MemoryTransport::new("in", "out");
        transport.inject_frame(Frame::black(1, 1));
        transport.reconnect().unwrap();
        assert!(transport.receive_frame().unwrap().is_none());
        assert_eq!(transport.reconnect_count(), 1);
    }

    #[test]
    fn injected_failures_surface_as_errors() {
        let mut transport = MemoryTransport::new("in", "out");
        transport.set_fail_sends(true);
        assert!(transport.send_frame(&Frame::black(1, 1)).is_err());
        transport.set_fail_sends(false);
        assert!(transport.send_frame(&Frame::black(1, 1)).is_ok());

        transport.set_fail_reconnects(true);
        assert!(transport.reconnect().is_err());
    }
}
