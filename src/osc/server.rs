//! OSC listener over UDP.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DaemonError, Result};
use crate::state::ControlState;

use super::dispatcher::CommandDispatcher;

/// How long a receive blocks before the shutdown flag is re-checked.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// UDP server feeding inbound OSC packets to the command dispatcher.
pub struct OscServer {
    socket: UdpSocket,
    state: Arc<ControlState>,
    dispatcher: Arc<CommandDispatcher>,
}

impl OscServer {
    /// Binds the control socket.
    ///
    /// Binding is the one fatal failure in the OSC path; everything after
    /// it is logged and skipped.
    pub fn bind(
        ip: &str,
        port: u16,
        state: Arc<ControlState>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind((ip, port))
            .map_err(|e| DaemonError::osc_bind_failed(format!("{}:{}", ip, port), e))?;
        socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(|e| DaemonError::osc_bind_failed(format!("{}:{}", ip, port), e))?;

        Ok(Self {
            socket,
            state,
            dispatcher,
        })
    }

    /// The address the server actually bound, useful with port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives and dispatches packets until shutdown is requested.
    ///
    /// Decode failures are counted and skipped; a socket-level failure
    /// stops the server and raises the shutdown flag so the generation
    /// loop exits too.
    pub fn run(self) {
        if self.state.verbosity() >= 1 {
            let addr = self
                .socket
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "<unknown>".to_string());
            eprintln!("--------------------");
            eprintln!("OSC server listening on {}", addr);
            eprintln!("--------------------");
        }

        let mut buf = [0u8; rosc::decoder::MTU];
        while !self.state.is_shutdown() {
            let received = match self.socket.recv_from(&mut buf) {
                Ok((size, _peer)) => size,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => {
                    eprintln!("OSC socket error: {}", e);
                    self.state.request_shutdown();
                    break;
                }
            };

            self.dispatcher.handle_datagram(&buf[..received]);
        }

        if self.state.verbosity() >= 1 {
            eprintln!("OSC server stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PromptPair;
    use rosc::{encoder, OscMessage, OscPacket, OscType};
    use std::thread;

    fn spawn_server() -> (
        Arc<ControlState>,
        Arc<CommandDispatcher>,
        SocketAddr,
        thread::JoinHandle<()>,
    ) {
        let state = Arc::new(ControlState::new(PromptPair::new("abstract shape", ""), 0));
        let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&state)));
        let server = OscServer::bind(
            "127.0.0.1",
            0,
            Arc::clone(&state),
            Arc::clone(&dispatcher),
        )
        .unwrap();
        let addr = server.local_addr().unwrap();
        let handle = thread::spawn(move || server.run());
        (state, dispatcher, addr, handle)
    }

    fn send(addr: SocketAddr, message: OscMessage) {
        let bytes = encoder::encode(&OscPacket::Message(message)).unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(&bytes, addr).unwrap();
        // Give the listener a moment to pick the datagram up.
        thread::sleep(Duration::from_millis(50));
    }

    #[test]
    fn commands_arrive_over_the_socket() {
        let (state, _dispatcher, addr, handle) = spawn_server();

        send(
            addr,
            OscMessage {
                addr: "/prompt".to_string(),
                args: vec![OscType::String("neon city".into())],
            },
        );
        send(
            addr,
            OscMessage {
                addr: "/start".to_string(),
                args: vec![],
            },
        );

        assert_eq!(state.prompt().text, "neon city");
        assert!(state.running());

        send(
            addr,
            OscMessage {
                addr: "/quit".to_string(),
                args: vec![],
            },
        );
        // Checked before join so a lost datagram fails fast instead of
        // hanging on a listener that never saw the quit.
        assert!(state.is_shutdown());
        handle.join().unwrap();
    }

    #[test]
    fn garbage_datagrams_are_counted_not_fatal() {
        let (state, dispatcher, addr, handle) = spawn_server();

        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(b"definitely not osc", addr).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(dispatcher.malformed_count() >= 1);
        assert!(!state.is_shutdown());

        state.request_shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn shutdown_flag_stops_the_server_without_traffic() {
        let (state, _dispatcher, _addr, handle) = spawn_server();
        state.request_shutdown();
        // The 500ms read timeout bounds how long the join can take.
        handle.join().unwrap();
    }
}
