//! Applies parsed commands to the shared control state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rosc::{OscMessage, OscPacket};

use crate::state::{ControlState, MAX_VERBOSITY};

use super::commands::{Command, ParseError};

/// Parses inbound messages and applies each command's effect.
///
/// Effects touch only the control state; the dispatch path never calls
/// into the pipeline or transport, so command latency stays independent
/// of GPU work. Unknown and malformed messages are counted and skipped.
pub struct CommandDispatcher {
    state: Arc<ControlState>,
    unknown: AtomicU64,
    malformed: AtomicU64,
}

impl CommandDispatcher {
    /// Creates a dispatcher mutating the given control state.
    pub fn new(state: Arc<ControlState>) -> Self {
        Self {
            state,
            unknown: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
        }
    }

    /// Decodes one raw datagram and dispatches its contents.
    ///
    /// The single entry point for the message channel: malformed packets
    /// are counted and skipped, never fatal.
    pub fn handle_datagram(&self, datagram: &[u8]) {
        match rosc::decoder::decode_udp(datagram) {
            Ok((_rest, packet)) => self.dispatch_packet(packet),
            Err(e) => {
                self.malformed.fetch_add(1, Ordering::SeqCst);
                if self.state.verbosity() >= 2 {
                    eprintln!("Ignoring malformed OSC packet: {:?}", e);
                }
            }
        }
    }

    /// Dispatches every message in a packet, walking bundles in order.
    pub fn dispatch_packet(&self, packet: OscPacket) {
        match packet {
            OscPacket::Message(message) => self.dispatch_message(&message),
            OscPacket::Bundle(bundle) => {
                for inner in bundle.content {
                    self.dispatch_packet(inner);
                }
            }
        }
    }

    /// Parses one message and applies its effect.
    pub fn dispatch_message(&self, message: &OscMessage) {
        match Command::parse(message) {
            Ok(command) => self.apply(command),
            Err(ParseError::UnknownAddress) => {
                self.unknown.fetch_add(1, Ordering::SeqCst);
                if self.state.verbosity() >= 2 {
                    eprintln!("Ignoring unknown OSC address: {}", message.addr);
                }
            }
            Err(ParseError::BadArguments) => {
                self.malformed.fetch_add(1, Ordering::SeqCst);
                if self.state.verbosity() >= 1 {
                    eprintln!("Ignoring {} with unusable arguments", message.addr);
                }
            }
        }
    }

    /// Applies a command's documented effect to the control state.
    pub fn apply(&self, command: Command) {
        let state = &self.state;
        match command {
            Command::SetPrompt { text, negative } => {
                if state.verbosity() >= 2 {
                    eprintln!("Prompt: {}", elide(&text, 40));
                }
                if state.verbosity() >= 3 {
                    if let Some(negative) = &negative {
                        eprintln!("Negative prompt: {}", negative);
                    }
                }
                state.set_prompt(text, negative);
            }
            Command::Start => {
                let was_running = state.set_running(true);
                if !was_running && state.verbosity() >= 2 {
                    eprintln!("Continuous generation started");
                }
            }
            Command::Stop => {
                let was_running = state.set_running(false);
                if was_running && state.verbosity() >= 2 {
                    eprintln!("Continuous generation stopped");
                }
            }
            Command::Trigger => {
                if state.verbosity() >= 2 {
                    eprintln!("Generation triggered");
                }
                state.request_trigger();
            }
            Command::EnableOutput => {
                let was_enabled = state.set_output_enabled(true);
                if !was_enabled && state.verbosity() >= 2 {
                    eprintln!("Output enabled");
                }
            }
            Command::DisableOutput => {
                let was_enabled = state.set_output_enabled(false);
                if was_enabled && state.verbosity() >= 2 {
                    eprintln!("Output disabled");
                }
            }
            Command::RestartConnections => {
                if state.verbosity() >= 1 {
                    eprintln!("Texture restart requested");
                }
                state.request_restart();
            }
            Command::SetVerbosity(level) => {
                let clamped = level.clamp(0, i64::from(MAX_VERBOSITY)) as u8;
                if i64::from(clamped) != level && state.verbosity() >= 1 {
                    eprintln!(
                        "Verbose level {} out of range, clamping to {}",
                        level, clamped
                    );
                }
                state.set_verbosity(clamped);
                eprintln!("Verbose level set to: {}", clamped);
            }
            Command::QueryVerbosity => {
                eprintln!("Current verbose level: {}", state.verbosity());
            }
            Command::CycleVerbosity => {
                let level = state.cycle_verbosity();
                eprintln!("Verbose level: {}", level);
            }
            Command::VerboseOn => {
                state.set_verbosity(2);
                eprintln!("Verbose level: 2");
            }
            Command::VerboseOff => {
                state.set_verbosity(0);
                eprintln!("Verbose level: 0 (quiet)");
            }
            Command::Shutdown => {
                if state.verbosity() >= 1 {
                    eprintln!("Shutdown requested");
                }
                state.request_shutdown();
            }
        }
    }

    /// Number of messages ignored for an unknown address.
    pub fn unknown_count(&self) -> u64 {
        self.unknown.load(Ordering::SeqCst)
    }

    /// Number of messages or packets ignored as malformed.
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::SeqCst)
    }
}

/// Shortens text for log lines, keeping the first `max_chars` characters.
fn elide(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
