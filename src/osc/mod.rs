//! OSC control channel.
//!
//! A UDP listener decodes inbound OSC packets, maps each address onto a
//! typed [`Command`], and applies its effect to the shared control state.
//! The channel never blocks on the generation loop and never touches the
//! pipeline or transport itself.

mod commands;
mod dispatcher;
mod server;

pub use commands::{Command, ParseError};
pub use dispatcher::CommandDispatcher;
pub use server::OscServer;
