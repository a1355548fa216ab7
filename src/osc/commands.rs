//! Typed control commands and the OSC address table.

use rosc::{OscMessage, OscType};

/// A control command parsed from one inbound OSC message.
///
/// Commands are transient: the dispatcher creates one per message,
/// applies its effect, and drops it.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the prompt text, and the negative prompt when given.
    SetPrompt {
        text: String,
        negative: Option<String>,
    },
    /// Start continuous generation.
    Start,
    /// Stop continuous generation.
    Stop,
    /// Generate exactly one frame.
    Trigger,
    /// Deliver generated frames to the output transport.
    EnableOutput,
    /// Keep generating but discard the results.
    DisableOutput,
    /// Tear down and re-establish the texture connections.
    RestartConnections,
    /// Set the verbosity level (clamped to 0..=3).
    SetVerbosity(i64),
    /// Report the current verbosity level.
    QueryVerbosity,
    /// Advance verbosity to the next level, wrapping around.
    CycleVerbosity,
    /// Verbosity level 2.
    VerboseOn,
    /// Verbosity level 0.
    VerboseOff,
    /// Exit the daemon.
    Shutdown,
}

/// Why an inbound message did not produce a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The address is not in the command table.
    UnknownAddress,
    /// The address is known but the arguments do not fit.
    BadArguments,
}

impl Command {
    /// Maps an OSC message onto the command table.
    ///
    /// | Address | Command |
    /// |---|---|
    /// | `/prompt <text> [negative]` | [`Command::SetPrompt`] |
    /// | `/start`, `/s` | [`Command::Start`] |
    /// | `/stop`, `/S` | [`Command::Stop`] |
    /// | `/trigger`, `/t` | [`Command::Trigger`] |
    /// | `/p` | [`Command::EnableOutput`] |
    /// | `/P` | [`Command::DisableOutput`] |
    /// | `/x`, `/restart` | [`Command::RestartConnections`] |
    /// | `/verbose <n>` | [`Command::SetVerbosity`] |
    /// | `/verbose` | [`Command::QueryVerbosity`] |
    /// | `/v` | [`Command::CycleVerbosity`] |
    /// | `/von`, `/voff` | [`Command::VerboseOn`] / [`Command::VerboseOff`] |
    /// | `/quit` | [`Command::Shutdown`] |
    pub fn parse(message: &OscMessage) -> Result<Command, ParseError> {
        match message.addr.as_str() {
            "/prompt" => {
                let text = string_arg(&message.args, 0).ok_or(ParseError::BadArguments)?;
                let negative = string_arg(&message.args, 1);
                Ok(Command::SetPrompt { text, negative })
            }
            "/start" | "/s" => Ok(Command::Start),
            "/stop" | "/S" => Ok(Command::Stop),
            "/trigger" | "/t" => Ok(Command::Trigger),
            "/p" => Ok(Command::EnableOutput),
            "/P" => Ok(Command::DisableOutput),
            "/x" | "/restart" => Ok(Command::RestartConnections),
            "/verbose" => {
                if message.args.is_empty() {
                    Ok(Command::QueryVerbosity)
                } else {
                    int_arg(&message.args, 0)
                        .map(Command::SetVerbosity)
                        .ok_or(ParseError::BadArguments)
                }
            }
            "/v" => Ok(Command::CycleVerbosity),
            "/von" => Ok(Command::VerboseOn),
            "/voff" => Ok(Command::VerboseOff),
            "/quit" => Ok(Command::Shutdown),
            _ => Err(ParseError::UnknownAddress),
        }
    }
}

/// Coerces common OSC argument types to text.
fn string_arg(args: &[OscType], index: usize) -> Option<String> {
    match args.get(index)? {
        OscType::String(s) => Some(s.clone()),
        OscType::Int(i) => Some(i.to_string()),
        OscType::Long(i) => Some(i.to_string()),
        OscType::Float(f) => Some(f.to_string()),
        OscType::Double(f) => Some(f.to_string()),
        OscType::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerces numeric OSC argument types to an integer.
fn int_arg(args: &[OscType], index: usize) -> Option<i64> {
    match args.get(index)? {
        OscType::Int(i) => Some(i64::from(*i)),
        OscType::Long(i) => Some(*i),
        OscType::Float(f) => Some(*f as i64),
        OscType::Double(f) => Some(*f as i64),
        _ => None,
    }
}
