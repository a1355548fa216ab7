//! Shared control state.
//!
//! The single source of truth for runtime-mutable parameters, written by
//! the command dispatcher and read once per cycle by the generation loop.
//! Every field transition is one atomic operation; the prompt pair is the
//! only compound field and is swapped under a lock held just long enough
//! to clone or replace it.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

/// Highest supported verbosity level.
pub const MAX_VERBOSITY: u8 = 3;

/// Positive and negative prompt text, always updated together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    /// Conditioning text steering generation toward the description.
    pub text: String,
    /// Conditioning text steering generation away from the description.
    pub negative: String,
}

impl PromptPair {
    /// Creates a prompt pair.
    pub fn new(text: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            negative: negative.into(),
        }
    }

    /// Cache key combining both halves of the pair.
    pub fn cache_key(&self) -> String {
        format!("{}||{}", self.text, self.negative)
    }
}

/// A consistent view of the level-triggered fields, taken once per loop
/// cycle. The edge-triggered flags are consumed separately through
/// [`ControlState::take_trigger`] and [`ControlState::take_restart`].
#[derive(Debug, Clone)]
pub struct ControlSnapshot {
    pub prompt: PromptPair,
    pub running: bool,
    pub output_enabled: bool,
    pub verbosity: u8,
}

/// Runtime-mutable daemon state shared between the OSC listener and the
/// generation loop.
///
/// `running`, `output_enabled`, and `verbosity` are level-triggered: their
/// effect persists until changed again. `trigger_pending` and
/// `restart_pending` are edge-triggered: a read-and-clear consumes each
/// pending event exactly once, so a single set can never fire twice nor be
/// lost between concurrent set and clear.
pub struct ControlState {
    prompt: Mutex<PromptPair>,
    running: AtomicBool,
    output_enabled: AtomicBool,
    verbosity: AtomicU8,
    trigger_pending: AtomicBool,
    restart_pending: AtomicBool,
    shutdown: AtomicBool,
}

impl ControlState {
    /// Creates control state with the given initial prompt and verbosity.
    ///
    /// Generation starts stopped with output delivery enabled.
    pub fn new(prompt: PromptPair, verbosity: u8) -> Self {
        Self {
            prompt: Mutex::new(prompt),
            running: AtomicBool::new(false),
            output_enabled: AtomicBool::new(true),
            verbosity: AtomicU8::new(verbosity.min(MAX_VERBOSITY)),
            trigger_pending: AtomicBool::new(false),
            restart_pending: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Returns a consistent snapshot of the level-triggered fields.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            prompt: self.prompt(),
            running: self.running(),
            output_enabled: self.output_enabled(),
            verbosity: self.verbosity(),
        }
    }

    /// Returns a clone of the current prompt pair.
    pub fn prompt(&self) -> PromptPair {
        self.prompt.lock().unwrap().clone()
    }

    /// Replaces the prompt text, and the negative prompt when given.
    ///
    /// Both halves change under one lock so no reader observes a
    /// half-applied pair.
    pub fn set_prompt(&self, text: String, negative: Option<String>) {
        let mut prompt = self.prompt.lock().unwrap();
        prompt.text = text;
        if let Some(negative) = negative {
            prompt.negative = negative;
        }
    }

    /// Returns whether continuous generation is active.
    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sets the running flag, returning its prior value.
    pub fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::SeqCst)
    }

    /// Returns whether generated frames are delivered to the transport.
    pub fn output_enabled(&self) -> bool {
        self.output_enabled.load(Ordering::SeqCst)
    }

    /// Sets the output flag, returning its prior value.
    pub fn set_output_enabled(&self, enabled: bool) -> bool {
        self.output_enabled.swap(enabled, Ordering::SeqCst)
    }

    /// Returns the current verbosity level.
    pub fn verbosity(&self) -> u8 {
        self.verbosity.load(Ordering::SeqCst)
    }

    /// Sets the verbosity level, clamped to [`MAX_VERBOSITY`].
    pub fn set_verbosity(&self, level: u8) {
        self.verbosity.store(level.min(MAX_VERBOSITY), Ordering::SeqCst);
    }

    /// Advances verbosity to the next level, wrapping 3 back to 0.
    /// Returns the new level.
    pub fn cycle_verbosity(&self) -> u8 {
        let prior = self
            .verbosity
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |level| {
                Some((level + 1) % (MAX_VERBOSITY + 1))
            })
            .unwrap();
        (prior + 1) % (MAX_VERBOSITY + 1)
    }

    /// Requests a one-shot generation.
    pub fn request_trigger(&self) {
        self.trigger_pending.store(true, Ordering::SeqCst);
    }

    /// Consumes the pending trigger, returning whether one was set.
    pub fn take_trigger(&self) -> bool {
        self.trigger_pending.swap(false, Ordering::SeqCst)
    }

    /// Requests a texture transport reconnect.
    pub fn request_restart(&self) {
        self.restart_pending.store(true, Ordering::SeqCst);
    }

    /// Consumes the pending restart request, returning whether one was set.
    pub fn take_restart(&self) -> bool {
        self.restart_pending.swap(false, Ordering::SeqCst)
    }

    /// Signals both the listener and the generation loop to exit.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Returns true if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
