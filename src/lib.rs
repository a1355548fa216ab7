//! easel-daemon: real-time diffusion image daemon with OSC control.
//!
//! The daemon sits between an OSC command channel and a continuous
//! generation loop: inbound messages mutate shared control state, and a
//! worker thread reads that state every cycle to decide whether to pull
//! an input frame from the texture transport, run the diffusion pipeline,
//! and publish the result. Prepared prompt conditioning is cached so
//! switching prompts never resets the pipeline.
//!
//! # Modules
//!
//! - [`state`]: Shared control state (prompt, flags, verbosity)
//! - [`cache`]: Prompt-conditioning cache with single-flight preparation
//! - [`osc`]: OSC listener, command table, and dispatcher
//! - [`generation`]: Generation loop and connection supervisor
//! - [`pipeline`] / [`transport`]: external collaborator boundaries
//! - [`config`] / [`cli`]: runtime configuration
//! - [`error`]: Error codes and types (DaemonError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use easel_daemon::cache::PromptCache;
//! use easel_daemon::config::DaemonConfig;
//! use easel_daemon::daemon::run_daemon;
//! use easel_daemon::pipeline::passthrough::PassthroughPipeline;
//! use easel_daemon::state::{ControlState, PromptPair};
//! use easel_daemon::transport::memory::MemoryTransport;
//!
//! let config = DaemonConfig::default();
//! let state = Arc::new(ControlState::new(
//!     PromptPair::new(config.prompt.clone(), config.negative_prompt.clone()),
//!     config.verbosity,
//! ));
//! let cache = Arc::new(PromptCache::with_capacity(config.prompt_cache_size));
//!
//! // Swap in a real engine and texture transport here.
//! run_daemon(
//!     &config,
//!     state,
//!     cache,
//!     PassthroughPipeline::new(),
//!     MemoryTransport::new(&config.texture_in, &config.texture_out),
//! )?;
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod generation;
pub mod osc;
pub mod pipeline;
pub mod state;
pub mod transport;

// Re-export commonly used types at crate root for convenience
pub use config::DaemonConfig;
pub use error::{DaemonError, ErrorCode, Result};
pub use state::{ControlSnapshot, ControlState, PromptPair};
