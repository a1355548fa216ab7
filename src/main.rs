//! easel-daemon: real-time diffusion image daemon.
//!
//! An OSC control channel drives a continuous diffusion loop that reads
//! input frames from a shared-texture transport and publishes generated
//! frames back.

use std::sync::Arc;

use easel_daemon::cache::PromptCache;
use easel_daemon::cli::Cli;
use easel_daemon::daemon::run_daemon;
use easel_daemon::error::{DaemonError, Result};
use easel_daemon::pipeline::passthrough::PassthroughPipeline;
use easel_daemon::state::{ControlState, PromptPair};
use easel_daemon::transport::memory::MemoryTransport;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let config = cli.to_config().map_err(DaemonError::invalid_config)?;
    if let Some(message) = config.validate() {
        return Err(DaemonError::invalid_config(message));
    }

    let seed = config.seed.unwrap_or_else(rand::random);

    if config.verbosity >= 1 {
        eprintln!("=== easel-daemon ===");
        eprintln!("Model: {}", config.model);
        eprintln!("Size: {}x{}", config.width, config.height);
        eprintln!("Acceleration: {}", config.acceleration);
        eprintln!("Seed: {}", seed);
        if !config.lora.is_empty() {
            let pairs: Vec<String> = config
                .lora
                .iter()
                .map(|lora| format!("{}:{}", lora.name, lora.scale))
                .collect();
            eprintln!("LoRA: {}", pairs.join(", "));
        }
        eprintln!(
            "Texture in '{}', texture out '{}'",
            config.texture_in, config.texture_out
        );
        eprintln!();
    }

    let state = Arc::new(ControlState::new(
        PromptPair::new(config.prompt.clone(), config.negative_prompt.clone()),
        config.verbosity,
    ));
    let cache = Arc::new(PromptCache::with_capacity(config.prompt_cache_size));

    // Built-in wiring-check collaborators; engine bindings plug their own
    // pipeline and transport into `run_daemon` through the library API.
    let pipeline = PassthroughPipeline::new();
    let transport = MemoryTransport::new(&config.texture_in, &config.texture_out);

    run_daemon(&config, state, cache, pipeline, transport)
}
