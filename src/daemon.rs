//! Daemon wiring.
//!
//! Spawns the OSC listener and the generation worker as independent
//! threads sharing only the control state and the prompt cache, then
//! joins both when shutdown is requested.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::PromptCache;
use crate::config::DaemonConfig;
use crate::error::Result;
use crate::generation::GenerationWorker;
use crate::osc::{CommandDispatcher, OscServer};
use crate::pipeline::DiffusionPipeline;
use crate::state::ControlState;
use crate::transport::TextureTransport;

/// Runs the daemon until shutdown.
///
/// Blocks the calling thread. Returns once both the listener and the
/// generation loop have exited; the only fatal error is failing to bind
/// the OSC socket.
pub fn run_daemon<P, T>(
    config: &DaemonConfig,
    state: Arc<ControlState>,
    cache: Arc<PromptCache>,
    pipeline: P,
    transport: T,
) -> Result<()>
where
    P: DiffusionPipeline + 'static,
    T: TextureTransport + 'static,
{
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&state)));
    let server = OscServer::bind(
        &config.osc_ip,
        config.osc_port,
        Arc::clone(&state),
        dispatcher,
    )?;

    let listener = thread::spawn(move || server.run());

    let mut worker = GenerationWorker::new(
        Arc::clone(&state),
        cache,
        pipeline,
        transport,
        Duration::from_millis(config.idle_sleep_ms),
    );
    let generator = thread::spawn(move || worker.run());

    listener.join().ok();
    generator.join().ok();

    if state.verbosity() >= 1 {
        eprintln!("Shutdown complete");
    }

    Ok(())
}
