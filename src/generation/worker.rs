//! The generation loop.
//!
//! Once per cycle the worker snapshots the control state, decides whether
//! to produce a frame, resolves conditioning through the prompt cache,
//! runs the pipeline, and delivers the result. It never blocks on the
//! command dispatcher, and no failure below startup ends the loop.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::PromptCache;
use crate::pipeline::{DiffusionPipeline, Frame};
use crate::state::ControlState;
use crate::transport::TextureTransport;

use super::supervisor::ConnectionSupervisor;

/// Where the worker currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Waiting for a reason to produce a frame.
    Idle,
    /// Resolving conditioning and running the pipeline.
    Generating,
    /// Handing the produced frame to the transport.
    Delivering,
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do; the caller should back off briefly.
    Idle,
    /// Production was due but failed or had no input; retried next cycle.
    Skipped,
    /// A frame was produced.
    Generated {
        /// True if the frame reached the transport.
        delivered: bool,
    },
}

/// Long-lived worker that turns control state into frames.
pub struct GenerationWorker<P, T>
where
    P: DiffusionPipeline,
    T: TextureTransport,
{
    state: Arc<ControlState>,
    cache: Arc<PromptCache>,
    pipeline: P,
    transport: T,
    supervisor: ConnectionSupervisor,
    /// Most recent input frame, reused whenever no new one is available.
    last_frame: Option<Frame>,
    frame_count: u64,
    idle_sleep: Duration,
    phase: LoopPhase,
}

impl<P, T> GenerationWorker<P, T>
where
    P: DiffusionPipeline,
    T: TextureTransport,
{
    /// Creates a worker over the given collaborators.
    pub fn new(
        state: Arc<ControlState>,
        cache: Arc<PromptCache>,
        pipeline: P,
        transport: T,
        idle_sleep: Duration,
    ) -> Self {
        let supervisor = ConnectionSupervisor::new(Arc::clone(&state));
        Self {
            state,
            cache,
            pipeline,
            transport,
            supervisor,
            last_frame: None,
            frame_count: 0,
            idle_sleep,
            phase: LoopPhase::Idle,
        }
    }

    /// Runs cycles until shutdown is requested.
    pub fn run(&mut self) {
        if self.state.verbosity() >= 1 {
            eprintln!("--------------------");
            eprintln!("Generation loop started");
            eprintln!("--------------------");
        }

        while !self.state.is_shutdown() {
            match self.cycle() {
                CycleOutcome::Generated { .. } => {}
                CycleOutcome::Idle | CycleOutcome::Skipped => thread::sleep(self.idle_sleep),
            }
        }

        if self.state.verbosity() >= 1 {
            eprintln!("Generation loop stopped");
        }
    }

    /// Runs one cycle of the loop state machine.
    ///
    /// The trigger flag is consumed before the running check, so a pending
    /// one-shot fires exactly once whether or not continuous generation is
    /// active, and can never fire late after a stop.
    pub fn cycle(&mut self) -> CycleOutcome {
        let snapshot = self.state.snapshot();

        if self.state.take_restart() {
            // Failure leaves the connections down until the next request.
            let _ = self.supervisor.restart(&mut self.transport);
        }

        let triggered = self.state.take_trigger();
        if !triggered && !snapshot.running {
            return CycleOutcome::Idle;
        }

        self.phase = LoopPhase::Generating;

        let conditioning = match self.cache.lookup_or_prepare(&snapshot.prompt, &self.pipeline) {
            Ok(conditioning) => conditioning,
            Err(e) => {
                if snapshot.verbosity >= 1 {
                    eprintln!("Skipping cycle: {}", e);
                }
                self.phase = LoopPhase::Idle;
                return CycleOutcome::Skipped;
            }
        };

        match self.transport.receive_frame() {
            Ok(Some(frame)) => self.last_frame = Some(frame),
            Ok(None) => {}
            Err(e) => {
                // Treated as "no new frame"; the last one is reused below.
                if snapshot.verbosity >= 1 {
                    eprintln!("{}", e);
                }
            }
        }

        let Some(input) = self.last_frame.as_ref() else {
            if snapshot.verbosity >= 3 {
                eprintln!("Ready to generate but no input frame has arrived yet");
            }
            self.phase = LoopPhase::Idle;
            return CycleOutcome::Skipped;
        };

        let output = match self.pipeline.generate(input, &conditioning) {
            Ok(frame) => frame,
            Err(e) => {
                if snapshot.verbosity >= 1 {
                    eprintln!("Skipping cycle: {}", e);
                }
                self.phase = LoopPhase::Idle;
                return CycleOutcome::Skipped;
            }
        };

        self.phase = LoopPhase::Delivering;

        let mut delivered = false;
        if snapshot.output_enabled {
            match self.transport.send_frame(&output) {
                Ok(()) => delivered = true,
                Err(e) => {
                    // Delivery is lost for this cycle only; the output flag
                    // is untouched and the next cycle retries.
                    if snapshot.verbosity >= 1 {
                        eprintln!("{}", e);
                    }
                }
            }
        }

        self.frame_count += 1;
        if snapshot.verbosity >= 3 {
            eprintln!("Processed frame #{}", self.frame_count);
        }

        self.phase = LoopPhase::Idle;
        CycleOutcome::Generated { delivered }
    }

    /// The worker's current position in the cycle state machine.
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Number of frames produced since startup.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
