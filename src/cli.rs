//! CLI argument parser.
//!
//! Command-line flags override `EASEL_*` environment variables, which
//! override built-in defaults.

use clap::{Parser, ValueEnum};

use crate::config::{parse_lora_list, Acceleration, DaemonConfig};
use crate::state::MAX_VERBOSITY;

/// Acceleration methods selectable from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AccelerationArg {
    /// No acceleration
    None,
    /// Memory-efficient attention
    #[default]
    Xformers,
    /// Compiled TensorRT engines
    Tensorrt,
}

impl From<AccelerationArg> for Acceleration {
    fn from(arg: AccelerationArg) -> Self {
        match arg {
            AccelerationArg::None => Acceleration::None,
            AccelerationArg::Xformers => Acceleration::Xformers,
            AccelerationArg::Tensorrt => Acceleration::Tensorrt,
        }
    }
}

/// easel-daemon: real-time diffusion image daemon
#[derive(Parser, Debug, Default)]
#[command(name = "easel-daemon")]
#[command(about = "Real-time diffusion image daemon with OSC control and shared-texture streaming")]
#[command(version)]
pub struct Cli {
    /// OSC server listen address
    #[arg(long)]
    pub osc_ip: Option<String>,

    /// OSC server port
    #[arg(long)]
    pub osc_port: Option<u16>,

    /// Texture endpoint to read input frames from
    #[arg(long)]
    pub texture_in: Option<String>,

    /// Texture endpoint to publish output frames as
    #[arg(long)]
    pub texture_out: Option<String>,

    /// Model ID or path for the diffusion engine
    #[arg(long)]
    pub model: Option<String>,

    /// LoRA name:scale pairs, comma separated (e.g. "lineart:0.5,flat:0.7")
    #[arg(long)]
    pub lora: Option<String>,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Acceleration method
    #[arg(long, value_enum)]
    pub acceleration: Option<AccelerationArg>,

    /// Delta multiplier of virtual residual noise
    #[arg(long)]
    pub delta: Option<f32>,

    /// Seed for the diffusion engine
    #[arg(long)]
    pub seed: Option<u64>,

    /// Verbose level: 0=quiet, 1=startup/shutdown, 2=+commands, 3=+prompts/frames
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=MAX_VERBOSITY as i64))]
    pub verbose: Option<u8>,

    /// Set verbose level to 0 (overrides --verbose)
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Builds the effective configuration from env and CLI layers.
    pub fn to_config(&self) -> Result<DaemonConfig, String> {
        let mut config = DaemonConfig::from_env();

        if let Some(ref ip) = self.osc_ip {
            config.osc_ip = ip.clone();
        }
        if let Some(port) = self.osc_port {
            config.osc_port = port;
        }
        if let Some(ref name) = self.texture_in {
            config.texture_in = name.clone();
        }
        if let Some(ref name) = self.texture_out {
            config.texture_out = name.clone();
        }
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(ref lora) = self.lora {
            config.lora = parse_lora_list(lora)?;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(acceleration) = self.acceleration {
            config.acceleration = acceleration.into();
        }
        if let Some(delta) = self.delta {
            config.delta = delta;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(verbose) = self.verbose {
            config.verbosity = verbose;
        }
        if self.quiet {
            config.verbosity = 0;
        }

        Ok(config)
    }
}
