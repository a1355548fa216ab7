//! Daemon configuration module.
//!
//! Runtime configuration for the easel-daemon: the OSC listen address,
//! texture endpoint names, engine settings, and logging defaults.

use serde::{Deserialize, Serialize};

use crate::state::MAX_VERBOSITY;

/// Acceleration method requested from the diffusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Acceleration {
    /// No acceleration; slowest but universally available.
    None,

    /// Memory-efficient attention.
    #[default]
    Xformers,

    /// Compiled TensorRT engines; fastest, longest warmup.
    Tensorrt,
}

impl Acceleration {
    /// Returns the string representation of the acceleration method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Acceleration::None => "none",
            Acceleration::Xformers => "xformers",
            Acceleration::Tensorrt => "tensorrt",
        }
    }

    /// Parses an acceleration method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Acceleration::None),
            "xformers" => Some(Acceleration::Xformers),
            "tensorrt" => Some(Acceleration::Tensorrt),
            _ => None,
        }
    }
}

impl std::fmt::Display for Acceleration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One LoRA adapter and its blend scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraWeight {
    pub name: String,
    pub scale: f32,
}

/// Runtime configuration for the daemon.
///
/// Built from defaults, then `EASEL_*` environment variables, then
/// command-line arguments, each layer overriding the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the OSC server listens on.
    pub osc_ip: String,

    /// Port the OSC server listens on.
    pub osc_port: u16,

    /// Texture endpoint to read input frames from.
    pub texture_in: String,

    /// Texture endpoint to publish output frames as.
    pub texture_out: String,

    /// Model ID or path for the diffusion engine.
    pub model: String,

    /// LoRA adapters blended into the model.
    pub lora: Vec<LoraWeight>,

    /// Output image width in pixels.
    pub width: u32,

    /// Output image height in pixels.
    pub height: u32,

    /// Acceleration method for the engine.
    pub acceleration: Acceleration,

    /// Delta multiplier of virtual residual noise.
    pub delta: f32,

    /// Seed for the engine; random when unset.
    pub seed: Option<u64>,

    /// Startup verbosity level (0..=3).
    pub verbosity: u8,

    /// Prompt applied before any `/prompt` command arrives.
    pub prompt: String,

    /// Negative prompt applied before any `/prompt` command arrives.
    pub negative_prompt: String,

    /// Number of prepared prompts kept in the conditioning cache.
    pub prompt_cache_size: usize,

    /// How long the generation loop sleeps between idle cycles.
    pub idle_sleep_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            osc_ip: "127.0.0.1".to_string(),
            osc_port: 7000,
            texture_in: "SourceImage".to_string(),
            texture_out: "Easel".to_string(),
            model: "stabilityai/sd-turbo".to_string(),
            lora: Vec::new(),
            width: 512,
            height: 512,
            acceleration: Acceleration::default(),
            delta: 0.5,
            seed: None,
            verbosity: 1,
            prompt: "abstract shape".to_string(),
            negative_prompt: "low quality, bad quality, blurry, low resolution".to_string(),
            prompt_cache_size: 10,
            idle_sleep_ms: 5,
        }
    }
}

impl DaemonConfig {
    /// Creates a DaemonConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a DaemonConfig from environment variables.
    ///
    /// Reads the following variables, falling back to defaults for unset
    /// or unparsable values:
    /// - `EASEL_OSC_IP` / `EASEL_OSC_PORT` - OSC listen address
    /// - `EASEL_TEXTURE_IN` / `EASEL_TEXTURE_OUT` - texture endpoint names
    /// - `EASEL_MODEL` - model ID or path
    /// - `EASEL_LORA` - LoRA `name:scale` pairs, comma separated
    /// - `EASEL_WIDTH` / `EASEL_HEIGHT` - image size
    /// - `EASEL_ACCELERATION` - none, xformers, tensorrt
    /// - `EASEL_DELTA` - residual noise multiplier
    /// - `EASEL_SEED` - engine seed
    /// - `EASEL_VERBOSE` - verbosity level 0..=3
    /// - `EASEL_CACHE_SIZE` - prompt cache capacity
    /// - `EASEL_IDLE_SLEEP_MS` - idle cycle sleep
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ip) = std::env::var("EASEL_OSC_IP") {
            if !ip.is_empty() {
                config.osc_ip = ip;
            }
        }

        if let Ok(port_str) = std::env::var("EASEL_OSC_PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                if port > 0 {
                    config.osc_port = port;
                }
            }
        }

        if let Ok(name) = std::env::var("EASEL_TEXTURE_IN") {
            if !name.is_empty() {
                config.texture_in = name;
            }
        }

        if let Ok(name) = std::env::var("EASEL_TEXTURE_OUT") {
            if !name.is_empty() {
                config.texture_out = name;
            }
        }

        if let Ok(model) = std::env::var("EASEL_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }

        if let Ok(lora_str) = std::env::var("EASEL_LORA") {
            if let Ok(lora) = parse_lora_list(&lora_str) {
                config.lora = lora;
            }
        }

        if let Ok(width_str) = std::env::var("EASEL_WIDTH") {
            if let Ok(width) = width_str.parse::<u32>() {
                if width > 0 {
                    config.width = width;
                }
            }
        }

        if let Ok(height_str) = std::env::var("EASEL_HEIGHT") {
            if let Ok(height) = height_str.parse::<u32>() {
                if height > 0 {
                    config.height = height;
                }
            }
        }

        if let Ok(accel_str) = std::env::var("EASEL_ACCELERATION") {
            if let Some(acceleration) = Acceleration::parse(&accel_str) {
                config.acceleration = acceleration;
            }
        }

        if let Ok(delta_str) = std::env::var("EASEL_DELTA") {
            if let Ok(delta) = delta_str.parse::<f32>() {
                if delta.is_finite() && delta > 0.0 {
                    config.delta = delta;
                }
            }
        }

        if let Ok(seed_str) = std::env::var("EASEL_SEED") {
            if let Ok(seed) = seed_str.parse::<u64>() {
                config.seed = Some(seed);
            }
        }

        if let Ok(verbose_str) = std::env::var("EASEL_VERBOSE") {
            if let Ok(verbosity) = verbose_str.parse::<u8>() {
                config.verbosity = verbosity.min(MAX_VERBOSITY);
            }
        }

        if let Ok(size_str) = std::env::var("EASEL_CACHE_SIZE") {
            if let Ok(size) = size_str.parse::<usize>() {
                if size > 0 {
                    config.prompt_cache_size = size;
                }
            }
        }

        if let Ok(sleep_str) = std::env::var("EASEL_IDLE_SLEEP_MS") {
            if let Ok(sleep) = sleep_str.parse::<u64>() {
                config.idle_sleep_ms = sleep;
            }
        }

        config
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.osc_port == 0 {
            return Some("osc_port must be nonzero".to_string());
        }

        if self.width == 0 || self.height == 0 {
            return Some(format!("image size {}x{} is empty", self.width, self.height));
        }

        if self.width % 8 != 0 || self.height % 8 != 0 {
            return Some(format!(
                "image size {}x{} must be a multiple of 8",
                self.width, self.height
            ));
        }

        if !self.delta.is_finite() || self.delta <= 0.0 {
            return Some(format!("delta must be positive, got {}", self.delta));
        }

        if self.verbosity > MAX_VERBOSITY {
            return Some(format!(
                "verbosity {} out of range 0..={}",
                self.verbosity, MAX_VERBOSITY
            ));
        }

        if self.prompt_cache_size == 0 {
            return Some("prompt_cache_size must be at least 1".to_string());
        }

        for lora in &self.lora {
            if !lora.scale.is_finite() {
                return Some(format!("LoRA '{}' has a non-finite scale", lora.name));
            }
        }

        None
    }
}

/// Parses a LoRA list of the form `name1:scale1,name2:scale2`.
///
/// An empty string yields an empty list.
pub fn parse_lora_list(lora_str: &str) -> Result<Vec<LoraWeight>, String> {
    let mut weights = Vec::new();

    for pair in lora_str.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (name, scale_str) = pair
            .rsplit_once(':')
            .ok_or_else(|| format!("LoRA entry '{}' is missing ':scale'", pair))?;

        let scale: f32 = scale_str
            .trim()
            .parse()
            .map_err(|_| format!("Invalid LoRA scale '{}' for '{}'", scale_str.trim(), name))?;

        weights.push(LoraWeight {
            name: name.trim().to_string(),
            scale,
        });
    }

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DaemonConfig::new();
        assert!(config.validate().is_none());
        assert_eq!(config.osc_port, 7000);
        assert_eq!(config.width, 512);
        assert_eq!(config.acceleration, Acceleration::Xformers);
        assert_eq!(config.prompt, "abstract shape");
        assert_eq!(config.prompt_cache_size, 10);
    }

    #[test]
    fn acceleration_parsing() {
        assert_eq!(Acceleration::parse("none"), Some(Acceleration::None));
        assert_eq!(Acceleration::parse("XFormers"), Some(Acceleration::Xformers));
        assert_eq!(Acceleration::parse("tensorrt"), Some(Acceleration::Tensorrt));
        assert_eq!(Acceleration::parse("cuda"), None);
    }

    #[test]
    fn acceleration_display() {
        assert_eq!(Acceleration::Xformers.to_string(), "xformers");
        assert_eq!(Acceleration::None.to_string(), "none");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = DaemonConfig::new();
        config.osc_port = 0;
        assert!(config.validate().is_some());

        let mut config = DaemonConfig::new();
        config.width = 500;
        assert!(config.validate().is_some());

        let mut config = DaemonConfig::new();
        config.delta = -1.0;
        assert!(config.validate().is_some());

        let mut config = DaemonConfig::new();
        config.prompt_cache_size = 0;
        assert!(config.validate().is_some());
    }

    #[test]
    fn parse_lora_list_pairs() {
        let weights = parse_lora_list("lineart:0.5, flat:0.7").unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].name, "lineart");
        assert_eq!(weights[0].scale, 0.5);
        assert_eq!(weights[1].name, "flat");
        assert_eq!(weights[1].scale, 0.7);
    }

    #[test]
    fn parse_lora_list_empty_string() {
        assert!(parse_lora_list("").unwrap().is_empty());
    }

    #[test]
    fn parse_lora_list_rejects_bad_entries() {
        assert!(parse_lora_list("lineart").is_err());
        assert!(parse_lora_list("lineart:heavy").is_err());
    }

    #[test]
    fn from_env_defaults_when_unset() {
        // No EASEL_* variables are set in the test environment.
        let config = DaemonConfig::from_env();
        assert_eq!(config, DaemonConfig::default());
    }
}
