//! Diffusion pipeline boundary.
//!
//! The daemon never looks inside the engine: it hands over a prompt pair
//! to get back an opaque conditioning handle, and an input frame plus a
//! handle to get back an output frame. Engine bindings implement
//! [`DiffusionPipeline`]; the built-in [`passthrough`] implementation
//! verifies the wiring without a GPU.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

pub mod passthrough;

/// One RGBA image buffer exchanged with the texture transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA bytes, row-major, `width * height * 4` long.
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Creates a frame from raw RGBA bytes.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Creates an opaque black frame of the given size.
    pub fn black(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        for pixel in pixels.chunks_exact_mut(4) {
            pixel[3] = 0xff;
        }
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Opaque handle to prepared prompt conditioning.
///
/// Only the pipeline that produced a handle can interpret its contents;
/// the cache and the generation loop just move it around. Clones share
/// the underlying prepared value.
#[derive(Clone)]
pub struct Conditioning {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Conditioning {
    /// Wraps a pipeline-specific prepared value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Recovers the pipeline-specific value, if the type matches.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// True if both handles share the same prepared value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Conditioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Conditioning(..)")
    }
}

/// External diffusion engine contract.
pub trait DiffusionPipeline: Send + Sync {
    /// Prepares conditioning for a prompt pair.
    ///
    /// Expensive; callers go through the prompt cache rather than calling
    /// this directly every cycle.
    fn prepare_conditioning(&self, prompt: &str, negative_prompt: &str) -> Result<Conditioning>;

    /// Runs one generation step on an input frame.
    fn generate(&self, input: &Frame, conditioning: &Conditioning) -> Result<Frame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_frame_is_opaque() {
        let frame = Frame::black(4, 2);
        assert_eq!(frame.pixels.len(), 32);
        assert!(frame.pixels.chunks_exact(4).all(|px| px == [0, 0, 0, 0xff]));
    }

    #[test]
    fn conditioning_downcast_and_identity() {
        let handle = Conditioning::new(String::from("embedded"));
        assert_eq!(handle.downcast_ref::<String>().unwrap(), "embedded");
        assert!(handle.downcast_ref::<u32>().is_none());

        let clone = handle.clone();
        assert!(handle.ptr_eq(&clone));
        assert!(!handle.ptr_eq(&Conditioning::new(String::from("embedded"))));
    }
}
