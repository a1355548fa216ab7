//! Identity pipeline for wiring verification.
//!
//! Echoes every input frame back unchanged, so the full OSC → state →
//! loop → transport path can be exercised without an engine attached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Result;

use super::{Conditioning, DiffusionPipeline, Frame};

/// Conditioning payload produced by the passthrough pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPrompt {
    pub prompt: String,
    pub negative_prompt: String,
}

/// Pipeline that returns input frames unchanged.
///
/// Clones share call counters, so a handle kept by the caller keeps
/// observing a pipeline moved into the generation worker.
#[derive(Clone, Default)]
pub struct PassthroughPipeline {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    prepare_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    #[cfg(test)]
    fail_prepare: std::sync::atomic::AtomicBool,
    #[cfg(test)]
    fail_generate: std::sync::atomic::AtomicBool,
}

impl PassthroughPipeline {
    /// Creates a passthrough pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conditioning preparations performed so far.
    pub fn prepare_calls(&self) -> usize {
        self.inner.prepare_calls.load(Ordering::SeqCst)
    }

    /// Number of generation calls performed so far.
    pub fn generate_calls(&self) -> usize {
        self.inner.generate_calls.load(Ordering::SeqCst)
    }

    /// Makes subsequent conditioning preparations fail.
    #[cfg(test)]
    pub fn set_fail_prepare(&self, fail: bool) {
        self.inner.fail_prepare.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent generation calls fail.
    #[cfg(test)]
    pub fn set_fail_generate(&self, fail: bool) {
        self.inner.fail_generate.store(fail, Ordering::SeqCst);
    }
}

impl DiffusionPipeline for PassthroughPipeline {
    fn prepare_conditioning(&self, prompt: &str, negative_prompt: &str) -> Result<Conditioning> {
        self.inner.prepare_calls.fetch_add(1, Ordering::SeqCst);

        #[cfg(test)]
        if self.inner.fail_prepare.load(Ordering::SeqCst) {
            return Err(crate::error::DaemonError::conditioning_failed(
                "injected prepare failure",
            ));
        }

        Ok(Conditioning::new(PreparedPrompt {
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.to_string(),
        }))
    }

    fn generate(&self, input: &Frame, _conditioning: &Conditioning) -> Result<Frame> {
        self.inner.generate_calls.fetch_add(1, Ordering::SeqCst);

        #[cfg(test)]
        if self.inner.fail_generate.load(Ordering::SeqCst) {
            return Err(crate::error::DaemonError::generation_failed(
                "injected generate failure",
            ));
        }

        Ok(input.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_wraps_prompt_pair() {
        let pipeline = PassthroughPipeline::new();
        let handle = pipeline.prepare_conditioning("neon city", "blurry").unwrap();
        let prepared = handle.downcast_ref::<PreparedPrompt>().unwrap();
        assert_eq!(prepared.prompt, "neon city");
        assert_eq!(prepared.negative_prompt, "blurry");
        assert_eq!(pipeline.prepare_calls(), 1);
    }

    #[test]
    fn generate_echoes_input() {
        let pipeline = PassthroughPipeline::new();
        let handle = pipeline.prepare_conditioning("x", "").unwrap();
        let input = Frame::black(2, 2);
        let output = pipeline.generate(&input, &handle).unwrap();
        assert_eq!(output, input);
        assert_eq!(pipeline.generate_calls(), 1);
    }

    #[test]
    fn clones_share_counters() {
        let pipeline = PassthroughPipeline::new();
        let observer = pipeline.clone();
        pipeline.prepare_conditioning("x", "").unwrap();
        assert_eq!(observer.prepare_calls(), 1);
    }

    #[test]
    fn injected_failures_surface_as_errors() {
        let pipeline = PassthroughPipeline::new();
        pipeline.set_fail_prepare(true);
        assert!(pipeline.prepare_conditioning("x", "").is_err());

        pipeline.set_fail_prepare(false);
        let handle = pipeline.prepare_conditioning("x", "").unwrap();
        pipeline.set_fail_generate(true);
        assert!(pipeline.generate(&Frame::black(1, 1), &handle).is_err());
    }
}
