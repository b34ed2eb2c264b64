//! Process-scoped pipeline state

use crate::utils::FunctionCache;
use std::sync::atomic::{AtomicBool, Ordering};

/// Extraction stage a one-shot warning belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Decipher,
    NTransform,
}

/// Function cache plus the one-shot warning flags. Build one per process and
/// share it; tests build their own for isolation.
#[derive(Default)]
pub struct PipelineState {
    cache: FunctionCache,
    decipher_warned: AtomicBool,
    n_transform_warned: AtomicBool,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &FunctionCache {
        &self.cache
    }

    /// Returns true exactly once per stage for the lifetime of this state
    pub fn first_warning(&self, stage: ExtractionStage) -> bool {
        let flag = match stage {
            ExtractionStage::Decipher => &self.decipher_warned,
            ExtractionStage::NTransform => &self.n_transform_warned,
        };
        !flag.swap(true, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineState")
            .field("decipher_warned", &self.decipher_warned)
            .field("n_transform_warned", &self.n_transform_warned)
            .finish_non_exhaustive()
    }
}
