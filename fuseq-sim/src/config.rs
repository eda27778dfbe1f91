//! Simulator configuration

use crate::error::{Result, SimulatorError};

/// Configuration for the fused state-vector simulator
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Maximum number of distinct qubits a fused cluster may touch
    ///
    /// Default: 4
    pub fuse_span: usize,

    /// Maximum number of gates fused into one cluster
    ///
    /// Default: 999
    pub fuse_depth: usize,

    /// Pending-gate count above which the buffer is force-flushed
    ///
    /// The buffer flushes when its length exceeds this value, so the
    /// default admits at most 1000 pending gates.
    ///
    /// Default: 999
    pub flush_threshold: usize,

    /// Random seed for measurement sampling
    ///
    /// If None, the generator is seeded from OS entropy at construction.
    ///
    /// Default: None
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            fuse_span: 4,
            fuse_depth: 999,
            flush_threshold: 999,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum cluster span
    pub fn with_fuse_span(mut self, fuse_span: usize) -> Self {
        self.fuse_span = fuse_span;
        self
    }

    /// Set the maximum cluster depth
    pub fn with_fuse_depth(mut self, fuse_depth: usize) -> Self {
        self.fuse_depth = fuse_depth;
        self
    }

    /// Set the force-flush threshold for the gate buffer
    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    /// Set a fixed measurement seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.fuse_span == 0 {
            return Err(SimulatorError::InvalidConfig(
                "fuse_span must be at least 1".to_string(),
            ));
        }
        if self.fuse_depth == 0 {
            return Err(SimulatorError::InvalidConfig(
                "fuse_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
