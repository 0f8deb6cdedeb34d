use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for segmentation and overlap behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Target chunk size in tokens (soft limit, cut point anchor)
    pub target_tokens: usize,

    /// Minimum chunk size in tokens (the final chunk of a file may be shorter)
    pub min_tokens: usize,

    /// Maximum chunk size in tokens (hard limit, including overlap)
    pub max_tokens: usize,

    /// Fixed overlap applied when no boundary straddles a cut
    pub min_overlap: usize,

    /// Upper bound on combined prefix + suffix overlap per chunk pair
    pub max_overlap: usize,

    /// Report function/class/namespace boundaries to the cut search
    pub preserve_functions: bool,

    /// Report comment boundaries to the cut search
    pub preserve_comments: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_tokens: 500,
            min_tokens: 400,
            max_tokens: 600,
            min_overlap: 25,
            max_overlap: 100,
            preserve_functions: true,
            preserve_comments: true,
        }
    }
}

impl ChunkerConfig {
    /// Validate configuration. Called at construction, before any file is processed.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(ChunkerError::invalid_config("max_tokens must be > 0"));
        }

        if self.min_tokens > self.target_tokens {
            return Err(ChunkerError::invalid_config(format!(
                "min_tokens ({}) cannot exceed target_tokens ({})",
                self.min_tokens, self.target_tokens
            )));
        }

        if self.target_tokens > self.max_tokens {
            return Err(ChunkerError::invalid_config(format!(
                "target_tokens ({}) cannot exceed max_tokens ({})",
                self.target_tokens, self.max_tokens
            )));
        }

        if self.min_overlap > self.max_overlap {
            return Err(ChunkerError::invalid_config(format!(
                "min_overlap ({}) cannot exceed max_overlap ({})",
                self.min_overlap, self.max_overlap
            )));
        }

        Ok(())
    }
}
