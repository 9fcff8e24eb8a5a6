// ============================================================
// Layer 2 — MergeUseCase
// ============================================================
// Builds the title!=!content summarisation corpus from a pair of
// line-aligned text files.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::corpus_merge::{merge_files, MismatchPolicy};

pub struct MergeUseCase {
    /// Content lines
    pub src:    PathBuf,
    /// Title lines
    pub tgt:    PathBuf,
    pub out:    PathBuf,
    pub policy: MismatchPolicy,
}

impl MergeUseCase {
    /// Returns the number of records written.
    pub fn execute(&self) -> Result<usize> {
        tracing::info!(
            "Merging titles '{}' with contents '{}' (on mismatch: {})",
            self.tgt.display(),
            self.src.display(),
            self.policy,
        );
        merge_files(&self.src, &self.tgt, &self.out, self.policy)
            .with_context(|| format!("cannot build corpus '{}'", self.out.display()))
    }
}
