// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch to {output_dir}/metrics.csv:
//
//   epoch,train_loss,valid_f1,valid_em,valid_avg
//   1,3.124500,61.204100,42.118000,51.661050
//   2,2.290100,70.854300,51.172000,61.013150
//
// The header is written only when the file is created, so
// repeated runs in the same directory keep appending.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ReaderError, Result};
use crate::infra::evaluator::EvalScores;

const HEADER: &str = "epoch,train_loss,valid_f1,valid_em,valid_avg";

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Starts at 1
    pub epoch:      usize,
    /// Mean training loss over the epoch
    pub train_loss: f64,
    pub f1:         f64,
    pub em:         f64,
    pub avg:        f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, scores: &EvalScores) -> Self {
        Self { epoch, train_loss, f1: scores.f1, em: scores.em, avg: scores.avg }
    }

    /// Strictly better than the best validation average seen so far
    pub fn is_improvement(&self, best_avg: f64) -> bool {
        self.avg > best_avg
    }

    fn csv_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6},{:.6}",
            self.epoch, self.train_loss, self.f1, self.em, self.avg,
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and write the header if the CSV is new.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| ReaderError::io(dir, e))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            fs::write(&csv_path, format!("{HEADER}\n"))
                .map_err(|e| ReaderError::io(&csv_path, e))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| ReaderError::io(&self.csv_path, e))?;

        writeln!(f, "{}", m.csv_row()).map_err(|e| ReaderError::io(&self.csv_path, e))?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, valid_avg={:.4}",
            m.epoch,
            m.train_loss,
            m.avg,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
