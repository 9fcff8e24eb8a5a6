// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Rebuilds a trained encoder from its checkpoint directory and
// scores it on a dataset:
//
//   train_config.json + tokenizer.json + weights
//        │
//        ▼
//   load examples ─▶ windows ─▶ score all ─▶ decode ─▶ CMRC F1 / EM
//                                                 │
//                                                 └─▶ predictions.json (optional)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::data::{
    loader::CmrcLoader,
    windowing::{TokenizerSegmenter, WindowArena},
};
use crate::domain::{
    prediction::Prediction,
    traits::{ExampleSource, WindowSegmenter},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    evaluator::{evaluate, EvalScores},
    tokenizer_store::TokenizerStore,
};
use crate::ml::inferencer::{predict_all, InferBackend, Inferencer};

pub struct EvaluateUseCase {
    data_file:      PathBuf,
    checkpoint_dir: PathBuf,
    /// Explicit weights file; the best checkpoint otherwise
    weights:        Option<PathBuf>,
    predictions:    Option<PathBuf>,
}

impl EvaluateUseCase {
    pub fn new(
        data_file:      impl Into<PathBuf>,
        checkpoint_dir: impl Into<PathBuf>,
        weights:        Option<PathBuf>,
        predictions:    Option<PathBuf>,
    ) -> Self {
        Self {
            data_file:      data_file.into(),
            checkpoint_dir: checkpoint_dir.into(),
            weights,
            predictions,
        }
    }

    pub fn execute(&self) -> Result<EvalScores> {
        // ── Step 1: Rebuild the encoder ───────────────────────────────────────
        let ckpt = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg  = ckpt.load_config().with_context(|| {
            format!(
                "no usable train_config.json in '{}'; run 'train' first",
                self.checkpoint_dir.display()
            )
        })?;

        let tokenizer  = TokenizerStore::new(&self.checkpoint_dir).load()?;
        let vocab_size = TokenizerStore::vocab_size(&tokenizer);

        let device = burn::backend::wgpu::WgpuDevice::default();
        let model  = cfg.encoder_config(vocab_size).init::<InferBackend>(&device);
        let model  = ckpt.load_weights(model, self.weights.as_deref(), &device)?;

        // ── Step 2: Windows ───────────────────────────────────────────────────
        let examples = CmrcLoader::new(&self.data_file)
            .load_all()
            .with_context(|| format!("cannot load '{}'", self.data_file.display()))?;
        let segmenter = TokenizerSegmenter::new(tokenizer, cfg.window_config())?;
        let arena     = WindowArena::new(segmenter.segment(&examples)?);
        tracing::info!("{} examples -> {} windows", examples.len(), arena.len());

        // ── Step 3: Predict and score ─────────────────────────────────────────
        let scorer      = Inferencer::new(model, device, cfg.batch_size);
        let predictions = predict_all(&scorer, &examples, &arena, &cfg.decode_config())?;

        if let Some(path) = &self.predictions {
            write_predictions(path, &predictions)?;
        }

        let scores = evaluate(&predictions, &examples);
        tracing::info!("Evaluated {} examples", scores.total);
        Ok(scores)
    }
}

/// Pretty JSON array of predictions, in example order.
fn write_predictions(path: &Path, predictions: &[Prediction]) -> Result<()> {
    let json = serde_json::to_string_pretty(predictions)?;
    fs::write(path, json)
        .with_context(|| format!("cannot write predictions to '{}'", path.display()))?;
    tracing::info!("Wrote {} predictions to '{}'", predictions.len(), path.display());
    Ok(())
}
