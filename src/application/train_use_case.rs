// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a fine-tuning run:
//
//   Step 1: Load train and dev examples     (Layer 4 - data)
//   Step 2: Load tokenizer, keep a copy     (Layer 6 - infra)
//   Step 3: Segment into windows            (Layer 4 - data)
//   Step 4: Label training windows          (Layer 4 - data)
//   Step 5: Save config                     (Layer 6 - infra)
//   Step 6: Run training loop               (Layer 5 - ml)

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    alignment::{label_windows, MissingAnswerPolicy},
    dataset::{TrainingSet, ValidationSet},
    decoding::DecodeConfig,
    loader::CmrcLoader,
    windowing::{TokenizerSegmenter, WindowArena, WindowConfig},
};
use crate::domain::traits::{ExampleSource, WindowSegmenter};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    model::SpanEncoderConfig,
    trainer::{run_training, TrainSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved as train_config.json beside the checkpoints; evaluation
// rebuilds the encoder and the windowing from it. Missing fields
// fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub train_file:        String,
    pub dev_file:          String,
    /// HuggingFace tokenizer.json
    pub tokenizer:         String,
    pub output_dir:        String,

    pub max_length:        usize,
    pub stride:            usize,
    pub n_best:            usize,
    pub max_answer_length: usize,

    pub batch_size:        usize,
    pub epochs:            usize,
    pub lr:                f64,
    pub weight_decay:      f32,
    pub seed:              u64,
    pub missing_answer:    MissingAnswerPolicy,
    /// Log the running loss every N optimiser steps
    pub log_every:         usize,

    pub d_model:           usize,
    pub num_heads:         usize,
    pub num_layers:        usize,
    pub d_ff:              usize,
    pub dropout:           f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_file:        "data/cmrc2018_train.json".to_string(),
            dev_file:          "data/cmrc2018_dev.json".to_string(),
            tokenizer:         "data/tokenizer.json".to_string(),
            output_dir:        "checkpoints".to_string(),
            max_length:        512,
            stride:            128,
            n_best:            20,
            max_answer_length: 30,
            batch_size:        4,
            epochs:            5,
            lr:                2e-5,
            weight_decay:      0.01,
            seed:              5,
            missing_answer:    MissingAnswerPolicy::Fail,
            log_every:         100,
            d_model:           256,
            num_heads:         8,
            num_layers:        6,
            d_ff:              1024,
            dropout:           0.1,
        }
    }
}

impl TrainConfig {
    pub fn window_config(&self) -> WindowConfig {
        WindowConfig { max_length: self.max_length, stride: self.stride }
    }

    pub fn decode_config(&self) -> DecodeConfig {
        DecodeConfig { n_best: self.n_best, max_answer_length: self.max_answer_length }
    }

    /// Position table sized to the window length.
    pub fn encoder_config(&self, vocab_size: usize) -> SpanEncoderConfig {
        SpanEncoderConfig::new(
            vocab_size,
            self.max_length,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
            self.dropout,
        )
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Load examples ─────────────────────────────────────────────
        let train_examples = CmrcLoader::new(&cfg.train_file)
            .load_all()
            .with_context(|| format!("cannot load training data '{}'", cfg.train_file))?;
        let dev_examples = CmrcLoader::new(&cfg.dev_file)
            .load_all()
            .with_context(|| format!("cannot load dev data '{}'", cfg.dev_file))?;
        tracing::info!(
            "Loaded {} training and {} dev examples",
            train_examples.len(),
            dev_examples.len()
        );

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let tokenizer  = TokenizerStore::load_from(Path::new(&cfg.tokenizer))?;
        let vocab_size = TokenizerStore::vocab_size(&tokenizer);
        TokenizerStore::new(&cfg.output_dir).save_copy(&tokenizer)?;

        // ── Step 3: Windows ───────────────────────────────────────────────────
        let segmenter     = TokenizerSegmenter::new(tokenizer, cfg.window_config())?;
        let train_windows = segmenter.segment(&train_examples)?;
        tracing::info!("train: {} -> {} windows", train_examples.len(), train_windows.len());
        let dev_windows   = segmenter.segment(&dev_examples)?;
        tracing::info!("dev: {} -> {} windows", dev_examples.len(), dev_windows.len());

        // ── Step 4: Labels ────────────────────────────────────────────────────
        let labels = label_windows(&train_windows, &train_examples, cfg.missing_answer)
            .context("cannot label training windows")?;

        let train = TrainingSet::new(WindowArena::new(train_windows), labels);
        let valid = ValidationSet { examples: dev_examples, arena: WindowArena::new(dev_windows) };

        // ── Step 5: Save config for evaluation ────────────────────────────────
        let ckpt    = CheckpointManager::new(&cfg.output_dir)?;
        ckpt.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.output_dir)?;

        // ── Step 6: Training loop (Layer 5) ───────────────────────────────────
        run_training(cfg, vocab_size, train, valid, &ckpt, &metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.window_config(), WindowConfig { max_length: 512, stride: 128 });
        assert_eq!(cfg.decode_config(), DecodeConfig { n_best: 20, max_answer_length: 30 });
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.seed, 5);
        assert!((cfg.lr - 2e-5).abs() < 1e-12);
        assert_eq!(cfg.missing_answer, MissingAnswerPolicy::Fail);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: TrainConfig =
            serde_json::from_str(r#"{ "epochs": 2, "missing_answer": "skip" }"#).unwrap();
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.missing_answer, MissingAnswerPolicy::Skip);
        assert_eq!(cfg.stride, 128);
    }

    #[test]
    fn test_encoder_config_uses_window_length() {
        let mut cfg = TrainConfig::default();
        cfg.max_length = 384;
        let enc = cfg.encoder_config(21128);
        assert_eq!(enc.vocab_size, 21128);
        assert_eq!(enc.max_position, 384);
        assert_eq!(enc.type_vocab_size, 2);
    }
}
