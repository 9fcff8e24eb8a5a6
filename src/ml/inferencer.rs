// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs the encoder over windows through an unshuffled DataLoader
// and hands the logits back to the decoder. Every window of the
// dataset is scored before any example is decoded, because an
// example's answer may come from any of its windows.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    prelude::*,
};

use crate::data::{
    batcher::{SpanBatch, WindowBatcher},
    decoding::{decode_all, DecodeConfig},
    windowing::WindowArena,
};
use crate::domain::{
    example::Example,
    prediction::Prediction,
    traits::SpanScorer,
    window::{TokenWindow, WindowLogits},
};
use crate::ml::model::SpanEncoder;

/// Backend used outside of training
pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model:      SpanEncoder<B>,
    device:     B::Device,
    batch_size: usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: SpanEncoder<B>, device: B::Device, batch_size: usize) -> Self {
        Self { model, device, batch_size: batch_size.max(1) }
    }

    pub fn model(&self) -> &SpanEncoder<B> {
        &self.model
    }
}

impl<B: Backend> SpanScorer for Inferencer<B> {
    fn score(&self, windows: &[TokenWindow]) -> Result<Vec<WindowLogits>> {
        // No shuffle and no workers: batches come back in window order,
        // which decode_all relies on.
        let loader = DataLoaderBuilder::<B, TokenWindow, SpanBatch<B>>::new(WindowBatcher)
            .batch_size(self.batch_size)
            .set_device(self.device.clone())
            .build(InMemDataset::new(windows.to_vec()));

        let mut rows = Vec::with_capacity(windows.len());
        for batch in loader.iter() {
            rows.extend(self.model.forward(batch).into_rows()?);
        }
        Ok(rows)
    }
}

/// Score every window in `arena`, then decode one prediction per example.
pub fn predict_all(
    scorer:   &impl SpanScorer,
    examples: &[Example],
    arena:    &WindowArena,
    cfg:      &DecodeConfig,
) -> Result<Vec<Prediction>> {
    let logits = scorer.score(arena.windows())?;
    tracing::debug!("Scored {} windows", logits.len());

    Ok(decode_all(examples, arena, &logits, cfg)?)
}
