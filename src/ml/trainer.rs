// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes the span encoder and validates it every epoch.
//
//   for epoch in 1..=epochs
//     ├─ DataLoader yields shuffled labelled batches (seeded)
//     ├─ for each batch: loss ─▶ backward ─▶ AdamW step (linear decay lr)
//     ├─ model.valid() ─▶ score ALL dev windows ─▶ decode per example
//     ├─ CMRC F1 / EM ─▶ metrics.csv
//     └─ avg > best ?  save weights, best = avg
//
// Training runs on Autodiff<Wgpu>; validation uses the inner
// backend returned by model.valid(), where dropout is disabled.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{Context, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{LabelledBatch, WindowBatcher},
    dataset::{LabelledWindow, TrainingSet, ValidationSet},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    evaluator::evaluate,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    inferencer::{predict_all, InferBackend, Inferencer},
    model::SpanEncoder,
    schedule::LinearDecay,
};

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub best_epoch: Option<usize>,
    pub best_avg:   f64,
}

pub fn run_training(
    cfg:        &TrainConfig,
    vocab_size: usize,
    train:      TrainingSet,
    valid:      ValidationSet,
    ckpt:       &CheckpointManager,
    metrics:    &MetricsLogger,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, vocab_size, train, &valid, ckpt, metrics, device)
}

fn train_loop(
    cfg:        &TrainConfig,
    vocab_size: usize,
    train:      TrainingSet,
    valid:      &ValidationSet,
    ckpt:       &CheckpointManager,
    metrics:    &MetricsLogger,
    device:     burn::backend::wgpu::WgpuDevice,
) -> Result<TrainSummary> {
    // ── Build model ───────────────────────────────────────────────────────────
    // Seeds weight init and dropout; the loader below seeds the shuffle.
    TrainBackend::seed(&device, cfg.seed);
    let mut model: SpanEncoder<TrainBackend> = cfg.encoder_config(vocab_size).init(&device);
    tracing::info!(
        "Model ready: {} layers, d_model={}, vocab={}",
        cfg.num_layers, cfg.d_model, vocab_size,
    );

    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay)
        .init();

    // ── Training data loader, reshuffled every epoch ──────────────────────────
    let batch_size = cfg.batch_size.max(1);
    let train_loader =
        DataLoaderBuilder::<TrainBackend, LabelledWindow, LabelledBatch<TrainBackend>>::new(WindowBatcher)
            .batch_size(batch_size)
            .shuffle(cfg.seed)
            .set_device(device.clone())
            .build(train);

    let batches_per_epoch = train_loader.num_items().div_ceil(batch_size);
    let mut schedule      = LinearDecay::new(cfg.lr, cfg.epochs * batches_per_epoch);
    let decode_cfg        = cfg.decode_config();
    let log_every         = cfg.log_every.max(1);

    tracing::info!(
        "{} training windows, {} batches per epoch, {} epochs",
        train_loader.num_items(), batches_per_epoch, cfg.epochs,
    );
    tracing::info!("Per-epoch metrics go to '{}'", metrics.csv_path().display());

    let mut best_avg   = 0.0f64;
    let mut best_epoch = None;

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut steps    = 0usize;

        for batch in train_loader.iter() {
            let loss = model.forward_loss(batch);

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            steps    += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(schedule.next_lr(), model, grads);

            if steps % log_every == 0 {
                tracing::info!(
                    "epoch {} step {}/{} loss {:.6} lr {:.3e}",
                    epoch, steps, batches_per_epoch, loss_sum / steps as f64, schedule.lr(),
                );
            }
        }

        let train_loss = if steps > 0 { loss_sum / steps as f64 } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let scorer: Inferencer<InferBackend> =
            Inferencer::new(model.valid(), device.clone(), batch_size);
        let predictions = predict_all(&scorer, &valid.examples, &valid.arena, &decode_cfg)
            .with_context(|| format!("validation failed in epoch {epoch}"))?;
        let scores = evaluate(&predictions, &valid.examples);

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | Valid F1={:.4} | EM={:.4} | AVG={:.4}",
            epoch, cfg.epochs, train_loss, scores.f1, scores.em, scores.avg,
        );

        let row = EpochMetrics::new(epoch, train_loss, &scores);
        metrics.log(&row)?;

        if row.is_improvement(best_avg) {
            best_avg   = scores.avg;
            best_epoch = Some(epoch);
            let path = ckpt.save_weights(scorer.model(), epoch, scores.avg)?;
            tracing::info!("New best AVG {:.4}, saved '{}'", scores.avg, path.display());
        } else {
            tracing::info!("AVG {:.4} did not beat {:.4}; no checkpoint", scores.avg, best_avg);
        }
    }

    tracing::info!("Training complete!");
    Ok(TrainSummary { best_epoch, best_avg })
}
