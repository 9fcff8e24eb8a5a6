// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds or runs burn modules lives here; the
// data layer only touches burn to stack tensors.
//
//   model.rs      — transformer encoder with a start/end span head
//   trainer.rs    — AdamW fine-tuning loop with per-epoch validation
//   inferencer.rs — batched scoring of windows and decoding of answers
//   schedule.rs   — linear learning-rate decay
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// Span encoder architecture
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Window scoring and answer decoding
pub mod inferencer;

/// Learning-rate schedule
pub mod schedule;
