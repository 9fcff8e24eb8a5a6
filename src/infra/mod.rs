// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by more than one layer:
//
//   checkpoint.rs      — encoder weights (CompactRecorder), the
//                        best-checkpoint pointer and the saved
//                        TrainConfig.
//
//   tokenizer_store.rs — loads tokenizer.json and keeps a copy
//                        beside the checkpoints.
//
//   metrics.rs         — per-epoch CSV log.
//
//   evaluator.rs       — CMRC2018 F1 / EM scoring.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer loading and persistence
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;

/// CMRC2018 answer scoring
pub mod evaluator;
