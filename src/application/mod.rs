// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case wires the lower layers together for one command.
// No model math and no printing here; the CLI layer reports the
// results.

/// Fine-tuning with per-epoch validation
pub mod train_use_case;

/// Scoring a checkpoint on a dataset
pub mod evaluate_use_case;

/// Title/content corpus merge
pub mod merge_use_case;
