// ============================================================
// Layer 3 — Collaborator Traits
// ============================================================
// The tokenizer and the encoder are external collaborators. The
// core only depends on these contracts, which keeps alignment and
// decoding testable with hand-built windows and logits.

use crate::domain::error::Result;
use crate::domain::example::Example;
use crate::domain::window::{TokenWindow, WindowLogits};

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Anything that can produce the full list of examples, in file order.
pub trait ExampleSource {
    fn load_all(&self) -> Result<Vec<Example>>;
}

// ─── WindowSegmenter ──────────────────────────────────────────────────────────
/// Splits (question, context) pairs into overlapping fixed-length
/// windows with character offsets and segment tags. Windows come back
/// in example order; each one carries its parent's index and id.
pub trait WindowSegmenter {
    fn segment(&self, examples: &[Example]) -> Result<Vec<TokenWindow>>;
}

// ─── SpanScorer ───────────────────────────────────────────────────────────────
/// Computes per-token start/end logits for a group of windows.
/// Returns exactly one `WindowLogits` per input window, in order.
pub trait SpanScorer {
    fn score(&self, windows: &[TokenWindow]) -> anyhow::Result<Vec<WindowLogits>>;
}
