// ============================================================
// Layer 3 — Token Window Domain Types
// ============================================================
// A context longer than the token budget is split into several
// overlapping windows. Each window remembers which example it
// came from, so inference can aggregate all windows of one
// example before choosing an answer.
//
// Window layout (BERT style pair encoding):
//   [CLS] question... [SEP] context... [SEP] [PAD]...
//   Special Question  Special Context  Special Special
//
// Offsets are kept only for context tokens; every other position
// holds `None`, which is how decoding recognises positions that
// can never start or end an answer.

use serde::{Deserialize, Serialize};

/// Half-open character range `[start, end)` inside the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharSpan {
    pub start: usize,
    pub end:   usize,
}

impl CharSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, other: CharSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Which part of the pair encoding a token position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Question,
    Context,
    /// [CLS], [SEP] and padding
    Special,
}

/// One fixed-length tokenized slice of a (question, context) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWindow {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub type_ids:       Vec<u32>,
    pub segments:       Vec<Segment>,
    /// `Some` only for context tokens
    pub offsets:        Vec<Option<CharSpan>>,
    /// Position of the parent example in the loaded dataset
    pub example_index:  usize,
    pub example_id:     String,
}

impl TokenWindow {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Inclusive token range `(context_start, context_end)` of the
    /// context segment. Context tokens are contiguous, so the range
    /// ends at the first non-context token after the first context one.
    pub fn context_range(&self) -> Option<(usize, usize)> {
        let start = self.segments.iter().position(|s| *s == Segment::Context)?;
        let run = self.segments[start..]
            .iter()
            .take_while(|s| **s == Segment::Context)
            .count();
        Some((start, start + run - 1))
    }
}

/// Training target for one window: token indices of the answer's
/// first and last token. `(0, 0)` points both ends at the leading
/// [CLS] token and means "no answer in this window".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPair {
    pub start: usize,
    pub end:   usize,
}

impl LabelPair {
    pub const NO_ANSWER: LabelPair = LabelPair { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_no_answer(&self) -> bool {
        *self == Self::NO_ANSWER
    }
}

/// Per-token start and end scores the model produced for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowLogits {
    pub start: Vec<f32>,
    pub end:   Vec<f32>,
}
