// ============================================================
// Layer 3 — Prediction Domain Types
// ============================================================

use serde::{Deserialize, Serialize};

use crate::domain::window::CharSpan;

/// A scored answer span proposed by one window. Transient: the
/// decoder keeps only the best one per example.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAnswer {
    pub span:  CharSpan,
    pub text:  String,
    /// start_logit + end_logit, unnormalised
    pub score: f32,
}

/// Final answer for one example, in the layout the evaluator and the
/// predictions file expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id:              String,
    pub prediction_text: String,
    pub answer_start:    usize,
}

impl Prediction {
    pub fn from_candidate(id: impl Into<String>, candidate: &CandidateAnswer) -> Self {
        Self {
            id:              id.into(),
            prediction_text: candidate.text.clone(),
            answer_start:    candidate.span.start,
        }
    }

    /// "No predictable answer": empty text at offset 0.
    pub fn empty(id: impl Into<String>) -> Self {
        Self { id: id.into(), prediction_text: String::new(), answer_start: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.prediction_text.is_empty()
    }
}
