// ============================================================
// Layer 6 — CMRC2018 Evaluator
// ============================================================
// Scores predictions against gold answers the way the CMRC2018
// shared task does:
//
//   segmentation  Chinese characters and punctuation marks are
//                 tokens on their own; any other run of text is
//                 split on whitespace.
//   F1            longest common contiguous token run between the
//                 prediction and a gold answer (punctuation
//                 removed), best over all gold answers.
//   EM            punctuation-stripped prediction equals any
//                 punctuation-stripped gold answer.
//
//   f1 = 100 · mean F1,  em = 100 · mean EM,  avg = (f1 + em) / 2
//
// Every gold example counts towards the mean; an example with no
// prediction scores zero on both metrics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::example::Example;
use crate::domain::prediction::Prediction;

const PUNCTUATION: &[char] = &[
    '-', ':', '_', '*', '^', '/', '\\', '~', '`', '+', '=',
    '，', '。', '：', '？', '！', '“', '”', '；', '’', '《', '》', '…', '·',
    '、', '「', '」', '（', '）', '－', '～', '『', '』',
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalScores {
    pub f1:    f64,
    pub em:    f64,
    pub avg:   f64,
    pub total: usize,
}

fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Tokens used for F1: one per CJK character / punctuation mark,
/// whitespace-separated words for everything else.
pub fn mixed_segmentation(text: &str, remove_punctuation: bool) -> Vec<String> {
    let text = text.trim().to_lowercase();
    let mut segments = Vec::new();
    let mut pending  = String::new();

    let flush = |pending: &mut String, segments: &mut Vec<String>| {
        segments.extend(pending.split_whitespace().map(str::to_string));
        pending.clear();
    };

    for c in text.chars() {
        if remove_punctuation && is_punctuation(c) {
            continue;
        }
        if is_cjk(c) || is_punctuation(c) {
            flush(&mut pending, &mut segments);
            segments.push(c.to_string());
        } else {
            pending.push(c);
        }
    }
    flush(&mut pending, &mut segments);
    segments
}

pub fn strip_punctuation(text: &str) -> String {
    text.trim().to_lowercase().chars().filter(|c| !is_punctuation(*c)).collect()
}

/// Length of the longest common contiguous run of tokens.
fn longest_common_run(a: &[String], b: &[String]) -> usize {
    let mut best = 0;
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y { prev[j] + 1 } else { 0 };
            best = best.max(curr[j + 1]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

/// Best F1 of `prediction` against any of `answers`, in [0, 1].
pub fn f1_score(answers: &[String], prediction: &str) -> f64 {
    let predicted = mixed_segmentation(prediction, true);

    answers
        .iter()
        .map(|answer| {
            let gold   = mixed_segmentation(answer, true);
            let common = longest_common_run(&gold, &predicted);
            if common == 0 {
                return 0.0;
            }
            let precision = common as f64 / predicted.len() as f64;
            let recall    = common as f64 / gold.len() as f64;
            2.0 * precision * recall / (precision + recall)
        })
        .fold(0.0, f64::max)
}

/// 1.0 if `prediction` matches any answer after normalisation.
pub fn exact_match(answers: &[String], prediction: &str) -> f64 {
    let predicted = strip_punctuation(prediction);
    if answers.iter().any(|a| strip_punctuation(a) == predicted) { 1.0 } else { 0.0 }
}

/// Score `predictions` against the gold answers of `examples`.
pub fn evaluate(predictions: &[Prediction], examples: &[Example]) -> EvalScores {
    let by_id: HashMap<&str, &str> = predictions
        .iter()
        .map(|p| (p.id.as_str(), p.prediction_text.as_str()))
        .collect();

    let mut f1_sum  = 0.0;
    let mut em_sum  = 0.0;
    let mut missing = 0usize;

    for example in examples {
        let Some(prediction) = by_id.get(example.id.as_str()) else {
            missing += 1;
            continue;
        };
        f1_sum += f1_score(&example.answers.text, prediction);
        em_sum += exact_match(&example.answers.text, prediction);
    }

    if missing > 0 {
        tracing::warn!("{} gold examples have no prediction", missing);
    }

    let total = examples.len();
    let (f1, em) = if total == 0 {
        (0.0, 0.0)
    } else {
        (100.0 * f1_sum / total as f64, 100.0 * em_sum / total as f64)
    };

    EvalScores { f1, em, avg: (f1 + em) * 0.5, total }
}
