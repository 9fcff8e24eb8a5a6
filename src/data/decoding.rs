// ============================================================
// Layer 4 — Answer Span Decoding (inference direction)
// ============================================================
// Turns per-token start/end logits back into answer text.
//
// For every window of an example:
//   1. take the n_best highest start logits and n_best highest end logits
//   2. try every (start, end) pair, dropping pairs that touch a
//      non-context token, run backwards, or exceed max_answer_length
//   3. score = start_logit + end_logit
// Across ALL windows of the example the single best candidate wins.
// The first candidate reaching the maximum is kept on ties, with
// candidates generated in window order, then start rank, then end rank.
//
// No surviving candidate → empty prediction, never an error.

use serde::{Deserialize, Serialize};

use crate::data::windowing::WindowArena;
use crate::domain::error::{ReaderError, Result};
use crate::domain::example::Example;
use crate::domain::prediction::{CandidateAnswer, Prediction};
use crate::domain::window::{CharSpan, TokenWindow, WindowLogits};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Start/end candidates considered per window
    pub n_best:            usize,
    /// Longest answer, in tokens, that may be proposed
    pub max_answer_length: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self { n_best: 20, max_answer_length: 30 }
    }
}

/// Indices of the `n` largest values, highest first. Equal values keep
/// ascending index order so the result is reproducible across platforms.
pub fn top_indices(logits: &[f32], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..logits.len()).collect();
    order.sort_by(|&a, &b| logits[b].total_cmp(&logits[a]));
    order.truncate(n);
    order
}

/// Character → byte boundary table so candidate text can be sliced
/// without rescanning the context for every pair.
struct CharIndex<'a> {
    text:   &'a str,
    bounds: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        let bounds = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, bounds }
    }

    fn slice(&self, span: CharSpan) -> &'a str {
        let last  = self.bounds.len() - 1;
        let start = self.bounds[span.start.min(last)];
        let end   = self.bounds[span.end.min(last)];
        if start >= end { "" } else { &self.text[start..end] }
    }
}

/// All candidates of one window that survive the decoding filters.
fn window_candidates(
    window:  &TokenWindow,
    logits:  &WindowLogits,
    context: &CharIndex<'_>,
    cfg:     &DecodeConfig,
) -> Vec<CandidateAnswer> {
    let offset = |i: usize| window.offsets.get(i).copied().flatten();
    let starts = top_indices(&logits.start, cfg.n_best);
    let ends   = top_indices(&logits.end, cfg.n_best);

    let mut candidates = Vec::new();
    for &s in &starts {
        for &e in &ends {
            let (Some(first), Some(last)) = (offset(s), offset(e)) else {
                continue;
            };
            if e < s || e - s + 1 > cfg.max_answer_length {
                continue;
            }
            let span = CharSpan::new(first.start, last.end);
            candidates.push(CandidateAnswer {
                span,
                text:  context.slice(span).to_string(),
                score: logits.start[s] + logits.end[e],
            });
        }
    }
    candidates
}

/// Best answer for `example` over every one of its windows.
pub fn decode_example<'w>(
    example: &Example,
    windows: impl IntoIterator<Item = (&'w TokenWindow, &'w WindowLogits)>,
    cfg:     &DecodeConfig,
) -> Prediction {
    let context = CharIndex::new(&example.context);
    let mut best: Option<CandidateAnswer> = None;

    for (window, logits) in windows {
        for candidate in window_candidates(window, logits, &context, cfg) {
            if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
    }

    match best {
        Some(c) => Prediction::from_candidate(&example.id, &c),
        None    => Prediction::empty(&example.id),
    }
}

/// Decode every example. `logits[i]` must belong to `arena.windows()[i]`,
/// which is why this only runs after a complete inference pass.
pub fn decode_all(
    examples: &[Example],
    arena:    &WindowArena,
    logits:   &[WindowLogits],
    cfg:      &DecodeConfig,
) -> Result<Vec<Prediction>> {
    if logits.len() != arena.len() {
        return Err(ReaderError::ShapeMismatch { expected: arena.len(), actual: logits.len() });
    }

    let predictions: Vec<Prediction> = examples
        .iter()
        .map(|example| {
            let windows = arena
                .indices_for(&example.id)
                .iter()
                .map(|&i| (&arena.windows()[i], &logits[i]));
            decode_example(example, windows, cfg)
        })
        .collect();

    let empty = predictions.iter().filter(|p| p.is_empty()).count();
    tracing::debug!("Decoded {} predictions ({} empty)", predictions.len(), empty);
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::alignment::align_answer;
    use crate::domain::example::GoldAnswers;
    use crate::domain::window::Segment;

    /// Window whose every position is a context token with the given offsets
    fn bare_window(offsets: Vec<Option<CharSpan>>, id: &str) -> TokenWindow {
        let n = offsets.len();
        TokenWindow {
            input_ids:      vec![7; n],
            attention_mask: vec![1; n],
            type_ids:       vec![1; n],
            segments:       offsets
                .iter()
                .map(|o| if o.is_some() { Segment::Context } else { Segment::Special })
                .collect(),
            offsets,
            example_index:  0,
            example_id:     id.into(),
        }
    }

    fn spans(pairs: &[(usize, usize)]) -> Vec<Option<CharSpan>> {
        pairs.iter().map(|&(s, e)| Some(CharSpan::new(s, e))).collect()
    }

    fn example(id: &str, context: &str) -> Example {
        Example::new(id, context, "q", GoldAnswers::default())
    }

    #[test]
    fn test_top_indices_descending_and_stable() {
        let logits = [0.5, 2.0, 0.5, 1.0];
        assert_eq!(top_indices(&logits, 3), vec![1, 3, 0]);
        assert_eq!(top_indices(&logits, 10), vec![1, 3, 0, 2]);
        assert!(top_indices(&[], 5).is_empty());
    }

    #[test]
    fn test_reference_single_window() {
        let ex     = example("e", "abcdefg");
        let window = bare_window(spans(&[(0, 1), (1, 2), (2, 5)]), "e");
        let logits = WindowLogits { start: vec![0.1, 0.9, 0.2], end: vec![0.1, 0.2, 0.8] };

        let pred = decode_example(&ex, [(&window, &logits)], &DecodeConfig::default());
        assert_eq!(pred.prediction_text, "bcde");
        assert_eq!(pred.answer_start, 1);

        // score of the winner is 0.9 + 0.8
        let best = window_candidates(&window, &logits, &CharIndex::new(&ex.context), &DecodeConfig::default())
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .unwrap();
        assert!((best.score - 1.7).abs() < 1e-6);
        assert_eq!(best.span, CharSpan::new(1, 5));
    }

    #[test]
    fn test_never_picks_backwards_span() {
        // best raw pair is start=2, end=0 (score 20), which is invalid
        let ex     = example("e", "abc");
        let window = bare_window(spans(&[(0, 1), (1, 2), (2, 3)]), "e");
        let logits = WindowLogits { start: vec![0.0, 0.0, 10.0], end: vec![10.0, 0.0, 1.0] };

        let pred = decode_example(&ex, [(&window, &logits)], &DecodeConfig::default());
        // start=2,end=2 → 11.0 beats start=0,end=0 → 10.0
        assert_eq!(pred.prediction_text, "c");
        assert_eq!(pred.answer_start, 2);
    }

    #[test]
    fn test_all_null_offsets_give_empty_prediction() {
        let ex     = example("e", "abc");
        let window = bare_window(vec![None, None, None], "e");
        let logits = WindowLogits { start: vec![1.0, 2.0, 3.0], end: vec![3.0, 2.0, 1.0] };

        let pred = decode_example(&ex, [(&window, &logits)], &DecodeConfig::default());
        assert_eq!(pred, Prediction::empty("e"));
    }

    #[test]
    fn test_no_windows_give_empty_prediction() {
        let ex = example("e", "abc");
        let pred = decode_example(&ex, std::iter::empty(), &DecodeConfig::default());
        assert!(pred.is_empty());
        assert_eq!(pred.answer_start, 0);
    }

    #[test]
    fn test_max_answer_length_filter() {
        let ex     = example("e", "abcd");
        let window = bare_window(spans(&[(0, 1), (1, 2), (2, 3), (3, 4)]), "e");
        let logits = WindowLogits { start: vec![5.0, 0.0, 0.0, 0.0], end: vec![0.0, 0.0, 0.0, 5.0] };
        let cfg    = DecodeConfig { n_best: 20, max_answer_length: 2 };

        let pred = decode_example(&ex, [(&window, &logits)], &cfg);
        // 0..=3 is 4 tokens; best allowed is start 0 with an end within 2 tokens
        assert_eq!(pred.prediction_text, "a");
    }

    #[test]
    fn test_n_best_limits_candidates() {
        let ex     = example("e", "abc");
        let window = bare_window(spans(&[(0, 1), (1, 2), (2, 3)]), "e");
        // only index 0 makes the top-1 start; only index 0 the top-1 end
        let logits = WindowLogits { start: vec![3.0, 2.0, 1.0], end: vec![3.0, 2.0, 1.0] };
        let cfg    = DecodeConfig { n_best: 1, max_answer_length: 30 };

        let cands = window_candidates(&window, &logits, &CharIndex::new(&ex.context), &cfg);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].text, "a");
    }

    #[test]
    fn test_best_across_windows() {
        let ex = example("e", "0123456789");
        let w1 = bare_window(spans(&[(0, 2), (2, 4), (4, 6)]), "e");
        let w2 = bare_window(spans(&[(4, 6), (6, 8), (8, 10)]), "e");
        let l1 = WindowLogits { start: vec![1.0, 0.0, 0.0], end: vec![1.0, 0.0, 0.0] };
        let l2 = WindowLogits { start: vec![0.0, 4.0, 0.0], end: vec![0.0, 0.0, 4.0] };

        let pred = decode_example(&ex, [(&w1, &l1), (&w2, &l2)], &DecodeConfig::default());
        assert_eq!(pred.prediction_text, "6789");
        assert_eq!(pred.answer_start, 6);
    }

    #[test]
    fn test_tie_keeps_first_candidate() {
        let ex = example("e", "ab");
        let w1 = bare_window(spans(&[(0, 1)]), "e");
        let w2 = bare_window(spans(&[(1, 2)]), "e");
        let l  = WindowLogits { start: vec![1.0], end: vec![1.0] };

        let pred = decode_example(&ex, [(&w1, &l), (&w2, &l)], &DecodeConfig::default());
        assert_eq!(pred.prediction_text, "a");
    }

    #[test]
    fn test_multibyte_context_slicing() {
        let ex     = example("zh", "北京是中国的首都");
        let window = bare_window(spans(&[(0, 2), (2, 3), (3, 5)]), "zh");
        let logits = WindowLogits { start: vec![0.0, 0.0, 2.0], end: vec![0.0, 0.0, 2.0] };

        let pred = decode_example(&ex, [(&window, &logits)], &DecodeConfig::default());
        assert_eq!(pred.prediction_text, "中国");
        assert_eq!(pred.answer_start, 3);
    }

    #[test]
    fn test_alignment_then_decoding_roundtrip() {
        let context = "长城位于中国北方，全长两万多里。";
        let answer  = "中国北方";
        let start   = 4;

        // [CLS] q [SEP] then one token per context char, then [SEP]
        let mut offsets  = vec![None, None, None];
        let mut segments = vec![Segment::Special, Segment::Question, Segment::Special];
        for c in 0..context.chars().count() {
            offsets.push(Some(CharSpan::new(c, c + 1)));
            segments.push(Segment::Context);
        }
        offsets.push(None);
        segments.push(Segment::Special);
        let n = offsets.len();
        let window = TokenWindow {
            input_ids: vec![1; n], attention_mask: vec![1; n], type_ids: vec![0; n],
            segments, offsets, example_index: 0, example_id: "gw".into(),
        };

        let ex = Example::new(
            "gw", context, "长城在哪里？",
            GoldAnswers::new(vec![answer.into()], vec![start]),
        );
        let label = align_answer(&window, ex.first_answer_span().unwrap());

        let mut logits = WindowLogits { start: vec![-1.0; n], end: vec![-1.0; n] };
        logits.start[label.start] = 5.0;
        logits.end[label.end]     = 5.0;

        let pred = decode_example(&ex, [(&window, &logits)], &DecodeConfig::default());
        assert_eq!(pred.prediction_text, answer);
        assert_eq!(pred.answer_start, start);
    }

    #[test]
    fn test_decode_all_groups_by_example() {
        let examples = vec![example("a", "xyz"), example("b", "uvw")];
        let wa = bare_window(spans(&[(0, 1), (1, 2)]), "a");
        let mut wb = bare_window(spans(&[(2, 3)]), "b");
        wb.example_index = 1;
        let arena  = WindowArena::new(vec![wa, wb]);
        let logits = vec![
            WindowLogits { start: vec![0.0, 1.0], end: vec![0.0, 1.0] },
            WindowLogits { start: vec![1.0], end: vec![1.0] },
        ];

        let preds = decode_all(&examples, &arena, &logits, &DecodeConfig::default()).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!((preds[0].id.as_str(), preds[0].prediction_text.as_str()), ("a", "y"));
        assert_eq!((preds[1].id.as_str(), preds[1].prediction_text.as_str()), ("b", "w"));
    }

    #[test]
    fn test_decode_all_rejects_missing_logits() {
        let examples = vec![example("a", "xyz")];
        let arena    = WindowArena::new(vec![bare_window(spans(&[(0, 1)]), "a")]);
        let err = decode_all(&examples, &arena, &[], &DecodeConfig::default()).unwrap_err();
        assert!(matches!(err, ReaderError::ShapeMismatch { expected: 1, actual: 0 }));
    }
}
