// ============================================================
// Layer 4 — Answer Span Alignment (training direction)
// ============================================================
// Maps the first gold answer's CHARACTER span onto TOKEN indices
// of one window, producing the label the span head is trained on.
//
// Example (context "北京是中国的首都", answer "中国" at chars 3..5):
//
//   token   [CLS] 首 都 [SEP] 北 京 是 中 国 的 首 都 [SEP]
//   index     0   1  2    3   4  5  6  7  8  9 10 11  12
//   offset    -   -  -    -  0,1 ..   3,4 4,5 ..
//
//   context tokens = 4..=11 → label = (7, 8)
//
// If the stride window cut the answer off, the label is the
// no-answer sentinel (0, 0), pointing both ends at [CLS].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ReaderError, Result};
use crate::domain::example::Example;
use crate::domain::window::{CharSpan, LabelPair, TokenWindow};

/// What to do with a training example that has no gold answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAnswerPolicy {
    /// Abort the run with `ReaderError::Alignment`
    #[default]
    Fail,
    /// Drop every window of that example from the training set
    Skip,
}

impl FromStr for MissingAnswerPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other  => Err(format!("unknown missing-answer policy '{other}' (expected fail|skip)")),
        }
    }
}

impl fmt::Display for MissingAnswerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => f.write_str("fail"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

/// Compute the minimal token span of `window` whose character coverage
/// contains `answer`, or the sentinel when the answer is not fully
/// inside the window's context.
pub fn align_answer(window: &TokenWindow, answer: CharSpan) -> LabelPair {
    let Some((context_start, context_end)) = window.context_range() else {
        return LabelPair::NO_ANSWER;
    };
    let offset = |i: usize| window.offsets.get(i).copied().flatten();

    let (Some(first), Some(last)) = (offset(context_start), offset(context_end)) else {
        return LabelPair::NO_ANSWER;
    };
    if !CharSpan::new(first.start, last.end).contains(answer) {
        return LabelPair::NO_ANSWER;
    }

    // Last token that starts at or before the answer start.
    let start = (context_start..=context_end)
        .take_while(|&i| offset(i).is_some_and(|o| o.start <= answer.start))
        .last()
        .unwrap_or(context_start);

    // First token (scanning from the right) that still ends at or after the answer end.
    let end = (context_start..=context_end)
        .rev()
        .take_while(|&i| offset(i).is_some_and(|o| o.end >= answer.end))
        .last()
        .unwrap_or(context_end);

    LabelPair::new(start, end)
}

/// Label every window with its parent example's first gold answer.
///
/// Returns `(window_index, label)` pairs in window order. Windows of
/// unanswered examples are dropped under `Skip` and abort under `Fail`.
pub fn label_windows(
    windows:  &[TokenWindow],
    examples: &[Example],
    policy:   MissingAnswerPolicy,
) -> Result<Vec<(usize, LabelPair)>> {
    let mut labels  = Vec::with_capacity(windows.len());
    let mut skipped = 0usize;

    for (i, window) in windows.iter().enumerate() {
        let example = examples.get(window.example_index).ok_or_else(|| {
            ReaderError::input_format(
                &window.example_id,
                format!("window points at missing example #{}", window.example_index),
            )
        })?;

        match (example.first_answer_span(), policy) {
            (Some(answer), _) => labels.push((i, align_answer(window, answer))),
            (None, MissingAnswerPolicy::Skip) => skipped += 1,
            (None, MissingAnswerPolicy::Fail) => {
                return Err(ReaderError::Alignment(example.id.clone()));
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} windows whose example has no gold answer", skipped);
    }
    let no_answer = labels.iter().filter(|(_, l)| l.is_no_answer()).count();
    tracing::debug!("Labelled {} windows ({} without the answer)", labels.len(), no_answer);

    Ok(labels)
}
