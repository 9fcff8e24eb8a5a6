// ============================================================
// Layer 4 — Token Windowing
// ============================================================
// Wraps a HuggingFace tokenizer so that each (question, context)
// pair becomes one or more fixed-length windows:
//
//   max_length = 12, stride = 2, question = 2 tokens
//   window 1: [CLS] q q [SEP] c0 c1 c2 c3 c4 c5 c6 [SEP]
//   window 2: [CLS] q q [SEP] c5 c6 c7 c8 c9 [SEP] [PAD] [PAD]
//                             └─┘ overlap of `stride` tokens
//
// Only the context is ever truncated ("only second"), so the
// question appears whole in every window. Offsets are CHARACTER
// offsets into the context so they line up with `answer_start`.
//
// Reference: tokenizers crate (TruncationParams / Encoding::get_overflowing)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokenizers::{
    Encoding, PaddingParams, PaddingStrategy, PostProcessor, Tokenizer, TruncationParams,
    TruncationStrategy,
};

use crate::domain::error::{ReaderError, Result};
use crate::domain::example::Example;
use crate::domain::traits::WindowSegmenter;
use crate::domain::window::{CharSpan, Segment, TokenWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Tokens per window, special tokens and padding included
    pub max_length: usize,
    /// Tokens shared between consecutive windows
    pub stride:     usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { max_length: 512, stride: 128 }
    }
}

/// `WindowSegmenter` backed by a `tokenizers::Tokenizer`.
pub struct TokenizerSegmenter {
    tokenizer: Tokenizer,
    cfg:       WindowConfig,
}

impl TokenizerSegmenter {
    /// Configure `tokenizer` for strided pair truncation and fixed padding.
    pub fn new(mut tokenizer: Tokenizer, cfg: WindowConfig) -> Result<Self> {
        if cfg.stride >= cfg.max_length {
            return Err(ReaderError::Tokenizer(format!(
                "stride ({}) must be smaller than max_length ({})",
                cfg.stride, cfg.max_length
            )));
        }

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: cfg.max_length,
                stride:     cfg.stride,
                strategy:   TruncationStrategy::OnlySecond,
                ..Default::default()
            }))
            .map_err(|e| ReaderError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(cfg.max_length),
            ..Default::default()
        }));

        Ok(Self { tokenizer, cfg })
    }

    /// Context tokens left per window once the question and the special
    /// tokens are placed. The tokenizer cannot stride through a context
    /// unless this stays above `stride`.
    fn context_budget(&self, example: &Example) -> Result<usize> {
        let question = self
            .tokenizer
            .encode(example.question.as_str(), false)
            .map_err(|e| ReaderError::Tokenizer(format!("example '{}': question: {e}", example.id)))?;
        let question_len = question.get_attention_mask().iter().filter(|&&m| m == 1).count();
        let special = self
            .tokenizer
            .get_post_processor()
            .map_or(0, |p| p.added_tokens(true));

        Ok(self.cfg.max_length.saturating_sub(question_len + special))
    }
}

impl WindowSegmenter for TokenizerSegmenter {
    fn segment(&self, examples: &[Example]) -> Result<Vec<TokenWindow>> {
        let mut windows = Vec::with_capacity(examples.len());

        for (index, example) in examples.iter().enumerate() {
            let budget = self.context_budget(example)?;
            if budget <= self.cfg.stride {
                return Err(ReaderError::Tokenizer(format!(
                    "example '{}': question leaves {} context tokens per window, \
                     need more than stride ({})",
                    example.id, budget, self.cfg.stride
                )));
            }

            let encoding = self
                .tokenizer
                .encode_char_offsets((example.question.as_str(), example.context.as_str()), true)
                .map_err(|e| ReaderError::Tokenizer(format!("example '{}': {e}", example.id)))?;

            // The first window is the encoding itself, later ones hang off it.
            for enc in std::iter::once(&encoding).chain(encoding.get_overflowing()) {
                windows.push(window_from_encoding(enc, index, &example.id));
            }
        }

        tracing::debug!("Segmented {} examples into {} windows", examples.len(), windows.len());
        Ok(windows)
    }
}

fn window_from_encoding(enc: &Encoding, example_index: usize, example_id: &str) -> TokenWindow {
    window_from_parts(
        enc.get_ids(),
        enc.get_attention_mask(),
        enc.get_type_ids(),
        &enc.get_sequence_ids(),
        enc.get_offsets(),
        example_index,
        example_id,
    )
}

/// Build a window from raw encoding columns. Sequence id 0 is the
/// question, 1 the context, `None` a special or padding token.
pub fn window_from_parts(
    ids:           &[u32],
    mask:          &[u32],
    type_ids:      &[u32],
    sequence_ids:  &[Option<usize>],
    offsets:       &[(usize, usize)],
    example_index: usize,
    example_id:    &str,
) -> TokenWindow {
    let segments: Vec<Segment> = sequence_ids
        .iter()
        .map(|s| match s {
            Some(0) => Segment::Question,
            Some(_) => Segment::Context,
            None    => Segment::Special,
        })
        .collect();

    let offsets = offsets
        .iter()
        .zip(&segments)
        .map(|(&(s, e), seg)| (*seg == Segment::Context).then_some(CharSpan::new(s, e)))
        .collect();

    TokenWindow {
        input_ids:      ids.to_vec(),
        attention_mask: mask.to_vec(),
        type_ids:       type_ids.to_vec(),
        segments,
        offsets,
        example_index,
        example_id:     example_id.to_string(),
    }
}

// ─── WindowArena ──────────────────────────────────────────────────────────────
/// Flat, ordered window storage plus an example id → window indices map,
/// built in one pass. Decoding reads every window of an example through it.
#[derive(Debug, Default)]
pub struct WindowArena {
    windows:    Vec<TokenWindow>,
    by_example: HashMap<String, Vec<usize>>,
}

impl WindowArena {
    pub fn new(windows: Vec<TokenWindow>) -> Self {
        let mut by_example: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, w) in windows.iter().enumerate() {
            by_example.entry(w.example_id.clone()).or_default().push(i);
        }
        Self { windows, by_example }
    }

    pub fn windows(&self) -> &[TokenWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Window indices for `example_id`, ascending. Empty if it has none.
    pub fn indices_for(&self, example_id: &str) -> &[usize] {
        self.by_example.get(example_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::alignment::{label_windows, MissingAnswerPolicy};
    use crate::domain::example::GoldAnswers;
    use crate::domain::window::LabelPair;

    #[test]
    fn test_window_from_parts_nulls_non_context() {
        let w = window_from_parts(
            &[101, 5, 102, 7, 8, 102, 0],
            &[1, 1, 1, 1, 1, 1, 0],
            &[0, 0, 0, 1, 1, 1, 0],
            &[None, Some(0), None, Some(1), Some(1), None, None],
            &[(0, 0), (0, 2), (0, 0), (0, 1), (1, 3), (0, 0), (0, 0)],
            4,
            "ex-4",
        );

        assert_eq!(
            w.segments,
            vec![
                Segment::Special, Segment::Question, Segment::Special,
                Segment::Context, Segment::Context, Segment::Special, Segment::Special,
            ]
        );
        assert_eq!(w.offsets[1], None, "question offsets must be dropped");
        assert_eq!(w.offsets[3], Some(CharSpan::new(0, 1)));
        assert_eq!(w.offsets[4], Some(CharSpan::new(1, 3)));
        assert_eq!(w.context_range(), Some((3, 4)));
        assert_eq!(w.example_index, 4);
        assert_eq!(w.example_id, "ex-4");
    }

    fn tagged(id: &str) -> TokenWindow {
        window_from_parts(&[1], &[1], &[0], &[Some(1)], &[(0, 1)], 0, id)
    }

    #[test]
    fn test_arena_groups_windows_by_example() {
        let arena = WindowArena::new(vec![tagged("a"), tagged("a"), tagged("b"), tagged("a")]);
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.indices_for("a"), &[0, 1, 3]);
        assert_eq!(arena.indices_for("b"), &[2]);
        assert!(arena.indices_for("missing").is_empty());
    }

    // BERT-style tokenizer with one token per Chinese character.
    fn char_tokenizer() -> Tokenizer {
        let json = r#"{
          "version": "1.0",
          "truncation": null,
          "padding": null,
          "added_tokens": [],
          "normalizer": {
            "type": "BertNormalizer", "clean_text": true,
            "handle_chinese_chars": true, "strip_accents": null, "lowercase": true
          },
          "pre_tokenizer": { "type": "BertPreTokenizer" },
          "post_processor": {
            "type": "TemplateProcessing",
            "single": [
              { "SpecialToken": { "id": "[CLS]", "type_id": 0 } },
              { "Sequence": { "id": "A", "type_id": 0 } },
              { "SpecialToken": { "id": "[SEP]", "type_id": 0 } }
            ],
            "pair": [
              { "SpecialToken": { "id": "[CLS]", "type_id": 0 } },
              { "Sequence": { "id": "A", "type_id": 0 } },
              { "SpecialToken": { "id": "[SEP]", "type_id": 0 } },
              { "Sequence": { "id": "B", "type_id": 1 } },
              { "SpecialToken": { "id": "[SEP]", "type_id": 1 } }
            ],
            "special_tokens": {
              "[CLS]": { "id": "[CLS]", "ids": [2], "tokens": ["[CLS]"] },
              "[SEP]": { "id": "[SEP]", "ids": [3], "tokens": ["[SEP]"] }
            }
          },
          "decoder": null,
          "model": {
            "type": "WordLevel",
            "vocab": {
              "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3,
              "长": 4, "城": 5, "在": 6, "哪": 7, "中": 8, "国": 9, "北": 10, "方": 11
            },
            "unk_token": "[UNK]"
          }
        }"#;
        json.parse().unwrap()
    }

    fn great_wall() -> Example {
        Example::new(
            "cmrc-1",
            "长城位于中国北方，是古代的防御工程",
            "长城在哪",
            GoldAnswers::new(vec!["中国北方".into()], vec![4]),
        )
    }

    #[test]
    fn test_segment_strides_through_long_context() {
        let segmenter =
            TokenizerSegmenter::new(char_tokenizer(), WindowConfig { max_length: 13, stride: 3 })
                .unwrap();
        let windows = segmenter.segment(&[great_wall()]).unwrap();

        // 6 context tokens per window, advancing 3 characters each time
        assert_eq!(windows.len(), 5);
        for (k, w) in windows.iter().enumerate() {
            assert_eq!(w.len(), 13);
            assert_eq!(w.example_id, "cmrc-1");
            assert_eq!(&w.segments[..6], &[
                Segment::Special, Segment::Question, Segment::Question,
                Segment::Question, Segment::Question, Segment::Special,
            ]);
            let (first, _) = w.context_range().unwrap();
            assert_eq!(w.offsets[first].unwrap().start, 3 * k);
        }
        assert_eq!(windows[0].input_ids[..6], [2, 4, 5, 6, 7, 3]);
        assert_eq!(windows[0].offsets[11], Some(CharSpan::new(5, 6)));

        // last window: chars 12..17, one [SEP], one [PAD]
        let last = &windows[4];
        assert_eq!(last.context_range(), Some((6, 10)));
        assert_eq!(last.offsets[10], Some(CharSpan::new(16, 17)));
        assert_eq!(last.input_ids[12], 0);
        assert_eq!(last.attention_mask[12], 0);
    }

    #[test]
    fn test_only_covering_window_gets_answer_label() {
        let segmenter =
            TokenizerSegmenter::new(char_tokenizer(), WindowConfig { max_length: 13, stride: 3 })
                .unwrap();
        let examples = vec![great_wall()];
        let windows  = segmenter.segment(&examples).unwrap();
        let labels   = label_windows(&windows, &examples, MissingAnswerPolicy::Fail).unwrap();

        let labelled: Vec<LabelPair> = labels.iter().map(|&(_, l)| l).collect();
        assert_eq!(labelled, vec![
            LabelPair::NO_ANSWER,
            LabelPair::new(7, 10),
            LabelPair::NO_ANSWER,
            LabelPair::NO_ANSWER,
            LabelPair::NO_ANSWER,
        ]);
        // window 1 covers chars 3..9; tokens 7..=10 are 中国北方
        assert_eq!(windows[1].input_ids[7..=10], [8, 9, 10, 11]);
    }

    #[test]
    fn test_stride_must_be_below_max_length() {
        let err = TokenizerSegmenter::new(char_tokenizer(), WindowConfig { max_length: 8, stride: 8 });
        assert!(matches!(err, Err(ReaderError::Tokenizer(_))));
    }

    #[test]
    fn test_question_too_long_for_stride_is_rejected() {
        // 3 special + 4 question tokens leave 3 context tokens, not more than stride 3
        let segmenter =
            TokenizerSegmenter::new(char_tokenizer(), WindowConfig { max_length: 10, stride: 3 })
                .unwrap();
        let err = segmenter.segment(&[great_wall()]).unwrap_err();
        assert!(err.to_string().contains("cmrc-1"), "{err}");
    }
}
