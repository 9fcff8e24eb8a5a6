// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// One question-answer unit. The gold answer set may contain
// several annotations; training only ever labels with the
// first one, evaluation scores against all of them.
//
// All offsets in this crate are CHARACTER offsets, never byte
// offsets. Chinese passages make the difference matter.

use serde::{Deserialize, Serialize};

use crate::domain::window::CharSpan;

/// Gold answers in the column layout used by the dataset files:
/// `text[i]` starts at character `answer_start[i]` of the context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoldAnswers {
    pub text:         Vec<String>,
    pub answer_start: Vec<usize>,
}

impl GoldAnswers {
    pub fn new(text: Vec<String>, answer_start: Vec<usize>) -> Self {
        Self { text, answer_start }
    }
}

/// A loaded record. Immutable once the loader hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id:       String,
    #[serde(default)]
    pub title:    String,
    pub context:  String,
    pub question: String,
    #[serde(default)]
    pub answers:  GoldAnswers,
}

impl Example {
    pub fn new(
        id:       impl Into<String>,
        context:  impl Into<String>,
        question: impl Into<String>,
        answers:  GoldAnswers,
    ) -> Self {
        Self {
            id:       id.into(),
            title:    String::new(),
            context:  context.into(),
            question: question.into(),
            answers,
        }
    }

    /// Character span `[s, s + len(text))` of the first gold answer,
    /// or `None` when the example carries no annotation.
    pub fn first_answer_span(&self) -> Option<CharSpan> {
        let text  = self.answers.text.first()?;
        let start = *self.answers.answer_start.first()?;
        Some(CharSpan::new(start, start + text.chars().count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(text: &str, start: usize) -> Example {
        Example::new(
            "ex-1",
            "北京是中国的首都。",
            "中国的首都是哪里？",
            GoldAnswers::new(vec![text.to_string()], vec![start]),
        )
    }

    #[test]
    fn test_first_answer_span_counts_chars() {
        // "北京" is 2 characters but 6 bytes
        let ex = example("北京", 0);
        assert_eq!(ex.first_answer_span(), Some(CharSpan::new(0, 2)));
    }

    #[test]
    fn test_no_answers_gives_none() {
        let ex = Example::new("ex-2", "ctx", "q", GoldAnswers::default());
        assert!(ex.first_answer_span().is_none());
        assert!(ex.answers.text.is_empty());
    }

    #[test]
    fn test_flat_record_deserialises_without_title() {
        let json = r#"{"id":"a","context":"c","question":"q",
                       "answers":{"text":["c"],"answer_start":[0]}}"#;
        let ex: Example = serde_json::from_str(json).unwrap();
        assert_eq!(ex.title, "");
        assert_eq!(ex.answers.answer_start, vec![0]);
    }
}
