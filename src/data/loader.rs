// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads reading-comprehension records from disk.
//
// Two layouts are accepted:
//
//   *.json  — CMRC2018 / SQuAD nesting
//             { "data": [ { "title", "paragraphs": [ { "context",
//               "qas": [ { "id", "question",
//                          "answers": [ { "text", "answer_start" } ] } ] } ] } ] }
//
//   *.jsonl — one flat record per line
//             { "id", "title", "context", "question",
//               "answers": { "text": [...], "answer_start": [...] } }
//
// Both produce the same flat `Example` list, in file order.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::domain::error::{ReaderError, Result};
use crate::domain::example::{Example, GoldAnswers};
use crate::domain::traits::ExampleSource;

#[derive(Deserialize)]
struct SquadFile {
    data: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    #[serde(default)]
    title:      String,
    paragraphs: Vec<Paragraph>,
}

#[derive(Deserialize)]
struct Paragraph {
    context: String,
    qas:     Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion {
    id:       String,
    question: String,
    #[serde(default)]
    answers:  Vec<RawAnswer>,
}

#[derive(Deserialize)]
struct RawAnswer {
    text:         String,
    answer_start: usize,
}

/// Loads examples from a CMRC-style `.json` file or a flat `.jsonl` file.
pub struct CmrcLoader {
    path: PathBuf,
}

impl CmrcLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_json_lines(&self) -> bool {
        self.path.extension().and_then(|e| e.to_str()) == Some("jsonl")
    }
}

impl ExampleSource for CmrcLoader {
    fn load_all(&self) -> Result<Vec<Example>> {
        let raw = fs::read_to_string(&self.path).map_err(|e| ReaderError::io(&self.path, e))?;

        let examples = if self.is_json_lines() {
            parse_json_lines(&raw, &self.path)?
        } else {
            parse_nested(&raw, &self.path)?
        };

        validate(&examples)?;

        tracing::info!("Loaded {} examples from '{}'", examples.len(), self.path.display());
        Ok(examples)
    }
}

fn parse_nested(raw: &str, path: &Path) -> Result<Vec<Example>> {
    let file: SquadFile = serde_json::from_str(raw)
        .map_err(|e| ReaderError::input_format(path.display().to_string(), e))?;

    let mut examples = Vec::new();
    for article in file.data {
        for paragraph in article.paragraphs {
            for qa in paragraph.qas {
                let (text, answer_start) = qa
                    .answers
                    .into_iter()
                    .map(|a| (a.text, a.answer_start))
                    .unzip();
                examples.push(Example {
                    id:       qa.id,
                    title:    article.title.clone(),
                    context:  paragraph.context.clone(),
                    question: qa.question,
                    answers:  GoldAnswers::new(text, answer_start),
                });
            }
        }
    }
    Ok(examples)
}

fn parse_json_lines(raw: &str, path: &Path) -> Result<Vec<Example>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Example>(line).map_err(|e| {
                ReaderError::input_format(format!("{}:{}", path.display(), n + 1), e)
            })
        })
        .collect()
}

/// Balanced answer lists, and ids unique across the file: windows and
/// predictions are grouped by id.
fn validate(examples: &[Example]) -> Result<()> {
    let mut seen = HashSet::with_capacity(examples.len());
    for example in examples {
        let answers = &example.answers;
        if answers.text.len() != answers.answer_start.len() {
            return Err(ReaderError::input_format(
                &example.id,
                format!(
                    "{} answer texts but {} answer starts",
                    answers.text.len(),
                    answers.answer_start.len()
                ),
            ));
        }
        if !seen.insert(example.id.as_str()) {
            return Err(ReaderError::input_format(&example.id, "duplicate example id"));
        }
    }
    Ok(())
}
