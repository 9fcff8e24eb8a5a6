// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a HuggingFace `tokenizer.json` and keeps a copy next to
// the checkpoints, so evaluation always tokenises with exactly
// the vocabulary the weights were trained against.
//
// A WordPiece tokenizer with a BERT normaliser
// (handle_chinese_chars = true) gives the per-character Chinese
// tokens the alignment and decoding stages expect.

use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::domain::error::{ReaderError, Result};

const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// Path of the stored copy
    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load a tokenizer from an arbitrary `tokenizer.json`.
    pub fn load_from(path: &Path) -> Result<Tokenizer> {
        Tokenizer::from_file(path).map_err(|e| {
            ReaderError::Tokenizer(format!("cannot load '{}': {e}", path.display()))
        })
    }

    /// Load the copy stored in this directory.
    pub fn load(&self) -> Result<Tokenizer> {
        Self::load_from(&self.path())
    }

    /// Write `tokenizer` into this directory.
    pub fn save_copy(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ReaderError::io(&self.dir, e))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| ReaderError::Tokenizer(format!("cannot save '{}': {e}", path.display())))?;
        tracing::info!("Tokenizer copied to '{}'", path.display());
        Ok(())
    }

    /// Embedding rows needed for every id the tokenizer can emit
    pub fn vocab_size(tokenizer: &Tokenizer) -> usize {
        tokenizer.get_vocab_size(true)
    }
}
