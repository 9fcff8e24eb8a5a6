// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `eval` and `merge`.
//
// Policies are parsed through their FromStr impls, so clap
// types never leak into the lower layers.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{merge_use_case::MergeUseCase, train_use_case::TrainConfig};
use crate::data::{alignment::MissingAnswerPolicy, corpus_merge::MismatchPolicy};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the span encoder on a CMRC / SQuAD style dataset
    Train(TrainArgs),

    /// Score a trained checkpoint on a dataset
    Eval(EvalArgs),

    /// Merge title and content files into a `title!=!content` corpus
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training set (.json nested or .jsonl flat)
    #[arg(long, default_value = "data/cmrc2018_train.json")]
    pub train_file: String,

    /// Validation set scored after every epoch
    #[arg(long, default_value = "data/cmrc2018_dev.json")]
    pub dev_file: String,

    /// HuggingFace tokenizer.json
    #[arg(long, default_value = "data/tokenizer.json")]
    pub tokenizer: String,

    /// Where config, tokenizer copy, weights and metrics go
    #[arg(long, default_value = "checkpoints")]
    pub output_dir: String,

    /// Tokens per window, special tokens included
    #[arg(long, default_value_t = 512)]
    pub max_length: usize,

    /// Tokens shared by consecutive windows of one context
    #[arg(long, default_value_t = 128)]
    pub stride: usize,

    /// Start/end candidates kept per window when decoding
    #[arg(long, default_value_t = 20)]
    pub n_best: usize,

    /// Longest answer, in tokens
    #[arg(long, default_value_t = 30)]
    pub max_answer_length: usize,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Peak learning rate, decayed linearly to zero
    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// AdamW weight decay
    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f32,

    /// Seeds weight init, dropout and the per-epoch shuffle
    #[arg(long, default_value_t = 5)]
    pub seed: u64,

    /// Training example without a gold answer: fail | skip
    #[arg(long, default_value_t = MissingAnswerPolicy::Fail)]
    pub missing_answer: MissingAnswerPolicy,

    /// Log the running loss every N steps
    #[arg(long, default_value_t = 100)]
    pub log_every: usize,

    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_file:        a.train_file,
            dev_file:          a.dev_file,
            tokenizer:         a.tokenizer,
            output_dir:        a.output_dir,
            max_length:        a.max_length,
            stride:            a.stride,
            n_best:            a.n_best,
            max_answer_length: a.max_answer_length,
            batch_size:        a.batch_size,
            epochs:            a.epochs,
            lr:                a.lr,
            weight_decay:      a.weight_decay,
            seed:              a.seed,
            missing_answer:    a.missing_answer,
            log_every:         a.log_every,
            d_model:           a.d_model,
            num_heads:         a.num_heads,
            num_layers:        a.num_layers,
            d_ff:              a.d_ff,
            dropout:           a.dropout,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Dataset to predict and score
    #[arg(long, default_value = "data/cmrc2018_dev.json")]
    pub data_file: PathBuf,

    /// Output directory of a training run
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Weights file to load instead of the best checkpoint
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Write predictions as JSON here
    #[arg(long)]
    pub predictions: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Content lines
    #[arg(long, default_value = "valid.src.txt")]
    pub src: PathBuf,

    /// Title lines
    #[arg(long, default_value = "valid.tgt.txt")]
    pub tgt: PathBuf,

    #[arg(long, default_value = "data.tsv")]
    pub out: PathBuf,

    /// Line counts differ: fail | truncate
    #[arg(long, default_value_t = MismatchPolicy::Fail)]
    pub on_mismatch: MismatchPolicy,
}

impl From<MergeArgs> for MergeUseCase {
    fn from(a: MergeArgs) -> Self {
        MergeUseCase { src: a.src, tgt: a.tgt, out: a.out, policy: a.on_mismatch }
    }
}
