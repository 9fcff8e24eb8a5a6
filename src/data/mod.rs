// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the dataset file and tensors, in both
// directions:
//
//   dataset file
//       │
//       ▼
//   CmrcLoader          → Example list
//       │
//       ▼
//   TokenizerSegmenter  → TokenWindow list (+ WindowArena grouping)
//       │
//       ├──▶ alignment  → LabelPair per window      (training)
//       │        │
//       │        ▼
//       │    TrainingSet ─▶ DataLoader(WindowBatcher) → LabelledBatch
//       │
//       └──▶ DataLoader(WindowBatcher) → SpanBatch → model → logits
//                                            │
//                                            ▼
//                                  decoding → Prediction per example
//
// corpus_merge is unrelated to the QA pipeline: it prepares the
// title/content corpus used for summarisation.

/// Loads CMRC / SQuAD style JSON and flat JSON-lines records
pub mod loader;

/// Strided tokenizer windows and the example → windows arena
pub mod windowing;

/// Character answer span → token label pair
pub mod alignment;

/// Start/end logits → best answer text per example
pub mod decoding;

/// Burn datasets over labelled training windows
pub mod dataset;

/// Stacks windows into burn tensor batches
pub mod batcher;

/// Zips title and content files into a delimited corpus
pub mod corpus_merge;
