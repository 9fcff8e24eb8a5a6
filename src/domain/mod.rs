// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the reading
// comprehension problem. Nothing here touches burn, the tokenizer
// or the filesystem, so every type can be built by hand in tests.
//
//   Example ──(tokenizer)──▶ TokenWindow* ──(model)──▶ WindowLogits
//                                 │                         │
//                          LabelPair (train)       Prediction (inference)

/// One question/context/gold-answers record
pub mod example;

/// Token windows, offsets, segments and label pairs
pub mod window;

/// Candidate answers and final predictions
pub mod prediction;

/// Collaborator contracts implemented by the data and ml layers
pub mod traits;

/// Typed errors shared by the data and infra layers
pub mod error;
