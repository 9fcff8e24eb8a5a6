use burn::data::dataset::Dataset;

use crate::data::windowing::WindowArena;
use crate::domain::{
    example::Example,
    window::{LabelPair, TokenWindow},
};

/// One training window together with its target span.
#[derive(Debug, Clone)]
pub struct LabelledWindow {
    pub window: TokenWindow,
    pub label:  LabelPair,
}

/// Training windows plus one label per kept window. Windows dropped by
/// the missing-answer policy stay in the arena but have no label entry.
pub struct TrainingSet {
    arena:  WindowArena,
    /// `(window index in arena, label)`
    labels: Vec<(usize, LabelPair)>,
}

impl TrainingSet {
    pub fn new(arena: WindowArena, labels: Vec<(usize, LabelPair)>) -> Self {
        Self { arena, labels }
    }
}

impl Dataset<LabelledWindow> for TrainingSet {
    fn get(&self, index: usize) -> Option<LabelledWindow> {
        let &(window, label) = self.labels.get(index)?;
        let window = self.arena.windows().get(window)?.clone();
        Some(LabelledWindow { window, label })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Gold examples and their windows, decoded and scored after every epoch.
pub struct ValidationSet {
    pub examples: Vec<Example>,
    pub arena:    WindowArena,
}
