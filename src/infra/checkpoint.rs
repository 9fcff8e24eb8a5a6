// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores encoder weights with Burn's CompactRecorder.
//
// Layout of the output directory:
//
//   {output_dir}/
//     train_config.json                                   ← hyperparameters
//     tokenizer.json                                      ← tokenizer copy
//     epoch_2_valid_avg_61.0132_model_weights.mpk.gz      ← weights
//     best_checkpoint.json                                ← pointer to the best file
//     metrics.csv
//
// Weights are only written when the validation average improves,
// so the newest weights file is always the best one.
//
// CompactRecorder replaces whatever follows the last '.' with its
// own extension. The stem contains a dotted score, so any known
// recorder extension is stripped and a dummy ".bin" suffix is
// appended before handing the path over. A user-supplied `foo.mpk`
// therefore resolves to `foo.mpk.gz`, the only format loaded here.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::{ReaderError, Result};
use crate::ml::model::SpanEncoder;

const CONFIG_FILE: &str = "train_config.json";
const BEST_FILE:   &str = "best_checkpoint.json";
const WEIGHTS_EXT: &str = ".mpk.gz";
const RECORDER_EXTS: [&str; 6] = [".mpk.gz", ".json.gz", ".bin.gz", ".mpk", ".json", ".bin"];

/// Contents of `best_checkpoint.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:     usize,
    pub valid_avg: f64,
    /// File name of the weights, relative to the checkpoint directory
    pub weights:   String,
}

/// `epoch_{n}_valid_avg_{avg:.4}_model_weights`
pub fn weights_stem(epoch: usize, valid_avg: f64) -> String {
    format!("epoch_{epoch}_valid_avg_{valid_avg:.4}_model_weights")
}

/// Path handed to the recorder for a weights file: any recorder
/// extension stripped, dummy suffix added.
fn recorder_path(weights: &Path) -> PathBuf {
    let name = weights.to_string_lossy();
    let stem = RECORDER_EXTS
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(&*name);
    PathBuf::from(format!("{stem}.bin"))
}

/// The file CompactRecorder actually reads for `weights`.
fn resolved_weights(weights: &Path) -> PathBuf {
    recorder_path(weights).with_extension(&WEIGHTS_EXT[1..])
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it does not exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| ReaderError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Write the weights for `epoch` and point `best_checkpoint.json` at them.
    /// Returns the path of the weights file.
    pub fn save_weights<B: Backend>(
        &self,
        model:     &SpanEncoder<B>,
        epoch:     usize,
        valid_avg: f64,
    ) -> Result<PathBuf> {
        let stem = weights_stem(epoch, valid_avg);
        let file = self.dir.join(format!("{stem}{WEIGHTS_EXT}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), recorder_path(&file))
            .map_err(|e| {
                ReaderError::Checkpoint(format!("cannot save '{}': {e}", file.display()))
            })?;

        let best = BestCheckpoint {
            epoch,
            valid_avg,
            weights: format!("{stem}{WEIGHTS_EXT}"),
        };
        self.write_json(BEST_FILE, &best)?;

        tracing::debug!("Saved weights to '{}'", file.display());
        Ok(file)
    }

    /// Load weights into `model`. With no explicit file, the one named in
    /// `best_checkpoint.json` is used.
    pub fn load_weights<B: Backend>(
        &self,
        model:   SpanEncoder<B>,
        weights: Option<&Path>,
        device:  &B::Device,
    ) -> Result<SpanEncoder<B>> {
        let file = match weights {
            Some(path) => path.to_path_buf(),
            None       => self.dir.join(self.best()?.weights),
        };
        let resolved = resolved_weights(&file);
        if !resolved.is_file() {
            return Err(ReaderError::Checkpoint(format!(
                "'{}' resolves to '{}', which does not exist (weights must be {WEIGHTS_EXT})",
                file.display(),
                resolved.display()
            )));
        }
        tracing::info!("Loading weights from '{}'", resolved.display());

        let record = CompactRecorder::new()
            .load(recorder_path(&file), device)
            .map_err(|e| {
                ReaderError::Checkpoint(format!("cannot load '{}': {e}", file.display()))
            })?;

        Ok(model.load_record(record))
    }

    pub fn best(&self) -> Result<BestCheckpoint> {
        self.read_json(BEST_FILE).map_err(|e| match e {
            ReaderError::Io { .. } => ReaderError::Checkpoint(format!(
                "no '{BEST_FILE}' in '{}'; has a training run saved any weights?",
                self.dir.display()
            )),
            other => other,
        })
    }

    /// Must be written before training so evaluation can rebuild the encoder.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(CONFIG_FILE)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| ReaderError::Checkpoint(format!("cannot serialise '{name}': {e}")))?;
        fs::write(&path, json).map_err(|e| ReaderError::io(&path, e))
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path).map_err(|e| ReaderError::io(&path, e))?;
        serde_json::from_str(&json)
            .map_err(|e| ReaderError::Checkpoint(format!("corrupt '{}': {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_weights_stem_format() {
        assert_eq!(weights_stem(3, 61.01315), "epoch_3_valid_avg_61.0132_model_weights");
        assert_eq!(weights_stem(1, 0.0), "epoch_1_valid_avg_0.0000_model_weights");
    }

    #[test]
    fn test_recorder_path_survives_dotted_score() {
        let p = recorder_path(Path::new("out/epoch_1_valid_avg_51.6610_model_weights.mpk.gz"));
        assert_eq!(p, PathBuf::from("out/epoch_1_valid_avg_51.6610_model_weights.bin"));
        // the recorder swaps ".bin" for its own extension
        assert_eq!(
            p.with_extension("mpk.gz"),
            PathBuf::from("out/epoch_1_valid_avg_51.6610_model_weights.mpk.gz"),
        );

        let p = recorder_path(Path::new("out/custom"));
        assert_eq!(p, PathBuf::from("out/custom.bin"));
    }

    #[test]
    fn test_recorder_path_strips_other_extensions() {
        for name in ["w.mpk", "w.mpk.gz", "w.bin", "w.json.gz"] {
            assert_eq!(recorder_path(Path::new(name)), PathBuf::from("w.bin"), "{name}");
            assert_eq!(resolved_weights(Path::new(name)), PathBuf::from("w.mpk.gz"), "{name}");
        }
        assert_eq!(
            resolved_weights(Path::new("epoch_2_valid_avg_7.5000_model_weights.mpk")),
            PathBuf::from("epoch_2_valid_avg_7.5000_model_weights.mpk.gz"),
        );
    }

    #[test]
    fn test_load_weights_reports_resolved_path() {
        use crate::ml::model::SpanEncoderConfig;
        type TestBackend = burn::backend::NdArray;

        let dir    = TempDir::new().unwrap();
        let mgr    = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model  = SpanEncoderConfig::new(8, 4, 4, 1, 1, 8, 0.0).init::<TestBackend>(&device);

        let err = mgr
            .load_weights(model, Some(dir.path().join("foo.mpk").as_path()), &device)
            .unwrap_err();
        assert!(matches!(err, ReaderError::Checkpoint(_)));
        assert!(err.to_string().contains("foo.mpk.gz"), "{err}");
    }

    #[test]
    fn test_weights_roundtrip_through_mpk_name() {
        use crate::ml::model::SpanEncoderConfig;
        type TestBackend = burn::backend::NdArray;

        let dir    = TempDir::new().unwrap();
        let mgr    = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg    = SpanEncoderConfig::new(8, 4, 4, 1, 1, 8, 0.0);

        let saved = mgr.save_weights(&cfg.init::<TestBackend>(&device), 1, 12.5).unwrap();
        assert!(saved.is_file());

        // the same file, named without the ".gz"
        let plain = saved.to_string_lossy().trim_end_matches(".gz").to_string();
        let loaded = mgr.load_weights(cfg.init::<TestBackend>(&device), Some(Path::new(&plain)), &device);
        assert!(loaded.is_ok());
        // and through best_checkpoint.json
        assert!(mgr.load_weights(cfg.init::<TestBackend>(&device), None, &device).is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mgr = CheckpointManager::new(dir.path().join("run")).unwrap();

        let mut cfg = TrainConfig::default();
        cfg.epochs  = 2;
        cfg.stride  = 64;
        mgr.save_config(&cfg).unwrap();

        let back = mgr.load_config().unwrap();
        assert_eq!(back.epochs, 2);
        assert_eq!(back.stride, 64);
        assert_eq!(back.max_length, cfg.max_length);
    }

    #[test]
    fn test_best_pointer_missing_is_checkpoint_error() {
        let dir = TempDir::new().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        assert!(matches!(mgr.best(), Err(ReaderError::Checkpoint(_))));
    }

    #[test]
    fn test_best_pointer_roundtrip() {
        let dir  = TempDir::new().unwrap();
        let mgr  = CheckpointManager::new(dir.path()).unwrap();
        let best = BestCheckpoint {
            epoch:     4,
            valid_avg: 72.5,
            weights:   format!("{}{WEIGHTS_EXT}", weights_stem(4, 72.5)),
        };
        mgr.write_json(BEST_FILE, &best).unwrap();
        assert_eq!(mgr.best().unwrap(), best);
    }
}
