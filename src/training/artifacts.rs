use std::{
    fs::{self, File},
    path::PathBuf,
};

use burn::{
    config::Config,
    module::Module,
    record::{CompactRecorder, Record, Recorder},
    tensor::backend::Backend,
};

use super::EpochSummary;

/// The model weights, without the recorder's extension
pub const MODEL_FILE: &str = "model";

/// The model architecture and label map
pub const CONFIG_FILE: &str = "config.json";

/// The training settings
pub const TRAINING_FILE: &str = "training.json";

/// The per-epoch history
pub const HISTORY_FILE: &str = "history.json";

/// A directory holding everything needed to reuse a trained model
#[derive(Debug, Clone)]
pub struct Artifacts {
    dir: PathBuf,
}

impl Artifacts {
    /// Refer to an existing artifact directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the artifact directory if needed
    pub fn create(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let artifacts = Self::new(dir);

        fs::create_dir_all(&artifacts.dir).map_err(|e| {
            anyhow!(
                "Unable to create artifact directory {}: {}",
                artifacts.dir.display(),
                e
            )
        })?;

        Ok(artifacts)
    }

    /// A file inside the artifact directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Save a configuration as JSON
    pub fn save_config<C: Config>(&self, name: &str, config: &C) -> anyhow::Result<()> {
        let path = self.path(name);

        config
            .save(&path)
            .map_err(|e| anyhow!("Unable to save {}: {}", path.display(), e))
    }

    /// Load a configuration saved with [Artifacts::save_config]
    pub fn load_config<C: Config>(&self, name: &str) -> anyhow::Result<C> {
        let path = self.path(name);

        C::load(&path).map_err(|e| anyhow!("Unable to load {}: {}", path.display(), e))
    }

    /// Save the training history as JSON
    pub fn save_history(&self, history: &[EpochSummary]) -> anyhow::Result<()> {
        let file = File::create(self.path(HISTORY_FILE))?;
        serde_json::to_writer_pretty(file, history)?;

        Ok(())
    }

    /// Record the model weights
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: M) -> anyhow::Result<()> {
        CompactRecorder::new()
            .record(model.into_record(), self.path(MODEL_FILE))
            .map_err(|e| anyhow!("Unable to save the trained model: {}", e))?;

        log::info!("Saved the trained model to {}", self.dir.display());

        Ok(())
    }

    /// Load model weights saved with [Artifacts::save_model]
    pub fn load_model<B: Backend, R: Record<B>>(&self, device: &B::Device) -> anyhow::Result<R> {
        CompactRecorder::new()
            .load(self.path(MODEL_FILE), device)
            .map_err(|e| {
                anyhow!(
                    "Unable to load the trained model from {}: {}",
                    self.dir.display(),
                    e
                )
            })
    }
}
