// ============================================================
// Layer 6 — Run Artifacts
// ============================================================
// Owns the output directory of one training run:
//
//   runs/classification/
//     run_config.json    ← hyperparameters the run used
//     metrics.csv        ← one row per epoch
//     loss.svg           ← train/validation loss curves
//     accuracy.svg       ← (classifier) train/validation accuracy
//     mae.svg            ← (regressor)  train/validation MAE
//     predictions.svg    ← (classifier) first 10 test digits
//
// No model weights are written: each run trains from scratch.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::infra::metrics::MetricsLogger;

pub struct RunArtifacts {
    dir: PathBuf,
}

impl RunArtifacts {
    /// Create (if needed) and take ownership of `dir`
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file inside the run directory
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Save the run configuration to `run_config.json`.
    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        let path = self.path("run_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    /// Fresh `metrics.csv` for this run
    pub fn metrics_logger(&self, metric_name: &str) -> Result<MetricsLogger> {
        MetricsLogger::create(&self.dir, metric_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Cfg { epochs: usize, batch_size: usize }

    #[test]
    fn test_config_written_as_json() {
        let dir = std::env::temp_dir().join("ai_demos_artifacts_test");
        let run = RunArtifacts::create(&dir).unwrap();
        run.save_config(&Cfg { epochs: 3, batch_size: 16 }).unwrap();

        let text = fs::read_to_string(run.path("run_config.json")).unwrap();
        let back: Cfg = serde_json::from_str(&text).unwrap();
        assert_eq!(back, Cfg { epochs: 3, batch_size: 16 });
    }
}
