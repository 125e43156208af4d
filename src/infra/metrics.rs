// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Columns follow the Keras history keys for the run's metric:
//   epoch,loss,accuracy,val_loss,val_accuracy      (classifier)
//   epoch,loss,mae,val_loss,val_mae                (regressor)
//
// The file is recreated at the start of every run so a CSV
// always describes exactly one training run.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::training_history::EpochRecord;

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create `<dir>/metrics.csv` with a header row for `metric_name`.
    pub fn create(dir: &Path, metric_name: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,loss,{metric_name},val_loss,val_{metric_name}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.loss,
            m.metric,
            m.val_loss,
            m.val_metric,
        )?;

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let dir    = std::env::temp_dir().join("ai_demos_metrics_test");
        let logger = MetricsLogger::create(&dir, "mae").unwrap();
        logger.log(&EpochRecord { epoch: 1, loss: 10.0, metric: 2.5, val_loss: 12.0, val_metric: 2.75 }).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epoch,loss,mae,val_loss,val_mae");
        assert_eq!(lines[1], "1,10.000000,2.500000,12.000000,2.750000");
    }
}
