// ============================================================
// Layer 3 — Training History
// ============================================================
// Per-epoch record of a fit() run, the Rust counterpart of the
// `history.history` dict a Keras fit returns:
//
//   loss, <metric>, val_loss, val_<metric>
//
// The metric is accuracy for the classifier and mean absolute
// error for the regressor; `metric_name` says which one so the
// CSV header and plot legends can be labelled correctly.

use serde::{Deserialize, Serialize};

/// Losses and metric values for one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch:      usize,
    pub loss:       f64,
    pub metric:     f64,
    pub val_loss:   f64,
    pub val_metric: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub metric_name: String,
    pub epochs:      Vec<EpochRecord>,
}

impl TrainingHistory {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self { metric_name: metric_name.into(), epochs: Vec::new() }
    }

    pub fn push(&mut self, record: EpochRecord) {
        self.epochs.push(record);
    }

    pub fn loss(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.loss).collect()
    }

    pub fn val_loss(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.val_loss).collect()
    }

    pub fn metric(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.metric).collect()
    }

    pub fn val_metric(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.val_metric).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_follow_epoch_order() {
        let mut h = TrainingHistory::new("accuracy");
        h.push(EpochRecord { epoch: 1, loss: 2.0, metric: 0.3, val_loss: 2.1, val_metric: 0.25 });
        h.push(EpochRecord { epoch: 2, loss: 1.0, metric: 0.6, val_loss: 1.2, val_metric: 0.55 });

        assert_eq!(h.epochs.len(), 2);
        assert_eq!(h.loss(), vec![2.0, 1.0]);
        assert_eq!(h.val_metric(), vec![0.25, 0.55]);
        assert_eq!(h.epochs.last().map(|e| e.epoch), Some(2));
    }
}
