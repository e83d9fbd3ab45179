use crate::integrator::{Observer, Report};
use growth_common::Snapshot;
use log::{debug, info};
use ndarray::ArrayD;
use std::time::Instant;

/// Copies both fields (row-major) into a [`Snapshot`].
pub fn snapshot_from_fields(updates: usize, time: f64, phi: &ArrayD<f64>, nutrient: &ArrayD<f64>) -> Snapshot {
    Snapshot::new(
        updates,
        time,
        phi.shape().to_vec(),
        phi.iter().copied().collect(),
        nutrient.iter().copied().collect(),
    )
}

/// Observer that keeps a snapshot of every report and logs progress.
#[derive(Debug)]
pub struct SnapshotRecorder {
    snapshots: Vec<Snapshot>,
    total_steps: usize,
    start_time: Instant,
}

impl SnapshotRecorder {
    pub fn new(total_steps: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            total_steps,
            start_time: Instant::now(),
        }
    }

    /// Records the fields after `updates` updates (0 for the initial state).
    pub fn record(&mut self, updates: usize, time: f64, phi: &ArrayD<f64>, nutrient: &ArrayD<f64>) {
        debug!("Recording snapshot after {} updates (t = {:.4})...", updates, time);
        self.snapshots.push(snapshot_from_fields(updates, time, phi, nutrient));
    }

    /// Update count of the most recent snapshot.
    pub fn last_recorded(&self) -> Option<usize> {
        self.snapshots.last().map(|s| s.step)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

impl Observer for SnapshotRecorder {
    fn observe(&mut self, report: &Report<'_>) -> anyhow::Result<()> {
        self.record(report.step + 1, report.time, report.phi, report.nutrient);
        if let Some(latest) = self.snapshots.last() {
            info!(
                "Step [{}/{}] (t = {:.4}) | Tumor cells: {} | phi mean: {:.4} | nutrient mean: {:.4} | Elapsed: {:.2} s",
                report.step,
                self.total_steps,
                report.time,
                latest.stats.tumor_cells,
                latest.stats.phi_mean,
                latest.stats.nutrient_mean,
                self.start_time.elapsed().as_secs_f64()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn records_reports_with_update_counts() {
        let phi = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 0.0, 0.6, 0.2]).unwrap();
        let nutrient = ArrayD::from_elem(IxDyn(&[2, 2]), 0.5);
        let mut recorder = SnapshotRecorder::new(10);
        recorder.record(0, 0.0, &phi, &nutrient);
        recorder
            .observe(&Report { step: 4, time: 0.05, phi: &phi, nutrient: &nutrient })
            .unwrap();

        assert_eq!(recorder.last_recorded(), Some(5));
        let snapshots = recorder.into_snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].shape, vec![2, 2]);
        assert_eq!(snapshots[1].phi, vec![1.0, 0.0, 0.6, 0.2]);
        assert_eq!(snapshots[1].stats.tumor_cells, 2);
    }

    #[test]
    fn flattening_follows_logical_order() {
        let mut phi = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        phi.swap_axes(0, 1);
        let snapshot = snapshot_from_fields(1, 0.1, &phi, &phi);
        assert_eq!(snapshot.shape, vec![3, 2]);
        assert_eq!(snapshot.phi, vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }
}
