//! Check orchestration
//!
//! Glues the capture pipeline to the diff engine and serializes operations
//! per page, so a baseline read can never interleave with a baseline
//! replacement for the same page. Persistence stays with the caller: this
//! module only produces the bytes to store.

use crate::capture::capture_page;
use crate::diff::{self, DiffConfig, Status};
use crate::target;
use crate::{CaptureConfig, Result};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Identifier of a monitored page. Allocation is the caller's concern; the
/// checker only uses it to serialize operations against the same page.
pub type PageId = i64;

/// Everything a caller needs to persist after one check.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// Percentage of the page that changed, in [0, 100]
    pub diff_percent: f64,
    pub status: Status,
    /// The capture itself, persisted as this run's snapshot
    pub capture_png: Vec<u8>,
    /// Highlight overlay, present only when pixels differ
    pub overlay_png: Option<Vec<u8>>,
    /// Set on the first run of a page: the capture doubles as the baseline
    pub new_baseline_png: Option<Vec<u8>>,
}

/// Result of an explicit baseline approval.
#[derive(Debug, Clone)]
pub struct Approval {
    /// The new baseline bytes the caller should store
    pub baseline_png: Vec<u8>,
    pub diff_percent: f64,
    pub status: Status,
}

/// Runs checks and approvals with per-page serialization.
pub struct Checker {
    capture_config: CaptureConfig,
    diff_config: DiffConfig,
    page_locks: Mutex<HashMap<PageId, Arc<Mutex<()>>>>,
}

impl Checker {
    pub fn new(capture_config: CaptureConfig, diff_config: DiffConfig) -> Self {
        Self {
            capture_config,
            diff_config,
            page_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn page_lock(&self, page_id: PageId) -> Arc<Mutex<()>> {
        let mut locks = self.page_locks.lock().await;
        locks
            .entry(page_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run one check: capture `raw_url` and compare against `baseline_png`.
    ///
    /// A capture failure propagates as a typed error and returns no partial
    /// image; the caller leaves the page's stored state untouched in that
    /// case. A comparison failure does not propagate: undecodable bytes are
    /// reported as a full change so they surface instead of passing as
    /// clean.
    pub async fn check(
        &self,
        page_id: PageId,
        raw_url: &str,
        baseline_png: Option<&[u8]>,
    ) -> Result<CheckOutcome> {
        let lock = self.page_lock(page_id).await;
        let _guard = lock.lock().await;

        let url = target::normalize(raw_url);
        let capture_png = capture_page(&self.capture_config, &url).await?;

        let baseline = match baseline_png {
            Some(bytes) => bytes,
            None => {
                info!("page {}: no baseline, adopting this capture", page_id);
                return Ok(CheckOutcome {
                    diff_percent: 0.0,
                    status: Status::Clean,
                    new_baseline_png: Some(capture_png.clone()),
                    overlay_png: None,
                    capture_png,
                });
            }
        };

        let report = diff::compare_or_failsafe(baseline, &capture_png, &self.diff_config);
        info!(
            "page {}: {:.4}% different across {} pixels ({:?})",
            page_id,
            report.diff_percent,
            (report.compared_width as u64) * (report.compared_height as u64),
            report.status
        );

        let overlay_png = match report.overlay {
            Some(ref img) => Some(diff::encode_png(img)?),
            None => None,
        };

        Ok(CheckOutcome {
            diff_percent: report.diff_percent,
            status: report.status,
            capture_png,
            overlay_png,
            new_baseline_png: None,
        })
    }

    /// Promote `capture_png` to the page's baseline and reset its state.
    ///
    /// A manual override, not a recomputation: whatever the last comparison
    /// found, the stored baseline is replaced wholesale and the page reads
    /// clean until the next check says otherwise.
    pub async fn approve(&self, page_id: PageId, capture_png: &[u8]) -> Result<Approval> {
        let lock = self.page_lock(page_id).await;
        let _guard = lock.lock().await;

        info!("page {}: baseline replaced by approval", page_id);
        Ok(Approval {
            baseline_png: capture_png.to_vec(),
            diff_percent: 0.0,
            status: Status::Clean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn approval_always_resets() {
        let checker = Checker::new(CaptureConfig::default(), DiffConfig::default());

        // Approval is blind: the bytes are not even decoded.
        let approval = checker.approve(7, b"opaque capture bytes").await.unwrap();
        assert_eq!(approval.diff_percent, 0.0);
        assert_eq!(approval.status, Status::Clean);
        assert_eq!(approval.baseline_png, b"opaque capture bytes");
    }

    #[tokio::test]
    async fn page_locks_are_per_page() {
        let checker = Checker::new(CaptureConfig::default(), DiffConfig::default());

        let lock_a = checker.page_lock(1).await;
        let lock_b = checker.page_lock(2).await;
        let lock_a2 = checker.page_lock(1).await;

        assert!(Arc::ptr_eq(&lock_a, &lock_a2));
        assert!(!Arc::ptr_eq(&lock_a, &lock_b));

        // Holding page 1 must not stop page 2.
        let _guard = lock_a.lock().await;
        assert!(lock_b.try_lock().is_ok());
        assert!(lock_a2.try_lock().is_err());
    }
}
