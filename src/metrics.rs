use metrics::counter;
use std::sync::atomic::{AtomicU64, Ordering};

/// Files handed to the upload pipeline
pub const UPLOAD_FILES_TOTAL: &str = "shaadi_upload_files_total";
/// Upload batches run
pub const UPLOAD_BATCHES_TOTAL: &str = "shaadi_upload_batches_total";
/// Gallery loads, labelled by outcome
pub const GALLERY_LOADS_TOTAL: &str = "shaadi_gallery_loads_total";
/// Photo records whose URL could not be signed
pub const SIGNED_URL_FAILURES_TOTAL: &str = "shaadi_signed_url_failures_total";
/// Email verification checks, labelled by outcome
pub const VERIFICATION_CHECKS_TOTAL: &str = "shaadi_verification_checks_total";
/// Errors, labelled by kind and operation
pub const ERRORS_TOTAL: &str = "shaadi_errors_total";

/// Metrics collection and management.
///
/// Every event is forwarded to the `metrics` facade and also tallied locally, so a command
/// can report what it did without a recorder installed.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    uploads_succeeded: AtomicU64,
    uploads_failed: AtomicU64,
    upload_batches: AtomicU64,
    gallery_loads: AtomicU64,
    signed_url_failures: AtomicU64,
    verification_checks: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of the local tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Files stored with metadata
    pub uploads_succeeded: u64,
    /// Files that failed at either step
    pub uploads_failed: u64,
    /// Upload batches run
    pub upload_batches: u64,
    /// Gallery loads
    pub gallery_loads: u64,
    /// Records dropped because signing failed
    pub signed_url_failures: u64,
    /// Verification checks performed
    pub verification_checks: u64,
    /// Errors recorded
    pub errors: u64,
}

impl MetricsCollector {
    /// Record one finished upload batch
    pub fn record_upload_batch(&self, succeeded: usize, failed: usize) {
        let succeeded = succeeded as u64;
        let failed = failed as u64;
        self.upload_batches.fetch_add(1, Ordering::Relaxed);
        self.uploads_succeeded.fetch_add(succeeded, Ordering::Relaxed);
        self.uploads_failed.fetch_add(failed, Ordering::Relaxed);

        counter!(UPLOAD_BATCHES_TOTAL).increment(1);
        counter!(UPLOAD_FILES_TOTAL, "outcome" => "success").increment(succeeded);
        counter!(UPLOAD_FILES_TOTAL, "outcome" => "failure").increment(failed);
    }

    /// Record a gallery load and how many records could not be signed
    pub fn record_gallery_load(&self, outcome: &'static str, signing_failures: usize) {
        let signing_failures = signing_failures as u64;
        self.gallery_loads.fetch_add(1, Ordering::Relaxed);
        self.signed_url_failures.fetch_add(signing_failures, Ordering::Relaxed);

        counter!(GALLERY_LOADS_TOTAL, "outcome" => outcome).increment(1);
        counter!(SIGNED_URL_FAILURES_TOTAL).increment(signing_failures);
    }

    /// Record one verification check
    pub fn record_verification_check(&self, outcome: &'static str) {
        self.verification_checks.fetch_add(1, Ordering::Relaxed);
        counter!(VERIFICATION_CHECKS_TOTAL, "outcome" => outcome).increment(1);
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &'static str, operation: &'static str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        counter!(ERRORS_TOTAL, "type" => error_type, "operation" => operation).increment(1);
    }

    /// Copy the local tallies
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_succeeded: self.uploads_succeeded.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            upload_batches: self.upload_batches.load(Ordering::Relaxed),
            gallery_loads: self.gallery_loads.load(Ordering::Relaxed),
            signed_url_failures: self.signed_url_failures.load(Ordering::Relaxed),
            verification_checks: self.verification_checks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_upload_batch_tallies() {
        let collector = MetricsCollector::default();
        collector.record_upload_batch(3, 1);
        collector.record_upload_batch(0, 2);
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.upload_batches, 2);
        assert_eq!(snapshot.uploads_succeeded, 3);
        assert_eq!(snapshot.uploads_failed, 3);
    }
}
