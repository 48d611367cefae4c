//! Guest photo upload pipeline.
//!
//! Each selected file is stored and recorded independently: the bytes go to object storage
//! first and the metadata row is inserted only once the bytes are in place. All files run
//! concurrently and the batch is reported as all, some or none succeeded. Nothing is retried.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::gate::AccessGate;
use crate::metrics::MetricsCollector;
use crate::models::{NewPhoto, PhotoRecord, SelectedFile};
use crate::repository::WeddingRepository;
use crate::validation::InputValidator;

/// Leading path segment for every stored photo
pub const STORAGE_PATH_PREFIX: &str = "wedding-photos";
const SUFFIX_LEN: usize = 6;

/// Where the uploaded photos will be filed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// Wedding id passed in by the caller or confirmed by the gate
    Explicit(Uuid),
    /// Most recently created wedding
    Latest(Uuid),
    /// No wedding found; a random id for this session
    Generated(Uuid),
}

impl UploadTarget {
    /// The wedding id photos are filed under
    #[must_use]
    pub const fn wedding_id(&self) -> Uuid {
        match self {
            Self::Explicit(id) | Self::Latest(id) | Self::Generated(id) => *id,
        }
    }
}

/// Result for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// Original file name
    pub file_name: String,
    /// Stored record, or the reason the file failed
    pub result: std::result::Result<PhotoRecord, String>,
}

impl FileOutcome {
    /// True when both the storage write and the metadata insert succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSummary {
    /// Every file stored
    AllSucceeded {
        /// Files stored
        count: usize,
    },
    /// Some files stored
    Partial {
        /// Files stored
        succeeded: usize,
        /// Files that failed
        failed: usize,
    },
    /// Nothing stored
    AllFailed {
        /// Files that failed
        failed: usize,
    },
}

impl UploadSummary {
    /// Message shown to the guest
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::AllSucceeded { count } => {
                format!("Successfully uploaded {count} photo(s) to the wedding album!")
            }
            Self::Partial { succeeded, failed } => format!(
                "Uploaded {succeeded} of {} photos. {failed} failed.",
                succeeded + failed
            ),
            Self::AllFailed { .. } => "Failed to upload photos. Please try again.".to_string(),
        }
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Per-file outcomes of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Where the batch was filed
    pub target: UploadTarget,
    /// One entry per selected file, in selection order
    pub outcomes: Vec<FileOutcome>,
}

impl UploadReport {
    /// Files stored with metadata
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Files that failed at either step
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// All, some or none
    #[must_use]
    pub fn summary(&self) -> UploadSummary {
        let succeeded = self.succeeded();
        let failed = self.failed();
        match (succeeded, failed) {
            (count, 0) => UploadSummary::AllSucceeded { count },
            (0, failed) => UploadSummary::AllFailed { failed },
            (succeeded, failed) => UploadSummary::Partial { succeeded, failed },
        }
    }
}

/// Object path for a new upload: `wedding-photos/{wedding}/{millis}-{suffix}.{ext}`
#[must_use]
pub fn storage_path(wedding_id: Uuid, file_name: &str, timestamp_millis: i64, suffix: &str) -> String {
    format!(
        "{STORAGE_PATH_PREFIX}/{wedding_id}/{timestamp_millis}-{suffix}.{}",
        InputValidator::file_extension(file_name)
    )
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Uploads photos and records their metadata
pub struct UploadPipeline {
    repository: Arc<dyn WeddingRepository>,
    uploader_label: String,
    wedding_id: Option<Uuid>,
    metrics: Arc<MetricsCollector>,
}

impl UploadPipeline {
    /// Pipeline filing photos under `uploader_label`
    pub fn new(repository: Arc<dyn WeddingRepository>, uploader_label: impl Into<String>) -> Self {
        Self {
            repository,
            uploader_label: uploader_label.into(),
            wedding_id: None,
            metrics: Arc::new(MetricsCollector::default()),
        }
    }

    /// File photos under this wedding instead of looking one up
    #[must_use]
    pub fn for_wedding(mut self, wedding_id: Option<Uuid>) -> Self {
        self.wedding_id = wedding_id;
        self
    }

    /// Report batches to a shared collector
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Pick the wedding this batch belongs to.
    ///
    /// Without an explicit id this falls back to the newest wedding, and without any wedding
    /// (or when the lookup fails) to a random id, so uploads are not guaranteed to belong to a
    /// real wedding in that case.
    pub async fn resolve_target(&self) -> UploadTarget {
        if let Some(id) = self.wedding_id {
            return UploadTarget::Explicit(id);
        }
        match self.repository.latest_wedding_id().await {
            Ok(Some(id)) => UploadTarget::Latest(id),
            Ok(None) => {
                let id = Uuid::new_v4();
                warn!(wedding_id = %id, "No wedding found, filing photos under a generated id");
                UploadTarget::Generated(id)
            }
            Err(e) => {
                let id = Uuid::new_v4();
                warn!(error = %e, wedding_id = %id, "Wedding lookup failed, filing photos under a generated id");
                UploadTarget::Generated(id)
            }
        }
    }

    /// Upload every file concurrently and aggregate the outcomes
    pub async fn upload(&self, files: Vec<SelectedFile>) -> UploadReport {
        let target = self.resolve_target().await;
        self.upload_to(target, files).await
    }

    /// Upload every file under an already resolved target
    pub async fn upload_to(&self, target: UploadTarget, files: Vec<SelectedFile>) -> UploadReport {
        let wedding_id = target.wedding_id();
        info!(files = files.len(), wedding_id = %wedding_id, "Uploading photos");

        let mut outcomes: Vec<FileOutcome> = files
            .iter()
            .map(|file| FileOutcome {
                file_name: file.name.clone(),
                result: Err("upload task did not complete".to_string()),
            })
            .collect();

        let mut tasks = JoinSet::new();
        for (index, file) in files.into_iter().enumerate() {
            let repository = Arc::clone(&self.repository);
            let label = self.uploader_label.clone();
            tasks.spawn(async move { (index, upload_one(repository.as_ref(), wedding_id, &label, file).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = outcome,
                Err(e) => error!(error = %e, "Upload task failed to complete"),
            }
        }

        let report = UploadReport { target, outcomes };
        self.metrics.record_upload_batch(report.succeeded(), report.failed());
        match report.summary() {
            UploadSummary::AllSucceeded { count } => info!(count, "All photos uploaded"),
            UploadSummary::Partial { succeeded, failed } => warn!(succeeded, failed, "Some photo uploads failed"),
            UploadSummary::AllFailed { failed } => error!(failed, "All photo uploads failed"),
        }
        report
    }
}

async fn upload_one(
    repository: &dyn WeddingRepository,
    wedding_id: Uuid,
    uploader_label: &str,
    file: SelectedFile,
) -> FileOutcome {
    let path = storage_path(wedding_id, &file.name, Utc::now().timestamp_millis(), &random_suffix());
    debug!(file = %file.name, size = file.size(), path = %path, "Uploading photo");
    let file_name = file.name;

    if let Err(e) = repository.upload_object(&path, file.bytes).await {
        error!(file = %file_name, error = %e, "Storage upload failed");
        return FileOutcome {
            file_name,
            result: Err(format!("Storage upload failed: {e}")),
        };
    }

    let photo = NewPhoto {
        wedding_id,
        file_name: file_name.clone(),
        file_path: path,
        uploaded_by: uploader_label.to_string(),
    };
    match repository.insert_photo(&photo).await {
        Ok(record) => FileOutcome {
            file_name,
            result: Ok(record),
        },
        Err(e) => {
            // bytes stay in storage without a metadata row
            error!(file = %file_name, path = %photo.file_path, error = %e, "Photo metadata insert failed");
            FileOutcome {
                file_name,
                result: Err(format!("Database insert failed: {e}")),
            }
        }
    }
}

/// Upload view state: the gate plus the current selection
pub struct UploadSession {
    gate: AccessGate,
    pipeline: UploadPipeline,
    selected: Vec<SelectedFile>,
}

impl UploadSession {
    /// Session behind `gate`
    #[must_use]
    pub fn new(gate: AccessGate, pipeline: UploadPipeline) -> Self {
        Self {
            gate,
            pipeline,
            selected: Vec::new(),
        }
    }

    /// The gate guarding this session
    pub fn gate_mut(&mut self) -> &mut AccessGate {
        &mut self.gate
    }

    /// Replace the selection
    pub fn select(&mut self, files: Vec<SelectedFile>) {
        self.selected = files;
    }

    /// Files waiting to be uploaded
    #[must_use]
    pub fn selected(&self) -> &[SelectedFile] {
        &self.selected
    }

    /// Upload the selection. The selection is cleared whatever the outcome; an empty
    /// selection is a no-op.
    ///
    /// Photos go to the wedding the gate was opened for when there is one, so a password
    /// checked against one wedding never files photos under another.
    pub async fn upload(&mut self) -> Result<Option<UploadReport>> {
        self.gate.require()?;
        let files = std::mem::take(&mut self.selected);
        if files.is_empty() {
            return Ok(None);
        }
        let target = match self.gate.wedding_id() {
            Some(id) => UploadTarget::Explicit(id),
            None => self.pipeline.resolve_target().await,
        };
        Ok(Some(self.pipeline.upload_to(target, files).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::gate::GateMode;
    use crate::repository::MockWeddingRepository;
    use chrono::Utc;

    fn record(photo: &NewPhoto) -> PhotoRecord {
        PhotoRecord {
            id: Uuid::new_v4(),
            wedding_id: Some(photo.wedding_id),
            file_name: photo.file_name.clone(),
            file_path: photo.file_path.clone(),
            uploaded_by: Some(photo.uploaded_by.clone()),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_storage_path_shape() {
        let id = Uuid::nil();
        assert_eq!(
            storage_path(id, "haldi.JPG", 1_700_000_000_000, "ab12cd"),
            format!("wedding-photos/{id}/1700000000000-ab12cd.jpg")
        );
        assert!(storage_path(id, "noext", 1, "x").ends_with("1-x.noext"));
        assert!(storage_path(id, "trailing.", 1, "x").ends_with("1-x.bin"));
    }

    #[test]
    fn test_random_suffix() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_summary_messages_differ() {
        let all = UploadSummary::AllSucceeded { count: 3 };
        let some = UploadSummary::Partial { succeeded: 2, failed: 1 };
        let none = UploadSummary::AllFailed { failed: 3 };
        assert_eq!(all.message(), "Successfully uploaded 3 photo(s) to the wedding album!");
        assert_eq!(some.message(), "Uploaded 2 of 3 photos. 1 failed.");
        assert_eq!(none.message(), "Failed to upload photos. Please try again.");
    }

    #[tokio::test]
    async fn test_metadata_only_after_storage_success() {
        let wedding_id = Uuid::new_v4();
        let mut mock = MockWeddingRepository::new();
        mock.expect_latest_wedding_id().returning(move || Ok(Some(wedding_id)));
        mock.expect_upload_object()
            .returning(|_, bytes| if bytes == b"bad" { Err(PlannerError::Backend("quota".into())) } else { Ok(()) });
        mock.expect_insert_photo().times(1).returning(|photo| Ok(record(photo)));

        let pipeline = UploadPipeline::new(Arc::new(mock), "Guest");
        let report = pipeline
            .upload(vec![SelectedFile::new("a.jpg", b"good".to_vec()), SelectedFile::new("b.jpg", b"bad".to_vec())])
            .await;

        assert_eq!(report.target, UploadTarget::Latest(wedding_id));
        assert_eq!(report.summary(), UploadSummary::Partial { succeeded: 1, failed: 1 });
        assert_eq!(report.outcomes[0].file_name, "a.jpg");
        assert!(report.outcomes[0].is_success());
        assert_eq!(report.outcomes[1].result, Err("Storage upload failed: Backend error: quota".to_string()));
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_generated_id() {
        let mut mock = MockWeddingRepository::new();
        mock.expect_latest_wedding_id().returning(|| Err(PlannerError::Backend("down".into())));
        let pipeline = UploadPipeline::new(Arc::new(mock), "Guest");
        assert!(matches!(pipeline.resolve_target().await, UploadTarget::Generated(_)));
    }

    #[tokio::test]
    async fn test_explicit_wedding_skips_lookup() {
        let id = Uuid::new_v4();
        let pipeline = UploadPipeline::new(Arc::new(MockWeddingRepository::new()), "Guest").for_wedding(Some(id));
        assert_eq!(pipeline.resolve_target().await, UploadTarget::Explicit(id));
    }

    #[tokio::test]
    async fn test_session_files_photos_under_gate_checked_wedding() {
        let checked = Uuid::new_v4();
        let newer = Uuid::new_v4();
        let mut mock = MockWeddingRepository::new();
        // the gate's lookup sees `checked`; any later lookup would see `newer`
        let mut lookups = vec![newer, checked];
        mock.expect_latest_wedding_id().times(1).returning(move || Ok(lookups.pop()));
        mock.expect_wedding_upload_password()
            .withf(move |id| *id == checked)
            .returning(|_| Ok(Some("haldi".to_string())));
        mock.expect_upload_object().returning(|_, _| Ok(()));
        mock.expect_insert_photo()
            .withf(move |photo| photo.wedding_id == checked)
            .returning(|photo| Ok(record(photo)));
        let repo: Arc<dyn WeddingRepository> = Arc::new(mock);

        let gate = AccessGate::new(GateMode::WeddingSecret, Arc::clone(&repo));
        let mut session = UploadSession::new(gate, UploadPipeline::new(repo, "Guest"));
        assert_eq!(session.gate_mut().submit("haldi").await.unwrap(), crate::gate::GateOutcome::Granted);
        session.select(vec![SelectedFile::new("a.jpg", vec![1])]);

        let report = session.upload().await.unwrap().unwrap();
        assert_eq!(report.target, UploadTarget::Explicit(checked));
        assert!(report.outcomes[0].is_success());
    }

    #[tokio::test]
    async fn test_session_requires_gate_and_clears_selection() {
        let mut mock = MockWeddingRepository::new();
        mock.expect_latest_wedding_id().returning(|| Ok(None));
        mock.expect_upload_object().returning(|_, _| Err(PlannerError::Backend("offline".into())));
        let repo: Arc<dyn WeddingRepository> = Arc::new(mock);

        let gate = AccessGate::new(GateMode::AnyNonEmpty, Arc::clone(&repo));
        let mut session = UploadSession::new(gate, UploadPipeline::new(repo, "Guest"));
        session.select(vec![SelectedFile::new("a.png", vec![1, 2, 3])]);

        assert!(matches!(session.upload().await, Err(PlannerError::AccessDenied)));
        assert_eq!(session.selected().len(), 1);

        session.gate_mut().submit("open sesame").await.unwrap();
        let report = session.upload().await.unwrap().unwrap();
        assert_eq!(report.summary(), UploadSummary::AllFailed { failed: 1 });
        assert!(session.selected().is_empty());
        assert!(session.upload().await.unwrap().is_none());
    }
}
