//! Gallery loader.
//!
//! Reads every photo record, newest first, and resolves a time-limited URL for each. Records
//! whose URL cannot be signed are dropped. The view is never empty: whenever no real photo can
//! be shown, a fixed placeholder set is returned together with a status explaining why.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{PlannerError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{GalleryPhoto, PhotoRecord, DEFAULT_UPLOADER_LABEL};
use crate::repository::WeddingRepository;
use crate::validation::InputValidator;

/// Default lifetime of a signed URL
pub const DEFAULT_SIGNED_URL_EXPIRY: Duration = Duration::from_secs(3600);

const PLACEHOLDERS: [(&str, &str, &str); 4] = [
    (
        "Beautiful Wedding Ceremony",
        "https://images.unsplash.com/photo-1519741497674-611481863552?q=80&w=800&auto=format&fit=crop",
        "Photographer",
    ),
    (
        "Happy Couple",
        "https://images.unsplash.com/photo-1606216794074-735e91aa2c92?q=80&w=800&auto=format&fit=crop",
        "Guest",
    ),
    (
        "Wedding Decorations",
        "https://images.unsplash.com/photo-1620370264769-b65b7f82c49d?q=80&w=800&auto=format&fit=crop",
        "Guest",
    ),
    (
        "Traditional Ceremony",
        "https://images.unsplash.com/photo-1583221214464-6af3c173e1ac?q=80&w=800&auto=format&fit=crop",
        "Family",
    ),
];

/// The fixed placeholder set shown when no real photo is available
#[must_use]
pub fn placeholder_photos(now: DateTime<Utc>) -> Vec<GalleryPhoto> {
    PLACEHOLDERS
        .iter()
        .enumerate()
        .map(|(i, (name, url, by))| GalleryPhoto {
            id: format!("demo-{}", i + 1),
            file_name: (*name).to_string(),
            url: (*url).to_string(),
            uploaded_by: (*by).to_string(),
            uploaded_at: now,
            placeholder: true,
        })
        .collect()
}

/// Why the gallery shows what it shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryStatus {
    /// Real photos resolved
    Photos {
        /// Photos shown
        count: usize,
    },
    /// Nothing uploaded yet
    NoPhotosYet,
    /// Records exist but none could be signed
    StorageAccessIssue {
        /// Records found
        total: usize,
    },
    /// The record query itself failed
    QueryFailed {
        /// Backend message
        message: String,
    },
}

impl GalleryStatus {
    /// True when the placeholder set is shown
    #[must_use]
    pub const fn shows_placeholders(&self) -> bool {
        !matches!(self, Self::Photos { .. })
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Photos { .. } => "photos",
            Self::NoPhotosYet => "empty",
            Self::StorageAccessIssue { .. } => "storage_issue",
            Self::QueryFailed { .. } => "query_failed",
        }
    }
}

impl fmt::Display for GalleryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photos { count } => write!(f, "Found {count} wedding photos"),
            Self::NoPhotosYet => f.write_str("Showing demo wedding photos (no uploaded photos yet)"),
            Self::StorageAccessIssue { total } => write!(
                f,
                "Found {total} uploaded photos, but showing demo photos (storage access issue)"
            ),
            Self::QueryFailed { message } => write!(f, "Error loading photos: {message}. Showing demo photos"),
        }
    }
}

/// What the gallery displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryView {
    /// Photos to show, placeholders included
    pub photos: Vec<GalleryPhoto>,
    /// Why these photos are shown
    pub status: GalleryStatus,
}

/// Builds the gallery view from stored photo records
pub struct GalleryLoader {
    repository: Arc<dyn WeddingRepository>,
    expiry: Duration,
    metrics: Arc<MetricsCollector>,
}

impl GalleryLoader {
    /// Loader signing URLs valid for `expiry`
    pub fn new(repository: Arc<dyn WeddingRepository>, expiry: Duration) -> Self {
        Self {
            repository,
            expiry,
            metrics: Arc::new(MetricsCollector::default()),
        }
    }

    /// Report loads to a shared collector
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Load the gallery
    pub async fn load(&self) -> GalleryView {
        let records = match self.repository.list_photos().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Photo query failed, showing placeholders");
                return self.finish(Vec::new(), GalleryStatus::QueryFailed { message: e.user_message() }, 0);
            }
        };

        let total = records.len();
        debug!(total, "Photo records loaded");
        if total == 0 {
            return self.finish(Vec::new(), GalleryStatus::NoPhotosYet, 0);
        }

        let photos = self.sign_all(records).await;
        let dropped = total - photos.len();
        if photos.is_empty() {
            warn!(total, "No photo URL could be signed, showing placeholders");
            return self.finish(photos, GalleryStatus::StorageAccessIssue { total }, dropped);
        }
        let count = photos.len();
        self.finish(photos, GalleryStatus::Photos { count }, dropped)
    }

    fn finish(&self, photos: Vec<GalleryPhoto>, status: GalleryStatus, dropped: usize) -> GalleryView {
        self.metrics.record_gallery_load(status.label(), dropped);
        let photos = if status.shows_placeholders() {
            placeholder_photos(Utc::now())
        } else {
            photos
        };
        info!(status = %status, shown = photos.len(), "Gallery loaded");
        GalleryView { photos, status }
    }

    /// Sign every record concurrently, keeping query order and dropping failures
    async fn sign_all(&self, records: Vec<PhotoRecord>) -> Vec<GalleryPhoto> {
        let mut slots: Vec<Option<GalleryPhoto>> = vec![None; records.len()];
        let mut tasks = JoinSet::new();
        for (index, record) in records.into_iter().enumerate() {
            let repository = Arc::clone(&self.repository);
            let expiry = self.expiry;
            tasks.spawn(async move {
                let signed = repository.create_signed_url(&record.file_path, expiry).await;
                (index, record, signed)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, record, Ok(url))) => slots[index] = Some(to_gallery_photo(record, url)),
                Ok((_, record, Err(e))) => {
                    warn!(path = %record.file_path, error = %e, "Could not sign photo URL, skipping");
                }
                Err(e) => error!(error = %e, "Signing task failed to complete"),
            }
        }
        slots.into_iter().flatten().collect()
    }
}

fn to_gallery_photo(record: PhotoRecord, url: String) -> GalleryPhoto {
    GalleryPhoto {
        id: record.id.to_string(),
        file_name: record.file_name,
        url,
        uploaded_by: record.uploaded_by.unwrap_or_else(|| DEFAULT_UPLOADER_LABEL.to_string()),
        uploaded_at: record.uploaded_at,
        placeholder: false,
    }
}

const MAX_NAME_ATTEMPTS: usize = 1000;

/// `name` with ` (n)` inserted before the extension; `n == 0` leaves it unchanged
fn numbered_file_name(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}

/// Create a file in `dir` that did not exist before, numbering the name on collision
async fn create_unique(dir: &Path, name: &str) -> Result<(PathBuf, tokio::fs::File)> {
    for n in 0..MAX_NAME_ATTEMPTS {
        let target = dir.join(numbered_file_name(name, n));
        match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&target).await {
            Ok(file) => return Ok((target, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(PlannerError::Other(format!("No free file name for {name} in {}", dir.display())))
}

/// Save a photo into `dir` under its display name. Only `http` and `https` URLs can be fetched.
///
/// Existing files are never replaced: a photo whose name is taken is saved as `name (1).ext`,
/// `name (2).ext` and so on.
pub async fn download_photo(http: &Client, photo: &GalleryPhoto, dir: &Path) -> Result<PathBuf> {
    let url = Url::parse(&photo.url).map_err(|e| PlannerError::Other(format!("Invalid photo URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PlannerError::Other(format!(
            "Cannot download {} from a {} URL",
            photo.file_name,
            url.scheme()
        )));
    }

    let bytes = http.get(url).send().await?.error_for_status()?.bytes().await?;
    let (target, mut file) = create_unique(dir, &InputValidator::safe_file_name(&photo.file_name)).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    info!(file = %target.display(), bytes = bytes.len(), "Photo downloaded");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockWeddingRepository;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn record(name: &str, minute: u32) -> PhotoRecord {
        PhotoRecord {
            id: Uuid::new_v4(),
            wedding_id: None,
            file_name: name.to_string(),
            file_path: format!("wedding-photos/w/{name}"),
            uploaded_by: None,
            uploaded_at: Utc.with_ymd_and_hms(2026, 2, 14, 18, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_placeholder_set() {
        let photos = placeholder_photos(Utc::now());
        assert_eq!(photos.len(), 4);
        assert_eq!(photos[0].id, "demo-1");
        assert_eq!(photos[0].uploaded_by, "Photographer");
        assert_eq!(photos[3].file_name, "Traditional Ceremony");
        assert!(photos.iter().all(|p| p.placeholder));
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(GalleryStatus::Photos { count: 2 }.to_string(), "Found 2 wedding photos");
        assert_eq!(
            GalleryStatus::StorageAccessIssue { total: 3 }.to_string(),
            "Found 3 uploaded photos, but showing demo photos (storage access issue)"
        );
        assert!(GalleryStatus::NoPhotosYet.shows_placeholders());
    }

    #[tokio::test]
    async fn test_signing_failures_are_dropped_in_order() {
        let mut mock = MockWeddingRepository::new();
        mock.expect_list_photos()
            .returning(|| Ok(vec![record("c.jpg", 3), record("b.jpg", 2), record("a.jpg", 1)]));
        mock.expect_create_signed_url().returning(|path, _| {
            if path.ends_with("b.jpg") {
                Err(PlannerError::Backend("Object not found".into()))
            } else {
                Ok(format!("https://cdn.example/{path}"))
            }
        });

        let metrics = Arc::new(MetricsCollector::default());
        let view = GalleryLoader::new(Arc::new(mock), DEFAULT_SIGNED_URL_EXPIRY)
            .with_metrics(Arc::clone(&metrics))
            .load()
            .await;

        assert_eq!(view.status, GalleryStatus::Photos { count: 2 });
        let names: Vec<_> = view.photos.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["c.jpg", "a.jpg"]);
        assert_eq!(view.photos[0].uploaded_by, "Guest");
        assert_eq!(metrics.snapshot().signed_url_failures, 1);
    }

    #[tokio::test]
    async fn test_all_signing_failures_show_placeholders() {
        let mut mock = MockWeddingRepository::new();
        mock.expect_list_photos().returning(|| Ok(vec![record("a.jpg", 1), record("b.jpg", 2)]));
        mock.expect_create_signed_url()
            .returning(|_, _| Err(PlannerError::Backend("permission denied".into())));

        let view = GalleryLoader::new(Arc::new(mock), DEFAULT_SIGNED_URL_EXPIRY).load().await;
        assert_eq!(view.status, GalleryStatus::StorageAccessIssue { total: 2 });
        assert_eq!(view.photos.len(), 4);
    }

    #[tokio::test]
    async fn test_query_failure_shows_placeholders() {
        let mut mock = MockWeddingRepository::new();
        mock.expect_list_photos().returning(|| Err(PlannerError::Backend("relation does not exist".into())));

        let view = GalleryLoader::new(Arc::new(mock), DEFAULT_SIGNED_URL_EXPIRY).load().await;
        assert_eq!(
            view.status,
            GalleryStatus::QueryFailed {
                message: "relation does not exist".to_string()
            }
        );
        assert!(view.photos.iter().all(|p| p.placeholder));
    }

    #[tokio::test]
    async fn test_download_rejects_non_http_urls() {
        let photo = GalleryPhoto {
            id: "1".into(),
            file_name: "haldi.jpg".into(),
            url: "memory://wedding-photos/w/haldi.jpg?expires_in=60".into(),
            uploaded_by: "Guest".into(),
            uploaded_at: Utc::now(),
            placeholder: false,
        };
        let dir = std::env::temp_dir();
        assert!(download_photo(&Client::new(), &photo, &dir).await.is_err());
    }

    #[test]
    fn test_numbered_file_name() {
        assert_eq!(numbered_file_name("IMG_0001.jpg", 0), "IMG_0001.jpg");
        assert_eq!(numbered_file_name("IMG_0001.jpg", 2), "IMG_0001 (2).jpg");
        assert_eq!(numbered_file_name("mehndi.final.png", 1), "mehndi.final (1).png");
        assert_eq!(numbered_file_name("photo", 1), "photo (1)");
    }
}
