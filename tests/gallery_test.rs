//! Integration tests for the gallery loader and photo downloads

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{photo, FaultyRepo, Faults};
use shaadi_planner::gallery::{download_photo, GalleryLoader, GalleryStatus, DEFAULT_SIGNED_URL_EXPIRY};
use shaadi_planner::models::GalleryPhoto;
use shaadi_planner::upload::UploadPipeline;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn seeded(faults: Faults, names: &[&str]) -> Arc<FaultyRepo> {
    let repo = Arc::new(FaultyRepo::new(faults));
    for name in names {
        // one batch per file so upload times are strictly ordered
        UploadPipeline::new(repo.clone(), "Guest").upload(vec![photo(name)]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    repo
}

#[tokio::test]
async fn test_empty_gallery_shows_placeholders() {
    let repo = seeded(Faults::default(), &[]).await;
    let view = GalleryLoader::new(repo, DEFAULT_SIGNED_URL_EXPIRY).load().await;

    assert_eq!(view.status, GalleryStatus::NoPhotosYet);
    assert_eq!(view.status.to_string(), "Showing demo wedding photos (no uploaded photos yet)");
    assert_eq!(view.photos.len(), 4);
    assert!(view.photos.iter().all(|p| p.placeholder));
}

#[tokio::test]
async fn test_photos_newest_first_with_signed_urls() {
    let repo = seeded(Faults::default(), &["first.jpg", "second.jpg", "third.jpg"]).await;
    let view = GalleryLoader::new(repo, Duration::from_secs(120)).load().await;

    assert_eq!(view.status, GalleryStatus::Photos { count: 3 });
    assert_eq!(view.status.to_string(), "Found 3 wedding photos");
    let names: Vec<_> = view.photos.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, vec!["third.jpg", "second.jpg", "first.jpg"]);
    assert!(view.photos.iter().all(|p| !p.placeholder && p.url.ends_with("expires_in=120")));
}

#[tokio::test]
async fn test_all_signing_failures_report_storage_issue() {
    let repo = seeded(
        Faults {
            fail_signing: true,
            ..Faults::default()
        },
        &["a.jpg", "b.jpg"],
    )
    .await;
    let view = GalleryLoader::new(repo.clone(), DEFAULT_SIGNED_URL_EXPIRY).load().await;

    assert_eq!(view.status, GalleryStatus::StorageAccessIssue { total: 2 });
    assert!(view.photos.iter().all(|p| p.placeholder));
    assert_eq!(repo.signing_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_query_failure_surfaces_message() {
    let repo = seeded(
        Faults {
            fail_listing: true,
            ..Faults::default()
        },
        &[],
    )
    .await;
    let view = GalleryLoader::new(repo, DEFAULT_SIGNED_URL_EXPIRY).load().await;

    let GalleryStatus::QueryFailed { message } = &view.status else {
        panic!("expected query failure, got {:?}", view.status);
    };
    assert_eq!(message, "relation \"photos\" does not exist");
    assert_eq!(view.photos.len(), 4);
}

/// Serve `body` once over plain HTTP and return the URL
async fn serve_once(body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await.unwrap();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}/storage/v1/object/sign/wedding-photos/w/1.jpg?token=abc")
}

#[tokio::test]
async fn test_download_saves_under_safe_name() {
    let url = serve_once(b"\xFF\xD8\xFFjpeg").await;
    let photo = GalleryPhoto {
        id: "1".to_string(),
        file_name: "../baraat.jpg".to_string(),
        url,
        uploaded_by: "Guest".to_string(),
        uploaded_at: Utc::now(),
        placeholder: false,
    };
    let dir = tempfile::tempdir().unwrap();

    let saved = download_photo(&reqwest::Client::new(), &photo, dir.path()).await.unwrap();

    assert_eq!(saved.parent(), Some(dir.path()));
    assert_eq!(saved.file_name().unwrap(), "_baraat.jpg");
    assert_eq!(std::fs::read(&saved).unwrap(), b"\xFF\xD8\xFFjpeg");
}

#[tokio::test]
async fn test_download_of_demo_url_is_rejected() {
    let repo = seeded(Faults::default(), &["a.jpg"]).await;
    let view = GalleryLoader::new(repo, DEFAULT_SIGNED_URL_EXPIRY).load().await;
    let dir = tempfile::tempdir().unwrap();

    let result = download_photo(&reqwest::Client::new(), &view.photos[0], dir.path()).await;
    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_same_name_downloads_keep_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let http = reqwest::Client::new();
    let mut saved = Vec::new();
    for body in [&b"first-guest"[..], &b"second-guest"[..]] {
        let photo = GalleryPhoto {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: "IMG_0001.jpg".to_string(),
            url: serve_once(body).await,
            uploaded_by: "Guest".to_string(),
            uploaded_at: Utc::now(),
            placeholder: false,
        };
        saved.push(download_photo(&http, &photo, dir.path()).await.unwrap());
    }

    assert_eq!(saved[0].file_name().unwrap(), "IMG_0001.jpg");
    assert_eq!(saved[1].file_name().unwrap(), "IMG_0001 (1).jpg");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    assert_eq!(std::fs::read(&saved[0]).unwrap(), b"first-guest");
    assert_eq!(std::fs::read(&saved[1]).unwrap(), b"second-guest");
}
