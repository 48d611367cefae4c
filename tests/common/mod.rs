//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use shaadi_planner::error::{PlannerError, Result};
use shaadi_planner::models::{
    AuthUser, NewPhoto, NewRsvp, NewWedding, PhotoRecord, RsvpRecord, SelectedFile, SignupForm, SignupMetadata,
    WeddingRecord,
};
use shaadi_planner::{DemoRepo, WeddingRepository};

/// Failures to inject on top of the in-memory backend
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Storage rejects objects whose bytes start with this marker
    pub reject_marker: Option<Vec<u8>>,
    /// Every metadata insert fails
    pub fail_photo_insert: bool,
    /// Every URL signing fails
    pub fail_signing: bool,
    /// The photo query fails
    pub fail_listing: bool,
    /// The latest-wedding lookup fails
    pub fail_wedding_lookup: bool,
}

/// In-memory backend with injectable failures
pub struct FaultyRepo {
    pub inner: DemoRepo,
    pub faults: Faults,
    pub signing_calls: AtomicUsize,
}

impl FaultyRepo {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: DemoRepo::new(),
            faults,
            signing_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WeddingRepository for FaultyRepo {
    async fn sign_up(&self, email: &str, password: &str, metadata: &SignupMetadata) -> Result<AuthUser> {
        self.inner.sign_up(email, password, metadata).await
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        self.inner.current_user().await
    }

    async fn resend_confirmation(&self, email: &str) -> Result<()> {
        self.inner.resend_confirmation(email).await
    }

    async fn insert_wedding(&self, wedding: &NewWedding) -> Result<WeddingRecord> {
        self.inner.insert_wedding(wedding).await
    }

    async fn latest_wedding_id(&self) -> Result<Option<Uuid>> {
        if self.faults.fail_wedding_lookup {
            return Err(PlannerError::Backend("permission denied for table weddings".to_string()));
        }
        self.inner.latest_wedding_id().await
    }

    async fn wedding_upload_password(&self, wedding_id: Uuid) -> Result<Option<String>> {
        self.inner.wedding_upload_password(wedding_id).await
    }

    async fn insert_rsvp(&self, rsvp: &NewRsvp) -> Result<RsvpRecord> {
        self.inner.insert_rsvp(rsvp).await
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoRecord> {
        if self.faults.fail_photo_insert {
            return Err(PlannerError::Backend("new row violates row-level security policy".to_string()));
        }
        self.inner.insert_photo(photo).await
    }

    async fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
        if self.faults.fail_listing {
            return Err(PlannerError::Backend("relation \"photos\" does not exist".to_string()));
        }
        self.inner.list_photos().await
    }

    async fn upload_object(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        if let Some(marker) = &self.faults.reject_marker {
            if bytes.starts_with(marker) {
                return Err(PlannerError::Backend("Payload too large".to_string()));
            }
        }
        self.inner.upload_object(path, bytes).await
    }

    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> Result<String> {
        self.signing_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_signing {
            return Err(PlannerError::Backend("Object not found".to_string()));
        }
        self.inner.create_signed_url(path, expires_in).await
    }
}

pub fn signup_form() -> SignupForm {
    SignupForm {
        bride_name: "Ananya".to_string(),
        groom_name: "Vikram".to_string(),
        email: "ananya.vikram@example.com".to_string(),
        phone: "+91 99887 76655".to_string(),
        wedding_date: "2026-12-05".to_string(),
        venue: "Leela Palace, Udaipur, Rajasthan".to_string(),
        password: "phere2026".to_string(),
    }
}

pub fn photo(name: &str) -> SelectedFile {
    SelectedFile::new(name, format!("jpeg bytes of {name}").into_bytes())
}

pub fn rejected_photo(name: &str) -> SelectedFile {
    SelectedFile::new(name, b"REJECT".to_vec())
}
