//! In-memory backend used in demo mode.
//!
//! When no backend URL or key is configured, submissions are simulated locally: accounts are
//! confirmed immediately and records live only for the lifetime of the process.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::{PlannerError, Result};
use crate::models::{AuthUser, NewPhoto, NewRsvp, NewWedding, PhotoRecord, RsvpRecord, SignupMetadata, WeddingRecord};
use crate::repository::WeddingRepository;

#[derive(Default)]
struct DemoState {
    current_user: Option<AuthUser>,
    weddings: Vec<(WeddingRecord, NewWedding)>,
    rsvps: Vec<NewRsvp>,
    photos: Vec<PhotoRecord>,
    objects: HashMap<String, Vec<u8>>,
}

/// Demo-mode repository
#[derive(Default)]
pub struct DemoRepo {
    state: Mutex<DemoState>,
}

impl DemoRepo {
    /// Empty demo backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// RSVPs received so far
    pub async fn rsvps(&self) -> Vec<NewRsvp> {
        self.state.lock().await.rsvps.clone()
    }

    /// Weddings created so far, oldest first
    pub async fn weddings(&self) -> Vec<WeddingRecord> {
        self.state.lock().await.weddings.iter().map(|(record, _)| record.clone()).collect()
    }

    /// Bytes stored at `path`, if any
    pub async fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().await.objects.get(path).cloned()
    }
}

#[async_trait]
impl WeddingRepository for DemoRepo {
    async fn sign_up(&self, email: &str, _password: &str, metadata: &SignupMetadata) -> Result<AuthUser> {
        info!(email, "Demo mode: account created and confirmed locally");
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            email_confirmed_at: Some(Utc::now()),
            user_metadata: Some(metadata.clone()),
        };
        self.state.lock().await.current_user = Some(user.clone());
        Ok(user)
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.state.lock().await.current_user.clone())
    }

    async fn resend_confirmation(&self, email: &str) -> Result<()> {
        info!(email, "Demo mode: confirmation email not sent");
        Ok(())
    }

    async fn insert_wedding(&self, wedding: &NewWedding) -> Result<WeddingRecord> {
        let record = WeddingRecord {
            id: Uuid::new_v4(),
            couple_names: wedding.couple_names.clone(),
            wedding_date: wedding.wedding_date,
            venue_name: Some(wedding.venue_name.clone()),
            created_at: Some(Utc::now()),
        };
        self.state.lock().await.weddings.push((record.clone(), wedding.clone()));
        Ok(record)
    }

    async fn latest_wedding_id(&self) -> Result<Option<Uuid>> {
        Ok(self.state.lock().await.weddings.last().map(|(record, _)| record.id))
    }

    async fn wedding_upload_password(&self, wedding_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .state
            .lock()
            .await
            .weddings
            .iter()
            .find(|(record, _)| record.id == wedding_id)
            .map(|(_, new)| new.photo_upload_password.clone()))
    }

    async fn insert_rsvp(&self, rsvp: &NewRsvp) -> Result<RsvpRecord> {
        self.state.lock().await.rsvps.push(rsvp.clone());
        Ok(RsvpRecord {
            id: Uuid::new_v4(),
            guest_name: rsvp.guest_name.clone(),
            attending: rsvp.attending,
            number_of_guests: Some(rsvp.number_of_guests),
            created_at: Some(Utc::now()),
        })
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoRecord> {
        let record = PhotoRecord {
            id: Uuid::new_v4(),
            wedding_id: Some(photo.wedding_id),
            file_name: photo.file_name.clone(),
            file_path: photo.file_path.clone(),
            uploaded_by: Some(photo.uploaded_by.clone()),
            uploaded_at: Utc::now(),
        };
        self.state.lock().await.photos.push(record.clone());
        Ok(record)
    }

    async fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
        let mut photos = self.state.lock().await.photos.clone();
        photos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(photos)
    }

    async fn upload_object(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.objects.contains_key(path) {
            return Err(PlannerError::Backend("The resource already exists".to_string()));
        }
        state.objects.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> Result<String> {
        if !self.state.lock().await.objects.contains_key(path) {
            return Err(PlannerError::Backend("Object not found".to_string()));
        }
        Ok(format!("memory://{path}?expires_in={}", expires_in.as_secs()))
    }
}
