//! Backend client seam.
//!
//! Every view talks to the hosted backend through [`WeddingRepository`]. The HTTP
//! implementation lives in [`crate::supabase`]; [`crate::demo`] provides the in-memory one used
//! when no backend is configured.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AuthUser, NewPhoto, NewRsvp, NewWedding, PhotoRecord, RsvpRecord, SignupMetadata, WeddingRecord};

/// Authentication, record and object-storage operations of the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeddingRepository: Send + Sync {
    /// Create an account; the confirmation email is sent by the backend
    async fn sign_up(&self, email: &str, password: &str, metadata: &SignupMetadata) -> Result<AuthUser>;

    /// Account of the current session, if any
    async fn current_user(&self) -> Result<Option<AuthUser>>;

    /// Send the signup confirmation email again
    async fn resend_confirmation(&self, email: &str) -> Result<()>;

    /// Insert a wedding and return the stored record
    async fn insert_wedding(&self, wedding: &NewWedding) -> Result<WeddingRecord>;

    /// Most recently created wedding
    async fn latest_wedding_id(&self) -> Result<Option<Uuid>>;

    /// Photo upload password stored for a wedding
    async fn wedding_upload_password(&self, wedding_id: Uuid) -> Result<Option<String>>;

    /// Insert an RSVP
    async fn insert_rsvp(&self, rsvp: &NewRsvp) -> Result<RsvpRecord>;

    /// Insert photo metadata
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoRecord>;

    /// All photo metadata, newest upload first
    async fn list_photos(&self) -> Result<Vec<PhotoRecord>>;

    /// Store bytes at `path` in the photo bucket; never overwrites
    async fn upload_object(&self, path: &str, bytes: Vec<u8>) -> Result<()>;

    /// Time-limited retrieval URL for the object at `path`
    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> Result<String>;
}
