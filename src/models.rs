//! Data models for weddings, RSVPs and photos
//!
//! This module contains the form state held by each view, the payloads sent to the backend,
//! and the records read back from it. The authoritative schema lives in the backend; these
//! types mirror the JSON shapes it accepts and returns.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{PlannerError, Result};

/// Label recorded on photos uploaded through the guest gate
pub const DEFAULT_UPLOADER_LABEL: &str = "Guest";
/// Time of day recorded for new weddings
pub const DEFAULT_WEDDING_TIME: (u32, u32) = (18, 0);
/// Venue name used when the venue text is blank
pub const DEFAULT_VENUE_NAME: &str = "Wedding Venue";
/// Default city, state and country for new weddings
pub const DEFAULT_CITY: &str = "Delhi";
/// Default state for new weddings
pub const DEFAULT_STATE: &str = "Delhi";
/// Default country for new weddings
pub const DEFAULT_COUNTRY: &str = "India";

/// Couple signup form state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupForm {
    /// Bride's name
    pub bride_name: String,
    /// Groom's name
    pub groom_name: String,
    /// Contact email, also the account login
    pub email: String,
    /// Contact phone (optional, may be blank)
    pub phone: String,
    /// Wedding date as `YYYY-MM-DD`
    pub wedding_date: String,
    /// Free-text venue, `"Name, address..."`
    pub venue: String,
    /// Account password, doubling as the photo upload password
    pub password: String,
}

impl SignupForm {
    /// Metadata attached to the account at creation time
    #[must_use]
    pub fn metadata(&self) -> SignupMetadata {
        SignupMetadata {
            bride_name: self.bride_name.clone(),
            groom_name: self.groom_name.clone(),
            phone: self.phone.clone(),
            wedding_date: self.wedding_date.clone(),
            venue: self.venue.clone(),
        }
    }
}

/// User metadata sent with account creation and returned with the account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupMetadata {
    /// Bride's name
    pub bride_name: String,
    /// Groom's name
    pub groom_name: String,
    /// Contact phone
    pub phone: String,
    /// Wedding date
    pub wedding_date: String,
    /// Venue text
    pub venue: String,
}

/// Account as reported by the backend's auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Account identifier
    pub id: Uuid,
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
    /// Set once the confirmation link has been followed
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    /// Signup details stored with the account
    #[serde(default)]
    pub user_metadata: Option<SignupMetadata>,
}

impl AuthUser {
    /// True once the email address has been confirmed
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Snapshot of the signup form kept across the verification detour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSignup {
    /// Account created for the couple
    pub user_id: Uuid,
    /// The form as submitted
    pub form: SignupForm,
}

impl PendingSignup {
    /// Rebuild a pending signup from the account itself, for a verification finished in a
    /// later session. `None` when the account carries no signup details.
    #[must_use]
    pub fn from_account(user: &AuthUser, password: &str) -> Option<Self> {
        let metadata = user.user_metadata.as_ref()?;
        let email = user.email.clone()?;
        Some(Self {
            user_id: user.id,
            form: SignupForm {
                bride_name: metadata.bride_name.clone(),
                groom_name: metadata.groom_name.clone(),
                email,
                phone: metadata.phone.clone(),
                wedding_date: metadata.wedding_date.clone(),
                venue: metadata.venue.clone(),
                password: password.to_string(),
            },
        })
    }
}

/// Wedding insert payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWedding {
    /// Account that created the wedding
    pub user_id: Option<Uuid>,
    /// "{bride} & {groom}"
    pub couple_names: String,
    /// Bride's name
    pub bride_name: String,
    /// Groom's name
    pub groom_name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Wedding date
    pub wedding_date: NaiveDate,
    /// Ceremony time
    pub wedding_time: NaiveTime,
    /// First segment of the venue text
    pub venue_name: String,
    /// Full venue text
    pub venue_address: String,
    /// Password guests use for photo sharing
    pub photo_upload_password: String,
    /// City
    pub city: String,
    /// State
    pub state: String,
    /// Country
    pub country: String,
    /// Always true: weddings are created after confirmation
    pub email_verified: bool,
    /// When the record was built
    pub email_verified_at: DateTime<Utc>,
    /// Activity flag read by the backend's access policies
    pub is_active: bool,
}

impl NewWedding {
    /// Build the insert payload from a submitted signup form
    pub fn from_signup(form: &SignupForm, user_id: Option<Uuid>, now: DateTime<Utc>) -> Result<Self> {
        let wedding_date = NaiveDate::parse_from_str(form.wedding_date.trim(), "%Y-%m-%d")
            .map_err(|_| PlannerError::Validation("Wedding date must be YYYY-MM-DD".to_string()))?;
        let (hour, minute) = DEFAULT_WEDDING_TIME;
        let wedding_time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| PlannerError::Other("invalid default wedding time".to_string()))?;

        let venue_name = form
            .venue
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_VENUE_NAME)
            .to_string();
        let phone = Some(form.phone.trim().to_string()).filter(|p| !p.is_empty());

        Ok(Self {
            user_id,
            couple_names: format!("{} & {}", form.bride_name.trim(), form.groom_name.trim()),
            bride_name: form.bride_name.trim().to_string(),
            groom_name: form.groom_name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone,
            wedding_date,
            wedding_time,
            venue_name,
            venue_address: form.venue.trim().to_string(),
            photo_upload_password: form.password.clone(),
            city: DEFAULT_CITY.to_string(),
            state: DEFAULT_STATE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            email_verified: true,
            email_verified_at: now,
            is_active: true,
        })
    }
}

/// Wedding as read back from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeddingRecord {
    /// Primary key
    pub id: Uuid,
    /// "{bride} & {groom}"
    pub couple_names: String,
    /// Wedding date
    pub wedding_date: NaiveDate,
    /// Venue name
    #[serde(default)]
    pub venue_name: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Food preference choices offered on the RSVP form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodPreference {
    /// Vegetarian
    #[serde(rename = "veg")]
    Vegetarian,
    /// Non-vegetarian
    #[serde(rename = "nonveg")]
    NonVegetarian,
    /// Vegan
    #[serde(rename = "vegan")]
    Vegan,
    /// Jain diet
    #[serde(rename = "jain")]
    Jain,
}

impl FoodPreference {
    /// Every accepted value, in form order
    pub const ALL: [Self; 4] = [Self::Vegetarian, Self::NonVegetarian, Self::Vegan, Self::Jain];

    /// Value stored by the backend
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vegetarian => "veg",
            Self::NonVegetarian => "nonveg",
            Self::Vegan => "vegan",
            Self::Jain => "jain",
        }
    }
}

impl fmt::Display for FoodPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodPreference {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "veg" | "vegetarian" => Ok(Self::Vegetarian),
            "nonveg" | "non-veg" | "non-vegetarian" => Ok(Self::NonVegetarian),
            "vegan" => Ok(Self::Vegan),
            "jain" => Ok(Self::Jain),
            other => {
                let choices: Vec<&str> = Self::ALL.iter().map(Self::as_str).collect();
                Err(PlannerError::Validation(format!(
                    "Unknown food preference: {other}. Must be one of: {}",
                    choices.join(", ")
                )))
            }
        }
    }
}

/// Attendance radio selection; the form holds `Option<Attendance>` so "unset" is representable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    /// Will attend
    Yes,
    /// Will not attend
    No,
}

impl Attendance {
    /// Strict boolean stored on the RSVP record
    #[must_use]
    pub const fn is_attending(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl FromStr for Attendance {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Self::Yes),
            "no" | "n" => Ok(Self::No),
            other => Err(PlannerError::Validation(format!("Attendance must be yes or no, got: {other}"))),
        }
    }
}

/// RSVP form state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpForm {
    /// Guest name
    pub name: String,
    /// Guest email (optional, may be blank)
    pub email: String,
    /// Attendance; `None` until the guest picks one
    pub attending: Option<Attendance>,
    /// Party size including the guest
    pub guests: u8,
    /// Food preference
    pub food_preference: Option<FoodPreference>,
    /// Whether drinks are wanted
    pub drinks: bool,
    /// Song request (optional, may be blank)
    pub song_request: String,
    /// Anything else (optional, may be blank)
    pub special_requests: String,
}

impl Default for RsvpForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            attending: None,
            guests: 1,
            food_preference: None,
            drinks: false,
            song_request: String::new(),
            special_requests: String::new(),
        }
    }
}

/// RSVP insert payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRsvp {
    /// Always `None`: RSVPs are not yet associated with a wedding
    pub wedding_id: Option<Uuid>,
    /// Guest name
    pub guest_name: String,
    /// Guest email
    pub email: Option<String>,
    /// Attendance
    pub attending: bool,
    /// Party size
    pub number_of_guests: u8,
    /// Food preference
    pub food_preference: Option<FoodPreference>,
    /// Drinks wanted
    pub drinks_preference: bool,
    /// Song request
    pub song_request: Option<String>,
    /// Anything else
    pub special_requests: Option<String>,
}

/// RSVP as read back from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpRecord {
    /// Primary key
    pub id: Uuid,
    /// Guest name
    pub guest_name: String,
    /// Attendance
    pub attending: bool,
    /// Party size
    #[serde(default)]
    pub number_of_guests: Option<u8>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A locally selected image waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Original file name
    pub name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Create a selection entry
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Size in megabytes, as shown next to each selected file
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_mb(&self) -> f64 {
        self.size() as f64 / 1024.0 / 1024.0
    }
}

/// Photo metadata insert payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhoto {
    /// Wedding the photo belongs to
    pub wedding_id: Uuid,
    /// Original file name
    pub file_name: String,
    /// Object storage path
    pub file_path: String,
    /// Uploader label
    pub uploaded_by: String,
}

/// Photo metadata as read back from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Primary key
    pub id: Uuid,
    /// Wedding the photo belongs to
    #[serde(default)]
    pub wedding_id: Option<Uuid>,
    /// Original file name
    pub file_name: String,
    /// Object storage path
    pub file_path: String,
    /// Uploader label
    #[serde(default)]
    pub uploaded_by: Option<String>,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

/// A photo ready to display: a real upload with a signed URL, or a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryPhoto {
    /// Record id, or `demo-N` for placeholders
    pub id: String,
    /// Display name, also used as the download file name
    pub file_name: String,
    /// Time-limited retrieval URL
    pub url: String,
    /// Uploader label
    pub uploaded_by: String,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
    /// True for placeholder entries
    pub placeholder: bool,
}
