//! Password gate in front of photo upload and the gallery.
//!
//! In the default [`GateMode::AnyNonEmpty`] mode any non-empty password is accepted. That is
//! a placeholder, not a security boundary: nothing is compared against the wedding's stored
//! password. [`GateMode::WeddingSecret`] performs the real comparison and should be used for
//! any deployment that guests can reach.

use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PlannerError, Result};
use crate::repository::WeddingRepository;

/// Message shown once the gate opens
pub const GRANTED_MESSAGE: &str = "Password verified! You can now upload photos.";

/// How a submitted password is checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateMode {
    /// Accept any non-empty password
    #[default]
    AnyNonEmpty,
    /// Compare against the wedding's stored photo upload password
    WeddingSecret,
}

impl FromStr for GateMode {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "any_non_empty" => Ok(Self::AnyNonEmpty),
            "wedding_secret" => Ok(Self::WeddingSecret),
            other => Err(PlannerError::InvalidConfig(format!(
                "Invalid gate mode: {other}. Must be one of: any_non_empty, wedding_secret"
            ))),
        }
    }
}

/// Result of a password submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Gate is open for this session
    Granted,
    /// Gate stays closed, with the reason to show
    Rejected(String),
}

/// Per-session password gate
pub struct AccessGate {
    mode: GateMode,
    repository: Arc<dyn WeddingRepository>,
    wedding_id: Option<Uuid>,
    verified_wedding: Option<Uuid>,
    authenticated: bool,
}

impl AccessGate {
    /// Closed gate
    pub fn new(mode: GateMode, repository: Arc<dyn WeddingRepository>) -> Self {
        Self {
            mode,
            repository,
            wedding_id: None,
            verified_wedding: None,
            authenticated: false,
        }
    }

    /// Check passwords against this wedding instead of the most recent one
    #[must_use]
    pub fn for_wedding(mut self, wedding_id: Option<Uuid>) -> Self {
        self.wedding_id = wedding_id;
        self
    }

    /// Whether the gate is open
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Wedding the open gate was granted for: the one whose password was checked, or the
    /// wedding passed to [`AccessGate::for_wedding`]. `None` while closed or when no wedding
    /// was involved.
    #[must_use]
    pub const fn wedding_id(&self) -> Option<Uuid> {
        if self.authenticated {
            self.verified_wedding
        } else {
            None
        }
    }

    /// Error unless the gate is open
    pub fn require(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(PlannerError::AccessDenied)
        }
    }

    /// Close the gate and return to the password prompt
    pub fn logout(&mut self) {
        self.authenticated = false;
        self.verified_wedding = None;
    }

    /// Submit a password
    pub async fn submit(&mut self, password: &str) -> Result<GateOutcome> {
        if password.is_empty() {
            self.logout();
            return Ok(GateOutcome::Rejected("Please enter the wedding password".to_string()));
        }

        let (outcome, wedding_id) = match self.mode {
            GateMode::AnyNonEmpty => (GateOutcome::Granted, self.wedding_id),
            GateMode::WeddingSecret => self.check_wedding_secret(password).await?,
        };

        let granted = outcome == GateOutcome::Granted;
        self.authenticated = granted;
        self.verified_wedding = if granted { wedding_id } else { None };
        if self.authenticated {
            info!(mode = ?self.mode, wedding_id = ?self.verified_wedding, "Photo gate opened");
        } else {
            warn!(mode = ?self.mode, "Photo gate password rejected");
        }
        Ok(outcome)
    }

    async fn check_wedding_secret(&self, password: &str) -> Result<(GateOutcome, Option<Uuid>)> {
        let wedding_id = match self.wedding_id {
            Some(id) => Some(id),
            None => self.repository.latest_wedding_id().await?,
        };
        let Some(wedding_id) = wedding_id else {
            return Ok((GateOutcome::Rejected("No wedding found".to_string()), None));
        };

        let stored = self.repository.wedding_upload_password(wedding_id).await?;
        let outcome = match stored {
            Some(stored) if constant_time_eq(stored.as_bytes(), password.as_bytes()) => GateOutcome::Granted,
            _ => GateOutcome::Rejected("Incorrect wedding password".to_string()),
        };
        Ok((outcome, Some(wedding_id)))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
