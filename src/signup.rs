//! Couple signup: account creation, the optional email verification detour, and creation of
//! the wedding page.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{PlannerError, Result};
use crate::models::{AuthUser, NewWedding, PendingSignup, SignupForm, WeddingRecord};
use crate::repository::WeddingRepository;
use crate::validation::InputValidator;

/// Message shown once the wedding page exists
pub const CREATED_MESSAGE: &str = "Wedding page created successfully! Your Indian wedding is ready.";
/// Error when the wedding page is requested before the email is confirmed
pub const VERIFY_FIRST_MESSAGE: &str = "Please complete email verification first.";

/// Where a submitted signup ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// Account created, confirmation email sent; finish with [`SignupFlow::complete`]
    VerificationRequired(PendingSignup),
    /// Account already confirmed and the wedding page created
    Created(WeddingRecord),
}

/// Drives the signup form
pub struct SignupFlow {
    repository: Arc<dyn WeddingRepository>,
}

impl SignupFlow {
    /// Flow backed by `repository`
    pub fn new(repository: Arc<dyn WeddingRepository>) -> Self {
        Self { repository }
    }

    /// Validate the form and create the account.
    ///
    /// Nothing reaches the backend when validation fails.
    pub async fn submit(&self, form: SignupForm) -> Result<SignupOutcome> {
        InputValidator::validate_signup_form(&form)?;

        let user = self
            .repository
            .sign_up(form.email.trim(), &form.password, &form.metadata())
            .await?;
        info!(user_id = %user.id, "Account created");

        if !user.is_confirmed() {
            info!(user_id = %user.id, "Waiting for email verification");
            return Ok(SignupOutcome::VerificationRequired(PendingSignup { user_id: user.id, form }));
        }

        let record = self.create_wedding(&form, user.id).await?;
        Ok(SignupOutcome::Created(record))
    }

    /// Create the wedding page for a signup whose email has since been confirmed
    pub async fn complete(&self, pending: &PendingSignup) -> Result<WeddingRecord> {
        let confirmed = self
            .repository
            .current_user()
            .await?
            .filter(|user| user.is_confirmed());
        let Some(user) = confirmed else {
            warn!(user_id = %pending.user_id, "Wedding creation attempted before verification");
            return Err(PlannerError::Validation(VERIFY_FIRST_MESSAGE.to_string()));
        };

        self.create_wedding(&pending.form, user.id).await
    }

    /// Finish a signup started in an earlier session. The form is rebuilt from the signup
    /// details stored with the account.
    pub async fn resume(&self, password: &str) -> Result<WeddingRecord> {
        let user = self
            .repository
            .current_user()
            .await?
            .filter(AuthUser::is_confirmed)
            .ok_or_else(|| PlannerError::Validation(VERIFY_FIRST_MESSAGE.to_string()))?;
        let pending = PendingSignup::from_account(&user, password)
            .ok_or_else(|| PlannerError::Backend("account has no signup details".to_string()))?;
        InputValidator::validate_signup_form(&pending.form)?;

        self.create_wedding(&pending.form, user.id).await
    }

    async fn create_wedding(&self, form: &SignupForm, user_id: uuid::Uuid) -> Result<WeddingRecord> {
        let wedding = NewWedding::from_signup(form, Some(user_id), Utc::now())?;
        let record = self.repository.insert_wedding(&wedding).await?;
        info!(wedding_id = %record.id, couple = %record.couple_names, "Wedding page created");
        Ok(record)
    }
}
