use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{PlannerError, Result};
use crate::models::{RsvpForm, SignupForm};

/// Message shown when a signup field is missing
pub const SIGNUP_REQUIRED_MESSAGE: &str = "Please fill in all required fields";
/// Message shown when the RSVP name or attendance is missing
pub const RSVP_REQUIRED_MESSAGE: &str = "Please fill in your name and attendance status";
/// Largest party accepted on a single RSVP
pub const MAX_GUESTS_PER_RSVP: u8 = 4;

#[allow(clippy::expect_used)]
static EXTENSION_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("extension pattern is valid"));

fn invalid(message: impl Into<String>) -> PlannerError {
    PlannerError::Validation(message.into())
}

/// Validation utilities for form input and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the couple signup form.
    ///
    /// The required-field check runs first so a partially filled form always reports the same
    /// message, whatever else is wrong with it.
    pub fn validate_signup_form(form: &SignupForm) -> Result<()> {
        let required = [
            &form.bride_name,
            &form.groom_name,
            &form.email,
            &form.wedding_date,
            &form.password,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(invalid(SIGNUP_REQUIRED_MESSAGE));
        }

        Self::validate_person_name(&form.bride_name)?;
        Self::validate_person_name(&form.groom_name)?;
        Self::validate_email(&form.email)?;
        Self::validate_wedding_date(&form.wedding_date)?;
        if !form.phone.trim().is_empty() {
            Self::validate_phone(&form.phone)?;
        }
        if form.venue.len() > 500 {
            return Err(invalid("Venue too long (max 500 characters)"));
        }

        Ok(())
    }

    /// Validate the RSVP form. Only the guest name and attendance are mandatory.
    pub fn validate_rsvp_form(form: &RsvpForm) -> Result<()> {
        if form.name.trim().is_empty() || form.attending.is_none() {
            return Err(invalid(RSVP_REQUIRED_MESSAGE));
        }

        Self::validate_person_name(&form.name)?;
        Self::validate_guest_count(form.guests)?;
        if !form.email.trim().is_empty() {
            Self::validate_email(&form.email)?;
        }

        Ok(())
    }

    /// Validate a bride, groom or guest name
    pub fn validate_person_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid("Name cannot be empty"));
        }

        if name.chars().count() > 100 {
            return Err(invalid("Name too long (max 100 characters)"));
        }

        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(invalid("Name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate party size
    pub fn validate_guest_count(guests: u8) -> Result<()> {
        if !(1..=MAX_GUESTS_PER_RSVP).contains(&guests) {
            return Err(invalid(format!(
                "Number of guests must be between 1 and {MAX_GUESTS_PER_RSVP}"
            )));
        }
        Ok(())
    }

    /// Validate phone number format
    pub fn validate_phone(phone: &str) -> Result<()> {
        if phone.trim().is_empty() {
            return Err(invalid("Phone number cannot be empty"));
        }

        if phone
            .chars()
            .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ')))
        {
            return Err(invalid("Phone number contains invalid characters"));
        }

        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if !(7..=15).contains(&digits) {
            return Err(invalid("Phone number must be between 7 and 15 digits"));
        }

        if phone.trim_start().contains('+') && !phone.trim_start().starts_with('+') {
            return Err(invalid("Phone number may only have + as its first character"));
        }

        Ok(())
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(invalid("Email cannot be empty"));
        }

        if email.len() > 254 {
            return Err(invalid("Email too long (max 254 characters)"));
        }

        let Some((local_part, domain_part)) = email.split_once('@') else {
            return Err(invalid("Email must contain @ symbol"));
        };

        if domain_part.contains('@') {
            return Err(invalid("Email must have exactly one @ symbol"));
        }

        if local_part.is_empty() || local_part.len() > 64 {
            return Err(invalid("Email local part invalid"));
        }

        if domain_part.is_empty()
            || !domain_part.contains('.')
            || domain_part.starts_with('.')
            || domain_part.ends_with('.')
        {
            return Err(invalid("Email domain invalid"));
        }

        Ok(())
    }

    /// Validate a `YYYY-MM-DD` wedding date
    pub fn validate_wedding_date(date: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| invalid("Wedding date must be YYYY-MM-DD"))
    }

    /// Validate backend URL
    pub fn validate_backend_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(PlannerError::InvalidConfig("Backend URL cannot be empty".to_string()));
        }

        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(PlannerError::InvalidConfig(
                "Backend URL must start with http:// or https://".to_string(),
            ));
        }

        if url.len() > 1000 {
            return Err(PlannerError::InvalidConfig("Backend URL too long".to_string()));
        }

        Ok(())
    }

    /// Storage extension for an uploaded file: the text after the last `.`, reduced to ASCII
    /// alphanumerics. Falls back to `bin` when nothing usable remains.
    #[must_use]
    pub fn file_extension(file_name: &str) -> String {
        let raw = file_name.rsplit('.').next().unwrap_or_default();
        let cleaned = EXTENSION_CHARS.replace_all(raw, "").to_lowercase();
        if cleaned.is_empty() {
            "bin".to_string()
        } else {
            cleaned.chars().take(10).collect()
        }
    }

    /// Reduce a display name to a single safe path component for downloads
    #[must_use]
    pub fn safe_file_name(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
            .collect();
        let cleaned = cleaned.trim().trim_start_matches('.').to_string();
        if cleaned.is_empty() {
            "photo".to_string()
        } else {
            cleaned
        }
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
