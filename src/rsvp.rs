//! Guest RSVP submission.

use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::models::{NewRsvp, RsvpForm, RsvpRecord};
use crate::repository::WeddingRepository;
use crate::validation::InputValidator;

/// Message shown after a successful RSVP
pub const SUBMITTED_MESSAGE: &str = "Thank you! Your RSVP has been submitted successfully.";

fn optional(text: &str) -> Option<String> {
    Some(InputValidator::sanitize_text(text)).filter(|s| !s.is_empty())
}

impl NewRsvp {
    /// Insert payload for a validated form. RSVPs are not linked to a wedding.
    #[must_use]
    pub fn from_form(form: &RsvpForm) -> Self {
        Self {
            wedding_id: None,
            guest_name: InputValidator::sanitize_text(&form.name),
            email: optional(&form.email),
            attending: form.attending.is_some_and(|a| a.is_attending()),
            number_of_guests: form.guests,
            food_preference: form.food_preference,
            drinks_preference: form.drinks,
            song_request: optional(&form.song_request),
            special_requests: optional(&form.special_requests),
        }
    }
}

/// Drives the RSVP form
pub struct RsvpFlow {
    repository: Arc<dyn WeddingRepository>,
}

impl RsvpFlow {
    /// Flow backed by `repository`
    pub fn new(repository: Arc<dyn WeddingRepository>) -> Self {
        Self { repository }
    }

    /// Validate and store an RSVP
    pub async fn submit(&self, form: &RsvpForm) -> Result<RsvpRecord> {
        InputValidator::validate_rsvp_form(form)?;
        let rsvp = NewRsvp::from_form(form);
        let record = self.repository.insert_rsvp(&rsvp).await?;
        info!(
            rsvp_id = %record.id,
            attending = rsvp.attending,
            guests = rsvp.number_of_guests,
            "RSVP submitted"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attendance, FoodPreference};
    use crate::repository::MockWeddingRepository;
    use uuid::Uuid;

    fn stored(rsvp: &NewRsvp) -> RsvpRecord {
        RsvpRecord {
            id: Uuid::new_v4(),
            guest_name: rsvp.guest_name.clone(),
            attending: rsvp.attending,
            number_of_guests: Some(rsvp.number_of_guests),
            created_at: None,
        }
    }

    #[test]
    fn test_blank_optionals_become_none() {
        let form = RsvpForm {
            name: " Anjali ".to_string(),
            attending: Some(Attendance::Yes),
            guests: 3,
            food_preference: Some(FoodPreference::Jain),
            drinks: true,
            song_request: "  ".to_string(),
            special_requests: "Wheelchair access".to_string(),
            ..RsvpForm::default()
        };
        let rsvp = NewRsvp::from_form(&form);
        assert_eq!(rsvp.wedding_id, None);
        assert_eq!(rsvp.guest_name, "Anjali");
        assert_eq!(rsvp.email, None);
        assert_eq!(rsvp.song_request, None);
        assert_eq!(rsvp.special_requests.as_deref(), Some("Wheelchair access"));
        assert!(rsvp.attending && rsvp.drinks_preference);
    }

    #[tokio::test]
    async fn test_unset_attendance_is_blocked() {
        let flow = RsvpFlow::new(Arc::new(MockWeddingRepository::new()));
        let form = RsvpForm {
            name: "Rohan".to_string(),
            ..RsvpForm::default()
        };
        let err = flow.submit(&form).await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill in your name and attendance status");
    }

    #[tokio::test]
    async fn test_declining_with_nothing_else_succeeds() {
        let mut mock = MockWeddingRepository::new();
        mock.expect_insert_rsvp()
            .withf(|r| !r.attending && r.number_of_guests == 1 && r.food_preference.is_none())
            .times(1)
            .returning(|r| Ok(stored(r)));
        let form = RsvpForm {
            name: "Rohan".to_string(),
            attending: Some(Attendance::No),
            ..RsvpForm::default()
        };
        let record = RsvpFlow::new(Arc::new(mock)).submit(&form).await.unwrap();
        assert!(!record.attending);
    }
}
