//! Integration tests for the signup and RSVP flows against the demo backend

mod common;

use std::sync::Arc;

use common::signup_form;
use shaadi_planner::gate::{AccessGate, GateMode, GateOutcome};
use shaadi_planner::models::{Attendance, FoodPreference, RsvpForm};
use shaadi_planner::rsvp::RsvpFlow;
use shaadi_planner::signup::{SignupFlow, SignupOutcome};
use shaadi_planner::verification::{CheckOutcome, PollPolicy, VerificationPoller};
use shaadi_planner::{DemoRepo, WeddingRepository};

#[tokio::test]
async fn test_demo_signup_creates_wedding_immediately() {
    let repo = Arc::new(DemoRepo::new());
    let outcome = SignupFlow::new(repo.clone()).submit(signup_form()).await.unwrap();

    let SignupOutcome::Created(record) = outcome else {
        panic!("demo accounts are confirmed at signup");
    };
    assert_eq!(record.couple_names, "Ananya & Vikram");
    assert_eq!(record.venue_name.as_deref(), Some("Leela Palace"));
    assert_eq!(repo.latest_wedding_id().await.unwrap(), Some(record.id));
    assert_eq!(repo.weddings().await.len(), 1);
}

#[tokio::test]
async fn test_signup_password_opens_secret_gate() {
    let repo = Arc::new(DemoRepo::new());
    SignupFlow::new(repo.clone()).submit(signup_form()).await.unwrap();

    let mut gate = AccessGate::new(GateMode::WeddingSecret, repo);
    assert!(matches!(gate.submit("phere").await.unwrap(), GateOutcome::Rejected(_)));
    assert_eq!(gate.submit("phere2026").await.unwrap(), GateOutcome::Granted);
}

#[tokio::test]
async fn test_invalid_signup_stores_nothing() {
    let repo = Arc::new(DemoRepo::new());
    let mut form = signup_form();
    form.groom_name = "   ".to_string();

    let err = SignupFlow::new(repo.clone()).submit(form).await.unwrap_err();
    assert_eq!(err.to_string(), "Please fill in all required fields");
    assert!(repo.current_user().await.unwrap().is_none());
    assert!(repo.weddings().await.is_empty());
}

#[tokio::test]
async fn test_verification_check_after_demo_signup() {
    let repo = Arc::new(DemoRepo::new());
    let poller = VerificationPoller::new(repo.clone(), PollPolicy::default());
    assert_eq!(poller.check_now().await, CheckOutcome::NotYetVerified);

    SignupFlow::new(repo.clone()).submit(signup_form()).await.unwrap();
    assert_eq!(poller.check_now().await, CheckOutcome::Verified);
    assert_eq!(poller.resend("ananya.vikram@example.com").await.message(), "New verification email sent! Please check your inbox.");
}

#[tokio::test]
async fn test_full_rsvp_is_stored() {
    let repo = Arc::new(DemoRepo::new());
    let form = RsvpForm {
        name: "Kavya Iyer".to_string(),
        email: "kavya@example.com".to_string(),
        attending: Some(Attendance::Yes),
        guests: 4,
        food_preference: Some(FoodPreference::Vegetarian),
        drinks: false,
        song_request: "London Thumakda".to_string(),
        special_requests: String::new(),
    };

    let record = RsvpFlow::new(repo.clone()).submit(&form).await.unwrap();
    assert!(record.attending);
    assert_eq!(record.number_of_guests, Some(4));

    let stored = repo.rsvps().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].wedding_id, None);
    assert_eq!(stored[0].food_preference, Some(FoodPreference::Vegetarian));
    assert_eq!(stored[0].song_request.as_deref(), Some("London Thumakda"));
    assert_eq!(stored[0].special_requests, None);
}

#[tokio::test]
async fn test_rsvp_guest_count_out_of_range() {
    let repo = Arc::new(DemoRepo::new());
    let form = RsvpForm {
        name: "Kavya".to_string(),
        attending: Some(Attendance::Yes),
        guests: 5,
        ..RsvpForm::default()
    };
    assert!(RsvpFlow::new(repo.clone()).submit(&form).await.is_err());
    assert!(repo.rsvps().await.is_empty());
}

#[tokio::test]
async fn test_rsvp_wire_format() {
    let form = RsvpForm {
        name: "Dev".to_string(),
        attending: Some(Attendance::No),
        food_preference: Some(FoodPreference::NonVegetarian),
        ..RsvpForm::default()
    };
    let json = serde_json::to_value(shaadi_planner::models::NewRsvp::from_form(&form)).unwrap();
    assert_eq!(json["attending"], false);
    assert_eq!(json["food_preference"], "nonveg");
    assert_eq!(json["number_of_guests"], 1);
    assert!(json["wedding_id"].is_null());
}
