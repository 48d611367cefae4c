//! Shaadi Planner - Indian wedding planning on a hosted backend
//!
//! A Rust library for the couple and guest side of an Indian wedding site, with
//! persistence, authentication and file storage delegated to a Supabase-compatible
//! backend-as-a-service.
//!
//! # Features
//!
//! - Couple signup with an email verification step
//! - Guest RSVPs
//! - Password-gated guest photo upload and gallery
//! - Demo mode with an in-memory backend when no backend is configured

/// Configuration management
pub mod config;
/// In-memory backend for demo mode
pub mod demo;
/// Error types
pub mod error;
/// Photo gallery loading and downloads
pub mod gallery;
/// Password gate for the photo views
pub mod gate;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Backend access trait
pub mod repository;
/// Guest RSVPs
pub mod rsvp;
/// Couple signup
pub mod signup;
/// HTTP backend client
pub mod supabase;
/// Guest photo upload
pub mod upload;
/// Input validation and sanitization
pub mod validation;
/// Email verification polling
pub mod verification;

// Re-export key components for easier access
pub use demo::DemoRepo;
pub use error::{PlannerError, Result};
pub use gallery::{GalleryLoader, GalleryStatus, GalleryView};
pub use gate::{AccessGate, GateMode, GateOutcome};
pub use repository::WeddingRepository;
pub use supabase::SupabaseRepo;
pub use upload::{UploadPipeline, UploadReport, UploadSession, UploadSummary};
pub use verification::{PollPolicy, PollState, VerificationPoller};
