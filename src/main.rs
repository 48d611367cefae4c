#![allow(clippy::print_stdout)] // command output goes to stdout, logs to stderr

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shaadi_planner::config::AppConfig;
use shaadi_planner::gallery::{download_photo, GalleryLoader};
use shaadi_planner::gate::{AccessGate, GateOutcome, GRANTED_MESSAGE};
use shaadi_planner::logging::{init_logging, OperationTimer};
use shaadi_planner::metrics::MetricsCollector;
use shaadi_planner::models::{Attendance, FoodPreference, RsvpForm, SelectedFile, SignupForm};
use shaadi_planner::rsvp::{RsvpFlow, SUBMITTED_MESSAGE};
use shaadi_planner::signup::{SignupFlow, SignupOutcome, CREATED_MESSAGE};
use shaadi_planner::upload::{UploadPipeline, UploadSession};
use shaadi_planner::verification::{CheckOutcome, PollState, VerificationPoller};
use shaadi_planner::{DemoRepo, PlannerError, SupabaseRepo, WeddingRepository};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit console logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what the planner offers
    Landing,
    /// Create the couple's account and wedding page
    Signup {
        /// Bride's name
        #[arg(long)]
        bride: String,

        /// Groom's name
        #[arg(long)]
        groom: String,

        /// Contact email, also the login
        #[arg(short, long)]
        email: String,

        /// Contact phone
        #[arg(long, default_value = "")]
        phone: String,

        /// Wedding date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Venue, e.g. "Taj Palace, New Delhi"
        #[arg(long, default_value = "")]
        venue: String,

        /// Account password, also the photo upload password
        #[arg(short, long)]
        password: String,

        /// Return after signup instead of waiting for the verification link
        #[arg(long)]
        no_wait: bool,
    },
    /// Wait for email verification and create the wedding page
    Verify {
        /// Email used at signup
        #[arg(short, long)]
        email: String,

        /// Password used at signup
        #[arg(short, long)]
        password: String,

        /// Send the verification email again first
        #[arg(long)]
        resend: bool,

        /// Check once instead of waiting
        #[arg(long)]
        once: bool,
    },
    /// Submit an RSVP
    Rsvp {
        /// Guest name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Guest email
        #[arg(short, long, default_value = "")]
        email: String,

        /// Attending: yes or no
        #[arg(short, long)]
        attending: Option<String>,

        /// Party size including yourself (1-4)
        #[arg(short, long, default_value_t = 1)]
        guests: u8,

        /// Food preference: veg, nonveg, vegan or jain
        #[arg(short, long)]
        food: Option<String>,

        /// Drinks: yes or no
        #[arg(long)]
        drinks: Option<String>,

        /// Song request for the sangeet
        #[arg(long, default_value = "")]
        song: String,

        /// Anything else the couple should know
        #[arg(long, default_value = "")]
        requests: String,
    },
    /// Upload photos to the wedding album
    Upload {
        /// Wedding password
        #[arg(short, long)]
        password: String,

        /// Wedding to file the photos under (defaults to the most recent one)
        #[arg(short, long)]
        wedding_id: Option<Uuid>,

        /// Image files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the wedding gallery
    Gallery {
        /// Wedding password
        #[arg(short, long)]
        password: String,

        /// Wedding whose password to check (defaults to the most recent one)
        #[arg(short, long)]
        wedding_id: Option<Uuid>,

        /// Save every shown photo into this directory
        #[arg(short, long)]
        download: Option<PathBuf>,
    },
}

/// The selected backend; demo mode when no URL or key is configured
enum Backend {
    Hosted(Arc<SupabaseRepo>),
    Demo(Arc<DemoRepo>),
}

impl Backend {
    fn connect(config: &AppConfig) -> Result<Self> {
        if config.is_demo_mode() {
            warn!("Backend URL or key missing, running in demo mode");
            return Ok(Self::Demo(Arc::new(DemoRepo::new())));
        }
        let repo = SupabaseRepo::from_config(config).context("Failed to create backend client")?;
        info!(url = %config.backend.url, "Using hosted backend");
        Ok(Self::Hosted(Arc::new(repo)))
    }

    fn repository(&self) -> Arc<dyn WeddingRepository> {
        match self {
            Self::Hosted(repo) => Arc::clone(repo) as Arc<dyn WeddingRepository>,
            Self::Demo(repo) => Arc::clone(repo) as Arc<dyn WeddingRepository>,
        }
    }

    const fn is_demo(&self) -> bool {
        matches!(self, Self::Demo(_))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; the guard flushes the log file on exit
    let json_console = cli.json_logs || config.logging.format == "json";
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        json_console,
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting shaadi-planner");

    let backend = Backend::connect(&config)?;
    let metrics = Arc::new(MetricsCollector::default());
    if backend.is_demo() {
        println!("Demo mode: no backend configured, submissions are simulated locally.");
    }

    let (operation, result) = match cli.command {
        Commands::Landing => ("landing", show_landing(&backend)),
        Commands::Signup {
            bride,
            groom,
            email,
            phone,
            date,
            venue,
            password,
            no_wait,
        } => {
            let form = SignupForm {
                bride_name: bride,
                groom_name: groom,
                email,
                phone,
                wedding_date: date,
                venue,
                password,
            };
            ("signup", signup(&config, &backend, &metrics, form, no_wait).await)
        }
        Commands::Verify {
            email,
            password,
            resend,
            once,
        } => ("verify", verify(&config, &backend, &metrics, &email, &password, resend, once).await),
        Commands::Rsvp {
            name,
            email,
            attending,
            guests,
            food,
            drinks,
            song,
            requests,
        } => {
            let form = rsvp_form(name, email, attending.as_deref(), guests, food.as_deref(), drinks.as_deref(), song, requests);
            ("rsvp", submit_rsvp(&backend, form).await)
        }
        Commands::Upload {
            password,
            wedding_id,
            files,
        } => ("upload", upload(&config, &backend, &metrics, &password, wedding_id, &files).await),
        Commands::Gallery {
            password,
            wedding_id,
            download,
        } => ("gallery", gallery(&config, &backend, &metrics, &password, wedding_id, download.as_deref()).await),
    };

    debug!(metrics = ?metrics.snapshot(), "Command finished");
    if let Err(e) = result {
        report_failure(&metrics, operation, &e);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Validation problems are shown as-is; anything else is logged and replaced by a generic message
fn report_failure(metrics: &MetricsCollector, operation: &'static str, err: &anyhow::Error) {
    match err.downcast_ref::<PlannerError>() {
        Some(PlannerError::Validation(message)) => {
            metrics.record_error("validation", operation);
            println!("{message}");
        }
        Some(PlannerError::AccessDenied) => {
            metrics.record_error("access_denied", operation);
            println!("{err}");
        }
        Some(planner) => {
            metrics.record_error(planner.kind(), operation);
            error!(operation, error = %err, "Command failed");
            println!("{GENERIC_FAILURE}");
        }
        None => {
            metrics.record_error("other", operation);
            error!(operation, error = %err, "Command failed");
            println!("{GENERIC_FAILURE}");
        }
    }
}

fn show_landing(backend: &Backend) -> Result<()> {
    println!("Shaadi Planner - plan your Indian wedding");
    println!();
    println!("  signup   Create your wedding page (couples)");
    println!("  verify   Finish signup once your email is confirmed");
    println!("  rsvp     Let the couple know you are coming (guests)");
    println!("  upload   Share your photos in the wedding album");
    println!("  gallery  Browse the wedding album");
    println!();
    let mode = if backend.is_demo() { "demo" } else { "hosted" };
    println!("Backend: {mode}");
    Ok(())
}

/// Couple signup, waiting for verification unless `no_wait`
async fn signup(
    config: &AppConfig, backend: &Backend, metrics: &Arc<MetricsCollector>, form: SignupForm, no_wait: bool,
) -> Result<()> {
    let _timer = OperationTimer::new("signup");
    let flow = SignupFlow::new(backend.repository());
    let email = form.email.trim().to_string();

    let pending = match flow.submit(form).await? {
        SignupOutcome::Created(record) => {
            println!("{CREATED_MESSAGE}");
            println!("Wedding id: {}", record.id);
            return Ok(());
        }
        SignupOutcome::VerificationRequired(pending) => pending,
    };

    println!("Almost there! We sent a verification link to {email}.");
    println!("Click the link in that email to activate your wedding page.");
    if no_wait {
        println!("Run `shaadi-planner verify --email {email} --password <password>` once you have confirmed.");
        return Ok(());
    }

    let poller = VerificationPoller::new(backend.repository(), config.poll_policy()).with_metrics(Arc::clone(metrics));
    match wait_for_verification(poller).await {
        PollState::Verified => {
            println!("Email verified successfully!");
            let record = flow.complete(&pending).await?;
            println!("{CREATED_MESSAGE}");
            println!("Wedding id: {}", record.id);
        }
        state => print_unverified(state, &email),
    }
    Ok(())
}

/// Verification step on its own, for a signup made earlier
async fn verify(
    config: &AppConfig, backend: &Backend, metrics: &Arc<MetricsCollector>, email: &str, password: &str,
    resend: bool, once: bool,
) -> Result<()> {
    match backend {
        Backend::Hosted(repo) => repo.remember_credentials(email.trim(), password).await,
        Backend::Demo(_) => {
            println!("Demo accounts are confirmed at signup; there is nothing to verify.");
            return Ok(());
        }
    }

    let poller = VerificationPoller::new(backend.repository(), config.poll_policy()).with_metrics(Arc::clone(metrics));
    if resend {
        println!("{}", poller.resend(email.trim()).await.message());
    }

    let state = if once {
        let outcome = poller.check_now().await;
        println!("{}", outcome.message());
        if outcome != CheckOutcome::Verified {
            return Ok(());
        }
        PollState::Verified
    } else {
        println!("Waiting for {email} to be verified (Ctrl-C to stop)...");
        wait_for_verification(poller).await
    };

    if state != PollState::Verified {
        print_unverified(state, email);
        return Ok(());
    }

    let record = SignupFlow::new(backend.repository()).resume(password).await?;
    println!("{CREATED_MESSAGE}");
    println!("Wedding id: {}", record.id);
    Ok(())
}

async fn wait_for_verification(poller: VerificationPoller) -> PollState {
    let mut handle = poller.spawn();
    tokio::select! {
        state = handle.wait() => state,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, abandoning verification wait");
            handle.abandon();
            handle.wait().await
        }
    }
}

fn print_unverified(state: PollState, email: &str) {
    match state {
        PollState::GaveUp => {
            println!("Still no verification for {email}. Run `shaadi-planner verify --email {email} --password <password> --resend` to get a new link.");
        }
        _ => println!("Stopped waiting. Run `shaadi-planner verify` after confirming {email}."),
    }
}

#[allow(clippy::too_many_arguments)]
fn rsvp_form(
    name: String, email: String, attending: Option<&str>, guests: u8, food: Option<&str>, drinks: Option<&str>,
    song: String, requests: String,
) -> Result<RsvpForm> {
    let attending = attending.map(str::parse::<Attendance>).transpose()?;
    let food_preference = food.map(str::parse::<FoodPreference>).transpose()?;
    Ok(RsvpForm {
        name,
        email,
        attending,
        guests,
        food_preference,
        drinks: drinks.is_some_and(|d| d.trim().eq_ignore_ascii_case("yes")),
        song_request: song,
        special_requests: requests,
    })
}

async fn submit_rsvp(backend: &Backend, form: Result<RsvpForm>) -> Result<()> {
    let form = form?;
    RsvpFlow::new(backend.repository()).submit(&form).await?;
    println!("{SUBMITTED_MESSAGE}");
    Ok(())
}

/// Open the gate for a photo command, printing the outcome
async fn open_gate(config: &AppConfig, backend: &Backend, password: &str, wedding_id: Option<Uuid>) -> Result<Option<AccessGate>> {
    let mut gate = AccessGate::new(config.gate_mode(), backend.repository()).for_wedding(wedding_id);
    match gate.submit(password).await? {
        GateOutcome::Granted => {
            println!("{GRANTED_MESSAGE}");
            Ok(Some(gate))
        }
        GateOutcome::Rejected(reason) => {
            println!("{reason}");
            Ok(None)
        }
    }
}

async fn upload(
    config: &AppConfig, backend: &Backend, metrics: &Arc<MetricsCollector>, password: &str, wedding_id: Option<Uuid>,
    paths: &[PathBuf],
) -> Result<()> {
    let _timer = OperationTimer::new("upload");
    let Some(gate) = open_gate(config, backend, password, wedding_id).await? else {
        return Ok(());
    };

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
                files.push(SelectedFile::new(name, bytes));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                println!("Skipping {}: {e}", path.display());
            }
        }
    }
    let total_mb: f64 = files.iter().map(SelectedFile::size_mb).sum();
    println!("Selected {} photo(s), {total_mb:.2} MB", files.len());

    let pipeline = UploadPipeline::new(backend.repository(), config.uploads.uploader_label.clone())
        .for_wedding(wedding_id)
        .with_metrics(Arc::clone(metrics));
    let mut session = UploadSession::new(gate, pipeline);
    session.select(files);

    let Some(report) = session.upload().await? else {
        println!("No photos selected.");
        return Ok(());
    };
    for outcome in &report.outcomes {
        if let Err(reason) = &outcome.result {
            println!("  {}: {reason}", outcome.file_name);
        }
    }
    println!("{}", report.summary());
    Ok(())
}

async fn gallery(
    config: &AppConfig, backend: &Backend, metrics: &Arc<MetricsCollector>, password: &str, wedding_id: Option<Uuid>,
    download: Option<&Path>,
) -> Result<()> {
    let _timer = OperationTimer::new("gallery");
    let Some(gate) = open_gate(config, backend, password, wedding_id).await? else {
        return Ok(());
    };
    gate.require()?;

    let expiry = Duration::from_secs(config.storage.signed_url_expiry_secs);
    let view = GalleryLoader::new(backend.repository(), expiry)
        .with_metrics(Arc::clone(metrics))
        .load()
        .await;

    println!("{}", view.status);
    for photo in &view.photos {
        println!(
            "  {}  by {}  {}  {}",
            photo.file_name,
            photo.uploaded_by,
            photo.uploaded_at.format("%Y-%m-%d"),
            photo.url
        );
    }

    if let Some(dir) = download {
        tokio::fs::create_dir_all(dir).await?;
        let http = reqwest::Client::new();
        for photo in &view.photos {
            match download_photo(&http, photo, dir).await {
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => {
                    warn!(file = %photo.file_name, error = %e, "Download failed");
                    println!("Could not download {}: {}", photo.file_name, e.user_message());
                }
            }
        }
    }
    Ok(())
}
