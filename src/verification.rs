//! Email verification poller.
//!
//! After signup the account must be confirmed through the emailed link before the wedding page
//! can be created. The poller checks the account's confirmation timestamp immediately and then
//! on a [`PollPolicy`] until it is confirmed, the caller abandons the wait, or (with
//! [`PollPolicy::Backoff`]) the maximum wait elapses.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics::MetricsCollector;
use crate::repository::WeddingRepository;

/// Default fixed polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// When the next check happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPolicy {
    /// Check every `interval`, forever
    Fixed {
        /// Delay between checks
        interval: Duration,
    },
    /// Double the delay after every check up to `max_delay`, giving up after `max_wait`
    Backoff {
        /// First delay
        initial: Duration,
        /// Largest delay between checks
        max_delay: Duration,
        /// Total time before giving up
        max_wait: Duration,
    },
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::Fixed {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Delay after the `attempt`-th check (zero based)
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { interval } => interval,
            Self::Backoff { initial, max_delay, .. } => {
                initial.saturating_mul(2u32.saturating_pow(attempt)).min(max_delay)
            }
        }
    }

    /// Total wait before giving up, if bounded
    #[must_use]
    pub const fn max_wait(&self) -> Option<Duration> {
        match self {
            Self::Fixed { .. } => None,
            Self::Backoff { max_wait, .. } => Some(*max_wait),
        }
    }
}

/// Poller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Still waiting for confirmation
    Pending,
    /// Email confirmed; no further checks
    Verified,
    /// Caller left the verification step
    Abandoned,
    /// Maximum wait elapsed without confirmation
    GaveUp,
}

/// Result of one on-demand check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The account's email is confirmed
    Verified,
    /// No confirmation yet
    NotYetVerified,
    /// The check itself failed; carries the backend message
    Failed(String),
}

impl CheckOutcome {
    /// Message shown to the couple
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Verified => "Email verified successfully!",
            Self::NotYetVerified => {
                "Email not yet verified. Please check your email and click the verification link."
            }
            Self::Failed(_) => "Error checking verification status. Please try again.",
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NotYetVerified => "pending",
            Self::Failed(_) => "error",
        }
    }
}

/// Result of asking for the confirmation email again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// The backend accepted the request
    Sent,
    /// The request failed; carries the backend message
    Failed(String),
}

impl ResendOutcome {
    /// Message shown to the couple
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Sent => "New verification email sent! Please check your inbox.".to_string(),
            Self::Failed(reason) => format!("Error: {reason}"),
        }
    }
}

/// Checks whether the signed-up account has confirmed its email
pub struct VerificationPoller {
    repository: Arc<dyn WeddingRepository>,
    policy: PollPolicy,
    metrics: Arc<MetricsCollector>,
}

impl VerificationPoller {
    /// Poller checking the current account on `policy`'s schedule
    pub fn new(repository: Arc<dyn WeddingRepository>, policy: PollPolicy) -> Self {
        Self {
            repository,
            policy,
            metrics: Arc::new(MetricsCollector::default()),
        }
    }

    /// Report checks to a shared collector
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// One check of the confirmation timestamp
    pub async fn check_now(&self) -> CheckOutcome {
        let outcome = match self.repository.current_user().await {
            Ok(Some(user)) if user.is_confirmed() => CheckOutcome::Verified,
            Ok(_) => CheckOutcome::NotYetVerified,
            Err(e) => CheckOutcome::Failed(e.to_string()),
        };
        self.metrics.record_verification_check(outcome.label());
        debug!(outcome = outcome.label(), "Verification check");
        outcome
    }

    /// Send the confirmation email again
    pub async fn resend(&self, email: &str) -> ResendOutcome {
        match self.repository.resend_confirmation(email).await {
            Ok(()) => {
                info!(email, "Verification email resent");
                ResendOutcome::Sent
            }
            Err(e) => {
                warn!(email, error = %e, "Failed to resend verification email");
                ResendOutcome::Failed(e.user_message())
            }
        }
    }

    /// Poll until verified, abandoned through `cancel`, or out of time
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> PollState {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            if *cancel.borrow() {
                return PollState::Abandoned;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.changed() => return PollState::Abandoned,
                outcome = self.check_now() => outcome,
            };
            // a check that lands after abandonment is ignored
            if *cancel.borrow() {
                return PollState::Abandoned;
            }
            match outcome {
                CheckOutcome::Verified => {
                    info!(checks = attempt + 1, "Email verified");
                    return PollState::Verified;
                }
                CheckOutcome::NotYetVerified => {}
                CheckOutcome::Failed(reason) => warn!(error = %reason, "Verification check failed, will retry"),
            }

            let mut delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            if let Some(max_wait) = self.policy.max_wait() {
                let elapsed = started.elapsed();
                if elapsed >= max_wait {
                    warn!(checks = attempt, waited_secs = elapsed.as_secs(), "Gave up waiting for email verification");
                    return PollState::GaveUp;
                }
                delay = delay.min(max_wait - elapsed);
            }

            tokio::select! {
                biased;
                _ = cancel.changed() => return PollState::Abandoned,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Run on a background task
    pub fn spawn(self) -> PollerHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PollState::Pending);
        let task = tokio::spawn(async move {
            let state = self.run(cancel_rx).await;
            // the handle may already be gone
            let _ = state_tx.send(state);
            state
        });
        PollerHandle {
            cancel: cancel_tx,
            state: state_rx,
            task,
            finished: None,
        }
    }
}

/// Control over a spawned poller
pub struct PollerHandle {
    cancel: watch::Sender<bool>,
    state: watch::Receiver<PollState>,
    task: JoinHandle<PollState>,
    finished: Option<PollState>,
}

impl PollerHandle {
    /// Stop polling; any check still in flight is ignored
    pub fn abandon(&self) {
        self.cancel.send_replace(true);
    }

    /// Latest known state
    #[must_use]
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Wait for the poller to finish. Safe to call again, or to drop mid-wait.
    pub async fn wait(&mut self) -> PollState {
        if let Some(state) = self.finished {
            return state;
        }
        let state = match (&mut self.task).await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Verification poller task ended unexpectedly");
                PollState::Abandoned
            }
        };
        self.finished = Some(state);
        state
    }
}
