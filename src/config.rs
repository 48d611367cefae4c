use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::gate::GateMode;
use crate::verification::PollPolicy;

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hosted backend endpoint and credentials
    pub backend: BackendConfig,
    /// Object storage settings
    pub storage: StorageConfig,
    /// Photo upload settings
    pub uploads: UploadConfig,
    /// Email verification polling
    pub verification: VerificationConfig,
    /// Photo gate policy
    pub gate: GateConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Backend endpoint settings; an empty URL or key selects demo mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public (anon) API key
    pub anon_key: String,
    /// TCP connect timeout for backend requests
    pub connect_timeout_secs: u64,
}

/// Object storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket holding guest photos
    pub bucket: String,
    /// Lifetime of signed gallery URLs
    pub signed_url_expiry_secs: u64,
    /// Cache-Control max-age sent with uploads
    pub cache_control_secs: u64,
}

/// Photo upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Label recorded as the uploader
    pub uploader_label: String,
}

/// Email verification polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Fixed recheck interval (and the first backoff delay)
    pub poll_interval_secs: u64,
    /// Use bounded exponential backoff instead of the fixed interval
    pub backoff_enabled: bool,
    /// Largest delay between backoff checks
    pub backoff_max_delay_secs: u64,
    /// Give up after this long when backoff is enabled
    pub max_wait_secs: u64,
}

/// Photo gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// `any_non_empty` or `wedding_secret`
    pub mode: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Directory for the rolling JSON log, if any
    pub file_path: Option<String>,
    /// "json" or "text" console output
    pub format: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            connect_timeout_secs: 15,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "wedding-photos".to_string(),
            signed_url_expiry_secs: 3600,
            cache_control_secs: 3600,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            uploader_label: crate::models::DEFAULT_UPLOADER_LABEL.to_string(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            backoff_enabled: false,
            backoff_max_delay_secs: 60,
            max_wait_secs: 1800,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            mode: "any_non_empty".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // SHAADI_BACKEND__URL, SHAADI_STORAGE__BUCKET, ...
            .add_source(
                Environment::with_prefix("SHAADI")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let mut app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.backend.url = app_config.get_backend_url();
        app_config.backend.anon_key = app_config.get_anon_key();

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.backend.url.is_empty() {
            crate::validation::InputValidator::validate_backend_url(&self.backend.url)?;
        }
        if self.backend.connect_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connect_timeout_secs must be greater than 0"));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("storage bucket cannot be empty"));
        }
        if self.storage.signed_url_expiry_secs == 0 {
            return Err(anyhow::anyhow!("signed_url_expiry_secs must be greater than 0"));
        }

        if self.uploads.uploader_label.trim().is_empty() {
            return Err(anyhow::anyhow!("uploader_label cannot be empty"));
        }

        if self.verification.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("poll_interval_secs must be greater than 0"));
        }
        if self.verification.backoff_enabled {
            if self.verification.backoff_max_delay_secs < self.verification.poll_interval_secs {
                return Err(anyhow::anyhow!(
                    "backoff_max_delay_secs must be at least poll_interval_secs"
                ));
            }
            if self.verification.max_wait_secs == 0 {
                return Err(anyhow::anyhow!("max_wait_secs must be greater than 0"));
            }
        }

        self.gate.mode.parse::<GateMode>()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Demo mode: without both backend values, submissions are simulated locally
    #[must_use]
    pub fn is_demo_mode(&self) -> bool {
        self.backend.url.trim().is_empty() || self.backend.anon_key.trim().is_empty()
    }

    /// Get backend URL from environment or config
    #[must_use]
    pub fn get_backend_url(&self) -> String {
        std::env::var("SHAADI_BACKEND_URL")
            .or_else(|_| std::env::var("SUPABASE_URL"))
            .unwrap_or_else(|_| self.backend.url.clone())
    }

    /// Get the public API key from environment or config
    #[must_use]
    pub fn get_anon_key(&self) -> String {
        std::env::var("SHAADI_BACKEND_ANON_KEY")
            .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
            .unwrap_or_else(|_| self.backend.anon_key.clone())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Gate checking policy; `validate` has already rejected unknown modes
    #[must_use]
    pub fn gate_mode(&self) -> GateMode {
        self.gate.mode.parse().unwrap_or_default()
    }

    /// Verification polling policy
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_secs(self.verification.poll_interval_secs);
        if self.verification.backoff_enabled {
            PollPolicy::Backoff {
                initial: interval,
                max_delay: Duration::from_secs(self.verification.backoff_max_delay_secs),
                max_wait: Duration::from_secs(self.verification.max_wait_secs),
            }
        } else {
            PollPolicy::Fixed { interval }
        }
    }
}
