//! HTTP implementation of [`WeddingRepository`] against a Supabase project.
//!
//! Auth goes through `/auth/v1`, table access through the PostgREST endpoint at `/rest/v1`,
//! and photos through `/storage/v1`. Backend error bodies are surfaced verbatim as
//! [`PlannerError::Backend`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{PlannerError, Result};
use crate::models::{AuthUser, NewPhoto, NewRsvp, NewWedding, PhotoRecord, RsvpRecord, SignupMetadata, WeddingRecord};
use crate::repository::WeddingRepository;
use crate::validation::InputValidator;

const WEDDINGS_TABLE: &str = "weddings";
const RSVPS_TABLE: &str = "rsvps";
const PHOTOS_TABLE: &str = "photos";

/// Error code the auth service returns for a password login before confirmation
const EMAIL_NOT_CONFIRMED: &str = "email_not_confirmed";

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PasswordRow {
    photo_upload_password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignedUrl {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

struct Credentials {
    email: String,
    password: SecretString,
}

/// Supabase-backed repository
pub struct SupabaseRepo {
    http: Client,
    base_url: String,
    anon_key: SecretString,
    bucket: String,
    cache_control_secs: u64,
    access_token: RwLock<Option<SecretString>>,
    credentials: RwLock<Option<Credentials>>,
}

impl SupabaseRepo {
    /// Create a repository for the project at `base_url`
    pub fn new(base_url: &str, anon_key: &str, bucket: &str, connect_timeout: Duration) -> Result<Self> {
        InputValidator::validate_backend_url(base_url)?;
        if anon_key.trim().is_empty() {
            return Err(PlannerError::InvalidConfig("Backend API key cannot be empty".to_string()));
        }

        let http = Client::builder().connect_timeout(connect_timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: SecretString::from(anon_key.to_string()),
            bucket: bucket.to_string(),
            cache_control_secs: 3600,
            access_token: RwLock::new(None),
            credentials: RwLock::new(None),
        })
    }

    /// Create a repository from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut repo = Self::new(
            &config.backend.url,
            &config.backend.anon_key,
            &config.storage.bucket,
            Duration::from_secs(config.backend.connect_timeout_secs),
        )?;
        repo.cache_control_secs = config.storage.cache_control_secs;
        Ok(repo)
    }

    /// Remember login credentials so a session can be re-established while waiting for the
    /// email confirmation (the confirmation link itself opens in a browser, not here).
    pub async fn remember_credentials(&self, email: &str, password: &str) {
        *self.credentials.write().await = Some(Credentials {
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
        });
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn table_url(&self, table: &str) -> String {
        self.endpoint(&format!("/rest/v1/{table}"))
    }

    fn object_url(&self, path: &str) -> String {
        self.endpoint(&format!("/storage/v1/object/{}/{}", self.bucket, path.trim_start_matches('/')))
    }

    fn sign_url(&self, path: &str) -> String {
        self.endpoint(&format!("/storage/v1/object/sign/{}/{}", self.bucket, path.trim_start_matches('/')))
    }

    /// Attach the API key and the session token (or the anon key when signed out)
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("apikey", self.anon_key.expose_secret());
        match self.access_token.read().await.as_ref() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request.bearer_auth(self.anon_key.expose_secret()),
        }
    }

    /// Store the session token from an auth response, returning its user object
    async fn absorb_auth_response(&self, body: Value) -> Result<AuthUser> {
        if let Some(token) = body.get("access_token").and_then(Value::as_str) {
            *self.access_token.write().await = Some(SecretString::from(token.to_string()));
            let user = body
                .get("user")
                .cloned()
                .ok_or_else(|| PlannerError::Backend("auth response missing user".to_string()))?;
            return Ok(serde_json::from_value(user)?);
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn insert_returning<T, R>(&self, table: &str, row: &T) -> Result<R>
    where
        T: serde::Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        debug!(table, "Inserting record");
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&[row]);
        let response = check(self.authorize(request).await.send().await?).await?;
        let mut rows: Vec<R> = response.json().await?;
        if rows.is_empty() {
            return Err(PlannerError::Backend(format!("insert into {table} returned no rows")));
        }
        Ok(rows.swap_remove(0))
    }

    async fn password_login(&self) -> Result<Option<AuthUser>> {
        let credentials = self.credentials.read().await;
        let Some(credentials) = credentials.as_ref() else {
            return Ok(None);
        };

        let response = self
            .http
            .post(self.endpoint("/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password.expose_secret(),
            }))
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await?;
            if is_email_not_confirmed(&body) {
                debug!("Email not confirmed yet");
                return Ok(None);
            }
            return Err(PlannerError::Backend(error_message(StatusCode::BAD_REQUEST, &body)));
        }

        let body: Value = check(response).await?.json().await?;
        drop(credentials);
        self.absorb_auth_response(body).await.map(Some)
    }
}

/// Turn a non-success response into a backend error carrying the service's own message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PlannerError::Backend(error_message(status, &body)))
}

/// Extract the human-readable message from an auth, PostgREST or storage error body
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str))
        })
        .map(ToString::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            }
        })
}

fn is_email_not_confirmed(body: &str) -> bool {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code_matches = parsed
        .as_ref()
        .and_then(|value| value.get("error_code").and_then(Value::as_str))
        .is_some_and(|code| code == EMAIL_NOT_CONFIRMED);
    code_matches || body.to_lowercase().contains("email not confirmed")
}

fn content_type_for(path: &str) -> &'static str {
    match InputValidator::file_extension(path).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl WeddingRepository for SupabaseRepo {
    async fn sign_up(&self, email: &str, password: &str, metadata: &SignupMetadata) -> Result<AuthUser> {
        debug!(email, "Creating account");
        let response = self
            .http
            .post(self.endpoint("/auth/v1/signup"))
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: Value = check(response).await?.json().await?;
        self.remember_credentials(email, password).await;
        self.absorb_auth_response(body).await
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        let has_session = self.access_token.read().await.is_some();
        if has_session {
            let request = self.http.get(self.endpoint("/auth/v1/user"));
            let response = self.authorize(request).await.send().await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                let user: AuthUser = check(response).await?.json().await?;
                return Ok(Some(user));
            }
            warn!("Session token rejected, signing in again");
            *self.access_token.write().await = None;
        }
        self.password_login().await
    }

    async fn resend_confirmation(&self, email: &str) -> Result<()> {
        debug!(email, "Resending confirmation email");
        let response = self
            .http
            .post(self.endpoint("/auth/v1/resend"))
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn insert_wedding(&self, wedding: &NewWedding) -> Result<WeddingRecord> {
        self.insert_returning(WEDDINGS_TABLE, wedding).await
    }

    async fn latest_wedding_id(&self) -> Result<Option<Uuid>> {
        let request = self
            .http
            .get(self.table_url(WEDDINGS_TABLE))
            .query(&[("select", "id"), ("order", "created_at.desc"), ("limit", "1")]);
        let rows: Vec<IdRow> = check(self.authorize(request).await.send().await?).await?.json().await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }

    async fn wedding_upload_password(&self, wedding_id: Uuid) -> Result<Option<String>> {
        let id_filter = format!("eq.{wedding_id}");
        let request = self.http.get(self.table_url(WEDDINGS_TABLE)).query(&[
            ("select", "photo_upload_password"),
            ("id", id_filter.as_str()),
            ("limit", "1"),
        ]);
        let rows: Vec<PasswordRow> = check(self.authorize(request).await.send().await?).await?.json().await?;
        Ok(rows.into_iter().next().and_then(|row| row.photo_upload_password))
    }

    async fn insert_rsvp(&self, rsvp: &NewRsvp) -> Result<RsvpRecord> {
        self.insert_returning(RSVPS_TABLE, rsvp).await
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoRecord> {
        self.insert_returning(PHOTOS_TABLE, photo).await
    }

    async fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
        let request = self
            .http
            .get(self.table_url(PHOTOS_TABLE))
            .query(&[("select", "*"), ("order", "uploaded_at.desc")]);
        let rows = check(self.authorize(request).await.send().await?).await?.json().await?;
        Ok(rows)
    }

    async fn upload_object(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        debug!(path, size = bytes.len(), "Uploading object");
        let request = self
            .http
            .post(self.object_url(path))
            .header("cache-control", format!("max-age={}", self.cache_control_secs))
            .header("x-upsert", "false")
            .header("content-type", content_type_for(path))
            .body(bytes);
        check(self.authorize(request).await.send().await?).await?;
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> Result<String> {
        let request = self
            .http
            .post(self.sign_url(path))
            .json(&json!({ "expiresIn": expires_in.as_secs() }));
        let signed: SignedUrl = check(self.authorize(request).await.send().await?).await?.json().await?;
        Ok(join_signed_url(&self.base_url, &signed.signed_url))
    }
}

/// The storage API answers with a path relative to `/storage/v1`
fn join_signed_url(base_url: &str, signed: &str) -> String {
    if signed.starts_with("http://") || signed.starts_with("https://") {
        return signed.to_string();
    }
    format!("{}/storage/v1/{}", base_url.trim_end_matches('/'), signed.trim_start_matches('/'))
}
