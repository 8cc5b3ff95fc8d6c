//! Access tokens for the Drive and Sheets APIs.
//!
//! Three credential shapes are accepted: a bearer token supplied directly (for
//! example from `gcloud auth print-access-token`), a `service_account` key
//! whose signed assertion is exchanged at the OAuth endpoint, or an
//! `authorized_user` file whose refresh token is exchanged the same way.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::khaapa::insights::error::{Result, ToolError};

/// Read-only scopes the credentials must grant.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/drive.readonly",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime requested for service-account assertions; Google caps it at one hour.
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Credential file contents, keyed by the `type` field Google tooling writes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialFile {
    AuthorizedUser {
        client_id: String,
        #[serde(default)]
        client_secret: Option<String>,
        refresh_token: String,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
    ServiceAccount {
        client_email: String,
        private_key: String,
        #[serde(default)]
        private_key_id: Option<String>,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
}

/// Claims of the JWT-bearer assertion sent for a service account.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct RefreshCredentials {
    client_id: String,
    client_secret: Option<String>,
    refresh_token: String,
    token_uri: String,
}

/// Hands out bearer tokens, refreshing them when they are about to expire.
#[derive(Debug)]
pub struct Authenticator {
    kind: AuthKind,
    cached: Mutex<Option<CachedToken>>,
}

struct ServiceAccountCredentials {
    client_email: String,
    key: EncodingKey,
    key_id: Option<String>,
    token_uri: String,
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("key_id", &self.key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountCredentials {
    /// Signs an RS256 assertion asking for [`SCOPES`], valid from `now`.
    fn assertion(&self, now: SystemTime) -> Result<String> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|error| ToolError::Credentials(format!("system clock: {error}")))?
            .as_secs();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: SCOPES.join(" "),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME.as_secs(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|error| ToolError::Credentials(format!("signing assertion: {error}")))
    }
}

#[derive(Debug)]
enum AuthKind {
    Static(String),
    Refresh(RefreshCredentials),
    ServiceAccount(ServiceAccountCredentials),
}

impl Authenticator {
    /// Uses a pre-issued access token for every request.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Static(token.into()),
            cached: Mutex::new(None),
        }
    }

    /// Loads a `service_account` or `authorized_user` credential file.
    pub fn from_credentials_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::Credentials(format!(
                "credential file not found at {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let file: CredentialFile = serde_json::from_str(&content)
            .map_err(|error| ToolError::Credentials(format!("{}: {error}", path.display())))?;
        Self::from_credential_file(file)
    }

    pub fn from_credential_file(file: CredentialFile) -> Result<Self> {
        match file {
            CredentialFile::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
                token_uri,
            } => Ok(Self {
                kind: AuthKind::Refresh(RefreshCredentials {
                    client_id,
                    client_secret,
                    refresh_token,
                    token_uri,
                }),
                cached: Mutex::new(None),
            }),
            CredentialFile::ServiceAccount {
                client_email,
                private_key,
                private_key_id,
                token_uri,
            } => {
                let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|error| {
                    ToolError::Credentials(format!("private key for {client_email}: {error}"))
                })?;
                Ok(Self {
                    kind: AuthKind::ServiceAccount(ServiceAccountCredentials {
                        client_email,
                        key,
                        key_id: private_key_id,
                        token_uri,
                    }),
                    cached: Mutex::new(None),
                })
            }
        }
    }

    /// Returns a bearer token valid for at least [`EXPIRY_MARGIN`].
    pub fn access_token(&self, client: &Client) -> Result<String> {
        if let AuthKind::Static(token) = &self.kind {
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock();
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
            debug!("access token expiring; refreshing");
        }

        let token = match &self.kind {
            AuthKind::Static(token) => return Ok(token.clone()),
            AuthKind::Refresh(credentials) => refresh(client, credentials)?,
            AuthKind::ServiceAccount(credentials) => {
                let assertion = credentials.assertion(SystemTime::now())?;
                let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
                request_token(client, &credentials.token_uri, &form)?
            }
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drops any cached token so the next request refreshes it.
    pub fn invalidate(&self) {
        self.cached.lock().take();
    }
}

fn refresh(client: &Client, credentials: &RefreshCredentials) -> Result<CachedToken> {
    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("client_id", credentials.client_id.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
    ];
    if let Some(secret) = credentials.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    request_token(client, &credentials.token_uri, &form)
}

/// Posts a token grant and reads the access token out of the response.
fn request_token(client: &Client, token_uri: &str, form: &[(&str, &str)]) -> Result<CachedToken> {
    let response = client
        .post(token_uri)
        .form(form)
        .send()
        .map_err(|error| ToolError::SourceUnavailable(format!("token refresh failed: {error}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ToolError::SourceUnavailable(format!(
            "token refresh failed ({status}): {body}"
        )));
    }

    let body: TokenResponse = response.json()?;
    let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
    info!(expires_in = lifetime.as_secs(), "obtained access token");
    Ok(CachedToken {
        value: body.access_token,
        expires_at: Instant::now() + lifetime,
    })
}
