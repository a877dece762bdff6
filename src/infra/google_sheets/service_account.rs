// Bearer tokens for the Sheets API, minted from a Google service account.
//
// The account signs an RS256 assertion, trades it at the token endpoint and
// keeps the result until shortly before it lapses. The tracked spreadsheet
// has to be shared with `client_email` as an editor.
//
// Key sources, tried in order:
// - `GOOGLE_SERVICE_ACCOUNT_KEY`: path of a downloaded JSON key
// - `GOOGLE_SERVICE_ACCOUNT_JSON`: the same JSON inline
// - `GSHEET_CLIENT_EMAIL` with `GSHEET_KEY`: bare email plus PEM, where a
//   literal `\n` stands for a line break

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: u64 = 3600;

type AuthResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// Only the key fields we sign with; the rest of the key file is ignored.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > SystemTime::now() + Duration::from_secs(60)
    }
}

pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    pub async fn from_file(path: &str) -> AuthResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> AuthResult<Self> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)?;
        Ok(Self::with_credentials(credentials))
    }

    /// For deployments that only hold the email and PEM, not the key file.
    pub fn from_key(client_email: &str, private_key: &str) -> Self {
        Self::with_credentials(ServiceAccountCredentials {
            client_email: client_email.to_string(),
            private_key: unescape_newlines(private_key),
            token_uri: default_token_uri(),
        })
    }

    fn with_credentials(credentials: ServiceAccountCredentials) -> Self {
        Self {
            credentials,
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn from_env() -> AuthResult<Self> {
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            return Self::from_file(&path).await;
        }
        if let Ok(json) = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json);
        }
        match (
            std::env::var("GSHEET_CLIENT_EMAIL"),
            std::env::var("GSHEET_KEY"),
        ) {
            (Ok(email), Ok(key)) => Ok(Self::from_key(&email, &key)),
            _ => Err("No service account configured: set GOOGLE_SERVICE_ACCOUNT_KEY, \
                      GOOGLE_SERVICE_ACCOUNT_JSON, or GSHEET_CLIENT_EMAIL and GSHEET_KEY."
                .into()),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// Bearer token for the next Sheets call. A cached token is reused while
    /// it has more than a minute left.
    pub async fn get_access_token(&self) -> AuthResult<String> {
        if let Some(cached) = self.cached_token.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.token.clone());
            }
        }

        let (token, lifetime) = self.fetch_new_token().await?;
        *self.cached_token.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at: SystemTime::now() + lifetime,
        });
        Ok(token)
    }

    fn signed_assertion(&self) -> AuthResult<String> {
        let iat = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let claims = AssertionClaims {
            iss: &self.credentials.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.credentials.token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    async fn fetch_new_token(&self) -> AuthResult<(String, Duration)> {
        let assertion = self.signed_assertion()?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(format!("Token exchange failed ({}): {}", status, text).into());
        }

        let granted: TokenResponse = response.json().await?;
        tracing::debug!(
            client_email = %self.credentials.client_email,
            expires_in = ?granted.expires_in,
            "Fetched Google access token"
        );

        Ok((granted.access_token, token_lifetime(granted.expires_in)))
    }
}

/// Cache lifetime for a token, a few minutes short of what Google granted.
fn token_lifetime(expires_in: Option<u64>) -> Duration {
    let granted = expires_in.unwrap_or(3600);
    Duration::from_secs(granted.saturating_sub(300).max(60))
}

fn unescape_newlines(key: &str) -> String {
    key.replace("\\n", "\n")
}
