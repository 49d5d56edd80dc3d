//! Google ID token verification through the tokeninfo endpoint

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Public tokeninfo endpoint
pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Upper bound on a tokeninfo round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum GoogleError {
    #[error("Google rejected the ID token (status {0})")]
    Rejected(u16),

    #[error("Google profile has no email")]
    MissingEmail,

    #[error("Invalid tokeninfo URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Tokeninfo request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Profile fields read from a verified ID token
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Google account ID
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Client for Google's tokeninfo endpoint
pub struct GoogleClient {
    http: Client,
    tokeninfo_url: String,
}

impl GoogleClient {
    pub fn new(tokeninfo_url: impl Into<String>, timeout: Duration) -> Result<Self, GoogleError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            tokeninfo_url: tokeninfo_url.into(),
        })
    }

    /// Resolve an ID token to the profile it asserts
    pub async fn verify_id_token(&self, id_token: &str) -> Result<GoogleProfile, GoogleError> {
        let url = url::Url::parse_with_params(&self.tokeninfo_url, &[("id_token", id_token)])?;

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            debug!("Tokeninfo rejected ID token: {}", response.status());
            return Err(GoogleError::Rejected(response.status().as_u16()));
        }

        let profile: GoogleProfile = response.json().await?;
        if profile.email.as_deref().is_none_or(str::is_empty) {
            return Err(GoogleError::MissingEmail);
        }

        Ok(profile)
    }
}
