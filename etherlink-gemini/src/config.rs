//! Gemini estimator configuration.
//!
//! # Environment Variables
//!
//! - `API_KEY` - Gemini API key (required). A `.env` file in the working
//!   directory is loaded first when present.

use std::time::Duration;

use url::Url;

use crate::error::GeminiError;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "API_KEY";
/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Gemini REST API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Connection settings for the Gemini API.
#[derive(Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`
    pub api_key: String,
    /// Model name (default: `gemini-2.5-flash`)
    pub model: String,
    /// API root, with a trailing slash
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Creates a configuration with default model and endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::MissingApiKey`] when `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeminiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey(API_KEY_VAR));
        }
        let base_url = Url::parse(DEFAULT_BASE_URL).map_err(|e| GeminiError::UrlParse {
            context: "Failed to parse default base url",
            source: e,
        })?;
        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_owned(),
            base_url,
            timeout: None,
        })
    }

    /// Loads `.env` if present and reads the API key from `API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::MissingApiKey`] when the variable is unset or blank.
    pub fn from_env() -> Result<Self, GeminiError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the API key through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::MissingApiKey`] when the key is absent or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GeminiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR).ok_or(GeminiError::MissingApiKey(API_KEY_VAR))?;
        Self::new(api_key)
    }

    /// Uses another model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Uses another API root. A trailing slash is added when missing.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::UrlParse`] when `base_url` is not a URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, GeminiError> {
        let mut normalized = base_url.trim_end_matches('/').to_owned();
        normalized.push('/');
        self.base_url = Url::parse(&normalized).map_err(|e| GeminiError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Ok(self)
    }

    /// Sets a timeout for every request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
