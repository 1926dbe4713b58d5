use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while parsing, enriching or storing recipes
#[derive(Error, Debug)]
pub enum RecipeError {
    /// HTTP transport failure (connection, TLS, body decoding)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    /// The remote service answered, but not with the expected shape
    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    Builder(String),

    /// Provider is misconfigured or unknown
    #[error("Provider error: {0}")]
    Provider(String),

    /// API key could not be found in config or environment
    #[error("{0} not found in config or environment")]
    MissingCredentials(String),

    /// An assistant run ended in a non-completed terminal state
    #[error("Assistant run {run_id} ended with status {status}")]
    RunFailed { run_id: String, status: String },

    /// Polling for an assistant run gave up
    #[error("Assistant run {run_id} did not finish after {attempts} polls")]
    PollExhausted { run_id: String, attempts: u32 },

    /// A call was raced against a timer and lost
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The recipe text was empty
    #[error("recipe text cannot be empty")]
    EmptyInput,

    /// The AI collaborator reported that the text is not a recipe
    #[error("Not a recipe: {0}")]
    NotARecipe(String),

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(String),
}

impl RecipeError {
    pub(crate) fn invalid_response(service: &str, reason: impl Into<String>) -> Self {
        RecipeError::InvalidResponse {
            service: service.to_string(),
            reason: reason.into(),
        }
    }
}
