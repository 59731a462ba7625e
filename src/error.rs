//! Error types for the data access client, session and configuration.

use thiserror::Error;

/// Failures from the Data Access Client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service answered with a GraphQL `errors` array
    #[error("graphql error: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("response has no data for `{0}`")]
    MissingData(&'static str),

    #[error("no signed-in session to authorize the request")]
    NotSignedIn,

    #[error("subscription channel error: {0}")]
    Channel(String),

    #[error("{0} is only available in the browser")]
    Unsupported(&'static str),
}

/// Failures from the session provider
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("user pool settings are missing from the configuration")]
    NotConfigured,
}

/// Failures loading the startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid graphql endpoint `{endpoint}`: {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("authentication mode {mode} requires `{key}`")]
    MissingKey { mode: &'static str, key: &'static str },
}
