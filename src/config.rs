//! Startup Configuration
//!
//! Amplify-style `amplifyconfiguration.json`, bundled at build time and
//! loaded once in `main`.

use reqwest::Url;
use serde::Deserialize;

use crate::error::ConfigError;

const BUNDLED_CONFIG: &str = include_str!("../amplifyconfiguration.json");

/// How requests to the GraphQL endpoint are authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AuthMode {
    #[serde(rename = "API_KEY")]
    ApiKey,
    #[serde(rename = "AMAZON_COGNITO_USER_POOLS")]
    UserPools,
}

impl AuthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::ApiKey => "API_KEY",
            AuthMode::UserPools => "AMAZON_COGNITO_USER_POOLS",
        }
    }
}

/// Hosted sign-in page settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig {
    pub domain: String,
    #[serde(default)]
    pub scope: Vec<String>,
    pub redirect_sign_in: String,
    pub redirect_sign_out: String,
    #[serde(default = "default_response_type")]
    pub response_type: String,
}

fn default_response_type() -> String {
    "token".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "aws_appsync_graphqlEndpoint")]
    pub graphql_endpoint: String,
    #[serde(rename = "aws_appsync_region")]
    pub region: String,
    #[serde(rename = "aws_appsync_authenticationType")]
    pub auth_mode: AuthMode,
    #[serde(rename = "aws_appsync_apiKey", default)]
    pub api_key: Option<String>,
    #[serde(rename = "aws_cognito_region", default)]
    pub cognito_region: Option<String>,
    #[serde(rename = "aws_user_pools_id", default)]
    pub user_pool_id: Option<String>,
    #[serde(rename = "aws_user_pools_web_client_id", default)]
    pub user_pool_client_id: Option<String>,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
}

impl AppConfig {
    /// The payload compiled into the bundle
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_json(BUNDLED_CONFIG)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;
        let mode = self.auth_mode.as_str();
        match self.auth_mode {
            AuthMode::ApiKey if self.api_key.as_deref().map_or(true, str::is_empty) => {
                Err(ConfigError::MissingKey { mode, key: "aws_appsync_apiKey" })
            }
            AuthMode::UserPools if self.user_pool_client_id.is_none() => {
                Err(ConfigError::MissingKey { mode, key: "aws_user_pools_web_client_id" })
            }
            _ => Ok(()),
        }
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::Endpoint {
            endpoint: self.graphql_endpoint.clone(),
            reason,
        };
        let url = Url::parse(&self.graphql_endpoint).map_err(|e| invalid(e.to_string()))?;
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        Ok(url)
    }

    /// Host header value the realtime handshake is signed for
    pub fn api_host(&self) -> String {
        self.endpoint_url()
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// WebSocket endpoint for subscriptions
    ///
    /// `xyz.appsync-api.<region>.amazonaws.com/graphql` becomes
    /// `wss://xyz.appsync-realtime-api.<region>.amazonaws.com/graphql`;
    /// custom domains serve it under `/graphql/realtime`.
    pub fn realtime_endpoint(&self) -> String {
        let host = self.api_host();
        if host.contains("appsync-api") && host.ends_with("amazonaws.com") {
            let path = self
                .endpoint_url()
                .map(|url| url.path().to_string())
                .unwrap_or_else(|_| "/graphql".to_string());
            format!("wss://{}{}", host.replacen("appsync-api", "appsync-realtime-api", 1), path)
        } else {
            format!("wss://{}/graphql/realtime", host)
        }
    }

    /// Identity provider API endpoint, when a user pool is configured
    pub fn identity_endpoint(&self) -> Option<String> {
        let region = self.cognito_region.as_deref().unwrap_or(&self.region);
        self.user_pool_client_id
            .as_ref()
            .map(|_| format!("https://cognito-idp.{}.amazonaws.com/", region))
    }
}
