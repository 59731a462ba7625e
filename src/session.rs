//! Session Capability
//!
//! The sign-in flow belongs to the managed identity provider's hosted page.
//! This module adopts the tokens it hands back, exposes them to the data
//! client and ends the session on sign-out.

use std::cell::RefCell;

use async_trait::async_trait;
use leptos::logging::{log, warn};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, OAuthConfig};
use crate::error::AuthError;

const GLOBAL_SIGN_OUT_TARGET: &str = "AWSCognitoIdentityProviderService.GlobalSignOut";

/// Tokens of a signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub id_token: Option<String>,
    /// Epoch milliseconds after which the tokens are stale
    pub expires_at_ms: Option<f64>,
}

impl Session {
    pub fn is_expired(&self, now_ms: f64) -> bool {
        self.expires_at_ms.is_some_and(|at| now_ms >= at)
    }
}

/// Which sessions a sign-out invalidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutScope {
    /// This browser only
    Local,
    /// Every session of the user, on every device
    Global,
}

/// Externally supplied authentication capability
#[async_trait(?Send)]
pub trait SessionProvider {
    /// The live session, if any
    fn current(&self) -> Option<Session>;

    /// Where to send the user to sign in
    fn sign_in_url(&self) -> Option<String>;

    async fn sign_out(&self, scope: SignOutScope) -> Result<(), AuthError>;
}

/// Parse the implicit-grant fragment the hosted sign-in page redirects back with
///
/// `#access_token=...&id_token=...&expires_in=3600&token_type=Bearer`
pub fn parse_fragment(fragment: &str, now_ms: f64) -> Option<Session> {
    let mut access_token = None;
    let mut id_token = None;
    let mut expires_in = None;

    for pair in fragment.trim_start_matches('#').split('&') {
        let Some((key, value)) = pair.split_once('=') else { continue };
        let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
        match key {
            "access_token" => access_token = Some(value),
            "id_token" => id_token = Some(value),
            "expires_in" => expires_in = value.parse::<f64>().ok(),
            _ => {}
        }
    }

    Some(Session {
        access_token: access_token.filter(|t| !t.is_empty())?,
        id_token,
        expires_at_ms: expires_in.map(|secs| now_ms + secs * 1000.0),
    })
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Hosted sign-in page URL
pub fn authorize_url(oauth: &OAuthConfig, client_id: &str) -> String {
    format!(
        "https://{}/oauth2/authorize?client_id={}&response_type={}&scope={}&redirect_uri={}",
        oauth.domain,
        encode(client_id),
        encode(&oauth.response_type),
        encode(&oauth.scope.join(" ")),
        encode(&oauth.redirect_sign_in),
    )
}

/// Hosted logout URL, clears the provider's own cookie
pub fn logout_url(oauth: &OAuthConfig, client_id: &str) -> String {
    format!(
        "https://{}/logout?client_id={}&logout_uri={}",
        oauth.domain,
        encode(client_id),
        encode(&oauth.redirect_sign_out),
    )
}

/// Session handed over by the managed provider's hosted UI
pub struct HostedUiSession {
    client_id: Option<String>,
    oauth: Option<OAuthConfig>,
    identity_endpoint: Option<String>,
    session: RefCell<Option<Session>>,
    http: reqwest::Client,
}

impl HostedUiSession {
    /// Pick up tokens from the redirect fragment, else from session storage
    pub fn restore(config: &AppConfig) -> Self {
        let now = browser::now_ms();
        let session = match browser::location_fragment().and_then(|f| parse_fragment(&f, now)) {
            Some(session) => {
                log!("[Session] Signed in via hosted UI");
                browser::strip_fragment();
                browser::save(&session);
                Some(session)
            }
            None => browser::load(),
        };
        Self::new(config, session)
    }

    pub fn new(config: &AppConfig, session: Option<Session>) -> Self {
        Self {
            client_id: config.user_pool_client_id.clone(),
            oauth: config.oauth.clone(),
            identity_endpoint: config.identity_endpoint(),
            session: RefCell::new(session),
            http: reqwest::Client::new(),
        }
    }

    async fn global_sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let endpoint = self.identity_endpoint.as_deref().ok_or(AuthError::NotConfigured)?;
        let body = serde_json::json!({ "AccessToken": session.access_token });
        let response = self
            .http
            .post(endpoint)
            .header("Content-Type", "application/x-amz-json-1.1")
            .header("X-Amz-Target", GLOBAL_SIGN_OUT_TARGET)
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[async_trait(?Send)]
impl SessionProvider for HostedUiSession {
    fn current(&self) -> Option<Session> {
        let now = browser::now_ms();
        self.session.borrow().clone().filter(|s| !s.is_expired(now))
    }

    fn sign_in_url(&self) -> Option<String> {
        Some(authorize_url(self.oauth.as_ref()?, self.client_id.as_deref()?))
    }

    /// An expired or missing session still signs out locally; only a live
    /// one can be revoked everywhere
    async fn sign_out(&self, scope: SignOutScope) -> Result<(), AuthError> {
        match (self.current(), scope) {
            (Some(session), SignOutScope::Global) => self.global_sign_out(&session).await?,
            (None, SignOutScope::Global) => warn!("[Session] No live session, signing out locally"),
            _ => {}
        }

        self.session.borrow_mut().take();
        browser::clear();
        log!("[Session] Signed out ({:?})", scope);

        match (self.oauth.as_ref(), self.client_id.as_deref()) {
            (Some(oauth), Some(client_id)) => browser::redirect(&logout_url(oauth, client_id)),
            _ => warn!("[Session] No hosted UI configured, skipping logout redirect"),
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::Session;

    const STORAGE_KEY: &str = "restaurant-ui.session";

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.session_storage().ok().flatten()
    }

    pub fn now_ms() -> f64 {
        js_sys::Date::now()
    }

    pub fn location_fragment() -> Option<String> {
        let hash = web_sys::window()?.location().hash().ok()?;
        (!hash.is_empty()).then_some(hash)
    }

    /// Drop tokens from the address bar
    pub fn strip_fragment() {
        let Some(window) = web_sys::window() else { return };
        let path = window.location().pathname().unwrap_or_else(|_| "/".to_string());
        if let Ok(history) = window.history() {
            let _ = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&path));
        }
    }

    pub fn load() -> Option<Session> {
        let raw = storage()?.get_item(STORAGE_KEY).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn save(session: &Session) {
        if let (Some(storage), Ok(raw)) = (storage(), serde_json::to_string(session)) {
            let _ = storage.set_item(STORAGE_KEY, &raw);
        }
    }

    pub fn clear() {
        if let Some(storage) = storage() {
            let _ = storage.remove_item(STORAGE_KEY);
        }
    }

    pub fn redirect(url: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.location().assign(url);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod browser {
    use super::Session;

    pub fn now_ms() -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or_default()
    }

    pub fn location_fragment() -> Option<String> {
        None
    }

    pub fn strip_fragment() {}

    pub fn load() -> Option<Session> {
        None
    }

    pub fn save(_session: &Session) {}

    pub fn clear() {}

    pub fn redirect(_url: &str) {}
}
