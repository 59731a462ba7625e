//! Auth Header Component
//!
//! Default header slot of the sign-in gate.

use leptos::prelude::*;

pub const WELCOME_HEADING: &str = "Welcome To My Yelp App";

#[component]
pub fn AuthHeader() -> impl IntoView {
    view! {
        <div class="auth-header">
            <img src="assets/logo.svg" class="login-logo" alt="Restaurant Directory Logo" />
            <h3>{WELCOME_HEADING}</h3>
        </div>
    }
}
