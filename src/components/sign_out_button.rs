//! Sign Out Button Component

use leptos::logging::warn;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::context::use_app_context;
use crate::session::SignOutScope;

/// Ends every session of the user; failures only reach the console
#[component]
pub fn SignOutButton() -> impl IntoView {
    let ctx = use_app_context();

    let sign_out = move |_: web_sys::MouseEvent| {
        let session = ctx.session();
        spawn_local(async move {
            match session.sign_out(SignOutScope::Global).await {
                Ok(()) => ctx.mark_signed_out(),
                Err(e) => warn!("[Session] error signing out: {}", e),
            }
        });
    };

    view! {
        <button class="btn btn-danger float-right" on:click=sign_out>
            "Sign Out"
        </button>
    }
}
