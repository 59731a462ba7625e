//! Session Shell Component
//!
//! Gates the app behind the managed identity provider.

use leptos::prelude::*;

use super::AuthHeader;
use crate::context::use_app_context;

/// Renders `children` only for a signed-in user
///
/// Signed-out users see the header slot (logo and welcome heading by
/// default) and a link to the provider's hosted sign-in page.
#[component]
pub fn SessionShell(
    /// Replaces the default logo and heading on the sign-in gate
    #[prop(optional, into)]
    header: Option<ViewFn>,
    children: ChildrenFn,
) -> impl IntoView {
    let ctx = use_app_context();
    let header = header.unwrap_or_else(|| ViewFn::from(|| view! { <AuthHeader /> }));
    let sign_in_url = ctx.session().sign_in_url();

    view! {
        <Show
            when=move || ctx.signed_in.get()
            fallback=move || view! {
                <div class="auth-gate">
                    {header.run()}
                    {match sign_in_url.clone() {
                        Some(url) => view! {
                            <a class="btn btn-primary" href=url>"Sign In"</a>
                        }.into_any(),
                        None => view! {
                            <p class="auth-unavailable">"Sign-in is not configured."</p>
                        }.into_any(),
                    }}
                </div>
            }
        >
            {children()}
        </Show>
    }
}
