use leptos::prelude::*;

/// Spinner shown while the initial list loads
#[component]
pub fn LoadingSpinner() -> impl IntoView {
    view! {
        <div class="text-center">
            <div class="spinner-border" role="status">
                <span class="sr-only">"Loading..."</span>
            </div>
        </div>
    }
}
