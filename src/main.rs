//! Restaurant Directory Frontend Entry Point

mod api;
mod app;
mod components;
mod config;
mod context;
mod error;
mod models;
mod screen;
mod session;
mod store;

use app::App;
use config::AppConfig;
use leptos::logging::error;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();

    // Loaded once; everything downstream receives it explicitly
    match AppConfig::bundled() {
        Ok(config) => mount_to_body(move || view! { <App config=config /> }),
        Err(e) => {
            error!("[Main] Invalid configuration: {}", e);
            let message = e.to_string();
            mount_to_body(move || view! {
                <div class="config-error">
                    <h3>"The app is misconfigured"</h3>
                    <p>{message}</p>
                </div>
            })
        }
    }
}
