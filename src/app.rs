//! Restaurant Directory App
//!
//! Root component: session gate around the restaurants view.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use reactive_stores::Store;

use crate::api::{AppSyncClient, DataClient};
use crate::components::{LoadingSpinner, RestaurantForm, RestaurantTable, SessionShell, SignOutButton};
use crate::config::AppConfig;
use crate::context::{use_app_context, AppContext};
use crate::models::Restaurant;
use crate::screen::{RestaurantScreen, ScreenHost};
use crate::session::{HostedUiSession, SessionProvider};
use crate::store::{store_dispatch, store_draft, Action, AppState, AppStore};

#[component]
pub fn App(config: AppConfig) -> impl IntoView {
    let session: Rc<dyn SessionProvider> = Rc::new(HostedUiSession::restore(&config));
    let client: Rc<dyn DataClient> = Rc::new(AppSyncClient::new(&config, session.clone()));
    let signed_in = signal(session.current().is_some());

    // Provide capabilities to all children
    provide_context(AppContext::new(client, session, signed_in));

    view! {
        <div class="App">
            <SessionShell>
                <RestaurantsPage />
            </SessionShell>
        </div>
    }
}

/// Store, loading flag and session gate as seen by the screen
struct LeptosHost {
    store: AppStore,
    loading: WriteSignal<bool>,
    ctx: AppContext,
}

impl ScreenHost for LeptosHost {
    fn dispatch(&self, action: Action) {
        store_dispatch(&self.store, action);
    }

    fn draft(&self) -> Restaurant {
        store_draft(&self.store)
    }

    fn set_loading(&self, loading: bool) {
        // The page may be gone by the time a request settles
        self.loading.try_set(loading);
    }

    fn notify(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }

    fn session_expired(&self) {
        self.ctx.mark_signed_out();
    }
}

/// Form, loading indicator and table over a fresh store per mount
#[component]
fn RestaurantsPage() -> impl IntoView {
    let ctx = use_app_context();
    let store = Store::new(AppState::default());
    provide_context(store);

    let (loading, set_loading) = signal(false);
    let host = Rc::new(LeptosHost {
        store,
        loading: set_loading,
        ctx,
    });
    let screen = StoredValue::new_local(RestaurantScreen::new(ctx.client(), host));

    // Mount: initial fetch and subscription
    Effect::new(move |_| {
        let screen = screen.get_value();
        spawn_local(async move {
            screen.mount().await;
        });
    });

    on_cleanup(move || {
        if let Some(screen) = screen.try_get_value() {
            screen.unmount();
        }
    });

    view! {
        <div class="container">
            <div class="row my-3">
                <div class="col">
                    <SignOutButton />
                </div>
            </div>

            <div class="row mt-3">
                <div class="col-md-4">
                    <RestaurantForm screen=screen />
                </div>
            </div>

            <div class="row my-3">
                <div class="col">
                    <Show when=move || !loading.get() fallback=|| view! { <LoadingSpinner /> }>
                        <RestaurantTable />
                    </Show>
                </div>
            </div>
        </div>
    }
}
