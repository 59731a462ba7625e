//! Application Context
//!
//! Capabilities injected at the root and shared via the Leptos Context API.

use std::rc::Rc;

use leptos::prelude::*;

use crate::api::DataClient;
use crate::session::SessionProvider;

/// App-wide capabilities and session flag provided via context
#[derive(Clone, Copy)]
pub struct AppContext {
    client: StoredValue<Rc<dyn DataClient>, LocalStorage>,
    session: StoredValue<Rc<dyn SessionProvider>, LocalStorage>,
    /// Whether the session shell lets the app through - read
    pub signed_in: ReadSignal<bool>,
    /// Whether the session shell lets the app through - write
    set_signed_in: WriteSignal<bool>,
}

impl AppContext {
    pub fn new(
        client: Rc<dyn DataClient>,
        session: Rc<dyn SessionProvider>,
        signed_in: (ReadSignal<bool>, WriteSignal<bool>),
    ) -> Self {
        Self {
            client: StoredValue::new_local(client),
            session: StoredValue::new_local(session),
            signed_in: signed_in.0,
            set_signed_in: signed_in.1,
        }
    }

    pub fn client(&self) -> Rc<dyn DataClient> {
        self.client.get_value()
    }

    pub fn session(&self) -> Rc<dyn SessionProvider> {
        self.session.get_value()
    }

    /// Drop back to the sign-in gate; a no-op once the root is gone
    pub fn mark_signed_out(&self) {
        self.set_signed_in.try_set(false);
    }
}

/// Get the app context
pub fn use_app_context() -> AppContext {
    expect_context::<AppContext>()
}
