//! Restaurant Form Component
//!
//! One text input per draft field plus the submit button.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::models::RestaurantField;
use crate::screen::RestaurantScreen;
use crate::store::{use_app_store, AppStateStoreFields};

/// Form for creating new restaurants
///
/// Inputs mirror the draft in the store, so clearing the draft after a
/// successful submit also clears the form.
#[component]
pub fn RestaurantForm(screen: StoredValue<Rc<RestaurantScreen>, LocalStorage>) -> impl IntoView {
    let store = use_app_store();

    let create_restaurant = move |ev: web_sys::MouseEvent| {
        ev.stop_propagation();
        let screen = screen.get_value();
        spawn_local(async move {
            // Failures are logged by the screen
            let _ = screen.submit().await;
        });
    };

    view! {
        <form class="restaurant-form" on:submit=|ev: web_sys::SubmitEvent| ev.prevent_default()>
            {RestaurantField::ALL.into_iter().map(move |field| view! {
                <div class="form-group">
                    <input
                        type="text"
                        class="form-control"
                        name=field.as_str()
                        placeholder=field.label()
                        prop:value=move || store.form_data().with(|draft| draft.field(field).to_string())
                        on:input=move |ev| {
                            let text = event_target_value(&ev);
                            screen.with_value(|screen| screen.change_field(field, text));
                        }
                    />
                </div>
            }).collect_view()}
            <button type="button" class="btn btn-primary float-left" on:click=create_restaurant>
                "Add New Restaurant"
            </button>
        </form>
    }
}
