//! Restaurant Table Component

use leptos::prelude::*;

use crate::store::{use_app_store, AppStateStoreFields};

/// Numbered table of restaurants; renders nothing while the list is empty
#[component]
pub fn RestaurantTable() -> impl IntoView {
    let store = use_app_store();

    move || {
        let restaurants = store.restaurants().get();
        if restaurants.is_empty() {
            return ().into_any();
        }

        view! {
            <table class="table table-striped table-bordered table-hover">
                <thead>
                    <tr>
                        <th>"#"</th>
                        <th>"Name"</th>
                        <th>"Description"</th>
                        <th>"City"</th>
                    </tr>
                </thead>
                <tbody>
                    // Position is the only key the client has
                    {restaurants.into_iter().enumerate().map(|(index, restaurant)| view! {
                        <tr>
                            <td>{index + 1}</td>
                            <td>{restaurant.name}</td>
                            <td>{restaurant.description}</td>
                            <td>{restaurant.city}</td>
                        </tr>
                    }).collect_view()}
                </tbody>
            </table>
        }
        .into_any()
    }
}
