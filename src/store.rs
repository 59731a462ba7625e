//! Application State Store
//!
//! A pure transition function over three actions, applied to a Leptos
//! `reactive_stores` store for field-level reactivity.

use std::collections::BTreeMap;

use leptos::logging::warn;
use leptos::prelude::*;
use reactive_stores::Store;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Restaurant, RestaurantField};

/// Partial draft update: field name to new text
pub type FormPatch = BTreeMap<RestaurantField, String>;

/// Application state with field-level reactivity
#[derive(Clone, Debug, Default, PartialEq, Store)]
pub struct AppState {
    /// Restaurants in server order, appended to by creation events
    pub restaurants: Vec<Restaurant>,
    /// Pending form values
    pub form_data: Restaurant,
}

/// State transitions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    try_from = "RawAction"
)]
pub enum Action {
    /// Replace the list wholesale
    Query(Vec<Restaurant>),
    /// Append one restaurant to the end of the list
    Subscription(Restaurant),
    /// Merge into the draft, other fields unchanged
    SetFormData(FormPatch),
    /// Anything else, whatever its payload. Leaves state untouched.
    Unknown,
}

/// Wire form before the tag is looked at
#[derive(Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl TryFrom<RawAction> for Action {
    type Error = serde_json::Error;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "QUERY" => serde_json::from_value(raw.payload).map(Action::Query),
            "SUBSCRIPTION" => serde_json::from_value(raw.payload).map(Action::Subscription),
            "SET_FORM_DATA" => serde_json::from_value(raw.payload).map(Action::SetFormData),
            _ => Ok(Action::Unknown),
        }
    }
}

impl Action {
    pub fn set_field(field: RestaurantField, value: impl Into<String>) -> Self {
        Action::SetFormData(FormPatch::from([(field, value.into())]))
    }
}

impl AppState {
    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::Query(restaurants) => self.restaurants = restaurants,
            Action::Subscription(restaurant) => self.restaurants.push(restaurant),
            Action::SetFormData(patch) => {
                for (field, value) in patch {
                    self.form_data.set_field(field, value);
                }
            }
            Action::Unknown => {}
        }
        self
    }
}

/// Type alias for the store
pub type AppStore = Store<AppState>;

/// Get the app store from context
pub fn use_app_store() -> AppStore {
    expect_context::<AppStore>()
}

// ========================
// Store Helper Functions
// ========================

/// Run an action through the reducer and write back the field it touched
///
/// A store already disposed (its page unmounted while a request was in
/// flight) drops the action.
pub fn store_dispatch(store: &AppStore, action: Action) {
    if store.is_disposed() {
        warn!("[Store] Store disposed, dropping {:?}", action);
        return;
    }
    match action {
        Action::Query(_) | Action::Subscription(_) => {
            let Some(restaurants) = store.restaurants().try_get_untracked() else { return };
            let current = AppState {
                restaurants,
                ..Default::default()
            };
            store.restaurants().try_set(current.reduce(action).restaurants);
        }
        Action::SetFormData(_) => {
            let Some(form_data) = store.form_data().try_get_untracked() else { return };
            let current = AppState {
                form_data,
                ..Default::default()
            };
            store.form_data().try_set(current.reduce(action).form_data);
        }
        Action::Unknown => {}
    }
}

/// Snapshot of the draft without subscribing to it; empty once disposed
pub fn store_draft(store: &AppStore) -> Restaurant {
    store.form_data().try_get_untracked().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> Vec<Restaurant> {
        (0..n)
            .map(|i| Restaurant::new(format!("R{}", i), format!("d{}", i), format!("c{}", i)))
            .collect()
    }

    #[test]
    fn test_initial_draft_has_empty_fields() {
        let state = AppState::default();
        assert!(state.restaurants.is_empty());
        for field in RestaurantField::ALL {
            assert_eq!(state.form_data.field(field), "");
        }
    }

    #[test]
    fn test_query_action_from_wire() {
        let json = r#"{"type":"QUERY","payload":[{"name":"A","description":"d1","city":"c1"}]}"#;
        let action: Action = serde_json::from_str(json).unwrap();

        let state = AppState::default().reduce(action);
        assert_eq!(state.restaurants, vec![Restaurant::new("A", "d1", "c1")]);
    }

    #[test]
    fn test_query_replaces_prior_content() {
        let state = AppState {
            restaurants: sample(3),
            ..Default::default()
        };
        let replacement = vec![Restaurant::new("X", "Y", "Z")];

        let state = state.reduce(Action::Query(replacement.clone()));
        assert_eq!(state.restaurants, replacement);

        let state = state.reduce(Action::Query(Vec::new()));
        assert!(state.restaurants.is_empty());
    }

    #[test]
    fn test_subscription_appends_to_end() {
        let before = sample(4);
        let item = Restaurant::new("New", "fresh", "Oslo");
        let state = AppState {
            restaurants: before.clone(),
            ..Default::default()
        };

        let state = state.reduce(Action::Subscription(item.clone()));
        assert_eq!(state.restaurants.len(), before.len() + 1);
        assert_eq!(state.restaurants[..before.len()], before[..]);
        assert_eq!(state.restaurants.last(), Some(&item));
    }

    #[test]
    fn test_set_form_data_merges() {
        let first: Action = serde_json::from_str(r#"{"type":"SET_FORM_DATA","payload":{"name":"Joe's"}}"#).unwrap();
        let second: Action = serde_json::from_str(r#"{"type":"SET_FORM_DATA","payload":{"city":"NYC"}}"#).unwrap();

        let state = AppState::default().reduce(first).reduce(second);
        assert_eq!(state.form_data, Restaurant::new("Joe's", "", "NYC"));
    }

    #[test]
    fn test_field_updates_keep_latest_value() {
        let updates = [
            (RestaurantField::Name, "a"),
            (RestaurantField::City, "b"),
            (RestaurantField::Name, "c"),
            (RestaurantField::Description, "d"),
            (RestaurantField::City, ""),
            (RestaurantField::Description, "e"),
        ];
        let mut state = AppState::default();
        for (field, value) in updates {
            let before = state.form_data.clone();
            state = state.reduce(Action::set_field(field, value));
            for other in RestaurantField::ALL {
                let expected = if other == field { value } else { before.field(other) };
                assert_eq!(state.form_data.field(other), expected);
            }
        }
        assert_eq!(state.form_data, Restaurant::new("c", "e", ""));
    }

    #[test]
    fn test_unknown_field_name_is_rejected() {
        let result = serde_json::from_str::<Action>(r#"{"type":"SET_FORM_DATA","payload":{"zip":"10001"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_action_is_noop() {
        let state = AppState {
            restaurants: sample(2),
            form_data: Restaurant::new("n", "d", "c"),
        };
        let action: Action = serde_json::from_str(r#"{"type":"RESET"}"#).unwrap();
        assert_eq!(action, Action::Unknown);
        assert_eq!(state.clone().reduce(action), state);
    }

    #[test]
    fn test_unknown_action_with_payload_is_noop() {
        let state = AppState {
            restaurants: sample(1),
            form_data: Restaurant::new("n", "d", "c"),
        };
        for json in [
            r#"{"type":"RESET","payload":{"x":1}}"#,
            r#"{"type":"DELETE","payload":[{"name":"A","description":"d","city":"c"}]}"#,
            r#"{"type":"NOOP","payload":null}"#,
        ] {
            let action: Action = serde_json::from_str(json).unwrap();
            assert_eq!(action, Action::Unknown);
            assert_eq!(state.clone().reduce(action), state);
        }
    }

    #[test]
    fn test_known_action_with_bad_payload_is_rejected() {
        assert!(serde_json::from_str::<Action>(r#"{"type":"QUERY"}"#).is_err());
        assert!(serde_json::from_str::<Action>(r#"{"type":"SUBSCRIPTION","payload":{"name":"A"}}"#).is_err());
    }

    fn owned_store() -> (Owner, AppStore) {
        let owner = Owner::new();
        let store = owner.with(|| Store::new(AppState::default()));
        (owner, store)
    }

    #[test]
    fn test_store_dispatch_query_and_subscription() {
        let (_owner, store) = owned_store();
        let listed = sample(2);

        store_dispatch(&store, Action::Query(listed.clone()));
        assert_eq!(store.restaurants().get_untracked(), listed);

        let incoming = Restaurant::new("New", "fresh", "Oslo");
        store_dispatch(&store, Action::Subscription(incoming.clone()));
        let restaurants = store.restaurants().get_untracked();
        assert_eq!(restaurants.len(), 3);
        assert_eq!(restaurants.last(), Some(&incoming));
        assert_eq!(store_draft(&store), Restaurant::default());
    }

    #[test]
    fn test_store_dispatch_form_data() {
        let (_owner, store) = owned_store();

        store_dispatch(&store, Action::set_field(RestaurantField::Name, "Joe's"));
        store_dispatch(&store, Action::set_field(RestaurantField::City, "NYC"));
        assert_eq!(store_draft(&store), Restaurant::new("Joe's", "", "NYC"));
        assert!(store.restaurants().get_untracked().is_empty());

        store_dispatch(&store, Action::Unknown);
        assert_eq!(store_draft(&store), Restaurant::new("Joe's", "", "NYC"));
    }

    #[test]
    fn test_store_dispatch_after_dispose_is_dropped() {
        let (owner, store) = owned_store();
        store_dispatch(&store, Action::set_field(RestaurantField::Name, "kept"));
        owner.cleanup();

        store_dispatch(&store, Action::Query(sample(2)));
        store_dispatch(&store, Action::Subscription(Restaurant::new("a", "b", "c")));
        store_dispatch(&store, Action::set_field(RestaurantField::City, "x"));
        assert_eq!(store_draft(&store), Restaurant::default());
    }
}
