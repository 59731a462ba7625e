//! GraphQL Operations
//!
//! The three operations of the managed backend's generated schema, and the
//! request/response envelopes they travel in.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::models::Restaurant;

pub const LIST_RESTAURANTS: &str = "query ListRestaurants(\
    $filter: ModelRestaurantFilterInput, $limit: Int, $nextToken: String) {
  listRestaurants(filter: $filter, limit: $limit, nextToken: $nextToken) {
    items { id name description city createdAt updatedAt __typename }
    nextToken
    __typename
  }
}";

pub const CREATE_RESTAURANT: &str = "mutation CreateRestaurant(\
    $input: CreateRestaurantInput!, $condition: ModelRestaurantConditionInput) {
  createRestaurant(input: $input, condition: $condition) {
    id name description city createdAt updatedAt __typename
  }
}";

pub const ON_CREATE_RESTAURANT: &str = "subscription OnCreateRestaurant(\
    $filter: ModelSubscriptionRestaurantFilterInput) {
  onCreateRestaurant(filter: $filter) {
    id name description city createdAt updatedAt __typename
  }
}";

/// `{ query, variables }` request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: Value,
}

impl GraphQlRequest {
    pub fn list_restaurants() -> Self {
        Self {
            query: LIST_RESTAURANTS,
            variables: Value::Object(Default::default()),
        }
    }

    pub fn create_restaurant(input: &Restaurant) -> Self {
        Self {
            query: CREATE_RESTAURANT,
            variables: serde_json::json!({ "input": input }),
        }
    }

    pub fn on_create_restaurant() -> Self {
        Self {
            query: ON_CREATE_RESTAURANT,
            variables: Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorEntry {
    pub message: String,
    #[serde(rename = "errorType", default)]
    pub error_type: Option<String>,
}

/// `{ data, errors }` response body
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

impl<T> GraphQlResponse<T> {
    /// Errors win over partial data
    pub fn into_result(self, operation: &'static str) -> Result<T, ApiError> {
        if !self.errors.is_empty() {
            return Err(graphql_error(&self.errors));
        }
        self.data.ok_or(ApiError::MissingData(operation))
    }
}

pub fn graphql_error(errors: &[GraphQlErrorEntry]) -> ApiError {
    ApiError::GraphQl {
        messages: errors
            .iter()
            .map(|e| match &e.error_type {
                Some(kind) => format!("{}: {}", kind, e.message),
                None => e.message.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListRestaurantsData {
    #[serde(rename = "listRestaurants")]
    pub list_restaurants: Option<RestaurantConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantConnection {
    #[serde(default)]
    pub items: Vec<Option<Restaurant>>,
    #[serde(rename = "nextToken", default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRestaurantData {
    #[serde(rename = "createRestaurant")]
    pub create_restaurant: Option<Restaurant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnCreateRestaurantData {
    #[serde(rename = "onCreateRestaurant")]
    pub on_create_restaurant: Option<Restaurant>,
}

impl ListRestaurantsData {
    /// Items in server order; null entries (unreadable records) are skipped
    pub fn into_items(self) -> Vec<Restaurant> {
        self.list_restaurants
            .map(|conn| conn.items.into_iter().flatten().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_carries_exact_input() {
        let request = GraphQlRequest::create_restaurant(&Restaurant::new("X", "Y", "Z"));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body["variables"],
            serde_json::json!({ "input": { "name": "X", "description": "Y", "city": "Z" } })
        );
        assert!(body["query"].as_str().unwrap().contains("createRestaurant(input: $input"));
    }

    #[test]
    fn test_list_response_keeps_order() {
        let json = r#"{"data":{"listRestaurants":{"items":[
            {"id":"1","name":"B","description":"b","city":"x","__typename":"Restaurant"},
            null,
            {"id":"2","name":"A","description":"a","city":"y","__typename":"Restaurant"}
        ],"nextToken":null}}}"#;
        let response: GraphQlResponse<ListRestaurantsData> = serde_json::from_str(json).unwrap();
        let items = response.into_result("listRestaurants").unwrap().into_items();
        assert_eq!(items, vec![Restaurant::new("B", "b", "x"), Restaurant::new("A", "a", "y")]);
    }

    #[test]
    fn test_errors_take_precedence() {
        let json = r#"{"data":null,"errors":[
            {"message":"Not Authorized to access listRestaurants","errorType":"Unauthorized"}
        ]}"#;
        let response: GraphQlResponse<ListRestaurantsData> = serde_json::from_str(json).unwrap();
        match response.into_result("listRestaurants") {
            Err(ApiError::GraphQl { messages }) => {
                assert_eq!(messages, vec!["Unauthorized: Not Authorized to access listRestaurants"]);
            }
            other => panic!("expected graphql error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data() {
        let response: GraphQlResponse<CreateRestaurantData> = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            response.into_result("createRestaurant"),
            Err(ApiError::MissingData("createRestaurant"))
        ));
    }
}
