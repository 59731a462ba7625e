//! AppSync Client
//!
//! GraphQL over HTTP for queries and mutations, the realtime WebSocket for
//! subscriptions.

use std::rc::Rc;

use async_trait::async_trait;
use leptos::logging::log;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::graphql::{CreateRestaurantData, GraphQlRequest, GraphQlResponse, ListRestaurantsData};
use super::realtime::{self, ChannelProtocol};
use super::{DataClient, SubscriptionHandle};
use crate::config::{AppConfig, AuthMode};
use crate::error::ApiError;
use crate::models::Restaurant;
use crate::session::SessionProvider;

enum Authorizer {
    ApiKey(String),
    UserPool(Rc<dyn SessionProvider>),
}

pub struct AppSyncClient {
    endpoint: String,
    realtime_endpoint: String,
    host: String,
    authorizer: Authorizer,
    http: reqwest::Client,
}

impl AppSyncClient {
    pub fn new(config: &AppConfig, session: Rc<dyn SessionProvider>) -> Self {
        let authorizer = match (config.auth_mode, &config.api_key) {
            (AuthMode::ApiKey, Some(key)) => Authorizer::ApiKey(key.clone()),
            _ => Authorizer::UserPool(session),
        };
        Self {
            endpoint: config.graphql_endpoint.clone(),
            realtime_endpoint: config.realtime_endpoint(),
            host: config.api_host(),
            authorizer,
            http: reqwest::Client::new(),
        }
    }

    /// Header name and value authorizing a request
    fn auth_header(&self) -> Result<(&'static str, String), ApiError> {
        match &self.authorizer {
            Authorizer::ApiKey(key) => Ok(("x-api-key", key.clone())),
            Authorizer::UserPool(session) => {
                let session = session.current().ok_or(ApiError::NotSignedIn)?;
                Ok(("Authorization", session.access_token))
            }
        }
    }

    /// Authorization object for the realtime handshake and `start` message
    fn realtime_authorization(&self) -> Result<Map<String, Value>, ApiError> {
        let (name, value) = self.auth_header()?;
        let mut map = Map::new();
        map.insert("host".to_string(), Value::from(self.host.clone()));
        map.insert(name.to_string(), Value::from(value));
        Ok(map)
    }

    async fn execute<T: DeserializeOwned>(&self, request: &GraphQlRequest, operation: &'static str) -> Result<T, ApiError> {
        let (name, value) = self.auth_header()?;
        let response: GraphQlResponse<T> = self
            .http
            .post(&self.endpoint)
            .header(name, value)
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        response.into_result(operation)
    }
}

#[async_trait(?Send)]
impl DataClient for AppSyncClient {
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
        let data: ListRestaurantsData = self
            .execute(&GraphQlRequest::list_restaurants(), "listRestaurants")
            .await?;
        let items = data.into_items();
        log!("[AppSync] Loaded {} restaurants", items.len());
        Ok(items)
    }

    async fn create_restaurant(&self, input: &Restaurant) -> Result<Restaurant, ApiError> {
        let data: CreateRestaurantData = self
            .execute(&GraphQlRequest::create_restaurant(input), "createRestaurant")
            .await?;
        data.create_restaurant.ok_or(ApiError::MissingData("createRestaurant"))
    }

    fn subscribe_on_create(
        &self,
        on_created: Rc<dyn Fn(Restaurant)>,
    ) -> Result<Box<dyn SubscriptionHandle>, ApiError> {
        let authorization = self.realtime_authorization()?;
        let url = realtime::connect_url(&self.realtime_endpoint, &authorization);
        let protocol = ChannelProtocol::new(
            uuid::Uuid::new_v4().to_string(),
            &GraphQlRequest::on_create_restaurant(),
            authorization,
        )?;
        open(&url, protocol, on_created)
    }
}

#[cfg(target_arch = "wasm32")]
fn open(
    url: &str,
    protocol: ChannelProtocol,
    on_created: Rc<dyn Fn(Restaurant)>,
) -> Result<Box<dyn SubscriptionHandle>, ApiError> {
    log!("[AppSync] Opening subscription {}", protocol.id());
    realtime::open_channel(url, protocol, on_created)
}

#[cfg(not(target_arch = "wasm32"))]
fn open(
    _url: &str,
    _protocol: ChannelProtocol,
    _on_created: Rc<dyn Fn(Restaurant)>,
) -> Result<Box<dyn SubscriptionHandle>, ApiError> {
    Err(ApiError::Unsupported("subscription channel"))
}
