//! Data Access Client
//!
//! The three operations this app consumes from the managed GraphQL backend,
//! behind a trait so the screen can be driven by a mock in tests.

mod appsync;
pub mod graphql;
pub mod realtime;

use std::rc::Rc;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::Restaurant;

pub use appsync::AppSyncClient;

/// Cancellation handle for an open subscription channel
pub trait SubscriptionHandle {
    /// Whether events can still arrive on the channel
    fn is_open(&self) -> bool;

    /// Consumes the handle, so a channel is cancelled at most once
    fn unsubscribe(self: Box<Self>);
}

#[async_trait(?Send)]
pub trait DataClient {
    /// `listRestaurants`, in server order
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ApiError>;

    /// `createRestaurant`, returns the created record
    async fn create_restaurant(&self, input: &Restaurant) -> Result<Restaurant, ApiError>;

    /// `onCreateRestaurant`: `on_created` runs for each delivered record
    fn subscribe_on_create(
        &self,
        on_created: Rc<dyn Fn(Restaurant)>,
    ) -> Result<Box<dyn SubscriptionHandle>, ApiError>;
}
