//! Restaurant Screen
//!
//! What the restaurants view does, independent of the DOM: fetch on mount,
//! keep one subscription channel open while mounted, turn form input into
//! draft updates and submit the draft.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use leptos::logging::{error, log, warn};

use crate::api::{DataClient, SubscriptionHandle};
use crate::error::ApiError;
use crate::models::{Restaurant, RestaurantField};
use crate::store::{Action, FormPatch};

pub const CREATED_NOTICE: &str = "New Restaurant added successfully";

/// The UI side the screen drives
pub trait ScreenHost {
    fn dispatch(&self, action: Action);

    /// Current draft values
    fn draft(&self) -> Restaurant;

    fn set_loading(&self, loading: bool);

    /// Confirmation shown to the user
    fn notify(&self, message: &str);

    /// The data client found no live session
    fn session_expired(&self);
}

/// Own submissions whose creation event may still arrive on the channel
#[derive(Debug, Default)]
struct PendingSubmissions(Vec<Restaurant>);

impl PendingSubmissions {
    fn push(&mut self, restaurant: Restaurant) {
        self.0.push(restaurant);
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    /// Remove one matching entry, reporting whether there was one
    fn claim(&mut self, restaurant: &Restaurant) -> bool {
        match self.0.iter().position(|pending| pending == restaurant) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }
}

pub struct RestaurantScreen {
    client: Rc<dyn DataClient>,
    host: Rc<dyn ScreenHost>,
    subscription: RefCell<Option<Box<dyn SubscriptionHandle>>>,
    pending: RefCell<PendingSubmissions>,
}

impl RestaurantScreen {
    pub fn new(client: Rc<dyn DataClient>, host: Rc<dyn ScreenHost>) -> Rc<Self> {
        Rc::new(Self {
            client,
            host,
            subscription: RefCell::new(None),
            pending: RefCell::new(PendingSubmissions::default()),
        })
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    /// Subscribed and the channel still delivering
    fn channel_open(&self) -> bool {
        self.subscription.borrow().as_ref().is_some_and(|handle| handle.is_open())
    }

    fn report(&self, e: &ApiError) {
        if matches!(e, ApiError::NotSignedIn) {
            warn!("[Screen] Session is gone, returning to sign-in");
            self.host.session_expired();
        }
    }

    /// Open the channel and load the list behind the loading flag
    pub async fn mount(self: &Rc<Self>) {
        self.open_channel();
        // Failure is already logged and the flag lowered
        let _ = self.load(true).await;
    }

    /// Cancel the channel opened by `mount`
    pub fn unmount(&self) {
        let handle = self.subscription.borrow_mut().take();
        if let Some(handle) = handle {
            handle.unsubscribe();
            log!("[Screen] Subscription cancelled");
        }
    }

    pub fn change_field(&self, field: RestaurantField, text: String) {
        self.host.dispatch(Action::set_field(field, text));
    }

    /// Create the draft, confirm, clear the submitted values and refetch the list
    pub async fn submit(&self) -> Result<(), ApiError> {
        let draft = self.host.draft();
        // Only an open channel can echo the submission back
        let tracked = self.channel_open();
        if tracked {
            self.pending.borrow_mut().push(draft.clone());
        }

        if let Err(e) = self.client.create_restaurant(&draft).await {
            if tracked {
                self.pending.borrow_mut().claim(&draft);
            }
            error!("[Screen] Failed to create restaurant: {}", e);
            self.report(&e);
            return Err(e);
        }

        self.host.notify(CREATED_NOTICE);
        if let Some(action) = cleared_draft(&draft, &self.host.draft()) {
            self.host.dispatch(action);
        }
        let result = self.refresh().await;
        if !self.channel_open() {
            // No echo will come to claim them
            self.pending.borrow_mut().clear();
        }
        result
    }

    /// Refetch the list without the loading indicator
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.load(false).await
    }

    async fn load(&self, show_loading: bool) -> Result<(), ApiError> {
        if show_loading {
            self.host.set_loading(true);
        }
        let result = self.client.list_restaurants().await;
        if show_loading {
            self.host.set_loading(false);
        }

        match result {
            Ok(restaurants) => {
                self.host.dispatch(Action::Query(restaurants));
                Ok(())
            }
            Err(e) => {
                error!("[Screen] Failed to load restaurants: {}", e);
                self.report(&e);
                Err(e)
            }
        }
    }

    fn open_channel(self: &Rc<Self>) {
        if self.is_subscribed() {
            warn!("[Screen] Already subscribed, keeping the open channel");
            return;
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let on_created: Rc<dyn Fn(Restaurant)> = Rc::new(move |restaurant| {
            if let Some(screen) = weak.upgrade() {
                screen.on_created(restaurant);
            }
        });

        match self.client.subscribe_on_create(on_created) {
            Ok(handle) => {
                *self.subscription.borrow_mut() = Some(handle);
            }
            Err(e) => {
                warn!("[Screen] Live updates unavailable: {}", e);
                self.report(&e);
            }
        }
    }

    fn on_created(&self, restaurant: Restaurant) {
        if self.pending.borrow_mut().claim(&restaurant) {
            log!("[Screen] Skipping event for own submission: {}", restaurant.name);
            return;
        }
        log!("[Screen] Restaurant created elsewhere: {}", restaurant.name);
        self.host.dispatch(Action::Subscription(restaurant));
    }
}

/// Empty the fields that still hold what was submitted; edits made while
/// the create was in flight stay
fn cleared_draft(submitted: &Restaurant, current: &Restaurant) -> Option<Action> {
    let patch: FormPatch = RestaurantField::ALL
        .into_iter()
        .filter(|&field| !current.field(field).is_empty() && current.field(field) == submitted.field(field))
        .map(|field| (field, String::new()))
        .collect();
    (!patch.is_empty()).then_some(Action::SetFormData(patch))
}
