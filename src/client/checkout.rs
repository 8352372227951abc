//! Checkout auto-resume.
//!
//! A shopper who presses "checkout" may first be sent to the login screen and
//! then to the address screen. The intent to check out, and the items being
//! checked out, survive both trips as a single record in session storage:
//!
//! ```text
//! Idle -> AwaitingAuth -> AwaitingProfile -> Submitting -> Done
//!                                                  \-> Failed (retryable)
//! ```
//!
//! The controller runs once per mount. Only when the shopper is signed in and
//! has a complete delivery profile does it place the order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::storage::KeyValueStorage;
use crate::domain::aggregates::{Cart, OrderLine, Recipient};
use crate::domain::profile::Profile;
use crate::domain::value_objects::{OrderId, UserId};
use crate::services::{OrderService, PlaceOrder, ProfileService};

pub const INTENT_KEY: &str = "checkout:intent";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CheckoutStage {
    Idle,
    AwaitingAuth,
    AwaitingProfile,
    Submitting,
    Done { order_id: OrderId },
    Failed { message: String },
}

/// The one persisted record. Replaces a loose flag plus a loose item list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutIntent {
    pub stage: CheckoutStage,
    pub items: Vec<OrderLine>,
}

impl CheckoutIntent {
    /// A previous attempt left work behind.
    pub fn is_pending(&self) -> bool {
        let unfinished = !matches!(self.stage, CheckoutStage::Idle | CheckoutStage::Done { .. });
        unfinished || !self.items.is_empty()
    }
}

pub struct IntentStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> IntentStore<S> {
    pub fn new(storage: S) -> Self { Self { storage } }

    pub fn load(&self) -> Option<CheckoutIntent> {
        let raw = self.storage.get(INTENT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(intent) => Some(intent),
            Err(error) => {
                warn!(%error, "ignoring unreadable checkout intent");
                None
            }
        }
    }

    pub fn save(&mut self, intent: &CheckoutIntent) {
        match serde_json::to_string(intent) {
            Ok(raw) => self.storage.set(INTENT_KEY, raw),
            Err(error) => warn!(%error, "failed to persist checkout intent"),
        }
    }

    pub fn clear(&mut self) { self.storage.remove(INTENT_KEY); }

    pub fn storage(&self) -> &S { &self.storage }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// What the controller needs from the outside world.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    async fn current_user(&self) -> Option<UserId>;

    async fn fetch_profile(&self, user: UserId) -> Result<Option<Profile>, BackendError>;

    async fn place_order(&self, order: PlaceOrder) -> Result<OrderId, BackendError>;
}

/// Runs checkout in-process against the services, for server-rendered pages.
#[derive(Clone)]
pub struct LocalBackend {
    orders: OrderService,
    profiles: ProfileService,
    user: Option<UserId>,
}

impl LocalBackend {
    pub fn new(orders: OrderService, profiles: ProfileService, user: Option<UserId>) -> Self {
        Self { orders, profiles, user }
    }
}

#[async_trait]
impl CheckoutBackend for LocalBackend {
    async fn current_user(&self) -> Option<UserId> { self.user }

    async fn fetch_profile(&self, user: UserId) -> Result<Option<Profile>, BackendError> {
        self.profiles.profile(user).await.map_err(|e| BackendError(e.to_string()))
    }

    async fn place_order(&self, order: PlaceOrder) -> Result<OrderId, BackendError> {
        self.orders.place_order(order).await.map_err(|e| BackendError(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRoutes {
    pub login: String,
    pub address: String,
    /// Where login and the address screen send the shopper back to.
    pub resume: String,
    pub confirmation: String,
}

impl Default for CheckoutRoutes {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            address: "/dashboard/address".into(),
            resume: "/checkout?checkout=1".into(),
            confirmation: "/dashboard/orders".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Nothing asked for checkout.
    Inactive,
    /// This mount already ran.
    AlreadyStarted,
    /// No items anywhere; stale intent was cleared.
    Abandoned,
    Redirect { to: String, return_to: String },
    Completed { order_id: OrderId, navigate_to: String },
    Failed { message: String },
}

pub struct CheckoutResume<B, S> {
    backend: B,
    intents: IntentStore<S>,
    routes: CheckoutRoutes,
    stage: CheckoutStage,
    started: bool,
}

impl<B: CheckoutBackend, S: KeyValueStorage> CheckoutResume<B, S> {
    pub fn new(backend: B, storage: S, routes: CheckoutRoutes) -> Self {
        Self { backend, intents: IntentStore::new(storage), routes, stage: CheckoutStage::Idle, started: false }
    }

    pub fn stage(&self) -> &CheckoutStage { &self.stage }

    pub fn intents(&self) -> &IntentStore<S> { &self.intents }

    /// `checkout_requested` is the explicit checkout query flag on the current page.
    pub async fn run(&mut self, checkout_requested: bool, cart: &mut Cart) -> CheckoutOutcome {
        if self.started {
            return CheckoutOutcome::AlreadyStarted;
        }
        self.started = true;

        let persisted = self.intents.load();
        let resuming = persisted.as_ref().is_some_and(CheckoutIntent::is_pending);
        if !checkout_requested && !resuming {
            return CheckoutOutcome::Inactive;
        }

        let items = if cart.is_empty() { persisted.map(|i| i.items).unwrap_or_default() } else { cart.lines() };
        if items.is_empty() {
            debug!("nothing to check out, clearing intent");
            self.intents.clear();
            self.stage = CheckoutStage::Idle;
            return CheckoutOutcome::Abandoned;
        }

        let Some(user) = self.backend.current_user().await else {
            self.persist(CheckoutStage::AwaitingAuth, &items);
            return self.redirect(self.routes.login.clone());
        };

        let profile = match self.backend.fetch_profile(user).await {
            Ok(profile) => profile,
            Err(BackendError(message)) => {
                warn!(user_id = %user, %message, "profile fetch failed");
                self.stage = CheckoutStage::Failed { message: message.clone() };
                return CheckoutOutcome::Failed { message };
            }
        };
        let Some(profile) = profile.filter(Profile::is_complete) else {
            self.persist(CheckoutStage::AwaitingProfile, &items);
            return self.redirect(self.routes.address.clone());
        };

        self.persist(CheckoutStage::Submitting, &items);
        let request = PlaceOrder {
            user_id: user,
            recipient: Recipient {
                full_name: profile.full_name,
                phone: profile.phone,
                address: profile.address,
                note: None,
            },
            items: items.clone(),
        };
        match self.backend.place_order(request).await {
            Ok(order_id) => {
                info!(%order_id, "checkout completed");
                self.intents.clear();
                cart.clear();
                self.stage = CheckoutStage::Done { order_id };
                CheckoutOutcome::Completed { order_id, navigate_to: self.routes.confirmation.clone() }
            }
            Err(BackendError(message)) => {
                warn!(user_id = %user, %message, "checkout submission failed");
                self.persist(CheckoutStage::Failed { message: message.clone() }, &items);
                CheckoutOutcome::Failed { message }
            }
        }
    }

    fn persist(&mut self, stage: CheckoutStage, items: &[OrderLine]) {
        self.intents.save(&CheckoutIntent { stage: stage.clone(), items: items.to_vec() });
        self.stage = stage;
    }

    fn redirect(&self, to: String) -> CheckoutOutcome {
        CheckoutOutcome::Redirect { to, return_to: self.routes.resume.clone() }
    }
}
