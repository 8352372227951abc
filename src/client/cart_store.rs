//! Per-owner cart persistence in client-local storage.

use tracing::warn;

use crate::client::storage::KeyValueStorage;
use crate::domain::aggregates::{Cart, CartItem, CartOwner};
use crate::domain::value_objects::UserId;

pub struct CartStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> CartStore<S> {
    pub fn new(storage: S) -> Self { Self { storage } }

    pub fn storage(&self) -> &S { &self.storage }

    /// Unreadable entries are treated as an empty cart.
    pub fn load(&self, owner: CartOwner) -> Cart {
        let Some(raw) = self.storage.get(&owner.storage_key()) else { return Cart::new(owner) };
        match serde_json::from_str::<Vec<CartItem>>(&raw) {
            Ok(items) => Cart::with_items(owner, items),
            Err(error) => {
                warn!(key = %owner.storage_key(), %error, "discarding unreadable cart");
                Cart::new(owner)
            }
        }
    }

    pub fn save(&mut self, cart: &Cart) {
        let key = cart.owner().storage_key();
        if cart.is_empty() {
            self.storage.remove(&key);
            return;
        }
        match serde_json::to_string(cart.items()) {
            Ok(raw) => self.storage.set(&key, raw),
            Err(error) => warn!(%key, %error, "failed to persist cart"),
        }
    }

    /// Folds the guest cart into the signed-in user's cart and drops the guest copy.
    pub fn adopt_guest(&mut self, user: UserId) -> Cart {
        let guest = self.load(CartOwner::Guest);
        let mut cart = self.load(CartOwner::User(user));
        if !guest.is_empty() {
            cart.absorb(guest);
            self.save(&cart);
            self.storage.remove(&CartOwner::Guest.storage_key());
        }
        cart
    }
}
