//! Cart Aggregate
//!
//! Client-side cart. It is never stored server side; the client keeps one per
//! owner (guest or signed-in user) in local storage using the JSON form below.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::OrderLine;
use crate::domain::value_objects::{Money, ProductId, Quantity, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CartOwner {
    Guest,
    User(UserId),
}

impl CartOwner {
    pub fn storage_key(&self) -> String {
        match self {
            Self::Guest => "cart:guest".to_string(),
            Self::User(id) => format!("cart:{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub qty: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> Option<Money> { self.price.map(|p| p.times(self.qty)) }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cart {
    owner: CartOwner,
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new(owner: CartOwner) -> Self { Self { owner, items: vec![] } }

    pub fn with_items(owner: CartOwner, items: Vec<CartItem>) -> Self {
        let mut cart = Self::new(owner);
        for item in items { cart.add_item(item); }
        cart
    }

    pub fn owner(&self) -> CartOwner { self.owner }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Sum over the items whose price is known.
    pub fn subtotal(&self) -> Money { self.items.iter().filter_map(CartItem::line_total).sum() }

    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.qty = existing.qty.saturating_add(item.qty);
            // newer catalog data wins
            if item.price.is_some() { existing.price = item.price; }
            if item.cover_url.is_some() { existing.cover_url = item.cover_url; }
            if item.slug.is_some() { existing.slug = item.slug; }
        } else {
            self.items.push(item);
        }
    }

    /// Sets the quantity; zero removes the item and larger counts clamp to the maximum.
    pub fn update_quantity(&mut self, product_id: ProductId, qty: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if qty == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.qty = Quantity::clamped(qty); }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }

    /// Moves every item of `other` into this cart, merging quantities.
    pub fn absorb(&mut self, other: Cart) {
        for item in other.items { self.add_item(item); }
    }

    pub fn clear(&mut self) { self.items.clear(); }

    pub fn lines(&self) -> Vec<OrderLine> {
        self.items.iter().map(|i| OrderLine { product_id: i.product_id, qty: i.qty }).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Item not found")]
    ItemNotFound,
}
