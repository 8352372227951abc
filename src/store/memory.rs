//! In-memory store with the same all-or-nothing semantics as Postgres.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::domain::aggregates::{NewOrder, Order, OrderItem, OrderStatus, Product};
use crate::domain::profile::Profile;
use crate::domain::value_objects::{OrderId, ProductId, UserId};
use crate::store::{AccountStore, CatalogStore, OrderFilter, Page, ProductFilter, StoreError, Transition};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    profiles: HashMap<UserId, Profile>,
    admins: HashSet<UserId>,
    sessions: HashMap<String, UserId>,
    fail_writes: bool,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap() }

    pub(crate) fn insert_product(&self, product: Product) { self.lock().products.insert(product.id, product); }

    pub(crate) fn remove_product(&self, id: ProductId) {
        let mut state = self.lock();
        state.products.remove(&id);
        for item in state.items.iter_mut().filter(|i| i.product_id == Some(id)) {
            item.product_id = None;
        }
    }

    pub(crate) fn product(&self, id: ProductId) -> Option<Product> { self.lock().products.get(&id).cloned() }

    pub(crate) fn set_stock(&self, id: ProductId, stock: i32) {
        if let Some(p) = self.lock().products.get_mut(&id) { p.stock = stock; }
    }

    pub(crate) fn set_active(&self, id: ProductId, active: bool) {
        if let Some(p) = self.lock().products.get_mut(&id) { p.active = active; }
    }

    pub(crate) fn set_status(&self, id: OrderId, status: OrderStatus) {
        if let Some(o) = self.lock().orders.iter_mut().find(|o| o.id == id) { o.status = status; }
    }

    pub(crate) fn order_count(&self) -> usize { self.lock().orders.len() }
    pub(crate) fn item_count(&self) -> usize { self.lock().items.len() }

    pub(crate) fn add_session(&self, token: &str, user: UserId) { self.lock().sessions.insert(token.to_string(), user); }
    pub(crate) fn add_admin(&self, user: UserId) { self.lock().admins.insert(user); }

    /// Every following write fails as if the database connection dropped.
    pub(crate) fn fail_writes(&self) { self.lock().fail_writes = true; }
}

fn check_writes(state: &State) -> Result<(), StoreError> {
    if state.fail_writes { return Err(StoreError::Backend("connection reset by peer".into())); }
    Ok(())
}

fn matches_filter(product: &Product, filter: &ProductFilter) -> bool {
    let price = product.unit_price().amount();
    product.active
        && filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
            .map_or(true, |s| product.name.to_lowercase().contains(&s.to_lowercase()))
        && filter.category.as_ref().map_or(true, |c| product.category.as_ref() == Some(c))
        && filter.min_price.map_or(true, |min| price >= min)
        && filter.max_price.map_or(true, |max| price <= max)
        && (!filter.in_stock || product.is_in_stock())
}

fn paginate<T: Clone>(all: Vec<T>, request: &crate::store::PageRequest) -> Page<T> {
    let total = all.len() as i64;
    let data = all
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.per_page() as usize)
        .collect();
    Page::new(data, total, request)
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let state = self.lock();
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, StoreError> {
        let state = self.lock();
        let mut all: Vec<Product> = state.products.values().filter(|p| matches_filter(p, filter)).cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(all, &filter.page_request()))
    }

    async fn active_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.lock().products.values().find(|p| p.active && p.slug == slug).cloned())
    }

    async fn commit_order(&self, new: &NewOrder) -> Result<(), StoreError> {
        let mut state = self.lock();
        check_writes(&state)?;

        for item in &new.items {
            let Some(id) = item.product_id else { continue };
            let product_name = item.product_name.clone();
            match state.products.get(&id) {
                Some(p) if p.active && i64::from(p.stock) < i64::from(item.qty.value()) => {
                    return Err(StoreError::StockConflict { product_name })
                }
                Some(p) if p.active => {}
                _ => return Err(StoreError::ProductUnavailable { product_name }),
            }
        }
        for item in &new.items {
            if let Some(p) = item.product_id.and_then(|id| state.products.get_mut(&id)) {
                p.stock -= item.qty.as_i32();
            }
        }
        state.orders.push(new.order.clone());
        state.items.extend(new.items.iter().cloned());
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let state = self.lock();
        let mut orders: Vec<Order> = state.orders.iter().filter(|o| o.user_id == user).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>, StoreError> {
        let state = self.lock();
        let mut all: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(all, &filter.page_request()))
    }

    async fn items_for_orders(&self, ids: &[OrderId]) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self.lock().items.iter().filter(|i| ids.contains(&i.order_id)).cloned().collect())
    }

    async fn cancel_order(&self, id: OrderId, user: UserId) -> Result<Transition, StoreError> {
        let mut state = self.lock();
        check_writes(&state)?;

        let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.user_id == user && o.status == OrderStatus::Pending)
        else {
            return Ok(Transition::Stale);
        };
        order.status = OrderStatus::Canceled;

        let lines: Vec<_> = state.items.iter().filter(|i| i.order_id == id).map(|i| (i.product_id, i.qty)).collect();
        for (product_id, qty) in lines {
            if let Some(p) = product_id.and_then(|pid| state.products.get_mut(&pid)) {
                p.stock += qty.as_i32();
            }
        }
        Ok(Transition::Applied)
    }

    async fn mark_paid(&self, id: OrderId, user: UserId) -> Result<Transition, StoreError> {
        let mut state = self.lock();
        check_writes(&state)?;
        match state.orders.iter_mut().find(|o| o.id == id && o.user_id == user && o.status == OrderStatus::Pending) {
            Some(order) => {
                order.status = OrderStatus::Paid;
                Ok(Transition::Applied)
            }
            None => Ok(Transition::Stale),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn profile(&self, user: UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.lock().profiles.get(&user).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, StoreError> {
        let mut state = self.lock();
        check_writes(&state)?;
        state.profiles.insert(profile.id, profile.clone());
        Ok(profile.clone())
    }

    async fn is_admin(&self, user: UserId) -> Result<bool, StoreError> { Ok(self.lock().admins.contains(&user)) }

    async fn session_user(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.lock().sessions.get(token).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::domain::aggregates::product::sample;
    use crate::domain::aggregates::{OrderLine, Recipient};
    use crate::domain::value_objects::{Money, Quantity};

    fn priced(product: &Product, qty: u32) -> NewOrder {
        let recipient = Recipient {
            full_name: "بهار".into(),
            phone: "09121234567".into(),
            address: "قزوین، خیابان پیغمبریه".into(),
            note: None,
        };
        let lines = [OrderLine { product_id: product.id, qty: Quantity::new(qty).unwrap() }];
        NewOrder::price(UserId::new(), recipient, &lines, &[product.clone()], Money::ZERO, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_commit_reports_why_a_priced_line_went_stale() {
        let store = MemoryStore::new();
        let product = sample("Lilium", 40_000, None, 5);
        store.insert_product(product.clone());
        let new = priced(&product, 2);

        store.set_active(product.id, false);
        let err = store.commit_order(&new).await.unwrap_err();
        assert_eq!(err, StoreError::ProductUnavailable { product_name: "Lilium".into() });

        store.set_active(product.id, true);
        store.set_stock(product.id, 1);
        let err = store.commit_order(&new).await.unwrap_err();
        assert_eq!(err, StoreError::StockConflict { product_name: "Lilium".into() });

        assert_eq!(store.order_count(), 0);
        assert_eq!(store.product(product.id).unwrap().stock, 1);
    }
}
