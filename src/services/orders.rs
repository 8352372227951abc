//! Order placement, cancellation and payment marking.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::aggregates::{merge_lines, NewOrder, Order, OrderItem, OrderLine, Recipient};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, OrderId, ProductId, UserId};
use crate::events::EventPublisher;
use crate::store::{CatalogStore, OrderFilter, Page, Transition};
use crate::{Result, ShopError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub recipient: Recipient,
    pub items: Vec<OrderLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn CatalogStore>,
    shipping_fee: Money,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn CatalogStore>, shipping_fee: Money, events: EventPublisher) -> Self {
        Self { store, shipping_fee, events }
    }

    pub fn shipping_fee(&self) -> Money { self.shipping_fee }

    /// Validates the request against live price and stock, then writes the order,
    /// its items and the stock decrement in one store call.
    #[instrument(skip_all, fields(user_id = %request.user_id, lines = request.items.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<OrderId> {
        if request.items.is_empty() {
            return Err(ShopError::validation("سبد خرید خالی است"));
        }
        let lines = merge_lines(&request.items)?;
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let products = self.store.products_by_ids(&ids).await?;

        let new = NewOrder::price(request.user_id, request.recipient, &lines, &products, self.shipping_fee, Utc::now())?;
        self.store.commit_order(&new).await.map_err(|error| {
            warn!(%error, "order write failed");
            ShopError::from(error)
        })?;

        let order = &new.order;
        info!(order_id = %order.id, grand_total = order.grand_total.amount(), "order placed");
        self.events
            .publish(DomainEvent::Order(OrderEvent::Placed {
                order_id: order.id,
                user_id: order.user_id,
                grand_total: order.grand_total,
                item_count: new.items.len(),
            }))
            .await;
        Ok(order.id)
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, user: UserId, id: OrderId) -> Result<()> {
        let order = self.owned_order(user, id).await?;
        order.ensure_cancelable()?;

        match self.store.cancel_order(id, user).await? {
            Transition::Applied => {
                info!(order_id = %id, "order canceled and restocked");
                self.events.publish(DomainEvent::Order(OrderEvent::Canceled { order_id: id, user_id: user })).await;
                Ok(())
            }
            Transition::Stale => Err(ShopError::OnlyPendingCanCancel),
        }
    }

    /// Marks a pending order as paid. There is no gateway behind this; it is a status flag.
    #[instrument(skip(self))]
    pub async fn pay_order(&self, user: UserId, id: OrderId) -> Result<()> {
        let order = self.owned_order(user, id).await?;
        order.ensure_payable()?;

        match self.store.mark_paid(id, user).await? {
            Transition::Applied => {
                info!(order_id = %id, "order marked paid");
                self.events.publish(DomainEvent::Order(OrderEvent::Paid { order_id: id, user_id: user })).await;
                Ok(())
            }
            Transition::Stale => Err(ShopError::OnlyPendingCanPay),
        }
    }

    /// The caller's orders, newest first.
    pub async fn orders_for(&self, user: UserId) -> Result<Vec<OrderDetails>> {
        let orders = self.store.orders_for_user(user).await?;
        self.with_items(orders).await
    }

    /// Read-only listing across every shopper, for the back office.
    pub async fn all_orders(&self, filter: &OrderFilter) -> Result<Page<OrderDetails>> {
        let page = self.store.list_orders(filter).await?;
        let data = self.with_items(page.data).await?;
        Ok(Page { data, total: page.total, page: page.page, per_page: page.per_page })
    }

    async fn owned_order(&self, user: UserId, id: OrderId) -> Result<Order> {
        // someone else's order is reported exactly like a missing one
        self.store
            .order(id)
            .await?
            .filter(|o| o.is_owned_by(user))
            .ok_or_else(|| ShopError::not_found("سفارش یافت نشد"))
    }

    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderDetails>> {
        if orders.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in self.store.items_for_orders(&ids).await? {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(orders
            .into_iter()
            .map(|order| {
                let items = grouped.remove(&order.id).unwrap_or_default();
                OrderDetails { order, items }
            })
            .collect())
    }
}
