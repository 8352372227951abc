//! Domain events
use serde::Serialize;

use crate::domain::value_objects::{Money, OrderId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OrderEvent {
    Placed { order_id: OrderId, user_id: UserId, grand_total: Money, item_count: usize },
    Canceled { order_id: OrderId, user_id: UserId },
    Paid { order_id: OrderId, user_id: UserId },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "shop.order.placed",
            Self::Order(OrderEvent::Canceled { .. }) => "shop.order.canceled",
            Self::Order(OrderEvent::Paid { .. }) => "shop.order.paid",
        }
    }
}
