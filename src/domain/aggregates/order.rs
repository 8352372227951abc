//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, OrderId, OrderItemId, ProductId, Quantity, UserId};
use crate::ShopError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Sent,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "canceled" => Ok(Self::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown order status `{0}`")]
pub struct UnknownStatus(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub sub_total: Money,
    pub shipping_fee: Money,
    pub grand_total: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user: UserId) -> bool { self.user_id == user }

    pub fn ensure_cancelable(&self) -> Result<(), ShopError> {
        if self.status != OrderStatus::Pending { return Err(ShopError::OnlyPendingCanCancel); }
        Ok(())
    }

    pub fn ensure_payable(&self) -> Result<(), ShopError> {
        if self.status != OrderStatus::Pending { return Err(ShopError::OnlyPendingCanPay); }
        Ok(())
    }
}

/// Line of an order, frozen at placement time. The product snapshot keeps history
/// readable after the product changes; `product_id` becomes `None` once the product is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_slug: String,
    pub product_category: Option<String>,
    pub qty: Quantity,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Requested line before pricing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub qty: Quantity,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
}

/// Fully priced order ready to be persisted in one go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Merges repeated products so availability is checked against the combined quantity.
pub fn merge_lines(lines: &[OrderLine]) -> Result<Vec<OrderLine>, ShopError> {
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                let total = existing.qty.value() + line.qty.value();
                existing.qty = Quantity::new(total).map_err(|e| ShopError::validation(e.to_string()))?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

fn amount_too_large() -> ShopError { ShopError::validation("مبلغ سفارش از حد مجاز بیشتر است") }

impl NewOrder {
    /// Validates `lines` against the loaded `products` and computes every total.
    pub fn price(
        user_id: UserId,
        recipient: Recipient,
        lines: &[OrderLine],
        products: &[Product],
        shipping_fee: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, ShopError> {
        if lines.is_empty() {
            return Err(ShopError::validation("سبد خرید خالی است"));
        }

        let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();
        let resolved = lines
            .iter()
            .map(|l| by_id.get(&l.product_id).map(|p| (*p, l.qty)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ShopError::validation("برخی محصولات یافت نشدند"))?;

        let order_id = OrderId::new();
        let mut items = Vec::with_capacity(resolved.len());
        for (product, qty) in resolved {
            product.ensure_orderable(qty)?;
            let unit_price = product.unit_price();
            let line_total = unit_price.checked_times(qty).ok_or_else(amount_too_large)?;
            items.push(OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: Some(product.id),
                product_name: product.name.clone(),
                product_slug: product.slug.clone(),
                product_category: product.category.clone(),
                qty,
                unit_price,
                line_total,
            });
        }

        let sub_total = items
            .iter()
            .try_fold(Money::ZERO, |acc, i| acc.checked_add(i.line_total))
            .ok_or_else(amount_too_large)?;
        let grand_total = sub_total.checked_add(shipping_fee).ok_or_else(amount_too_large)?;
        let order = Order {
            id: order_id,
            user_id,
            status: OrderStatus::Pending,
            full_name: recipient.full_name,
            phone: recipient.phone,
            address: recipient.address,
            note: recipient.note,
            sub_total,
            shipping_fee,
            grand_total,
            created_at: now,
        };
        Ok(Self { order, items })
    }
}
