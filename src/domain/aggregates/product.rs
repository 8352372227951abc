//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Money, ProductId, Quantity};
use crate::ShopError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub price: Money,
    pub sale_price: Option<Money>,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price charged per unit: the sale price wins only when it undercuts the list price.
    pub fn unit_price(&self) -> Money {
        match self.sale_price {
            Some(sale) if sale < self.price => sale,
            _ => self.price,
        }
    }

    pub fn is_in_stock(&self) -> bool { self.stock > 0 }

    /// Checks that `qty` units can be sold right now.
    pub fn ensure_orderable(&self, qty: Quantity) -> Result<(), ShopError> {
        if !self.active {
            return Err(ShopError::validation(format!("محصول «{}» در حال حاضر فعال نیست", self.name)));
        }
        if i64::from(qty.value()) > i64::from(self.stock) {
            return Err(ShopError::validation(format!(
                "موجودی «{}» کافی نیست (درخواستی: {}، موجود: {})",
                self.name, qty, self.stock
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample(name: &str, price: i64, sale_price: Option<i64>, stock: i32) -> Product {
    Product {
        id: ProductId::new(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        category: Some("bouquet".into()),
        description: None,
        cover_url: None,
        price: Money::new(price),
        sale_price: sale_price.map(Money::new),
        stock,
        active: true,
        created_at: Utc::now(),
    }
}
