//! Order endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::api::auth::CurrentUser;
use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::AppState;
use crate::domain::aggregates::{OrderLine, Recipient};
use crate::domain::profile::first_message;
use crate::domain::value_objects::{OrderId, ProductId, Quantity};
use crate::services::PlaceOrder;
use crate::ShopError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 2, max = 100, message = "نام گیرنده باید حداقل ۲ حرف باشد"))]
    pub full_name: String,
    #[validate(length(min = 5, max = 20, message = "شماره تماس معتبر نیست"))]
    pub phone: String,
    #[validate(length(min = 10, max = 500, message = "آدرس باید حداقل ۱۰ کاراکتر باشد"))]
    pub address: String,
    #[validate(length(max = 500, message = "توضیحات سفارش بیش از حد طولانی است"))]
    pub note: Option<String>,
    #[validate(length(min = 1, message = "سبد خرید خالی است"))]
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub qty: u32,
}

impl PlaceOrderRequest {
    fn into_command(self, user: CurrentUser) -> ApiResult<PlaceOrder> {
        self.validate().map_err(|e| ShopError::Validation(first_message(&e)))?;
        let items = self
            .items
            .iter()
            .map(|line| {
                Quantity::new(line.qty)
                    .map(|qty| OrderLine { product_id: line.product_id, qty })
                    .map_err(|e| ShopError::validation(e.to_string()))
            })
            .collect::<ApiResult<Vec<_>>>()?;
        let note = self.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(PlaceOrder {
            user_id: user.0,
            recipient: Recipient {
                full_name: self.full_name.trim().to_string(),
                phone: self.phone.trim().to_string(),
                address: self.address.trim().to_string(),
                note,
            },
            items,
        })
    }
}

pub async fn place_order(
    State(s): State<AppState>,
    user: CurrentUser,
    ApiJson(r): ApiJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let order_id = s.orders.place_order(r.into_command(user)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "orderId": order_id }))))
}

pub async fn list_orders(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Value>> {
    let orders = s.orders.orders_for(user).await?;
    Ok(Json(json!({ "ok": true, "orders": orders })))
}

pub async fn cancel_order(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<Value>> {
    s.orders.cancel_order(user, id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn pay_order(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<Value>> {
    s.orders.pay_order(user, id).await?;
    Ok(Json(json!({ "ok": true })))
}
