//! Back-office endpoints. Orders are read-only here.

use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::api::auth::AdminUser;
use crate::api::error::ApiResult;
use crate::api::extract::ApiQuery;
use crate::api::AppState;
use crate::services::OrderDetails;
use crate::store::{OrderFilter, Page};

pub async fn list_orders(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<Json<Page<OrderDetails>>> {
    info!(admin_id = %admin, status = ?filter.status, "admin order listing");
    Ok(Json(s.orders.all_orders(&filter).await?))
}
