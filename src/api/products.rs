//! Storefront catalog endpoints.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiPath, ApiQuery};
use crate::api::AppState;
use crate::domain::aggregates::Product;
use crate::store::{Page, ProductFilter};

pub async fn list_products(
    State(s): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(s.catalog.list_products(&filter).await?))
}

pub async fn get_product(State(s): State<AppState>, ApiPath(slug): ApiPath<String>) -> ApiResult<Json<Product>> {
    Ok(Json(s.catalog.product(&slug).await?))
}
