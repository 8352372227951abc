//! Extractors whose rejections use the shop's JSON error body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::ShopError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ShopError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ShopError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ShopError))]
pub struct ApiPath<T>(pub T);
