//! Profile endpoints consumed by the checkout flow.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::auth::CurrentUser;
use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::api::AppState;
use crate::domain::profile::ProfileInput;

pub async fn get_profile(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Value>> {
    let profile = s.profiles.profile(user).await?;
    let complete = profile.as_ref().is_some_and(|p| p.is_complete());
    Ok(Json(json!({ "ok": true, "profile": profile, "complete": complete })))
}

pub async fn save_profile(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<ProfileInput>,
) -> ApiResult<Json<Value>> {
    let profile = s.profiles.save(user, input).await?;
    Ok(Json(json!({ "ok": true, "profile": profile })))
}
