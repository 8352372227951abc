//! Cookie session lookup.
//!
//! The hosted auth service issues the session token; this module only resolves
//! the cookie to a user id and, for back-office routes, checks admin membership.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::warn;

use crate::api::AppState;
use crate::domain::value_objects::UserId;
use crate::ShopError;

/// Signed-in shopper. Rejects with `401` when the cookie is absent, unknown or expired.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

/// Signed-in member of `admin_users`. Rejects with `403` for everyone else.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub UserId);

pub(crate) fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.session_cookie).ok_or(ShopError::Unauthorized)?;
        match state.accounts.session_user(&token).await? {
            Some(user) => Ok(Self(user)),
            None => {
                warn!("unknown or expired session cookie");
                Err(ShopError::Unauthorized)
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !state.accounts.is_admin(user).await? {
            warn!(user_id = %user, "non-admin tried a back-office route");
            return Err(ShopError::Forbidden);
        }
        Ok(Self(user))
    }
}
