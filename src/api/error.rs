//! HTTP mapping for [`ShopError`]: every failure becomes `{ok: false, message}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

use crate::ShopError;

pub type ApiResult<T> = std::result::Result<T, ShopError>;

fn status_for(error: &ShopError) -> StatusCode {
    match error {
        ShopError::Validation(_) | ShopError::OnlyPendingCanCancel | ShopError::OnlyPendingCanPay => {
            StatusCode::BAD_REQUEST
        }
        ShopError::Unauthorized => StatusCode::UNAUTHORIZED,
        ShopError::Forbidden => StatusCode::FORBIDDEN,
        ShopError::NotFound(_) => StatusCode::NOT_FOUND,
        ShopError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            debug!(code = self.code(), error = %self, "request rejected");
        }
        (status, Json(json!({ "ok": false, "message": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(%rejection, "malformed json body");
        ShopError::validation("اطلاعات ارسال شده معتبر نیست")
    }
}

impl From<QueryRejection> for ShopError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(%rejection, "malformed query string");
        ShopError::validation("پارامترهای جستجو معتبر نیستند")
    }
}

impl From<PathRejection> for ShopError {
    fn from(rejection: PathRejection) -> Self {
        debug!(%rejection, "malformed path parameter");
        ShopError::not_found("یافت نشد")
    }
}
