//! Golbarg flower shop - order core
//!
//! Server side of the Golbarg storefront plus the client-side checkout logic.
//!
//! ## Features
//! - Product catalog browsing (active products, filters, paging)
//! - Order placement against live price and stock
//! - Order cancellation with restock, payment marking
//! - Delivery profiles with Persian validation messages
//! - Client cart and checkout auto-resume across login/profile redirects

pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod events;
pub mod services;
pub mod store;

use thiserror::Error;

use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

/// Error taxonomy shared by every service. Messages are shown to shoppers, so
/// they are short Persian strings unless the HTTP contract names a code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopError {
    #[error("{0}")]
    Validation(String),

    #[error("UNAUTHORIZED")]
    Unauthorized,

    #[error("FORBIDDEN")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("ONLY_PENDING_CAN_CANCEL")]
    OnlyPendingCanCancel,

    #[error("ONLY_PENDING_CAN_PAY")]
    OnlyPendingCanPay,

    #[error("{0}")]
    Server(String),
}

impl ShopError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Stable machine-readable code, used in logs and events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::OnlyPendingCanCancel => "ONLY_PENDING_CAN_CANCEL",
            Self::OnlyPendingCanPay => "ONLY_PENDING_CAN_PAY",
            Self::Server(_) => "SERVER_ERROR",
        }
    }
}

impl From<StoreError> for ShopError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::StockConflict { product_name } => {
                Self::Validation(format!("موجودی «{product_name}» کافی نیست"))
            }
            StoreError::ProductUnavailable { product_name } => {
                Self::Validation(format!("محصول «{product_name}» در حال حاضر فعال نیست"))
            }
            StoreError::Backend(message) => Self::Server(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
