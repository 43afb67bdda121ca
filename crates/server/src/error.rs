//! Unified error handling.
//!
//! Provides a unified `AppError` type that maps the service-layer error
//! taxonomy onto HTTP status codes. All route handlers should return
//! `Result<T, AppError>`. Server-side failures are logged and their details
//! hidden from clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{CartError, CheckoutError, CouponError};

/// Application-level error type for the commerce API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Coupon operation failed.
    #[error("coupon error: {0}")]
    Coupon(#[from] CouponError),

    /// Checkout failed.
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request is missing (or carries an invalid) user identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => cart_status(err),
            Self::Coupon(err) => coupon_status(err),
            Self::Checkout(err) => checkout_status(err),
            Self::Database(err) => repository_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn cart_status(err: &CartError) -> StatusCode {
    match err {
        CartError::ProductNotFound | CartError::CartNotFound | CartError::LineNotFound => {
            StatusCode::NOT_FOUND
        }
        CartError::InsufficientStock { .. }
        | CartError::AmbiguousTarget
        | CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
        CartError::Repository(inner) => repository_status(inner),
    }
}

fn coupon_status(err: &CouponError) -> StatusCode {
    match err {
        CouponError::NotFound => StatusCode::NOT_FOUND,
        CouponError::CodeTaken(_)
        | CouponError::InvalidCode(_)
        | CouponError::InvalidPercentage(_)
        | CouponError::InvalidDiscount(_)
        | CouponError::MissingMinPurchaseAmount
        | CouponError::Inactive
        | CouponError::UsageLimitExceeded
        | CouponError::MinPurchaseNotMet { .. }
        | CouponError::NoEligibleProducts => StatusCode::BAD_REQUEST,
        CouponError::Repository(inner) => repository_status(inner),
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::CouponExhausted => StatusCode::BAD_REQUEST,
        CheckoutError::OrderNotFound => StatusCode::NOT_FOUND,
        CheckoutError::Cart(inner) => cart_status(inner),
        CheckoutError::Repository(inner) => repository_status(inner),
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "request error");
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "code": status.as_u16(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn cart_errors_map_to_expected_statuses() {
        assert_eq!(
            get_status(AppError::Cart(CartError::ProductNotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::InsufficientStock {
                requested: 4,
                available: 2
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::AmbiguousTarget)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::InvalidQuantity(-2))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn coupon_errors_map_to_expected_statuses() {
        assert_eq!(
            get_status(AppError::Coupon(CouponError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Coupon(CouponError::Inactive)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Coupon(CouponError::UsageLimitExceeded)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn checkout_errors_map_to_expected_statuses() {
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::OrderNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "invalid scope in row".to_string(),
        ));
        assert_eq!(get_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn display_is_stable() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "not found: product 123");
    }
}
