//! HTTP route handlers for the commerce API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (verifies database)
//!
//! # Cart (identity via x-user-id header)
//! GET    /cart                 - Priced cart
//! POST   /cart                 - Add or replace a line
//! PATCH  /cart/items           - Set a line's quantity (0 deletes)
//! DELETE /cart/items           - Remove a line
//! DELETE /cart                 - Clear the cart
//!
//! # Catalog
//! GET  /products/{id}          - Product detail
//! GET  /products/{id}/coupons  - Active coupons covering the product
//!
//! # Coupons
//! POST   /coupons                      - Create (validated)
//! GET    /coupons                      - List with filters + pagination
//! GET    /coupons/{id}                 - Fetch by id
//! GET    /coupons/code/{code}          - Find by code
//! PATCH  /coupons/{id}                 - Partial update
//! DELETE /coupons/{id}                 - Delete
//! POST   /coupons/validate             - Validate against a cart total
//! POST   /coupons/apply                - Validate + discount breakdown
//! POST   /coupons/best-for-categories  - Batch best-coupon helper
//! POST   /coupons/increment-usage      - Record a redemption
//!
//! # Checkout
//! POST /checkout               - Place an order from the priced cart
//! GET  /orders/{id}            - Fetch one of the user's orders
//! ```

pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route(
            "/items",
            axum::routing::patch(cart::update).delete(cart::remove),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(products::show))
        .route("/{id}/coupons", get(products::coupons))
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(coupons::create).get(coupons::list))
        .route("/validate", post(coupons::validate))
        .route("/apply", post(coupons::apply))
        .route("/best-for-categories", post(coupons::best_for_categories))
        .route("/increment-usage", post(coupons::increment_usage))
        .route("/code/{code}", get(coupons::show_by_code))
        .route(
            "/{id}",
            get(coupons::show)
                .patch(coupons::update)
                .delete(coupons::delete),
        )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout::place_order))
        .route("/orders/{id}", get(checkout::show_order))
}

/// Create all routes for the commerce API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/products", product_routes())
        .nest("/coupons", coupon_routes())
        .merge(checkout_routes())
}
