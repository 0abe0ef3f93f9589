//! Programada Store
//!
//! Storefront core for a scheduled-import ("compra programada") Apple reseller.
//!
//! ## Features
//! - Product catalog with remote source, retry and built-in fallback
//! - Storage-variant pricing and discount badges
//! - Shopping cart keyed by product and storage option
//! - Checkout with PIX discount and sequential order numbers
//! - Order fulfillment timeline
//! - Postal-code address lookup and AI product advisor

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod services;
pub mod session;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::domain::aggregates::{CartError, OrderError, ProductError};
use crate::domain::timeline::TimelineError;
use crate::services::advisor::AdvisorError;
use crate::services::postal::PostalError;
use crate::session::SessionError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Customer is not logged in")]
    NotLoggedIn,

    #[error("Customer name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Postal(#[from] PostalError),

    #[error(transparent)]
    Advisor(#[from] AdvisorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
