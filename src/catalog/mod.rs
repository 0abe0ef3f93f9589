//! Product catalog resolution.
//!
//! The resolver asks a [`CatalogSource`] for the product table, retrying with
//! exponential backoff, and serves [`fallback::fallback_products`] whenever the
//! source fails, times out or returns no usable rows. Callers always get a catalog.

pub mod fallback;
pub mod postgres;
pub mod rest;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::domain::aggregates::{Pricing, Product, StorageOption};
use crate::domain::value_objects::Money;

pub use fallback::fallback_products;
pub use postgres::PgCatalogSource;
pub use rest::RestCatalogSource;

pub const DEFAULT_TABLE: &str = "products";

/// Errors raised by catalog sources. The resolver never lets these reach its callers.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed catalog response: {0}")]
    Malformed(String),

    #[error("invalid table name: {0}")]
    InvalidTable(String),

    #[error("catalog fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// A structured-data backend exposing `list(table) -> rows`, ordered by id.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list(&self, table: &str) -> Result<Vec<CatalogRow>, CatalogError>;

    fn name(&self) -> &'static str;
}

/// Raw row as stored remotely (snake_case, loosely typed).
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub market_price: Option<Decimal>,
    #[serde(default)]
    pub programada_price: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub storage_options: Option<Vec<StorageOptionRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageOptionRow {
    pub capacity: String,
    pub price: Decimal,
    #[serde(alias = "marketPrice")]
    pub market_price: Decimal,
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId { Text(String), Number(i64) }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row {0} has neither programada_price nor price")]
    MissingPrice(String),
}

impl TryFrom<CatalogRow> for Product {
    type Error = RowError;

    fn try_from(row: CatalogRow) -> Result<Self, Self::Error> {
        let price = row.programada_price.or(row.price).ok_or_else(|| RowError::MissingPrice(row.id.clone()))?;
        let options = row
            .storage_options
            .unwrap_or_default()
            .into_iter()
            .map(|o| StorageOption::new(o.capacity, Money::brl(o.price), Money::brl(o.market_price)))
            .collect();
        let pricing = Pricing::from_parts(Money::brl(price), row.market_price.map(Money::brl), options);

        let mut product = Product::new(row.id, row.name, row.category.unwrap_or_default(), pricing)
            .with_description(row.description.unwrap_or_default())
            .with_stock(row.in_stock.unwrap_or(true));
        if let Some(image) = row.image { product = product.with_image(image); }
        if let Some(rating) = row.rating { product = product.with_rating(rating); }
        Ok(product)
    }
}

/// Only plain identifiers are accepted as table names.
pub(crate) fn validate_table(table: &str) -> Result<(), CatalogError> {
    let valid = !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid { Ok(()) } else { Err(CatalogError::InvalidTable(table.to_string())) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, timeout: Duration::from_secs(8), initial_backoff: Duration::from_millis(200) }
    }
}

pub struct CatalogResolver {
    source: Option<Arc<dyn CatalogSource>>,
    table: String,
    fallback: Vec<Product>,
    retry: RetryPolicy,
}

impl CatalogResolver {
    /// A resolver with no remote source serves `fallback` as-is.
    pub fn new(fallback: Vec<Product>) -> Self {
        if fallback.is_empty() {
            warn!("fallback catalog is empty; an unreachable source will leave the store without products");
        }
        Self { source: None, table: DEFAULT_TABLE.to_string(), fallback, retry: RetryPolicy::default() }
    }

    pub fn with_source(mut self, source: Arc<dyn CatalogSource>) -> Self { self.source = Some(source); self }
    pub fn with_table(mut self, table: impl Into<String>) -> Self { self.table = table.into(); self }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self { self.retry = retry; self }

    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn get_products(&self) -> Vec<Product> {
        let Some(source) = &self.source else {
            debug!("no catalog source configured, serving built-in table");
            return self.fallback.clone();
        };

        let rows = match self.fetch_with_retry(source.as_ref()).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(source = source.name(), error = %e, "catalog fetch failed, serving built-in table");
                return self.fallback.clone();
            }
        };

        let products: Vec<Product> = rows
            .into_iter()
            .filter_map(|row| Product::try_from(row).map_err(|e| warn!(error = %e, "skipping catalog row")).ok())
            .collect();

        if products.is_empty() {
            warn!(source = source.name(), "catalog source returned no usable rows, serving built-in table");
            return self.fallback.clone();
        }
        info!(source = source.name(), count = products.len(), "catalog loaded");
        products
    }

    async fn fetch_with_retry(&self, source: &dyn CatalogSource) -> Result<Vec<CatalogRow>, CatalogError> {
        let attempts = self.retry.attempts.max(1);
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;
        loop {
            let error = match tokio::time::timeout(self.retry.timeout, source.list(&self.table)).await {
                Ok(Ok(rows)) => return Ok(rows),
                Ok(Err(e)) => e,
                Err(_) => CatalogError::Timeout(self.retry.timeout),
            };
            if attempt >= attempts { return Err(error); }
            warn!(attempt, attempts, error = %error, ?backoff, "catalog fetch failed, retrying");
            tokio::time::sleep(backoff).await;
            backoff = backoff.saturating_mul(2);
            attempt += 1;
        }
    }
}
