//! Cart Aggregate
//!
//! Lines are keyed by `(product id, storage label)`. Adding an existing key bumps
//! its quantity in place; the price captured by the first add is kept.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::product::{Product, ResolvedPrice};
use crate::domain::value_objects::{Money, Quantity, DEFAULT_CURRENCY};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    id: String,
    currency: String,
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub storage: Option<String>,
    pub quantity: Quantity,
    /// Locked in when the line was created.
    pub unit_price: Money,
    pub market_price: Option<Money>,
}

impl CartLine {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
    pub fn product_id(&self) -> &str { self.product.id() }
    pub fn matches(&self, product_id: &str, storage: Option<&str>) -> bool {
        self.product.id() == product_id && self.storage.as_deref() == storage
    }
}

impl Default for Cart { fn default() -> Self { Self::new(DEFAULT_CURRENCY) } }

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(), currency: currency.to_string(), lines: vec![],
            created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn line_count(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn line(&self, product_id: &str, storage: Option<&str>) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(product_id, storage))
    }

    /// Merges into the existing line for `(product, storage)` or appends a new one.
    pub fn add(&mut self, product: &Product, unit_price: Money, market_price: Option<Money>, storage: Option<&str>) -> Result<(), CartError> {
        if unit_price.currency() != self.currency {
            return Err(CartError::CurrencyMismatch { expected: self.currency.clone(), found: unit_price.currency().to_string() });
        }
        if let Some(existing) = self.lines.iter_mut().find(|l| l.matches(product.id(), storage)) {
            existing.quantity = existing.quantity.increment();
        } else {
            self.lines.push(CartLine {
                product: product.clone(), storage: storage.map(str::to_string),
                quantity: Quantity::ONE, unit_price, market_price,
            });
        }
        self.touch();
        Ok(())
    }

    pub fn add_resolved(&mut self, product: &Product, price: ResolvedPrice) -> Result<(), CartError> {
        let ResolvedPrice { unit_price, market_price, storage } = price;
        self.add(product, unit_price, market_price, storage.as_deref())
    }

    /// Removes the matching line. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: &str, storage: Option<&str>) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(product_id, storage));
        let removed = self.lines.len() != before;
        if removed { self.touch(); }
        removed
    }

    /// Replaces the quantity, clamped to at least 1. Unknown keys are ignored.
    pub fn set_quantity(&mut self, product_id: &str, storage: Option<&str>, quantity: i64) -> Option<Quantity> {
        let line = self.lines.iter_mut().find(|l| l.matches(product_id, storage))?;
        line.quantity = Quantity::clamped(quantity);
        let updated = line.quantity;
        self.touch();
        Some(updated)
    }

    pub fn subtotal(&self) -> Money {
        let amount = self.lines.iter().map(|l| l.line_total().amount()).sum::<Decimal>();
        Money::new(amount, &self.currency)
    }

    /// Units across all lines, for the cart badge.
    pub fn item_count(&self) -> u32 { self.lines.iter().fold(0u32, |n, l| n.saturating_add(l.quantity.value())) }

    pub fn snapshot(&self) -> Vec<CartLine> { self.lines.clone() }

    pub fn clear(&mut self) { self.lines.clear(); self.touch(); }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("cart is priced in {expected}, got {found}")]
    CurrencyMismatch { expected: String, found: String },
}
