//! Product Aggregate

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: String,
    name: String,
    category: String,
    description: String,
    image: Option<String>,
    pricing: Pricing,
    in_stock: bool,
    rating: Option<f32>,
}

/// One selectable storage capacity with its own prices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOption { pub capacity: String, pub price: Money, pub market_price: Money }

impl StorageOption {
    pub fn new(capacity: impl Into<String>, price: Money, market_price: Money) -> Self {
        Self { capacity: capacity.into(), price, market_price }
    }
}

/// Where a product's price comes from. When variants exist they are the only source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pricing {
    Simple { price: Money, market_price: Option<Money> },
    Variants { options: Vec<StorageOption> },
}

impl Pricing {
    /// Non-empty `options` win; otherwise the base prices apply.
    pub fn from_parts(price: Money, market_price: Option<Money>, options: Vec<StorageOption>) -> Self {
        if options.is_empty() { Self::Simple { price, market_price } } else { Self::Variants { options } }
    }

    pub fn resolve(&self, storage: Option<&str>) -> Result<ResolvedPrice, PricingError> {
        match (self, storage) {
            (Self::Simple { price, market_price }, _) => Ok(ResolvedPrice {
                unit_price: price.clone(), market_price: market_price.clone(), storage: None,
            }),
            (Self::Variants { options }, None) => options.first().map(ResolvedPrice::from).ok_or(PricingError::NoVariants),
            (Self::Variants { options }, Some(label)) => options
                .iter()
                .find(|o| o.capacity == label)
                .map(ResolvedPrice::from)
                .ok_or_else(|| PricingError::UnknownVariant(label.to_string())),
        }
    }
}

/// Price a customer would pay right now for one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub unit_price: Money,
    pub market_price: Option<Money>,
    /// Capacity actually priced; `None` for products without variants.
    pub storage: Option<String>,
}

impl ResolvedPrice {
    pub fn discount_percent(&self) -> Option<u32> { discount_percent(&self.unit_price, self.market_price.as_ref()) }
}

impl From<&StorageOption> for ResolvedPrice {
    fn from(o: &StorageOption) -> Self {
        Self { unit_price: o.price.clone(), market_price: Some(o.market_price.clone()), storage: Some(o.capacity.clone()) }
    }
}

/// Badge value: `round((market - unit) / market * 100)`.
///
/// `None` when there is no positive market price or the unit price is not below it,
/// so a badge never shows zero or a negative discount.
pub fn discount_percent(unit_price: &Money, market_price: Option<&Money>) -> Option<u32> {
    let market = market_price.filter(|m| m.is_positive() && m.currency() == unit_price.currency())?;
    let pct = ((market.amount() - unit_price.amount()) / market.amount() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    pct.to_u32().filter(|p| *p > 0)
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>, pricing: Pricing) -> Self {
        Self {
            id: id.into(), name: name.into(), category: category.into(), description: String::new(),
            image: None, pricing, in_stock: true, rating: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = description.into(); self }
    pub fn with_image(mut self, url: impl Into<String>) -> Self { self.image = Some(url.into()); self }
    pub fn with_rating(mut self, rating: f32) -> Self { self.rating = Some(rating); self }
    pub fn with_stock(mut self, in_stock: bool) -> Self { self.in_stock = in_stock; self }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn category(&self) -> &str { &self.category }
    pub fn description(&self) -> &str { &self.description }
    pub fn image(&self) -> Option<&str> { self.image.as_deref() }
    pub fn pricing(&self) -> &Pricing { &self.pricing }
    pub fn is_in_stock(&self) -> bool { self.in_stock }
    pub fn rating(&self) -> Option<f32> { self.rating }

    pub fn storage_labels(&self) -> Vec<&str> {
        match &self.pricing {
            Pricing::Simple { .. } => vec![],
            Pricing::Variants { options } => options.iter().map(|o| o.capacity.as_str()).collect(),
        }
    }

    /// Active unit and market price for `storage`, or for the first declared variant when omitted.
    pub fn resolve_price(&self, storage: Option<&str>) -> Result<ResolvedPrice, ProductError> {
        self.pricing.resolve(storage).map_err(|source| ProductError::Pricing { product_id: self.id.clone(), source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("unknown storage option '{0}'")]
    UnknownVariant(String),
    #[error("variant pricing without any options")]
    NoVariants,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("product {product_id}: {source}")]
    Pricing { product_id: String, #[source] source: PricingError },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iphone_13() -> Product {
        Product::new("iphone-13", "iPhone 13", "iPhone", Pricing::from_parts(
            Money::reais(2599), Some(Money::reais(4299)),
            vec![
                StorageOption::new("128GB", Money::reais(2599), Money::reais(4299)),
                StorageOption::new("256GB", Money::reais(3099), Money::reais(4799)),
            ],
        ))
    }

    #[test]
    fn test_default_variant_is_first_declared() {
        let resolved = iphone_13().resolve_price(None).unwrap();
        assert_eq!(resolved.unit_price, Money::reais(2599));
        assert_eq!(resolved.market_price, Some(Money::reais(4299)));
        assert_eq!(resolved.storage.as_deref(), Some("128GB"));
    }

    #[test]
    fn test_named_variant() {
        let resolved = iphone_13().resolve_price(Some("256GB")).unwrap();
        assert_eq!(resolved.unit_price, Money::reais(3099));
        assert_eq!(resolved.market_price, Some(Money::reais(4799)));
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let err = iphone_13().resolve_price(Some("2TB")).unwrap_err();
        assert_eq!(err, ProductError::Pricing { product_id: "iphone-13".into(), source: PricingError::UnknownVariant("2TB".into()) });
    }

    #[test]
    fn test_simple_pricing_ignores_label() {
        let airpods = Product::new("airpods-pro", "AirPods Pro", "Acessórios", Pricing::from_parts(Money::reais(1299), None, vec![]));
        let resolved = airpods.resolve_price(Some("128GB")).unwrap();
        assert_eq!(resolved.unit_price, Money::reais(1299));
        assert_eq!(resolved.storage, None);
        assert_eq!(resolved.discount_percent(), None);
    }

    #[test]
    fn test_discount_badge() {
        assert_eq!(discount_percent(&Money::reais(2599), Some(&Money::reais(4299))), Some(40));
        assert_eq!(discount_percent(&Money::reais(5000), Some(&Money::reais(4299))), None);
        assert_eq!(discount_percent(&Money::reais(4299), Some(&Money::reais(4299))), None);
        assert_eq!(discount_percent(&Money::reais(10), Some(&Money::zero("BRL"))), None);
    }
}
