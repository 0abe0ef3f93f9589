//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{discount_percent, Pricing, PricingError, Product, ProductError, ResolvedPrice, StorageOption};
pub use order::{Address, Order, OrderError, OrderFactory, PaymentMethod};
pub use cart::{Cart, CartError, CartLine};
