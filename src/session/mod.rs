//! One shopper's storefront state: catalog, cart, order history and login.
//!
//! `StoreSession` is the explicit container every mutation goes through, so it can
//! be driven from an HTTP layer, a bus listener or a test without ambient globals.

pub mod demo;
pub mod store;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::aggregates::{Address, Cart, CartLine, Order, OrderFactory, PaymentMethod, Pricing, Product, ResolvedPrice};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Quantity;
use crate::{Result, StoreError};

pub use demo::demo_orders;
pub use store::{FileSessionStore, MemorySessionStore, SessionError, SessionStore};

/// Session handle shared by the HTTP layer and the fulfillment listener.
pub type SharedSession = Arc<Mutex<StoreSession>>;

pub struct StoreSession {
    catalog: Vec<Product>,
    cart: Cart,
    orders: Vec<Order>,
    factory: OrderFactory,
    users: Box<dyn SessionStore>,
    pending_events: Vec<DomainEvent>,
}

impl StoreSession {
    pub fn new(catalog: Vec<Product>, factory: OrderFactory, users: Box<dyn SessionStore>) -> Self {
        Self { catalog, cart: Cart::default(), orders: vec![], factory, users, pending_events: vec![] }
    }

    /// Seeds earlier orders; their numbers are reserved so new orders never reuse them.
    pub fn with_orders(mut self, orders: Vec<Order>) -> Self {
        for number in orders.iter().filter_map(|o| o.id().parse::<u64>().ok()) {
            self.factory.reserve(number);
        }
        self.orders = orders;
        self
    }

    pub fn into_shared(self) -> SharedSession { Arc::new(Mutex::new(self)) }

    pub fn catalog(&self) -> &[Product] { &self.catalog }

    pub fn product(&self, id: &str) -> Result<&Product> {
        self.catalog.iter().find(|p| p.id() == id).ok_or_else(|| StoreError::ProductNotFound(id.to_string()))
    }

    pub fn price(&self, product_id: &str, storage: Option<&str>) -> Result<ResolvedPrice> {
        Ok(self.product(product_id)?.resolve_price(storage)?)
    }

    // ---- cart ----

    pub fn cart(&self) -> &Cart { &self.cart }

    /// Prices the selection now and adds it; an omitted storage means the first option.
    pub fn add_to_cart(&mut self, product_id: &str, storage: Option<&str>) -> Result<&CartLine> {
        let product = self.product(product_id)?.clone();
        let price = product.resolve_price(storage)?;
        let key = price.storage.clone();
        self.cart.add_resolved(&product, price)?;
        self.cart.line(product_id, key.as_deref()).ok_or_else(|| StoreError::ProductNotFound(product_id.to_string()))
    }

    pub fn remove_from_cart(&mut self, product_id: &str, storage: Option<&str>) -> bool {
        let key = self.line_key(product_id, storage);
        self.cart.remove(product_id, key.as_deref())
    }

    pub fn set_quantity(&mut self, product_id: &str, storage: Option<&str>, quantity: i64) -> Option<Quantity> {
        let key = self.line_key(product_id, storage);
        self.cart.set_quantity(product_id, key.as_deref(), quantity)
    }

    pub fn clear_cart(&mut self) { self.cart.clear(); }

    /// Same key `add_to_cart` would have used for this selection.
    fn line_key(&self, product_id: &str, storage: Option<&str>) -> Option<String> {
        match self.product(product_id).map(Product::pricing) {
            Ok(Pricing::Simple { .. }) => None,
            Ok(Pricing::Variants { options }) if storage.is_none() => options.first().map(|o| o.capacity.clone()),
            _ => storage.map(str::to_string),
        }
    }

    // ---- checkout & orders ----

    pub fn checkout(&mut self, address: Address, payment_method: PaymentMethod) -> Result<&Order> {
        if self.current_user().is_none() { return Err(StoreError::NotLoggedIn); }
        let mut order = self.factory.place_order(self.cart.snapshot(), address, payment_method)?;
        self.cart.clear();
        self.pending_events.extend(order.take_events());
        info!(order_id = order.id(), total = %order.total(), payment = payment_method.label(), "order placed");
        let index = self.orders.len();
        self.orders.push(order);
        Ok(&self.orders[index])
    }

    pub fn orders(&self) -> &[Order] { &self.orders }

    pub fn order(&self, id: &str) -> Result<&Order> {
        self.orders.iter().find(|o| o.id() == id).ok_or_else(|| StoreError::OrderNotFound(id.to_string()))
    }

    /// Applies an update from the fulfillment process. Backward moves are refused and logged.
    pub fn apply_fulfillment(&mut self, order_id: &str, step: u8) -> Result<bool> {
        let order = self.orders.iter_mut().find(|o| o.id() == order_id).ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;
        match order.advance_to(step) {
            Ok(moved) => {
                self.pending_events.extend(order.take_events());
                Ok(moved)
            }
            Err(e) => {
                warn!(order_id, step, error = %e, "rejected fulfillment update");
                Err(e.into())
            }
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.pending_events) }

    // ---- customer ----

    pub fn login(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() { return Err(StoreError::EmptyName); }
        self.users.save(name)?;
        info!(user = name, "customer logged in");
        Ok(name.to_string())
    }

    pub fn logout(&mut self) -> Result<()> { Ok(self.users.clear()?) }

    pub fn current_user(&self) -> Option<String> {
        self.users.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not read session, treating as logged out");
            None
        })
    }
}
