//! Order Aggregate

use std::sync::atomic::{AtomicU64, Ordering};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};
use crate::domain::aggregates::cart::CartLine;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::timeline::{Stage, Timeline, TimelineError};
use crate::domain::value_objects::{Cep, Money, DEFAULT_CURRENCY};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: String,
    created_at: DateTime<Utc>,
    #[serde(rename = "current_step")]
    timeline: Timeline,
    lines: Vec<CartLine>,
    subtotal: Money,
    discount: Money,
    total: Money,
    address: Address,
    payment_method: PaymentMethod,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(custom = "validate_zip")]
    pub zip: String,
}

fn validate_zip(zip: &str) -> Result<(), ValidationError> {
    Cep::new(zip).map(|_| ()).map_err(|_| ValidationError::new("zip_must_have_8_digits"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(alias = "instant-transfer", alias = "PIX")]
    Pix,
    #[serde(alias = "card", alias = "credit-card", alias = "Credit Card")]
    CreditCard,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self { Self::Pix => "PIX", Self::CreditCard => "Credit Card" }
    }

    /// Multiplier applied to the subtotal at checkout. PIX pays 5% less.
    pub fn total_rate(self) -> Decimal {
        match self { Self::Pix => Decimal::new(95, 2), Self::CreditCard => Decimal::ONE }
    }
}

impl Order {
    pub fn id(&self) -> &str { &self.id }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn stage(&self) -> Stage { self.timeline.current() }
    pub fn timeline(&self) -> &Timeline { &self.timeline }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn discount(&self) -> &Money { &self.discount }
    pub fn total(&self) -> &Money { &self.total }
    pub fn address(&self) -> &Address { &self.address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn item_count(&self) -> u32 { self.lines.iter().fold(0u32, |n, l| n.saturating_add(l.quantity.value())) }

    /// Rebuilds an order placed earlier, with its recorded total and stage.
    pub fn restore(
        id: impl Into<String>, created_at: DateTime<Utc>, stage: Stage, lines: Vec<CartLine>,
        total: Money, address: Address, payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: id.into(), created_at, timeline: Timeline::new(stage), lines, subtotal: total.clone(),
            discount: Money::zero(total.currency()), total, address, payment_method, events: vec![],
        }
    }

    /// Moves the order to `step`. Backward moves and unknown steps are rejected.
    pub fn advance_to(&mut self, step: u8) -> Result<bool, TimelineError> {
        let from = self.timeline.current();
        let moved = self.timeline.advance(step)?;
        if moved {
            self.raise_event(DomainEvent::Order(OrderEvent::StageAdvanced { order_id: self.id.clone(), from, to: self.timeline.current() }));
        }
        Ok(moved)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

/// Builds orders from cart snapshots and hands out sequential order numbers.
#[derive(Debug)]
pub struct OrderFactory {
    next_number: AtomicU64,
    currency: String,
}

impl OrderFactory {
    pub fn new(first_number: u64) -> Self { Self { next_number: AtomicU64::new(first_number), currency: DEFAULT_CURRENCY.to_string() } }

    /// Makes sure `number` is never issued again. Returns the next number to be issued.
    pub fn reserve(&self, number: u64) -> u64 {
        let next = number.saturating_add(1);
        self.next_number.fetch_max(next, Ordering::Relaxed).max(next)
    }

    /// Snapshot transform: the caller clears its cart once this returns `Ok`.
    pub fn place_order(&self, lines: Vec<CartLine>, address: Address, payment_method: PaymentMethod) -> Result<Order, OrderError> {
        if lines.is_empty() { return Err(OrderError::EmptyCart); }
        address.validate().map_err(|e| OrderError::InvalidAddress(e.to_string()))?;
        let line_totals: Vec<Money> = lines.iter().map(CartLine::line_total).collect();
        let subtotal = Money::sum(&self.currency, &line_totals)?;
        let total = subtotal.scale(payment_method.total_rate());
        let discount = Money::new(subtotal.amount() - total.amount(), &self.currency);
        let number = self.next_number.fetch_add(1, Ordering::Relaxed);
        let mut order = Order {
            id: number.to_string(), created_at: Utc::now(), timeline: Timeline::default(), lines,
            subtotal, discount, total, address, payment_method, events: vec![],
        };
        let placed = OrderEvent::Placed {
            order_id: order.id.clone(), total: order.total.amount(), payment_method, items: order.item_count(),
        };
        order.raise_event(DomainEvent::Order(placed));
        Ok(order)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("cannot place an order from an empty cart")]
    EmptyCart,
    #[error("invalid shipping address: {0}")]
    InvalidAddress(String),
    #[error(transparent)]
    Money(#[from] crate::domain::value_objects::MoneyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::Cart;
    use crate::domain::aggregates::product::{Pricing, Product};
    use crate::domain::timeline::StepState;

    fn address() -> Address {
        Address {
            street: "Rua 9".into(), number: Some("120".into()), complement: None, neighborhood: Some("Setor Oeste".into()),
            city: "Goiânia".into(), state: "GO".into(), zip: "74110-100".into(),
        }
    }

    fn cart_worth_1000() -> Cart {
        let p = Product::new("gift", "Gift Card", "Acessórios", Pricing::from_parts(Money::reais(250), None, vec![]));
        let mut cart = Cart::default();
        cart.add(&p, Money::reais(250), None, None).unwrap();
        cart.set_quantity("gift", None, 4);
        cart
    }

    #[test]
    fn test_pix_discount() {
        let factory = OrderFactory::new(1);
        let order = factory.place_order(cart_worth_1000().snapshot(), address(), PaymentMethod::Pix).unwrap();
        assert_eq!(order.subtotal().amount(), Decimal::new(1000, 0));
        assert_eq!(order.total().amount(), Decimal::new(95000, 2));
        assert_eq!(order.discount().amount(), Decimal::new(50, 0));
    }

    #[test]
    fn test_card_pays_full_price() {
        let factory = OrderFactory::new(1);
        let order = factory.place_order(cart_worth_1000().snapshot(), address(), PaymentMethod::CreditCard).unwrap();
        assert_eq!(order.total().amount(), Decimal::new(100000, 2));
        assert_eq!(order.discount().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_new_order_is_confirmed_with_sequential_ids() {
        let factory = OrderFactory::new(10235);
        let mut first = factory.place_order(cart_worth_1000().snapshot(), address(), PaymentMethod::Pix).unwrap();
        let second = factory.place_order(cart_worth_1000().snapshot(), address(), PaymentMethod::Pix).unwrap();
        assert_eq!(first.id(), "10235");
        assert_eq!(second.id(), "10236");
        assert_eq!(first.stage(), Stage::Confirmed);
        assert_eq!(first.timeline().state_of(Stage::Confirmed), StepState::Current);
        assert_eq!(first.timeline().progress(), 0.0);
        assert!(matches!(first.take_events().as_slice(), [DomainEvent::Order(OrderEvent::Placed { items: 4, .. })]));
    }

    #[test]
    fn test_reserved_numbers_are_skipped() {
        let factory = OrderFactory::new(10234);
        assert_eq!(factory.reserve(9921), 10234);
        assert_eq!(factory.reserve(10234), 10235);
        let order = factory.place_order(cart_worth_1000().snapshot(), address(), PaymentMethod::Pix).unwrap();
        assert_eq!(order.id(), "10235");
    }

    #[test]
    fn test_total_is_locked_at_creation() {
        let factory = OrderFactory::new(1);
        let mut cart = cart_worth_1000();
        let order = factory.place_order(cart.snapshot(), address(), PaymentMethod::CreditCard).unwrap();
        cart.set_quantity("gift", None, 40);
        assert_eq!(order.total().amount(), Decimal::new(1000, 0));
    }

    #[test]
    fn test_rejects_empty_cart_and_bad_address() {
        let factory = OrderFactory::new(1);
        assert_eq!(factory.place_order(vec![], address(), PaymentMethod::Pix).unwrap_err(), OrderError::EmptyCart);
        let bad = Address { zip: "123".into(), ..address() };
        assert!(matches!(factory.place_order(cart_worth_1000().snapshot(), bad, PaymentMethod::Pix), Err(OrderError::InvalidAddress(_))));
    }

    #[test]
    fn test_advance_raises_event() {
        let factory = OrderFactory::new(7);
        let mut order = factory.place_order(cart_worth_1000().snapshot(), address(), PaymentMethod::Pix).unwrap();
        order.take_events();
        assert_eq!(order.advance_to(2), Ok(true));
        assert!(order.advance_to(1).is_err());
        let events = order.take_events();
        assert_eq!(events, vec![DomainEvent::Order(OrderEvent::StageAdvanced { order_id: "7".into(), from: Stage::Confirmed, to: Stage::Preparing })]);
    }

    #[test]
    fn test_payment_method_aliases() {
        assert_eq!(serde_json::from_str::<PaymentMethod>("\"instant-transfer\"").unwrap(), PaymentMethod::Pix);
        assert_eq!(serde_json::from_str::<PaymentMethod>("\"card\"").unwrap(), PaymentMethod::CreditCard);
    }
}
