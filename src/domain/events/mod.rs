//! Domain events
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::order::PaymentMethod;
use crate::domain::timeline::Stage;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, total: Decimal, payment_method: PaymentMethod, items: u32 },
    StageAdvanced { order_id: String, from: Stage, to: Stage },
}

impl DomainEvent {
    /// Bus subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "store.orders.placed",
            Self::Order(OrderEvent::StageAdvanced { .. }) => "store.orders.stage",
        }
    }
}
