//! Order history shown on the customer dashboard before any real checkout.

use chrono::{TimeZone, Utc};

use crate::catalog::fallback_products;
use crate::domain::aggregates::{Address, CartLine, Order, PaymentMethod};
use crate::domain::timeline::Stage;
use crate::domain::value_objects::{Money, Quantity};

fn line(product_id: &str, storage: &str, price: i64) -> Option<CartLine> {
    let product = fallback_products().into_iter().find(|p| p.id() == product_id)?;
    Some(CartLine {
        product,
        storage: Some(storage.to_string()),
        quantity: Quantity::ONE,
        unit_price: Money::reais(price),
        market_price: None,
    })
}

fn goiania(street: &str, neighborhood: &str, zip: &str) -> Address {
    Address {
        street: street.to_string(),
        neighborhood: Some(neighborhood.to_string()),
        city: "Goiânia".to_string(),
        state: "GO".to_string(),
        zip: zip.to_string(),
        ..Address::default()
    }
}

pub fn demo_orders() -> Vec<Order> {
    let placed = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap_or_else(Utc::now);
    vec![
        Order::restore(
            "9921", placed(2024, 5, 10), Stage::Delivered,
            line("iphone-13", "128GB", 3499).into_iter().collect(),
            Money::reais(3499), goiania("Rua 9", "Setor Oeste", "74110-100"), PaymentMethod::Pix,
        ),
        Order::restore(
            "10234", placed(2024, 6, 5), Stage::InTransit,
            line("iphone-17-promax", "256GB", 8199).into_iter().collect(),
            Money::reais(8199), goiania("Av. T-63", "Bueno", "74230-010"), PaymentMethod::CreditCard,
        ),
    ]
}
