//! Built-in catalog served whenever the remote table is unreachable or empty.

use crate::domain::aggregates::{Pricing, Product, StorageOption};
use crate::domain::value_objects::Money;

const IMAGE_BASE: &str = "https://images.unsplash.com";

fn model(id: &str, name: &str, category: &str, image: &str, description: &str, rating: f32, options: &[(&str, i64, i64)]) -> Product {
    let options: Vec<StorageOption> = options
        .iter()
        .map(|&(capacity, price, market)| StorageOption::new(capacity, Money::reais(price), Money::reais(market)))
        .collect();
    let (base, market) = options.first().map(|o| (o.price.clone(), Some(o.market_price.clone()))).unwrap_or_default();
    Product::new(id, name, category, Pricing::from_parts(base, market, options))
        .with_image(format!("{IMAGE_BASE}/{image}?q=80&w=500&auto=format&fit=crop"))
        .with_description(description)
        .with_rating(rating)
}

/// The iPhone lineup, cheapest storage first for every model.
pub fn fallback_products() -> Vec<Product> {
    vec![
        model("iphone-13", "iPhone 13", "iPhone", "photo-1632661674596-df8be070a5c5",
            "Chip A15 Bionic. Sistema de câmera dupla. O melhor custo-benefício.", 4.8,
            &[("128GB", 2599, 4299), ("256GB", 3099, 4799)]),
        model("iphone-14", "iPhone 14", "iPhone", "photo-1678685888221-cda773a3dcdb",
            "Bateria para o dia todo. Detecção de acidentes. Fotos em pouca luz aprimoradas.", 4.9,
            &[("128GB", 2899, 4999), ("256GB", 3399, 5499)]),
        model("iphone-15", "iPhone 15", "iPhone", "photo-1696446701796-da61225697cc",
            "Dynamic Island. Câmera de 48MP. Design durável com vidro colorido.", 5.0,
            &[("128GB", 3499, 6499), ("256GB", 4299, 7299), ("512GB", 5299, 8299)]),
        model("iphone-16", "iPhone 16", "iPhone", "photo-1726058694038-a25e9334bb94",
            "Controle de Câmera. Botão de Ação. Inteligência Apple.", 5.0,
            &[("128GB", 4199, 7799), ("256GB", 4899, 8599), ("512GB", 5899, 9599)]),
        model("iphone-17", "iPhone 17", "Lançamento", "photo-1695048132973-2e38c1a63c8c",
            "Pré-venda Exclusiva de Natal. O futuro chegou primeiro na Icrazybr.", 5.0,
            &[("256GB", 5899, 9999), ("512GB", 6899, 10999)]),
        model("iphone-17-pro", "iPhone 17 Pro", "Lançamento", "photo-1695048133142-1a20484d2569",
            "Acabamento Titânio. A melhor câmera já feita. Desempenho Pro.", 5.0,
            &[("256GB", 7399, 11499), ("512GB", 8399, 12499), ("1TB", 9399, 14499)]),
        model("iphone-17-promax", "iPhone 17 Pro Max", "Lançamento", "photo-1695048133229-3079965d1341",
            "Tela gigante. Bateria para 2 dias. A experiência definitiva em iPhone.", 5.0,
            &[("256GB", 8199, 12499), ("512GB", 9699, 15499), ("1TB", 10699, 17499)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_variant_priced() {
        let products = fallback_products();
        assert_eq!(products.len(), 7);
        assert!(products.iter().all(|p| matches!(p.pricing(), Pricing::Variants { .. })));
        let pro_max = products.iter().find(|p| p.id() == "iphone-17-promax").unwrap();
        assert_eq!(pro_max.storage_labels(), ["256GB", "512GB", "1TB"]);
        assert_eq!(pro_max.resolve_price(Some("1TB")).unwrap().unit_price, Money::reais(10699));
    }
}
