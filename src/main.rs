//! Programada Store - storefront service for scheduled Apple imports

use std::sync::Arc;

use anyhow::Result;
use programada_store::api::{self, AppState};
use programada_store::catalog::{fallback_products, CatalogResolver, PgCatalogSource, RestCatalogSource};
use programada_store::config::{AppConfig, CatalogBackend};
use programada_store::domain::aggregates::OrderFactory;
use programada_store::services::{fulfillment, EventPublisher, GeminiAdvisor, PostalLookup};
use programada_store::session::{demo_orders, FileSessionStore, StoreSession};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let resolver = CatalogResolver::new(fallback_products()).with_table(config.catalog.table.clone()).with_retry(config.catalog.retry);
    let resolver = match &config.catalog.backend {
        CatalogBackend::BuiltIn => resolver,
        CatalogBackend::Rest { base_url, anon_key } => {
            resolver.with_source(Arc::new(RestCatalogSource::new(base_url.clone(), anon_key, config.catalog.retry.timeout)?))
        }
        CatalogBackend::Postgres { database_url } => {
            resolver.with_source(Arc::new(PgCatalogSource::connect_lazy(database_url, config.catalog.retry.timeout)?))
        }
    };
    let catalog = resolver.get_products().await;

    let orders = if config.seed_demo_orders { demo_orders() } else { vec![] };
    let session = StoreSession::new(catalog, OrderFactory::new(config.order_number_start), Box::new(FileSessionStore::new(config.session_file.clone())))
        .with_orders(orders)
        .into_shared();

    let nats = match &config.nats_url {
        Some(url) => async_nats::connect(url.as_str()).await.map_err(|e| tracing::warn!(error = %e, "NATS unavailable, events will only be logged")).ok(),
        None => None,
    };
    if let Some(client) = nats.clone() {
        fulfillment::spawn_listener(client, session.clone());
    }

    let state = AppState {
        session,
        advisor: Arc::new(GeminiAdvisor::new(config.advisor.api_key.as_ref(), config.advisor.model.clone(), config.advisor.timeout)?),
        postal: PostalLookup::new(config.postal.base_url.clone(), config.postal.timeout)?,
        events: EventPublisher::new(nats),
    };

    let port = config.port;
    tracing::info!("🚀 Programada Store listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, api::router(state)).await?;
    Ok(())
}
