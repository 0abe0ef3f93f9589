//! Fulfillment event bus over NATS.
//!
//! Order events drained from the session are published as JSON. Stage updates from
//! the external fulfillment process arrive on [`UPDATES_SUBJECT`] and are applied
//! through the session, which refuses regressions.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::events::DomainEvent;
use crate::session::SharedSession;

pub const UPDATES_SUBJECT: &str = "store.fulfillment.updates";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentUpdate {
    pub order_id: String,
    pub step: u8,
}

/// Publishes domain events when a bus is configured; otherwise only logs them.
#[derive(Clone, Default)]
pub struct EventPublisher { client: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(client: Option<async_nats::Client>) -> Self { Self { client } }

    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let Some(client) = &self.client else {
                debug!(subject = event.subject(), ?event, "no event bus configured");
                continue;
            };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => { error!(error = %e, "could not encode event"); continue; }
            };
            if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
                warn!(subject = event.subject(), error = %e, "event publish failed");
            }
        }
    }
}

/// Applies one raw update message and returns the events it produced.
pub async fn handle_update(session: &SharedSession, payload: &[u8]) -> Vec<DomainEvent> {
    let update: FulfillmentUpdate = match serde_json::from_slice(payload) {
        Ok(u) => u,
        Err(e) => { warn!(error = %e, "ignoring malformed fulfillment update"); return vec![]; }
    };
    let mut session = session.lock().await;
    match session.apply_fulfillment(&update.order_id, update.step) {
        Ok(true) => info!(order_id = %update.order_id, step = update.step, "order advanced"),
        Ok(false) => debug!(order_id = %update.order_id, step = update.step, "order already at step"),
        Err(e) => warn!(order_id = %update.order_id, error = %e, "fulfillment update dropped"),
    }
    session.take_events()
}

pub fn spawn_listener(client: async_nats::Client, session: SharedSession) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut updates = match client.subscribe(UPDATES_SUBJECT.to_string()).await {
            Ok(s) => s,
            Err(e) => { error!(error = %e, "could not subscribe to fulfillment updates"); return; }
        };
        let publisher = EventPublisher::new(Some(client));
        info!(subject = UPDATES_SUBJECT, "listening for fulfillment updates");
        while let Some(message) = updates.next().await {
            let events = handle_update(&session, &message.payload).await;
            publisher.publish(events).await;
        }
    })
}
