//! Outbound collaborators: language-model advisor, postal lookup and fulfillment bus.
pub mod advisor;
pub mod fulfillment;
pub mod postal;

pub use advisor::{GeminiAdvisor, ProductAdvisor};
pub use fulfillment::{EventPublisher, FulfillmentUpdate};
pub use postal::{PostalAddress, PostalLookup};
