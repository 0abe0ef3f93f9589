//! Cart, order and pricing domain
pub mod aggregates;
pub mod events;
pub mod timeline;
pub mod value_objects;
