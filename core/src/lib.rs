//! Customer 360 aggregation core.
//!
//! Pulls raw customer, account, and transaction records out of many
//! source systems, resolves each record to a global customer identity,
//! merges everything into one 360 view per customer, and publishes
//! domain events for downstream consumers. A decision engine answers
//! approve/decline/review questions from the aggregated view alone.

pub mod aggregation;
pub mod bus;
pub mod config;
pub mod connector;
pub mod decision;
pub mod error;
pub mod event;
pub mod features;
pub mod identity;
pub mod registry;
pub mod store;
pub mod types;
