use crate::{config::SourceType, event::EventKind, types::{Gcid, SourceId}};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum C360Error {
    #[error("At least one identifier (national id, phone, or email) is required")]
    InvalidIdentifier,

    #[error("Global customer {gcid} not found")]
    UnknownCustomer { gcid: Gcid },

    #[error("Connector type {source_type} is not supported")]
    UnsupportedSourceType { source_type: SourceType },

    #[error("Data source {id} not found")]
    SourceNotFound { id: SourceId },

    #[error("Data source '{name}' is disabled")]
    SourceDisabled { name: String },

    #[error("Connector not available for data source {id}")]
    ConnectorUnavailable { id: SourceId },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Event handler failed for {event_kind}: {message}")]
    HandlerFailed { event_kind: EventKind, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type C360Result<T> = Result<T, C360Error>;
