//! Domain events — immutable facts published once on the event bus.
//!
//! RULE: downstream consumers (fraud, risk, features, audit) react to
//! events only. Ingestion never calls a consumer directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::C360Result, types::Gcid};

/// Envelope carried by every published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    /// Name of the source system whose data produced this fact.
    pub source_system: String,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn new(source_system: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source_system: source_system.into(),
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Every fact the ingestion pipeline can publish.
/// Variants are added over time — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Customer {
        gcid: Gcid,
        local_customer_id: String,
        national_id: Option<String>,
        phone: Option<String>,
        email: Option<String>,
        first_name: String,
        last_name: String,
        action: CustomerAction,
    },
    /// `gcid` is `None` when the owning customer has not been seen yet;
    /// the raw local ids are carried so a downstream consumer can
    /// resolve the linkage later.
    Account {
        gcid: Option<Gcid>,
        local_customer_id: String,
        account_number: String,
        account_type: String,
        current_balance: f64,
        status: String,
    },
    Transaction {
        gcid: Option<Gcid>,
        local_account_id: String,
        transaction_id: String,
        amount: f64,
        currency: String,
        transaction_type: String,
        channel: String,
        balance_after: f64,
    },
    FraudAlert {
        gcid: Gcid,
        alert_type: String,
        risk_score: f64,
        reason: String,
        related_transaction_id: Option<String>,
        severity: String,
    },
    RiskAssessment {
        gcid: Gcid,
        risk_score: f64,
        risk_category: String,
        assessment_type: String,
    },
    Login {
        gcid: Gcid,
        channel: String,
        successful: bool,
        device_info: Option<String>,
        ip_address: Option<String>,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Customer { .. } => EventKind::Customer,
            Self::Account { .. } => EventKind::Account,
            Self::Transaction { .. } => EventKind::Transaction,
            Self::FraudAlert { .. } => EventKind::FraudAlert,
            Self::RiskAssessment { .. } => EventKind::RiskAssessment,
            Self::Login { .. } => EventKind::Login,
        }
    }
}

/// Subscription key. Matching is by exact kind only — there is no
/// hierarchy and no wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Customer,
    Account,
    Transaction,
    FraudAlert,
    RiskAssessment,
    Login,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Customer => "customer",
            Self::Account => "account",
            Self::Transaction => "transaction",
            Self::FraudAlert => "fraud_alert",
            Self::RiskAssessment => "risk_assessment",
            Self::Login => "login",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerAction {
    Created,
    Updated,
}

/// The contract every downstream consumer implements.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

/// Publishing side of the bus, as seen by the ingestion pipeline.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> C360Result<()>;
    fn publish_batch(&self, events: &[DomainEvent]) -> C360Result<()>;
}
