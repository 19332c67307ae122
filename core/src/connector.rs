//! Connector contract and the fixture-backed reference implementation.
//!
//! Every source system is reached through the same capability set:
//! probe connectivity, then fetch customers, accounts, and transactions.
//! Fetches are read-only and idempotent; a source that has no data of a
//! given kind returns an empty vec, never an error.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    config::{DataSourceConfig, SourceType},
    error::C360Result,
};

/// Raw customer record as fetched from one source system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub source_system: String,
    pub local_customer_id: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw account record as fetched from one source system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub source_system: String,
    pub local_account_id: String,
    pub local_customer_id: String,
    pub account_number: String,
    pub account_type: String,
    pub currency: String,
    pub current_balance: f64,
    pub available_balance: f64,
    pub status: String,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw transaction record as fetched from one source system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub source_system: String,
    pub local_transaction_id: String,
    pub local_account_id: String,
    pub posted_at: DateTime<Utc>,
    pub transaction_type: String,
    pub amount: f64,
    pub currency: String,
    pub channel: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub balance_after: f64,
}

/// Outcome of a connectivity probe. Detectable configuration problems
/// are reported here, never raised as errors, so callers can treat
/// probing uniformly across sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionResult {
    pub connected: bool,
    pub message: String,
    pub tested_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ConnectionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            connected: true,
            message: message.into(),
            tested_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            message: message.into(),
            tested_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// The capability set every source connector implements.
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;
    fn source_type(&self) -> SourceType;
    fn test_connection(&self) -> ConnectionResult;
    /// `since` is a lower bound for incremental fetch; `None` means a
    /// full fetch.
    fn fetch_customers(&self, since: Option<DateTime<Utc>>) -> C360Result<Vec<CustomerRecord>>;
    fn fetch_accounts(&self, since: Option<DateTime<Utc>>) -> C360Result<Vec<AccountRecord>>;
    fn fetch_transactions(&self, since: Option<DateTime<Utc>>)
        -> C360Result<Vec<TransactionRecord>>;
}

/// Reference connector backed by in-memory fixture data, parameterized
/// by source type. Stands in for the per-source network clients a real
/// deployment would plug in behind the same trait.
pub struct FixtureConnector {
    config: DataSourceConfig,
}

impl FixtureConnector {
    pub fn new(config: DataSourceConfig) -> Self {
        Self { config }
    }

    fn system(&self) -> String {
        self.config.name.clone()
    }

    fn customer(
        &self,
        local_id: &str,
        national_id: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
        first_name: &str,
        last_name: &str,
        address: Option<&str>,
    ) -> CustomerRecord {
        let now = Utc::now();
        CustomerRecord {
            source_system: self.system(),
            local_customer_id: local_id.to_string(),
            national_id: national_id.map(str::to_string),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 5, 15),
            address: address.map(str::to_string),
            status: "Active".into(),
            created_at: now - Duration::days(730),
            updated_at: now,
        }
    }

    fn account(
        &self,
        local_id: &str,
        local_customer_id: &str,
        number: &str,
        account_type: &str,
        balance: f64,
    ) -> AccountRecord {
        let now = Utc::now();
        AccountRecord {
            source_system: self.system(),
            local_account_id: local_id.to_string(),
            local_customer_id: local_customer_id.to_string(),
            account_number: number.to_string(),
            account_type: account_type.to_string(),
            currency: "KES".into(),
            current_balance: balance,
            available_balance: balance,
            status: "Active".into(),
            opened_at: now - Duration::days(730),
            updated_at: now,
        }
    }

    fn transaction(
        &self,
        local_id: &str,
        local_account_id: &str,
        transaction_type: &str,
        amount: f64,
        channel: &str,
        balance_after: f64,
    ) -> TransactionRecord {
        TransactionRecord {
            source_system: self.system(),
            local_transaction_id: local_id.to_string(),
            local_account_id: local_account_id.to_string(),
            posted_at: Utc::now() - Duration::days(1),
            transaction_type: transaction_type.to_string(),
            amount,
            currency: "KES".into(),
            channel: channel.to_string(),
            description: Some("Sample posting".into()),
            reference: None,
            balance_after,
        }
    }

    fn customers(&self) -> Vec<CustomerRecord> {
        match self.config.source_type {
            SourceType::CoreBanking => vec![
                self.customer(
                    "CB001",
                    Some("12345678"),
                    Some("+254700000001"),
                    Some("john.doe@example.com"),
                    "John",
                    "Doe",
                    Some("Nairobi, Kenya"),
                ),
                self.customer(
                    "CB002",
                    Some("87654321"),
                    None,
                    None,
                    "Mary",
                    "Wanjiku",
                    Some("Mombasa, Kenya"),
                ),
            ],
            // The mobile channel sees John under a different local id but
            // the same phone number — the dedup case the identity index
            // exists for.
            SourceType::MobileBanking => vec![
                self.customer(
                    "MB002",
                    None,
                    Some("+254700000002"),
                    Some("jane.smith@example.com"),
                    "Jane",
                    "Smith",
                    None,
                ),
                self.customer(
                    "MB003",
                    None,
                    Some("+254700000001"),
                    None,
                    "John",
                    "Doe",
                    None,
                ),
            ],
            SourceType::WebBanking => vec![self.customer(
                "WB001",
                None,
                None,
                Some("peter.omondi@example.com"),
                "Peter",
                "Omondi",
                None,
            )],
            SourceType::Ussd => vec![self.customer(
                "US001",
                None,
                Some("+254700000003"),
                None,
                "Grace",
                "Njeri",
                None,
            )],
            SourceType::OpenBanking => vec![self.customer(
                "OB001",
                Some("11223344"),
                None,
                Some("samuel.kip@example.com"),
                "Samuel",
                "Kiprop",
                None,
            )],
            // Scoring and analytics systems enrich existing customers;
            // they carry no raw customer/account/transaction feed.
            SourceType::FraudSystem
            | SourceType::RiskSystem
            | SourceType::Analytics
            | SourceType::AiCopilot
            | SourceType::External => vec![],
        }
    }

    fn accounts(&self) -> Vec<AccountRecord> {
        match self.config.source_type {
            SourceType::CoreBanking => vec![
                self.account("ACC001", "CB001", "1234567890", "Savings", 50_000.0),
                self.account("ACC002", "CB002", "1234567891", "Current", 120_000.0),
            ],
            SourceType::MobileBanking => {
                vec![self.account("MB_ACC002", "MB002", "9876543210", "Wallet", 8_500.0)]
            }
            _ => vec![],
        }
    }

    fn transactions(&self) -> Vec<TransactionRecord> {
        match self.config.source_type {
            SourceType::CoreBanking => vec![
                self.transaction("TXN001", "ACC001", "Credit", 10_000.0, "Branch", 50_000.0),
                self.transaction("TXN002", "ACC002", "Debit", 2_500.0, "ATM", 117_500.0),
            ],
            SourceType::MobileBanking => vec![self.transaction(
                "MB_TXN001",
                "MB_ACC002",
                "Debit",
                1_200.0,
                "Mobile",
                7_300.0,
            )],
            _ => vec![],
        }
    }
}

impl Connector for FixtureConnector {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn source_type(&self) -> SourceType {
        self.config.source_type
    }

    fn test_connection(&self) -> ConnectionResult {
        // A missing connection string is detectable up front; report it
        // in the result rather than erroring so probing stays uniform.
        if self.config.connection_string.trim().is_empty() {
            return ConnectionResult::failed(format!(
                "No connection string configured for {}",
                self.config.name
            ));
        }
        let mut result =
            ConnectionResult::ok(format!("Successfully connected to {}", self.config.name));
        result.metadata.insert(
            "source_type".into(),
            serde_json::Value::String(self.config.source_type.to_string()),
        );
        result
    }

    fn fetch_customers(&self, since: Option<DateTime<Utc>>) -> C360Result<Vec<CustomerRecord>> {
        let mut records = self.customers();
        if let Some(since) = since {
            records.retain(|r| r.updated_at > since);
        }
        Ok(records)
    }

    fn fetch_accounts(&self, since: Option<DateTime<Utc>>) -> C360Result<Vec<AccountRecord>> {
        let mut records = self.accounts();
        if let Some(since) = since {
            records.retain(|r| r.updated_at > since);
        }
        Ok(records)
    }

    fn fetch_transactions(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> C360Result<Vec<TransactionRecord>> {
        let mut records = self.transactions();
        if let Some(since) = since {
            records.retain(|r| r.posted_at > since);
        }
        Ok(records)
    }
}
