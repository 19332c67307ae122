//! Customer 360 store — canonical merged customer state, keyed by GCID.
//!
//! RULE: a customer merge is one atomic read-modify-write under the
//! store lock. Callers never read a customer, mutate it, and write it
//! back later.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    connector::{AccountRecord, CustomerRecord, TransactionRecord},
    types::Gcid,
};

/// Unified view of one customer across all systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer360 {
    pub id: Uuid,
    pub gcid: Gcid,

    // Personal information
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub national_id: Option<String>,

    // Contact information
    pub primary_phone: Option<String>,
    pub primary_email: Option<String>,
    pub address: Option<String>,

    // Status and segmentation
    pub status: String,
    pub customer_type: String,
    pub segment: String,

    // Risk profile
    pub risk_score: f64,
    pub risk_category: String,

    // Behavioral metrics
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_channel: Option<String>,
    pub login_count: u32,
    pub failed_login_attempts: u32,

    // Financial summary
    pub total_balance: f64,
    pub available_balance: f64,
    pub account_count: u32,
    pub monthly_inflow: f64,
    pub monthly_outflow: f64,
    pub average_daily_balance: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer360 {
    pub fn new(gcid: Gcid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            gcid,
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: None,
            national_id: None,
            primary_phone: None,
            primary_email: None,
            address: None,
            status: "Active".into(),
            customer_type: "Individual".into(),
            segment: "Retail".into(),
            risk_score: 0.0,
            risk_category: "Low".into(),
            last_login_at: None,
            last_login_channel: None,
            login_count: 0,
            failed_login_attempts: 0,
            total_balance: 0.0,
            available_balance: 0.0,
            account_count: 0,
            monthly_inflow: 0.0,
            monthly_outflow: 0.0,
            average_daily_balance: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    fn from_record(gcid: Gcid, record: &CustomerRecord) -> Self {
        let mut customer = Self::new(gcid);
        customer.first_name = record.first_name.clone().unwrap_or_default();
        customer.last_name = record.last_name.clone().unwrap_or_default();
        customer.date_of_birth = record.date_of_birth;
        customer.national_id = record.national_id.clone();
        customer.primary_phone = record.phone.clone();
        customer.primary_email = record.email.clone();
        customer.address = record.address.clone();
        customer.status = record.status.clone();
        customer.created_at = record.created_at;
        customer
    }

    /// Merge a later record into this customer. Non-empty incoming
    /// values overwrite; empty or missing values never erase existing
    /// data.
    fn merge_record(&mut self, record: &CustomerRecord) {
        if let Some(v) = record.first_name.as_deref().filter(|v| !v.is_empty()) {
            self.first_name = v.to_string();
        }
        if let Some(v) = record.last_name.as_deref().filter(|v| !v.is_empty()) {
            self.last_name = v.to_string();
        }
        if let Some(v) = record.address.as_deref().filter(|v| !v.is_empty()) {
            self.address = Some(v.to_string());
        }
        // Identifiers and contact details only fill gaps — the first
        // source to supply one stays authoritative.
        if self.national_id.is_none() {
            self.national_id = record.national_id.clone();
        }
        if self.primary_phone.is_none() {
            self.primary_phone = record.phone.clone();
        }
        if self.primary_email.is_none() {
            self.primary_email = record.email.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Account owned by a Customer360, keyed by account number within the
/// customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account360 {
    pub id: Uuid,
    pub gcid: Gcid,
    pub account_number: String,
    pub account_type: String,
    pub currency: String,
    pub current_balance: f64,
    pub available_balance: f64,
    pub status: String,
    pub opened_at: DateTime<Utc>,
    pub source_system: String,
    pub source_account_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transactions are append-only and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction360 {
    pub id: Uuid,
    pub gcid: Gcid,
    pub transaction_id: String,
    pub posted_at: DateTime<Utc>,
    pub transaction_type: String,
    pub amount: f64,
    pub currency: String,
    pub balance_after: f64,
    pub channel: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub source_system: String,
    pub source_account_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
}

/// Port for the canonical store. In-memory reference below; a real
/// deployment substitutes a database enforcing the same ownership and
/// uniqueness invariants.
pub trait Customer360Store: Send + Sync {
    fn get(&self, gcid: Gcid) -> Option<Customer360>;

    /// Atomically create or merge the customer for `gcid` from a raw
    /// source record.
    fn merge_customer(&self, gcid: Gcid, record: &CustomerRecord) -> MergeOutcome;

    /// Insert or replace the account keyed by its account number within
    /// the owning customer.
    fn upsert_account(&self, gcid: Gcid, record: &AccountRecord);

    /// Append a transaction, kept ordered by posting date.
    fn append_transaction(&self, gcid: Gcid, record: &TransactionRecord);

    fn accounts(&self, gcid: Gcid) -> Vec<Account360>;

    /// Most recent transactions first.
    fn recent_transactions(&self, gcid: Gcid, count: usize) -> Vec<Transaction360>;

    /// Which customer owns a source system's account. Used to attach
    /// transactions to their owner.
    fn find_account_owner(&self, source_system: &str, local_account_id: &str) -> Option<Gcid>;

    /// Returns false if the customer is unknown.
    fn update_risk_score(&self, gcid: Gcid, risk_score: f64, risk_category: &str) -> bool;

    /// Replace the stored customer wholesale. Seeding helper for tests
    /// and demos; the sync path goes through `merge_customer`.
    fn put(&self, customer: Customer360);

    fn customer_count(&self) -> usize;
}

#[derive(Default)]
struct StoreInner {
    customers: HashMap<Gcid, Customer360>,
    accounts: HashMap<Gcid, Vec<Account360>>,
    transactions: HashMap<Gcid, Vec<Transaction360>>,
    account_owner: HashMap<(String, String), Gcid>,
}

impl StoreInner {
    /// Keep the customer's financial summary consistent with its
    /// accounts. Runs under the same lock as the account write.
    fn refresh_summary(&mut self, gcid: Gcid) {
        let (count, total, available) = match self.accounts.get(&gcid) {
            Some(accounts) => (
                accounts.len() as u32,
                accounts.iter().map(|a| a.current_balance).sum(),
                accounts.iter().map(|a| a.available_balance).sum(),
            ),
            None => (0, 0.0, 0.0),
        };
        if let Some(customer) = self.customers.get_mut(&gcid) {
            customer.account_count = count;
            customer.total_balance = total;
            customer.available_balance = available;
            customer.updated_at = Utc::now();
        }
    }
}

#[derive(Default)]
pub struct InMemoryCustomer360Store {
    inner: Mutex<StoreInner>,
}

impl InMemoryCustomer360Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Customer360Store for InMemoryCustomer360Store {
    fn get(&self, gcid: Gcid) -> Option<Customer360> {
        self.lock().customers.get(&gcid).cloned()
    }

    fn merge_customer(&self, gcid: Gcid, record: &CustomerRecord) -> MergeOutcome {
        let mut inner = self.lock();
        match inner.customers.get_mut(&gcid) {
            Some(existing) => {
                existing.merge_record(record);
                MergeOutcome::Updated
            }
            None => {
                inner
                    .customers
                    .insert(gcid, Customer360::from_record(gcid, record));
                MergeOutcome::Created
            }
        }
    }

    fn upsert_account(&self, gcid: Gcid, record: &AccountRecord) {
        let now = Utc::now();
        let mut inner = self.lock();
        let accounts = inner.accounts.entry(gcid).or_default();
        match accounts
            .iter_mut()
            .find(|a| a.account_number == record.account_number)
        {
            Some(account) => {
                account.account_type = record.account_type.clone();
                account.currency = record.currency.clone();
                account.current_balance = record.current_balance;
                account.available_balance = record.available_balance;
                account.status = record.status.clone();
                account.updated_at = now;
            }
            None => accounts.push(Account360 {
                id: Uuid::new_v4(),
                gcid,
                account_number: record.account_number.clone(),
                account_type: record.account_type.clone(),
                currency: record.currency.clone(),
                current_balance: record.current_balance,
                available_balance: record.available_balance,
                status: record.status.clone(),
                opened_at: record.opened_at,
                source_system: record.source_system.clone(),
                source_account_id: record.local_account_id.clone(),
                created_at: now,
                updated_at: now,
            }),
        }
        inner.account_owner.insert(
            (record.source_system.clone(), record.local_account_id.clone()),
            gcid,
        );
        inner.refresh_summary(gcid);
    }

    fn append_transaction(&self, gcid: Gcid, record: &TransactionRecord) {
        let transaction = Transaction360 {
            id: Uuid::new_v4(),
            gcid,
            transaction_id: record.local_transaction_id.clone(),
            posted_at: record.posted_at,
            transaction_type: record.transaction_type.clone(),
            amount: record.amount,
            currency: record.currency.clone(),
            balance_after: record.balance_after,
            channel: record.channel.clone(),
            description: record.description.clone(),
            reference: record.reference.clone(),
            source_system: record.source_system.clone(),
            source_account_id: record.local_account_id.clone(),
            created_at: Utc::now(),
        };

        let mut inner = self.lock();
        let transactions = inner.transactions.entry(gcid).or_default();
        // Ordered by posting date; equal dates keep arrival order.
        let at = transactions.partition_point(|t| t.posted_at <= transaction.posted_at);
        transactions.insert(at, transaction);
    }

    fn accounts(&self, gcid: Gcid) -> Vec<Account360> {
        self.lock().accounts.get(&gcid).cloned().unwrap_or_default()
    }

    fn recent_transactions(&self, gcid: Gcid, count: usize) -> Vec<Transaction360> {
        let inner = self.lock();
        match inner.transactions.get(&gcid) {
            Some(transactions) => transactions.iter().rev().take(count).cloned().collect(),
            None => Vec::new(),
        }
    }

    fn find_account_owner(&self, source_system: &str, local_account_id: &str) -> Option<Gcid> {
        self.lock()
            .account_owner
            .get(&(source_system.to_string(), local_account_id.to_string()))
            .copied()
    }

    fn update_risk_score(&self, gcid: Gcid, risk_score: f64, risk_category: &str) -> bool {
        match self.lock().customers.get_mut(&gcid) {
            Some(customer) => {
                customer.risk_score = risk_score;
                customer.risk_category = risk_category.to_string();
                customer.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    fn put(&self, customer: Customer360) {
        self.lock().customers.insert(customer.gcid, customer);
    }

    fn customer_count(&self) -> usize {
        self.lock().customers.len()
    }
}
