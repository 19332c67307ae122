//! Data aggregation — the sync pipeline pulling raw records out of
//! source systems and folding them into the Customer 360 store.
//!
//! RULE: one source failing never aborts the run. `sync_source` always
//! returns a result describing what happened; `sync_all` yields one
//! result per enabled source.
//!
//! Per-source step order is fixed: probe the connection, then customers,
//! then accounts, then transactions. Customers must land first so the
//! identity index can attach accounts and transactions to their owner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    connector::{AccountRecord, CustomerRecord, TransactionRecord},
    error::{C360Error, C360Result},
    event::{CustomerAction, DomainEvent, EventPayload, EventPublisher},
    identity::IdentityResolver,
    registry::DataSourceRegistry,
    store::{Customer360Store, MergeOutcome},
    types::{Gcid, SourceId},
};

/// Outcome of syncing one data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSyncResult {
    pub source_id: SourceId,
    pub source_name: String,
    pub successful: bool,
    pub customers_processed: usize,
    pub accounts_processed: usize,
    pub transactions_processed: usize,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Aggregate view over the registry and store, for dashboards and the
/// sync runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationStats {
    pub total_sources: usize,
    pub enabled_sources: usize,
    pub total_customers: usize,
    pub by_source_type: HashMap<String, usize>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

pub struct DataAggregationService {
    registry: Arc<DataSourceRegistry>,
    resolver: Arc<dyn IdentityResolver>,
    store: Arc<dyn Customer360Store>,
    publisher: Arc<dyn EventPublisher>,
    /// Completion time of the last successful sync per source, used as
    /// the incremental fetch watermark.
    last_synced: Mutex<HashMap<SourceId, DateTime<Utc>>>,
}

impl DataAggregationService {
    pub fn new(
        registry: Arc<DataSourceRegistry>,
        resolver: Arc<dyn IdentityResolver>,
        store: Arc<dyn Customer360Store>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            registry,
            resolver,
            store,
            publisher,
            last_synced: Mutex::new(HashMap::new()),
        }
    }

    fn watermarks(&self) -> MutexGuard<'_, HashMap<SourceId, DateTime<Utc>>> {
        self.last_synced.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sync one source. Never returns `Err`; any failure is captured in
    /// the result so a multi-source run can keep going.
    pub fn sync_source(&self, id: SourceId) -> DataSyncResult {
        let started = Instant::now();
        let source_name = self
            .registry
            .get(id)
            .map(|c| c.name)
            .unwrap_or_else(|| id.to_string());

        let (counts, error) = match self.sync_inner(id) {
            Ok(counts) => (counts, None),
            Err(e) => {
                log::warn!("sync failed for source '{source_name}': {e}");
                ((0, 0, 0), Some(e.to_string()))
            }
        };

        let successful = error.is_none();
        let completed_at = Utc::now();
        if successful {
            self.watermarks().insert(id, completed_at);
        }

        DataSyncResult {
            source_id: id,
            source_name,
            successful,
            customers_processed: counts.0,
            accounts_processed: counts.1,
            transactions_processed: counts.2,
            duration_ms: started.elapsed().as_millis() as u64,
            error,
            completed_at,
        }
    }

    fn sync_inner(&self, id: SourceId) -> C360Result<(usize, usize, usize)> {
        let config = self
            .registry
            .get(id)
            .ok_or(C360Error::SourceNotFound { id })?;
        if !config.enabled {
            return Err(C360Error::SourceDisabled {
                name: config.name.clone(),
            });
        }
        let connector = self
            .registry
            .connector(id)
            .ok_or(C360Error::ConnectorUnavailable { id })?;

        let probe = connector.test_connection();
        if !probe.connected {
            return Err(C360Error::ConnectionFailed {
                message: probe.message,
            });
        }

        let since = self.watermarks().get(&id).copied();
        log::info!(
            "syncing source '{}' ({}), since={:?}",
            config.name,
            config.source_type,
            since
        );

        let mut customers = 0;
        for record in connector.fetch_customers(since)? {
            self.process_customer(&record)?;
            customers += 1;
        }

        let mut accounts = 0;
        for record in connector.fetch_accounts(since)? {
            self.process_account(&record);
            accounts += 1;
        }

        let mut transactions = 0;
        for record in connector.fetch_transactions(since)? {
            self.process_transaction(&record);
            transactions += 1;
        }

        log::info!(
            "synced '{}': {customers} customers, {accounts} accounts, {transactions} transactions",
            config.name
        );
        Ok((customers, accounts, transactions))
    }

    /// Sync every enabled source, one result each. Disabled sources are
    /// skipped entirely and produce no result.
    pub fn sync_all(&self) -> Vec<DataSyncResult> {
        let enabled: Vec<SourceId> = self
            .registry
            .all()
            .into_iter()
            .filter(|c| c.enabled)
            .filter_map(|c| c.id)
            .collect();

        enabled.into_iter().map(|id| self.sync_source(id)).collect()
    }

    /// Resolve the record to a GCID, record the source mapping, merge
    /// into the 360 view, and publish the customer fact.
    pub fn process_customer(&self, record: &CustomerRecord) -> C360Result<()> {
        let resolved = self.resolver.resolve_or_create(
            record.national_id.as_deref(),
            record.phone.as_deref(),
            record.email.as_deref(),
        )?;
        self.resolver.add_mapping(
            resolved.gcid,
            &record.source_system,
            &record.local_customer_id,
            record.national_id.as_deref(),
            record.phone.as_deref(),
            record.email.as_deref(),
        )?;

        let outcome = self.store.merge_customer(resolved.gcid, record);
        let action = match outcome {
            MergeOutcome::Created => CustomerAction::Created,
            MergeOutcome::Updated => CustomerAction::Updated,
        };

        self.publish(DomainEvent::new(
            record.source_system.clone(),
            EventPayload::Customer {
                gcid: resolved.gcid,
                local_customer_id: record.local_customer_id.clone(),
                national_id: record.national_id.clone(),
                phone: record.phone.clone(),
                email: record.email.clone(),
                first_name: record.first_name.clone().unwrap_or_default(),
                last_name: record.last_name.clone().unwrap_or_default(),
                action,
            },
        ));
        Ok(())
    }

    /// Attach the account to its owner when the owning customer has
    /// already been seen from this source. An unknown owner is not an
    /// error; the event still goes out with `gcid: None`.
    pub fn process_account(&self, record: &AccountRecord) {
        let gcid = self
            .resolver
            .find_by_source_local(&record.source_system, &record.local_customer_id);

        match gcid {
            Some(gcid) => self.store.upsert_account(gcid, record),
            None => log::debug!(
                "no owner yet for account {} from {}",
                record.local_account_id,
                record.source_system
            ),
        }

        self.publish(DomainEvent::new(
            record.source_system.clone(),
            EventPayload::Account {
                gcid,
                local_customer_id: record.local_customer_id.clone(),
                account_number: record.account_number.clone(),
                account_type: record.account_type.clone(),
                current_balance: record.current_balance,
                status: record.status.clone(),
            },
        ));
    }

    /// Same linkage rule as accounts, via the account-owner index.
    pub fn process_transaction(&self, record: &TransactionRecord) {
        let gcid: Option<Gcid> = self
            .store
            .find_account_owner(&record.source_system, &record.local_account_id);

        if let Some(gcid) = gcid {
            self.store.append_transaction(gcid, record);
        }

        self.publish(DomainEvent::new(
            record.source_system.clone(),
            EventPayload::Transaction {
                gcid,
                local_account_id: record.local_account_id.clone(),
                transaction_id: record.local_transaction_id.clone(),
                amount: record.amount,
                currency: record.currency.clone(),
                transaction_type: record.transaction_type.clone(),
                channel: record.channel.clone(),
                balance_after: record.balance_after,
            },
        ));
    }

    /// A consumer failing to handle a fact does not fail ingestion.
    fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.publisher.publish(&event) {
            log::warn!("publish failed for {}: {e}", event.kind());
        }
    }

    pub fn statistics(&self) -> AggregationStats {
        let configs = self.registry.all();
        let mut by_source_type: HashMap<String, usize> = HashMap::new();
        for config in &configs {
            *by_source_type
                .entry(config.source_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        AggregationStats {
            total_sources: configs.len(),
            enabled_sources: configs.iter().filter(|c| c.enabled).count(),
            total_customers: self.store.customer_count(),
            by_source_type,
            last_sync_at: self.watermarks().values().max().copied(),
        }
    }
}
