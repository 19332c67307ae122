//! Feature computation tests over a seeded store.

use std::sync::Arc;

use chrono::{Duration, Utc};

use c360_core::connector::TransactionRecord;
use c360_core::error::C360Error;
use c360_core::features::InMemoryFeatureStore;
use c360_core::store::{Customer360, Customer360Store, InMemoryCustomer360Store};
use c360_core::types::Gcid;

fn txn(
    id: &str,
    days_ago: i64,
    transaction_type: &str,
    amount: f64,
    channel: &str,
    balance_after: f64,
) -> TransactionRecord {
    TransactionRecord {
        source_system: "Core Banking System".into(),
        local_transaction_id: id.into(),
        local_account_id: "ACC001".into(),
        posted_at: Utc::now() - Duration::days(days_ago),
        transaction_type: transaction_type.into(),
        amount,
        currency: "KES".into(),
        channel: channel.into(),
        description: None,
        reference: None,
        balance_after,
    }
}

fn seeded() -> (Arc<InMemoryCustomer360Store>, Gcid) {
    let store = Arc::new(InMemoryCustomer360Store::new());
    let gcid = Gcid::new();
    let mut customer = Customer360::new(gcid);
    customer.first_name = "John".into();
    customer.risk_score = 0.2;
    customer.total_balance = 50_000.0;
    store.put(customer);
    (store, gcid)
}

/// Computing features for a customer the store has never seen fails.
#[test]
fn compute_requires_known_customer() {
    let store = Arc::new(InMemoryCustomer360Store::new());
    let features = InMemoryFeatureStore::new(store);

    let err = features.compute(Gcid::new()).unwrap_err();
    assert!(matches!(err, C360Error::UnknownCustomer { .. }));
}

/// Window counts, flows, and channel preference over a mixed history.
#[test]
fn transaction_windows_and_flows() {
    let (store, gcid) = seeded();
    // Two recent, one mid-window, one outside 90 days.
    store.append_transaction(gcid, &txn("T1", 2, "Credit", 10_000.0, "Mobile", 60_000.0));
    store.append_transaction(gcid, &txn("T2", 5, "Debit", 4_000.0, "Mobile", 56_000.0));
    store.append_transaction(gcid, &txn("T3", 60, "Debit", 1_000.0, "ATM", 55_000.0));
    store.append_transaction(gcid, &txn("T4", 120, "Credit", 9_000.0, "Branch", 64_000.0));

    let features = InMemoryFeatureStore::new(store);
    let f = features.compute(gcid).unwrap();

    assert_eq!(f.transaction_count_30d, 2);
    assert_eq!(f.transaction_count_90d, 3);
    assert!((f.monthly_inflow - 10_000.0).abs() < f64::EPSILON);
    assert!((f.monthly_outflow - 4_000.0).abs() < f64::EPSILON);
    assert!((f.average_transaction_amount - 7_000.0).abs() < f64::EPSILON);
    assert_eq!(f.preferred_channel.as_deref(), Some("Mobile"));
    assert!((f.min_balance_90d - 55_000.0).abs() < f64::EPSILON);
    assert!((f.max_balance_90d - 60_000.0).abs() < f64::EPSILON);
    assert!((f.current_risk_score - 0.2).abs() < f64::EPSILON);
}

/// With no transaction history the balance features fall back to the
/// customer's stored totals.
#[test]
fn empty_history_falls_back_to_stored_balance() {
    let (store, gcid) = seeded();
    let features = InMemoryFeatureStore::new(store);
    let f = features.compute(gcid).unwrap();

    assert_eq!(f.transaction_count_90d, 0);
    assert!((f.average_daily_balance - 50_000.0).abs() < f64::EPSILON);
    assert!((f.min_balance_90d - 50_000.0).abs() < f64::EPSILON);
    assert!(f.preferred_channel.is_none());
    assert!(!f.high_value);
    assert_eq!(f.velocity_score, 0.0);
}

/// `get` never recomputes; it returns the cached snapshot only.
#[test]
fn get_reads_cache_only() {
    let (store, gcid) = seeded();
    let features = InMemoryFeatureStore::new(store.clone());

    assert!(features.get(gcid).is_none(), "nothing cached before compute");
    features.compute(gcid).unwrap();
    let cached = features.get(gcid).unwrap();
    assert_eq!(cached.gcid, gcid);
    assert_eq!(cached.transaction_count_90d, 0);

    // New activity is invisible until the next compute.
    store.append_transaction(gcid, &txn("T9", 1, "Debit", 100.0, "Mobile", 49_900.0));
    assert_eq!(features.get(gcid).unwrap().transaction_count_90d, 0);
    assert_eq!(features.compute(gcid).unwrap().transaction_count_90d, 1);
}

/// Balances past the threshold mark the customer high value.
#[test]
fn high_value_flag_follows_balance() {
    let store = Arc::new(InMemoryCustomer360Store::new());
    let gcid = Gcid::new();
    let mut customer = Customer360::new(gcid);
    customer.total_balance = 2_500_000.0;
    store.put(customer);

    let features = InMemoryFeatureStore::new(store);
    assert!(features.compute(gcid).unwrap().high_value);
}

/// Temporal patterns cover the full 90-day window and normalize.
#[test]
fn temporal_patterns_are_normalized() {
    let (store, gcid) = seeded();
    store.append_transaction(gcid, &txn("T1", 1, "Debit", 100.0, "Mobile", 49_900.0));
    store.append_transaction(gcid, &txn("T2", 8, "Debit", 100.0, "Mobile", 49_800.0));

    let features = InMemoryFeatureStore::new(store);
    let f = features.compute(gcid).unwrap();

    let hourly_total: f64 = f.hourly_pattern.iter().sum();
    assert!((hourly_total - 1.0).abs() < 1e-9, "got {hourly_total}");
    let daily_total: u32 = f.day_of_week_pattern.iter().sum();
    assert_eq!(daily_total, 2);
}

/// Feature weights are a sane distribution.
#[test]
fn importance_weights_sum_to_one() {
    let weights = InMemoryFeatureStore::importance();
    assert!(!weights.is_empty());
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    assert!((total - 1.0).abs() < 1e-9, "got {total}");
}
