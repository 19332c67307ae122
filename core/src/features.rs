//! Behavioral feature computation over the aggregated 360 view.
//!
//! Features are derived, never stored back into the customer record.
//! The cache holds the last computed snapshot per customer; `compute`
//! refreshes it, `get` reads it without recomputing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{C360Error, C360Result},
    store::{Customer360Store, Transaction360},
    types::Gcid,
};

/// How many recent transactions to pull when computing features. Covers
/// well over 90 days for the volumes a single customer produces.
const FEATURE_WINDOW_TRANSACTIONS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerFeatures {
    pub gcid: Gcid,

    // Transaction behavior
    pub transaction_count_30d: usize,
    pub transaction_count_90d: usize,
    pub monthly_inflow: f64,
    pub monthly_outflow: f64,
    pub average_transaction_amount: f64,
    pub preferred_channel: Option<String>,

    // Login behavior
    pub last_login_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: u32,

    // Risk
    pub current_risk_score: f64,
    /// Transactions in the last 24 hours, scaled to [0, 1].
    pub velocity_score: f64,

    // Balance behavior
    pub average_daily_balance: f64,
    pub min_balance_90d: f64,
    pub max_balance_90d: f64,

    // Temporal patterns over the 90-day window
    pub hourly_pattern: [f64; 24],
    pub day_of_week_pattern: [u32; 7],

    pub high_value: bool,
    pub segment: String,
    pub calculated_at: DateTime<Utc>,
}

pub struct InMemoryFeatureStore {
    store: Arc<dyn Customer360Store>,
    cache: Mutex<HashMap<Gcid, CustomerFeatures>>,
}

impl InMemoryFeatureStore {
    pub fn new(store: Arc<dyn Customer360Store>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Gcid, CustomerFeatures>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recompute features from the current store state and cache the
    /// snapshot.
    pub fn compute(&self, gcid: Gcid) -> C360Result<CustomerFeatures> {
        let customer = self
            .store
            .get(gcid)
            .ok_or(C360Error::UnknownCustomer { gcid })?;

        let now = Utc::now();
        let transactions = self
            .store
            .recent_transactions(gcid, FEATURE_WINDOW_TRANSACTIONS);
        let window_90d: Vec<&Transaction360> = transactions
            .iter()
            .filter(|t| t.posted_at > now - Duration::days(90))
            .collect();
        let window_30d: Vec<&&Transaction360> = window_90d
            .iter()
            .filter(|t| t.posted_at > now - Duration::days(30))
            .collect();

        let monthly_inflow: f64 = window_30d
            .iter()
            .filter(|t| t.transaction_type.eq_ignore_ascii_case("credit"))
            .map(|t| t.amount)
            .sum();
        let monthly_outflow: f64 = window_30d
            .iter()
            .filter(|t| t.transaction_type.eq_ignore_ascii_case("debit"))
            .map(|t| t.amount)
            .sum();
        let average_transaction_amount = if window_30d.is_empty() {
            0.0
        } else {
            window_30d.iter().map(|t| t.amount).sum::<f64>() / window_30d.len() as f64
        };

        let mut channel_counts: HashMap<&str, usize> = HashMap::new();
        for t in &window_90d {
            *channel_counts.entry(t.channel.as_str()).or_insert(0) += 1;
        }
        let preferred_channel = channel_counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(channel, _)| channel.to_string());

        let last_24h = window_90d
            .iter()
            .filter(|t| t.posted_at > now - Duration::hours(24))
            .count();
        let velocity_score = (last_24h as f64 / 20.0).clamp(0.0, 1.0);

        let (average_daily_balance, min_balance_90d, max_balance_90d) = if window_90d.is_empty() {
            (
                customer.total_balance,
                customer.total_balance,
                customer.total_balance,
            )
        } else {
            let sum: f64 = window_90d.iter().map(|t| t.balance_after).sum();
            let min = window_90d
                .iter()
                .map(|t| t.balance_after)
                .fold(f64::INFINITY, f64::min);
            let max = window_90d
                .iter()
                .map(|t| t.balance_after)
                .fold(f64::NEG_INFINITY, f64::max);
            (sum / window_90d.len() as f64, min, max)
        };

        let mut hourly_pattern = [0.0f64; 24];
        let mut day_of_week_pattern = [0u32; 7];
        for t in &window_90d {
            hourly_pattern[t.posted_at.hour() as usize] += 1.0;
            day_of_week_pattern[t.posted_at.weekday().num_days_from_monday() as usize] += 1;
        }
        if !window_90d.is_empty() {
            for slot in hourly_pattern.iter_mut() {
                *slot /= window_90d.len() as f64;
            }
        }

        let features = CustomerFeatures {
            gcid,
            transaction_count_30d: window_30d.len(),
            transaction_count_90d: window_90d.len(),
            monthly_inflow,
            monthly_outflow,
            average_transaction_amount,
            preferred_channel,
            last_login_at: customer.last_login_at,
            failed_login_attempts: customer.failed_login_attempts,
            current_risk_score: customer.risk_score,
            velocity_score,
            average_daily_balance,
            min_balance_90d,
            max_balance_90d,
            hourly_pattern,
            day_of_week_pattern,
            high_value: customer.total_balance > 1_000_000.0,
            segment: customer.segment,
            calculated_at: now,
        };

        self.lock().insert(gcid, features.clone());
        Ok(features)
    }

    /// Last computed snapshot, if any. Never recomputes.
    pub fn get(&self, gcid: Gcid) -> Option<CustomerFeatures> {
        self.lock().get(&gcid).cloned()
    }

    /// Relative weight of each feature in downstream risk models.
    pub fn importance() -> Vec<(&'static str, f64)> {
        vec![
            ("current_risk_score", 0.25),
            ("velocity_score", 0.20),
            ("failed_login_attempts", 0.15),
            ("monthly_outflow", 0.12),
            ("transaction_count_30d", 0.10),
            ("average_daily_balance", 0.08),
            ("preferred_channel", 0.05),
            ("transaction_count_90d", 0.05),
        ]
    }
}
