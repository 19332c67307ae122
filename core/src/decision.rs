//! Real-time decision engine — approve, decline, or route to review,
//! using only the already-aggregated 360 view.
//!
//! RULE: a decision is a pure function of the stored customer state and
//! the request. The engine never fetches from source systems and never
//! mutates the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    store::{Customer360, Customer360Store},
    types::Gcid,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub gcid: Gcid,
    /// PAYMENT, LOAN_REQUEST, LOGIN, ACCOUNT_OPENING, or anything else
    /// (handled by the default rule set).
    pub event_type: String,
    pub amount: Option<f64>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision: Decision,
    pub risk_score: f64,
    pub reason: String,
    pub flags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Decline,
    Review,
}

pub struct DecisionEngine {
    store: Arc<dyn Customer360Store>,
}

impl DecisionEngine {
    pub fn new(store: Arc<dyn Customer360Store>) -> Self {
        Self { store }
    }

    /// Decide on a request. An unknown customer is always declined with
    /// maximum risk.
    pub fn decide(&self, request: &DecisionRequest) -> DecisionResponse {
        let customer = match self.store.get(request.gcid) {
            Some(customer) => customer,
            None => {
                return DecisionResponse {
                    decision: Decision::Decline,
                    risk_score: 1.0,
                    reason: "Customer not found".into(),
                    flags: Vec::new(),
                    timestamp: Utc::now(),
                }
            }
        };

        let risk_score = Self::contextual_risk(&customer, request.amount);
        let amount = request.amount.unwrap_or(0.0);
        let mut flags = Vec::new();

        // Rule tables are keyed by the uppercased event type, so
        // "payment" and "PAYMENT" hit the same rules.
        let event_type = request.event_type.to_uppercase();
        let decision = match event_type.as_str() {
            "PAYMENT" => {
                if risk_score > 0.7 {
                    flags.push("HIGH_RISK_SCORE".to_string());
                    Decision::Decline
                } else if amount > customer.available_balance {
                    flags.push("INSUFFICIENT_BALANCE".to_string());
                    Decision::Decline
                } else if amount > customer.average_daily_balance * 2.0 {
                    flags.push("UNUSUAL_AMOUNT".to_string());
                    Decision::Review
                } else if risk_score > 0.4 {
                    flags.push("MODERATE_RISK".to_string());
                    Decision::Review
                } else {
                    Decision::Approve
                }
            }
            "LOAN_REQUEST" => {
                if risk_score > 0.6 {
                    flags.push("HIGH_RISK_PROFILE".to_string());
                    Decision::Decline
                } else if customer.monthly_inflow < amount * 0.1 {
                    flags.push("INSUFFICIENT_INCOME".to_string());
                    Decision::Decline
                } else if risk_score > 0.3 {
                    flags.push("REQUIRES_MANUAL_REVIEW".to_string());
                    Decision::Review
                } else {
                    Decision::Approve
                }
            }
            "LOGIN" => {
                if customer.failed_login_attempts > 5 {
                    flags.push("MULTIPLE_FAILED_ATTEMPTS".to_string());
                    Decision::Decline
                } else if risk_score > 0.5 {
                    flags.push("SUSPICIOUS_ACTIVITY".to_string());
                    Decision::Review
                } else {
                    Decision::Approve
                }
            }
            "ACCOUNT_OPENING" => {
                if risk_score > 0.5 {
                    flags.push("HIGH_RISK_APPLICANT".to_string());
                    Decision::Review
                } else {
                    Decision::Approve
                }
            }
            _ => {
                if risk_score > 0.7 {
                    flags.push("HIGH_RISK".to_string());
                    Decision::Decline
                } else if risk_score > 0.4 {
                    flags.push("MODERATE_RISK".to_string());
                    Decision::Review
                } else {
                    Decision::Approve
                }
            }
        };

        let reason = match decision {
            Decision::Approve => {
                format!("{event_type} approved - Normal behavior pattern")
            }
            Decision::Decline => format!("Declined: {}", flags.join(", ")),
            Decision::Review => format!("Manual review required: {}", flags.join(", ")),
        };

        log::info!(
            "decision for {} on {event_type}: {decision:?} (risk {risk_score:.2})",
            request.gcid
        );

        DecisionResponse {
            decision,
            risk_score,
            reason,
            flags,
            timestamp: Utc::now(),
        }
    }

    /// Contextual risk for a customer without making a decision.
    /// Unknown customers score maximum risk. Scoring does not yet vary
    /// by event type.
    pub fn risk_score(&self, gcid: Gcid, _event_type: &str, amount: Option<f64>) -> f64 {
        match self.store.get(gcid) {
            Some(customer) => Self::contextual_risk(&customer, amount),
            None => 1.0,
        }
    }

    /// Stored base score plus behavioral penalties, clamped to [0, 1].
    fn contextual_risk(customer: &Customer360, amount: Option<f64>) -> f64 {
        let mut score = customer.risk_score;
        if customer.failed_login_attempts > 3 {
            score += 0.2;
        }
        if customer.status != "Active" {
            score += 0.3;
        }
        if let Some(amount) = amount {
            if customer.average_daily_balance > 0.0
                && amount > customer.average_daily_balance * 0.5
            {
                score += 0.15;
            }
        }
        score.clamp(0.0, 1.0)
    }
}
