//! Decision engine tests: per-event rule tables, risk scoring, and the
//! unknown-customer path.

use std::sync::Arc;

use c360_core::decision::{Decision, DecisionEngine, DecisionRequest};
use c360_core::store::{Customer360, Customer360Store, InMemoryCustomer360Store};
use c360_core::types::Gcid;

fn engine_with(customer: Customer360) -> (DecisionEngine, Gcid) {
    let store = Arc::new(InMemoryCustomer360Store::new());
    let gcid = customer.gcid;
    store.put(customer);
    (DecisionEngine::new(store), gcid)
}

fn healthy_customer() -> Customer360 {
    let mut c = Customer360::new(Gcid::new());
    c.first_name = "John".into();
    c.last_name = "Doe".into();
    c.risk_score = 0.1;
    c.available_balance = 100_000.0;
    c.total_balance = 100_000.0;
    c.average_daily_balance = 80_000.0;
    c.monthly_inflow = 60_000.0;
    c
}

fn request(gcid: Gcid, event_type: &str, amount: Option<f64>) -> DecisionRequest {
    DecisionRequest {
        gcid,
        event_type: event_type.into(),
        amount,
        channel: Some("Mobile".into()),
    }
}

/// An unknown customer is always declined at maximum risk, with the
/// reason alone carrying the explanation.
#[test]
fn unknown_customer_is_declined() {
    let engine = DecisionEngine::new(Arc::new(InMemoryCustomer360Store::new()));
    let response = engine.decide(&request(Gcid::new(), "PAYMENT", Some(1_000.0)));

    assert_eq!(response.decision, Decision::Decline);
    assert!((response.risk_score - 1.0).abs() < f64::EPSILON);
    assert_eq!(response.reason, "Customer not found");
    assert!(response.flags.is_empty(), "flags: {:?}", response.flags);
}

/// Event types are matched case-insensitively; a lowercase "payment"
/// hits the payment rules, not the default table.
#[test]
fn event_type_matching_is_case_insensitive() {
    let mut c = healthy_customer();
    c.available_balance = 500.0;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "payment", Some(1_000.0)));
    assert_eq!(response.decision, Decision::Decline);
    assert!(response.flags.contains(&"INSUFFICIENT_BALANCE".to_string()));
    assert!(response.reason.starts_with("Declined:"));

    let approved = engine.decide(&request(gcid, "account_opening", None));
    assert_eq!(approved.decision, Decision::Approve);
    assert!(approved.reason.contains("ACCOUNT_OPENING approved"));
}

/// A low-risk payment inside normal behavior is approved.
#[test]
fn normal_payment_is_approved() {
    let (engine, gcid) = engine_with(healthy_customer());
    let response = engine.decide(&request(gcid, "PAYMENT", Some(5_000.0)));

    assert_eq!(response.decision, Decision::Approve, "flags: {:?}", response.flags);
    assert!(response.flags.is_empty());
    assert!(response.reason.contains("PAYMENT approved"));
}

/// Payments above the available balance are declined.
#[test]
fn payment_over_balance_is_declined() {
    let mut c = healthy_customer();
    c.available_balance = 1_000.0;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "PAYMENT", Some(5_000.0)));
    assert_eq!(response.decision, Decision::Decline);
    assert!(response.flags.contains(&"INSUFFICIENT_BALANCE".to_string()));
    assert!(response.reason.starts_with("Declined:"));
}

/// High stored risk declines a payment before any balance check.
#[test]
fn high_risk_payment_is_declined() {
    let mut c = healthy_customer();
    c.risk_score = 0.8;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "PAYMENT", Some(100.0)));
    assert_eq!(response.decision, Decision::Decline);
    assert!(response.flags.contains(&"HIGH_RISK_SCORE".to_string()));
}

/// A payment far above the customer's usual balance goes to review.
#[test]
fn unusual_payment_amount_goes_to_review() {
    let mut c = healthy_customer();
    c.risk_score = 0.0;
    c.average_daily_balance = 1_000.0;
    c.available_balance = 10_000.0;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "PAYMENT", Some(3_000.0)));
    assert_eq!(response.decision, Decision::Review);
    assert!(response.flags.contains(&"UNUSUAL_AMOUNT".to_string()));
    assert!(response.reason.starts_with("Manual review required:"));
}

/// A loan request without the income to carry it is declined.
#[test]
fn loan_without_income_is_declined() {
    let mut c = healthy_customer();
    c.monthly_inflow = 5_000.0;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "LOAN_REQUEST", Some(100_000.0)));
    assert_eq!(response.decision, Decision::Decline);
    assert!(response.flags.contains(&"INSUFFICIENT_INCOME".to_string()));
}

/// A well-funded low-risk loan request is approved.
#[test]
fn funded_loan_is_approved() {
    let mut c = healthy_customer();
    c.monthly_inflow = 50_000.0;
    c.average_daily_balance = 500_000.0;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "LOAN_REQUEST", Some(100_000.0)));
    assert_eq!(response.decision, Decision::Approve, "flags: {:?}", response.flags);
}

/// More than five failed logins decline the next login outright.
#[test]
fn repeated_failed_logins_are_declined() {
    let mut c = healthy_customer();
    c.failed_login_attempts = 6;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "LOGIN", None));
    assert_eq!(response.decision, Decision::Decline);
    assert!(response
        .flags
        .contains(&"MULTIPLE_FAILED_ATTEMPTS".to_string()));
}

/// A risky applicant opening an account is routed to review, never
/// auto-declined.
#[test]
fn risky_account_opening_goes_to_review() {
    let mut c = healthy_customer();
    c.risk_score = 0.6;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "ACCOUNT_OPENING", None));
    assert_eq!(response.decision, Decision::Review);
    assert!(response.flags.contains(&"HIGH_RISK_APPLICANT".to_string()));
}

/// Unrecognized event types fall back to the generic thresholds.
#[test]
fn unknown_event_type_uses_default_rules() {
    let mut c = healthy_customer();
    c.risk_score = 0.5;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "CARD_ACTIVATION", None));
    assert_eq!(response.decision, Decision::Review);
    assert!(response.flags.contains(&"MODERATE_RISK".to_string()));
}

/// Risk penalties accumulate but never push the score past 1.0.
#[test]
fn risk_score_is_clamped() {
    let mut c = healthy_customer();
    c.risk_score = 0.9;
    c.failed_login_attempts = 10;
    c.status = "Suspended".into();
    c.average_daily_balance = 100.0;
    let (engine, gcid) = engine_with(c);

    let response = engine.decide(&request(gcid, "PAYMENT", Some(1_000.0)));
    assert!(response.risk_score <= 1.0);
    assert!((response.risk_score - 1.0).abs() < f64::EPSILON);
    assert_eq!(response.decision, Decision::Decline);
}

/// The standalone risk query matches decision behavior and is
/// non-decreasing in failed logins.
#[test]
fn risk_query_is_monotonic_in_failed_logins() {
    let mut low = healthy_customer();
    low.failed_login_attempts = 0;
    let mut high = healthy_customer();
    high.failed_login_attempts = 4;

    let (engine_low, gcid_low) = engine_with(low);
    let (engine_high, gcid_high) = engine_with(high);

    let low_score = engine_low.risk_score(gcid_low, "LOGIN", None);
    let high_score = engine_high.risk_score(gcid_high, "LOGIN", None);
    assert!(high_score > low_score);

    assert!((engine_low.risk_score(Gcid::new(), "LOGIN", None) - 1.0).abs() < f64::EPSILON);
}

/// A dormant account raises contextual risk relative to an active one.
#[test]
fn inactive_status_raises_risk() {
    let active = healthy_customer();
    let mut dormant = healthy_customer();
    dormant.status = "Dormant".into();

    let (engine_a, gcid_a) = engine_with(active);
    let (engine_d, gcid_d) = engine_with(dormant);

    let a = engine_a.decide(&request(gcid_a, "PAYMENT", Some(1_000.0)));
    let d = engine_d.decide(&request(gcid_d, "PAYMENT", Some(1_000.0)));
    assert!(d.risk_score > a.risk_score);
}
