//! sync-runner: headless aggregation runner for the Customer 360 core.
//!
//! Usage:
//!   sync-runner                          # built-in demo sources
//!   sync-runner --sources sources.json   # sources from file
//!   sync-runner --json                   # machine-readable output

use std::env;
use std::sync::Arc;

use anyhow::Result;
use c360_core::{
    aggregation::DataAggregationService,
    bus::InMemoryEventBus,
    config::DataSourceConfig,
    decision::{DecisionEngine, DecisionRequest},
    identity::{IdentityResolver, InMemoryIdentityResolver},
    registry::DataSourceRegistry,
    store::{Customer360Store, InMemoryCustomer360Store},
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json_output = args.iter().any(|a| a == "--json");
    let sources_path = args
        .windows(2)
        .find(|w| w[0] == "--sources")
        .map(|w| w[1].as_str());

    let configs = match sources_path {
        Some(path) => DataSourceConfig::load_all(path)?,
        None => DataSourceConfig::default_test(),
    };

    let registry = Arc::new(DataSourceRegistry::with_defaults());
    let resolver = Arc::new(InMemoryIdentityResolver::new());
    let store = Arc::new(InMemoryCustomer360Store::new());
    let bus = Arc::new(InMemoryEventBus::new());

    for config in configs {
        let name = config.name.clone();
        match registry.register(config) {
            Ok(id) => log::info!("registered '{name}' as {id}"),
            Err(e) => eprintln!("skipping source '{name}': {e}"),
        }
    }

    let service = DataAggregationService::new(
        registry.clone(),
        resolver.clone(),
        store.clone(),
        bus.clone(),
    );

    if !json_output {
        println!("Customer 360 — sync-runner");
        println!();
        println!("Connection tests:");
        for (id, result) in registry.test_all_connections() {
            let status = if result.connected { "ok" } else { "FAILED" };
            let name = registry.get(id).map(|c| c.name).unwrap_or_default();
            println!("  {name:<28} {status}  {}", result.message);
        }
        println!();
    }

    let results = service.sync_all();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("Sync results:");
    for r in &results {
        if r.successful {
            println!(
                "  {:<28} {} customers, {} accounts, {} transactions ({} ms)",
                r.source_name,
                r.customers_processed,
                r.accounts_processed,
                r.transactions_processed,
                r.duration_ms
            );
        } else {
            println!(
                "  {:<28} FAILED: {}",
                r.source_name,
                r.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let stats = service.statistics();
    println!();
    println!("Aggregation state:");
    println!("  sources:   {} ({} enabled)", stats.total_sources, stats.enabled_sources);
    println!("  customers: {}", stats.total_customers);

    // Sample decision against the first deduplicated customer, to show
    // the full pipeline end to end.
    if let Some(resolved) = resolver.find_by_national_id("12345678") {
        let engine = DecisionEngine::new(store.clone());
        let response = engine.decide(&DecisionRequest {
            gcid: resolved.gcid,
            event_type: "PAYMENT".into(),
            amount: Some(5_000.0),
            channel: Some("Mobile".into()),
        });
        println!();
        println!("Sample decision ({}):", resolved.value);
        println!("  decision: {:?}", response.decision);
        println!("  risk:     {:.2}", response.risk_score);
        println!("  reason:   {}", response.reason);
        if let Some(customer) = store.get(resolved.gcid) {
            println!(
                "  customer: {} {} ({} accounts, {:.2} total)",
                customer.first_name,
                customer.last_name,
                customer.account_count,
                customer.total_balance
            );
        }
    }

    Ok(())
}
