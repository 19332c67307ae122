//! Registry tests: registration, factory dispatch, enable/disable, and
//! connection probing.

use c360_core::config::{DataSourceConfig, SourceType};
use c360_core::error::C360Error;
use c360_core::registry::{ConnectorFactory, DataSourceRegistry};

/// Registration assigns an id when the config has none and builds a
/// connector for the configured type.
#[test]
fn register_assigns_id_and_builds_connector() {
    let registry = DataSourceRegistry::with_defaults();

    let id = registry
        .register(DataSourceConfig::new(
            "Core Banking System",
            SourceType::CoreBanking,
            "postgres://corebank.internal:5432/customers",
        ))
        .unwrap();

    let config = registry.get(id).unwrap();
    assert_eq!(config.id, Some(id));
    assert_eq!(config.name, "Core Banking System");
    assert!(config.enabled, "sources default to enabled");

    let connector = registry.connector(id).unwrap();
    assert_eq!(connector.name(), "Core Banking System");
    assert_eq!(connector.source_type(), SourceType::CoreBanking);
}

/// A source type the factory does not know is rejected and leaves the
/// registry unchanged.
#[test]
fn unsupported_source_type_is_rejected() {
    let registry = DataSourceRegistry::with_defaults();

    let err = registry
        .register(DataSourceConfig::new(
            "Partner Feed",
            SourceType::External,
            "https://partner.example.com",
        ))
        .unwrap_err();

    assert!(matches!(
        err,
        C360Error::UnsupportedSourceType {
            source_type: SourceType::External
        }
    ));
    assert!(registry.all().is_empty(), "failed registration must not persist");
}

/// An empty factory supports nothing.
#[test]
fn empty_factory_rejects_everything() {
    let registry = DataSourceRegistry::new(ConnectorFactory::empty());

    let err = registry
        .register(DataSourceConfig::new(
            "Core Banking System",
            SourceType::CoreBanking,
            "postgres://host/db",
        ))
        .unwrap_err();
    assert!(matches!(err, C360Error::UnsupportedSourceType { .. }));
}

/// Enable and disable toggle the stored flag; unknown ids report false.
#[test]
fn enable_disable_roundtrip() {
    let registry = DataSourceRegistry::with_defaults();
    let id = registry
        .register(DataSourceConfig::new(
            "Mobile Banking",
            SourceType::MobileBanking,
            "https://api.mobile.internal/v2",
        ))
        .unwrap();

    assert!(registry.disable(id));
    assert!(!registry.get(id).unwrap().enabled);
    assert!(registry.enable(id));
    assert!(registry.get(id).unwrap().enabled);

    assert!(!registry.disable(uuid::Uuid::new_v4()), "unknown id");
}

/// Probing reports per-source outcomes; a missing connection string is
/// a failed probe, not an error.
#[test]
fn test_all_connections_reports_each_source() {
    let registry = DataSourceRegistry::with_defaults();
    let good = registry
        .register(DataSourceConfig::new(
            "Core Banking System",
            SourceType::CoreBanking,
            "postgres://corebank.internal:5432/customers",
        ))
        .unwrap();
    let bad = registry
        .register(DataSourceConfig::new("Mobile Banking", SourceType::MobileBanking, ""))
        .unwrap();

    let results = registry.test_all_connections();
    assert_eq!(results.len(), 2);
    assert!(results[&good].connected);
    assert!(!results[&bad].connected);
    assert!(
        results[&bad].message.contains("No connection string"),
        "got: {}",
        results[&bad].message
    );
}
