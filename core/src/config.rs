//! Data source configuration.
//!
//! One `DataSourceConfig` describes one external system the aggregation
//! pipeline pulls from. Configurations are created via registration,
//! toggled with enable/disable, and never deleted in-session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::SourceId;

/// The kinds of source systems the pipeline knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    CoreBanking,
    MobileBanking,
    WebBanking,
    Ussd,
    FraudSystem,
    RiskSystem,
    OpenBanking,
    AiCopilot,
    Analytics,
    External,
}

impl SourceType {
    /// Stable string name, used for statistics keys and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoreBanking => "core_banking",
            Self::MobileBanking => "mobile_banking",
            Self::WebBanking => "web_banking",
            Self::Ussd => "ussd",
            Self::FraudSystem => "fraud_system",
            Self::RiskSystem => "risk_system",
            Self::OpenBanking => "open_banking",
            Self::AiCopilot => "ai_copilot",
            Self::Analytics => "analytics",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Assigned by the registry at registration time if absent.
    #[serde(default)]
    pub id: Option<SourceId>,
    pub name: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub connection_string: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct SourcesFile {
    sources: Vec<DataSourceConfig>,
}

impl DataSourceConfig {
    pub fn new(
        name: impl Into<String>,
        source_type: SourceType,
        connection_string: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            source_type,
            connection_string: connection_string.into(),
            metadata: HashMap::new(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Load all source configurations from a sources.json file.
    /// In tests, use `DataSourceConfig::default_test()`.
    pub fn load_all(path: &str) -> anyhow::Result<Vec<DataSourceConfig>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: SourcesFile = serde_json::from_str(&content)?;
        Ok(file.sources)
    }

    /// A small set of hardcoded source configurations for tests and demos.
    pub fn default_test() -> Vec<DataSourceConfig> {
        vec![
            DataSourceConfig::new(
                "Core Banking System",
                SourceType::CoreBanking,
                "postgres://corebank.internal:5432/customers",
            ),
            DataSourceConfig::new(
                "Mobile Banking",
                SourceType::MobileBanking,
                "https://api.mobile.internal/v2",
            ),
            DataSourceConfig::new(
                "Fraud Detection System",
                SourceType::FraudSystem,
                "https://fraud.internal/feed",
            ),
        ]
    }
}
