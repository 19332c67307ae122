//! Data source registry — the single authority mapping a configured
//! source type to a live connector instance.
//!
//! Adding a new source type means one factory entry and one `Connector`
//! implementation; nothing else changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::{DataSourceConfig, SourceType},
    connector::{ConnectionResult, Connector, FixtureConnector},
    error::{C360Error, C360Result},
    types::SourceId,
};

type ConnectorCtor = fn(DataSourceConfig) -> Arc<dyn Connector>;

/// Mapping from source type to connector constructor.
pub struct ConnectorFactory {
    ctors: HashMap<SourceType, ConnectorCtor>,
}

fn fixture_ctor(config: DataSourceConfig) -> Arc<dyn Connector> {
    Arc::new(FixtureConnector::new(config))
}

impl ConnectorFactory {
    /// Factory with no supported types. Tests use this to exercise the
    /// unsupported-type path.
    pub fn empty() -> Self {
        Self {
            ctors: HashMap::new(),
        }
    }

    /// Factory covering every built-in source type with the fixture
    /// connector.
    pub fn with_defaults() -> Self {
        let mut factory = Self::empty();
        for source_type in [
            SourceType::CoreBanking,
            SourceType::MobileBanking,
            SourceType::WebBanking,
            SourceType::Ussd,
            SourceType::FraudSystem,
            SourceType::RiskSystem,
            SourceType::OpenBanking,
            SourceType::AiCopilot,
            SourceType::Analytics,
        ] {
            factory.register(source_type, fixture_ctor);
        }
        factory
    }

    pub fn register(&mut self, source_type: SourceType, ctor: ConnectorCtor) {
        self.ctors.insert(source_type, ctor);
    }

    fn build(&self, config: &DataSourceConfig) -> C360Result<Arc<dyn Connector>> {
        match self.ctors.get(&config.source_type) {
            Some(ctor) => Ok(ctor(config.clone())),
            None => Err(C360Error::UnsupportedSourceType {
                source_type: config.source_type,
            }),
        }
    }
}

impl Default for ConnectorFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

struct RegistryInner {
    configs: HashMap<SourceId, DataSourceConfig>,
    connectors: HashMap<SourceId, Arc<dyn Connector>>,
}

/// Owns all data source configurations and their connector instances.
/// One mutex guards both maps; write volume is low and lock scope is
/// map access only — connector I/O always happens outside the lock.
pub struct DataSourceRegistry {
    factory: ConnectorFactory,
    inner: Mutex<RegistryInner>,
}

impl DataSourceRegistry {
    pub fn new(factory: ConnectorFactory) -> Self {
        Self {
            factory,
            inner: Mutex::new(RegistryInner {
                configs: HashMap::new(),
                connectors: HashMap::new(),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ConnectorFactory::with_defaults())
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a data source, assigning an id if the configuration has
    /// none, and construct its connector. An unsupported source type is
    /// fatal for the call and leaves the registry unchanged.
    pub fn register(&self, mut config: DataSourceConfig) -> C360Result<SourceId> {
        let id = config.id.unwrap_or_else(Uuid::new_v4);
        config.id = Some(id);
        config.updated_at = Utc::now();

        let connector = self.factory.build(&config)?;

        let mut inner = self.lock();
        log::info!(
            "registered data source '{}' ({}) as {id}",
            config.name,
            config.source_type
        );
        inner.configs.insert(id, config);
        inner.connectors.insert(id, connector);
        Ok(id)
    }

    pub fn all(&self) -> Vec<DataSourceConfig> {
        self.lock().configs.values().cloned().collect()
    }

    pub fn get(&self, id: SourceId) -> Option<DataSourceConfig> {
        self.lock().configs.get(&id).cloned()
    }

    pub fn connector(&self, id: SourceId) -> Option<Arc<dyn Connector>> {
        self.lock().connectors.get(&id).cloned()
    }

    /// Returns false if the id is unknown.
    pub fn enable(&self, id: SourceId) -> bool {
        self.set_enabled(id, true)
    }

    /// Returns false if the id is unknown.
    pub fn disable(&self, id: SourceId) -> bool {
        self.set_enabled(id, false)
    }

    fn set_enabled(&self, id: SourceId, enabled: bool) -> bool {
        match self.lock().configs.get_mut(&id) {
            Some(config) => {
                config.enabled = enabled;
                config.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Probe connectivity of every registered source. The snapshot is
    /// taken under the lock; the probes themselves are not.
    pub fn test_all_connections(&self) -> HashMap<SourceId, ConnectionResult> {
        let targets: Vec<(SourceId, Arc<dyn Connector>)> = {
            let inner = self.lock();
            inner
                .connectors
                .iter()
                .map(|(id, c)| (*id, c.clone()))
                .collect()
        };

        let mut results = HashMap::with_capacity(targets.len());
        for (id, connector) in targets {
            results.insert(id, connector.test_connection());
        }
        results
    }
}
