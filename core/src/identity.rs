//! Identity resolution — deduplicating customers across sources.
//!
//! RULE: within the index, each non-empty identifying value (national
//! id, phone, email) resolves to at most one GCID. First writer wins; a
//! later mapping presenting an already-indexed value attaches to the
//! existing GCID and never creates a second one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{C360Error, C360Result},
    types::Gcid,
};

/// System name recorded on the mapping written when a GCID is first
/// created by resolution (as opposed to a source-specific mapping).
const RESOLUTION_SYSTEM: &str = "c360";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalCustomerId {
    pub gcid: Gcid,
    /// Human-facing display value, `GCID<hex>`.
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered: mappings are only ever appended.
    pub mappings: Vec<IdentityMapping>,
}

/// Binding of one source system's local customer id (and the
/// identifying attributes it presented) to a GCID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub id: Uuid,
    pub gcid: Gcid,
    pub source_system: String,
    pub local_customer_id: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Port for identity resolution. The in-memory implementation below is
/// the reference; a real deployment swaps in a database behind the same
/// trait with a unique constraint per identifying value.
pub trait IdentityResolver: Send + Sync {
    /// Resolve an existing GCID by identifier priority (national id,
    /// then phone, then email), or create one and index whichever
    /// identifiers were supplied. At least one identifier must be
    /// non-empty.
    fn resolve_or_create(
        &self,
        national_id: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> C360Result<GlobalCustomerId>;

    fn find_by_national_id(&self, national_id: &str) -> Option<GlobalCustomerId>;
    fn find_by_phone(&self, phone: &str) -> Option<GlobalCustomerId>;
    fn find_by_email(&self, email: &str) -> Option<GlobalCustomerId>;

    /// Which GCID a source system's local customer id was mapped to.
    fn find_by_source_local(&self, source_system: &str, local_customer_id: &str) -> Option<Gcid>;

    /// Unknown ids are `None`, not an error.
    fn get(&self, gcid: Gcid) -> Option<GlobalCustomerId>;

    fn create_gcid(&self) -> GlobalCustomerId;

    /// Append a mapping to an existing GCID and index its identifiers
    /// with insert-if-absent semantics. Unknown GCIDs are rejected.
    fn add_mapping(
        &self,
        gcid: Gcid,
        source_system: &str,
        local_customer_id: &str,
        national_id: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> C360Result<()>;
}

#[derive(Default)]
struct IdentityIndex {
    customers: HashMap<Gcid, GlobalCustomerId>,
    by_national_id: HashMap<String, Gcid>,
    by_phone: HashMap<String, Gcid>,
    by_email: HashMap<String, Gcid>,
    by_source_local: HashMap<(String, String), Gcid>,
}

impl IdentityIndex {
    fn create(&mut self) -> GlobalCustomerId {
        let gcid = Gcid::new();
        let now = Utc::now();
        let record = GlobalCustomerId {
            gcid,
            value: format!("GCID{}", gcid.0.simple()),
            created_at: now,
            updated_at: now,
            mappings: Vec::new(),
        };
        self.customers.insert(gcid, record.clone());
        record
    }

    fn add_mapping(
        &mut self,
        gcid: Gcid,
        source_system: &str,
        local_customer_id: &str,
        national_id: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> C360Result<()> {
        let record = self
            .customers
            .get_mut(&gcid)
            .ok_or(C360Error::UnknownCustomer { gcid })?;

        // Re-presenting the same (source, local id) pair is a no-op, so
        // repeated syncs stay idempotent.
        let already_mapped = record
            .mappings
            .iter()
            .any(|m| m.source_system == source_system && m.local_customer_id == local_customer_id);
        if !already_mapped {
            record.mappings.push(IdentityMapping {
                id: Uuid::new_v4(),
                gcid,
                source_system: source_system.to_string(),
                local_customer_id: local_customer_id.to_string(),
                national_id: national_id.map(str::to_string),
                phone: phone.map(str::to_string),
                email: email.map(str::to_string),
                created_at: Utc::now(),
            });
            record.updated_at = Utc::now();
        }

        // Index writes are insert-if-absent: the first system to claim
        // an identifier wins, later claimants attach to the winner.
        if let Some(v) = non_empty(national_id) {
            self.by_national_id.entry(v.to_string()).or_insert(gcid);
        }
        if let Some(v) = non_empty(phone) {
            self.by_phone.entry(v.to_string()).or_insert(gcid);
        }
        if let Some(v) = non_empty(email) {
            self.by_email.entry(v.to_string()).or_insert(gcid);
        }
        self.by_source_local
            .entry((source_system.to_string(), local_customer_id.to_string()))
            .or_insert(gcid);

        Ok(())
    }

    fn find(
        &self,
        national_id: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Option<&GlobalCustomerId> {
        // Fixed priority order: national id is the most authoritative
        // identifier, then phone, then email. Preserved for
        // deterministic merge behavior.
        let gcid = non_empty(national_id)
            .and_then(|v| self.by_national_id.get(v))
            .or_else(|| non_empty(phone).and_then(|v| self.by_phone.get(v)))
            .or_else(|| non_empty(email).and_then(|v| self.by_email.get(v)))?;
        self.customers.get(gcid)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// In-memory identity index. All operations take one lock, so a
/// resolve-then-create is atomic and concurrent writers serialize.
#[derive(Default)]
pub struct InMemoryIdentityResolver {
    index: Mutex<IdentityIndex>,
}

impl InMemoryIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IdentityIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityResolver for InMemoryIdentityResolver {
    fn resolve_or_create(
        &self,
        national_id: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> C360Result<GlobalCustomerId> {
        if non_empty(national_id).is_none()
            && non_empty(phone).is_none()
            && non_empty(email).is_none()
        {
            return Err(C360Error::InvalidIdentifier);
        }

        let mut index = self.lock();
        if let Some(existing) = index.find(national_id, phone, email) {
            return Ok(existing.clone());
        }

        let created = index.create();
        log::debug!("created {} for new customer identity", created.value);
        let local_id = created.value.clone();
        index.add_mapping(
            created.gcid,
            RESOLUTION_SYSTEM,
            &local_id,
            national_id,
            phone,
            email,
        )?;
        // Re-read so the returned record includes the mapping just added.
        Ok(index
            .customers
            .get(&created.gcid)
            .cloned()
            .unwrap_or(created))
    }

    fn find_by_national_id(&self, national_id: &str) -> Option<GlobalCustomerId> {
        self.lock().find(Some(national_id), None, None).cloned()
    }

    fn find_by_phone(&self, phone: &str) -> Option<GlobalCustomerId> {
        self.lock().find(None, Some(phone), None).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<GlobalCustomerId> {
        self.lock().find(None, None, Some(email)).cloned()
    }

    fn find_by_source_local(&self, source_system: &str, local_customer_id: &str) -> Option<Gcid> {
        self.lock()
            .by_source_local
            .get(&(source_system.to_string(), local_customer_id.to_string()))
            .copied()
    }

    fn get(&self, gcid: Gcid) -> Option<GlobalCustomerId> {
        self.lock().customers.get(&gcid).cloned()
    }

    fn create_gcid(&self) -> GlobalCustomerId {
        self.lock().create()
    }

    fn add_mapping(
        &self,
        gcid: Gcid,
        source_system: &str,
        local_customer_id: &str,
        national_id: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> C360Result<()> {
        self.lock().add_mapping(
            gcid,
            source_system,
            local_customer_id,
            national_id,
            phone,
            email,
        )
    }
}
