//! Cached mapping of remote opal datasources onto schema and table names.
//!
//! Remote names are normalized into legal identifiers and may collide after
//! normalization; collisions are resolved deterministically in discovery
//! order. The whole mapping is rebuilt wholesale and published as an
//! immutable snapshot so readers never observe a half-built catalog.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use opal_connector::models::OpalDatasource;
use parking_lot::RwLock;
use tracing::debug;

use crate::errors::{DatasourceOpalError, Result};
use crate::OpalFetch;

/// A normalized `(schema, table)` pair as presented to the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaTableName {
    pub schema: String,
    pub table: String,
}

impl SchemaTableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        SchemaTableName {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for SchemaTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Normalize a remote identifier into a legal schema/table identifier.
///
/// Lowercases and replaces anything outside `[a-z0-9_]` with an underscore.
/// Idempotent; collision resolution is handled during the catalog rebuild.
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The fully-built name mapping, immutable once published.
#[derive(Debug, Default)]
struct CatalogSnapshot {
    /// Datasources exactly as fetched, in discovery order.
    datasources: Vec<OpalDatasource>,
    /// Schema name to the remote datasource name it was derived from.
    schemas: HashMap<String, String>,
    /// Schema table name to the remote (unnormalized) table name.
    tables: HashMap<SchemaTableName, String>,
}

fn build_snapshot(datasources: Vec<OpalDatasource>) -> CatalogSnapshot {
    let mut schemas = HashMap::new();
    let mut tables = HashMap::new();

    for datasource in &datasources {
        let candidate = normalize_name(&datasource.name);
        let mut schema_name = candidate.clone();
        let mut i = 1;
        while schemas.contains_key(&schema_name) {
            schema_name = format!("{candidate}_{i}");
            i += 1;
        }
        schemas.insert(schema_name.clone(), datasource.name.clone());

        for table_name in &datasource.table_names {
            let candidate = normalize_name(table_name);
            let mut key = SchemaTableName::new(&schema_name, &candidate);
            let mut i = 1;
            // Table names only need to be unique within their schema.
            while tables.contains_key(&key) {
                key = SchemaTableName::new(&schema_name, format!("{candidate}_{i}"));
                i += 1;
            }
            tables.insert(key, table_name.clone());
        }
    }

    CatalogSnapshot {
        datasources,
        schemas,
        tables,
    }
}

/// Lazily-initialized catalog of opal datasources.
pub struct OpalCatalog {
    fetch: Arc<dyn OpalFetch>,
    /// Minimum delay between discovery re-checks when the remote catalog
    /// came back empty. `None` re-checks on every call.
    cache_delay: Option<Duration>,
    /// Serializes rebuilds so at most one discovery fetch is in flight.
    /// Holds the instant of the last successful fetch.
    rebuild: tokio::sync::Mutex<Option<Instant>>,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl OpalCatalog {
    pub fn new(fetch: Arc<dyn OpalFetch>) -> OpalCatalog {
        OpalCatalog {
            fetch,
            cache_delay: None,
            rebuild: tokio::sync::Mutex::new(None),
            snapshot: RwLock::new(None),
        }
    }

    pub fn with_cache_delay(fetch: Arc<dyn OpalFetch>, cache_delay: Duration) -> OpalCatalog {
        OpalCatalog {
            fetch,
            cache_delay: Some(cache_delay),
            rebuild: tokio::sync::Mutex::new(None),
            snapshot: RwLock::new(None),
        }
    }

    fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.snapshot.read().clone()
    }

    /// Drop the cached catalog; the next call re-runs discovery.
    pub fn invalidate(&self) {
        *self.snapshot.write() = None;
    }

    /// Return the current catalog, running remote discovery if needed.
    ///
    /// A cache hit requires a non-empty datasource list: a legitimately
    /// empty remote catalog is indistinguishable from "not fetched yet" and
    /// triggers a new discovery on the next call, damped only by the
    /// configured cache delay. Concurrent callers during a rebuild block
    /// until it completes and then observe the freshly-built catalog.
    async fn ensure_initialized(&self) -> Result<Arc<CatalogSnapshot>> {
        if let Some(snapshot) = self.current() {
            if !snapshot.datasources.is_empty() {
                return Ok(snapshot);
            }
        }

        let mut last_fetch = self.rebuild.lock().await;

        // Re-check: another caller may have finished the rebuild while we
        // waited on the lock.
        if let Some(snapshot) = self.current() {
            if !snapshot.datasources.is_empty() {
                return Ok(snapshot);
            }
            if let (Some(delay), Some(at)) = (self.cache_delay, *last_fetch) {
                if at.elapsed() < delay {
                    return Ok(snapshot);
                }
            }
        }

        let datasources = self.fetch.fetch_datasources().await?;
        debug!(count = datasources.len(), "fetched opal datasources");

        let snapshot = Arc::new(build_snapshot(datasources));
        *self.snapshot.write() = Some(snapshot.clone());
        *last_fetch = Some(Instant::now());

        Ok(snapshot)
    }

    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        let snapshot = self.ensure_initialized().await?;
        Ok(snapshot.schemas.keys().cloned().collect())
    }

    pub async fn list_tables(&self, schema: &str) -> Result<Vec<SchemaTableName>> {
        let snapshot = self.ensure_initialized().await?;
        Ok(snapshot
            .tables
            .keys()
            .filter(|name| name.schema == schema)
            .cloned()
            .collect())
    }

    /// Remote datasource and table name for a schema table previously
    /// returned by `list_tables`.
    pub fn resolve(&self, name: &SchemaTableName) -> Result<(String, String)> {
        let snapshot = self
            .current()
            .ok_or_else(|| DatasourceOpalError::UnknownTable(name.to_string()))?;
        let datasource = snapshot
            .schemas
            .get(&name.schema)
            .ok_or_else(|| DatasourceOpalError::UnknownTable(name.to_string()))?;
        let table = snapshot
            .tables
            .get(name)
            .ok_or_else(|| DatasourceOpalError::UnknownTable(name.to_string()))?;
        Ok((datasource.clone(), table.clone()))
    }

    pub fn resolve_datasource_name(&self, name: &SchemaTableName) -> Result<String> {
        self.resolve(name).map(|(datasource, _)| datasource)
    }

    pub fn resolve_remote_table_name(&self, name: &SchemaTableName) -> Result<String> {
        self.resolve(name).map(|(_, table)| table)
    }

    /// Composed "datasource.table" reference for a schema table.
    pub fn resolve_table_ref(&self, name: &SchemaTableName) -> Result<String> {
        self.resolve(name)
            .map(|(datasource, table)| format!("{datasource}.{table}"))
    }

    /// Ensure the catalog is built and return nothing; used by accessors
    /// before resolving names.
    pub(crate) async fn initialize(&self) -> Result<()> {
        self.ensure_initialized().await.map(|_| ())
    }
}

impl fmt::Debug for OpalCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpalCatalog")
            .field("cache_delay", &self.cache_delay)
            .finish_non_exhaustive()
    }
}
