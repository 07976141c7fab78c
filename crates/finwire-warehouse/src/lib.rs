//! # Finwire Warehouse
//!
//! Embedded `DuckDB` storage for the records finwire keeps about its providers:
//!
//! - **data enrichments**: which source (a rule, a vendor, or the AI) set an
//!   attribute on an enrichable entity
//! - **provider merchants**: merchants discovered by a vendor, unique per
//!   `(name, source)`
//! - **settings**: key/value configuration consulted after the environment
//!
//! Records carry plain strings; typed source tags live in `finwire-core`.
//!
//! ```rust,no_run
//! use finwire_warehouse::{NewProviderMerchant, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     let merchant = warehouse.find_or_create_provider_merchant(&NewProviderMerchant {
//!         name: String::from("Blue Bottle Coffee"),
//!         source: String::from("ai"),
//!         website_url: Some(String::from("bluebottlecoffee.com")),
//!         logo_url: None,
//!     })?;
//!     println!("{}", merchant.id);
//!     Ok(())
//! }
//! ```

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection, Row};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use duckdb::{AccessMode, ConnectionPool, PooledConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("{table} already contains a row for {key}")]
    Duplicate { table: &'static str, key: String },
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub finwire_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::at(resolve_finwire_home())
    }
}

impl WarehouseConfig {
    /// Config rooted at `finwire_home`, with the database under `data/`.
    pub fn at(finwire_home: impl Into<PathBuf>) -> Self {
        let finwire_home = finwire_home.into();
        let db_path = finwire_home.join("data").join("warehouse.duckdb");
        Self {
            finwire_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// Input for [`Warehouse::record_enrichment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrichment {
    pub enrichable_type: String,
    pub enrichable_id: String,
    pub source: String,
    pub attribute_name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentRecord {
    pub id: String,
    pub enrichable_type: String,
    pub enrichable_id: String,
    pub source: String,
    pub attribute_name: String,
    pub value: Option<String>,
    pub created_at: String,
}

/// Input for provider merchant inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProviderMerchant {
    pub name: String,
    pub source: String,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMerchantRecord {
    pub id: String,
    pub name: String,
    pub source: String,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct Warehouse {
    pool: ConnectionPool,
}

const ENRICHMENT_COLUMNS: &str = "id, enrichable_type, enrichable_id, source, attribute_name, \
     value, CAST(created_at AS VARCHAR)";
const MERCHANT_COLUMNS: &str =
    "id, name, source, website_url, logo_url, CAST(created_at AS VARCHAR)";

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Records which source set `attribute_name` on an enrichable entity.
    ///
    /// Re-recording the same `(entity, source, attribute)` replaces the value.
    pub fn record_enrichment(
        &self,
        enrichment: &NewEnrichment,
    ) -> Result<EnrichmentRecord, WarehouseError> {
        require_non_empty("enrichable_type", &enrichment.enrichable_type)?;
        require_non_empty("enrichable_id", &enrichment.enrichable_id)?;
        require_non_empty("source", &enrichment.source)?;
        require_non_empty("attribute_name", &enrichment.attribute_name)?;

        let connection = self.pool.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<String, WarehouseError> {
            let existing = query_first(
                &connection,
                "SELECT id FROM data_enrichments \
                 WHERE enrichable_type = ? AND enrichable_id = ? AND source = ? AND attribute_name = ?",
                params![
                    enrichment.enrichable_type,
                    enrichment.enrichable_id,
                    enrichment.source,
                    enrichment.attribute_name
                ],
                |row| row.get::<_, String>(0),
            )?;

            match existing {
                Some(id) => {
                    connection.execute(
                        "UPDATE data_enrichments SET value = ?, created_at = CURRENT_TIMESTAMP WHERE id = ?",
                        params![enrichment.value, id],
                    )?;
                    Ok(id)
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    connection.execute(
                        "INSERT INTO data_enrichments \
                         (id, enrichable_type, enrichable_id, source, attribute_name, value) \
                         VALUES (?, ?, ?, ?, ?, ?)",
                        params![
                            id,
                            enrichment.enrichable_type,
                            enrichment.enrichable_id,
                            enrichment.source,
                            enrichment.attribute_name,
                            enrichment.value
                        ],
                    )?;
                    Ok(id)
                }
            }
        })();
        let id = finalize_transaction(&connection, result)?;

        let sql = format!("SELECT {ENRICHMENT_COLUMNS} FROM data_enrichments WHERE id = ?");
        query_first(&connection, &sql, params![id], read_enrichment)?.ok_or_else(|| {
            WarehouseError::InvalidRecord(String::from("enrichment vanished after write"))
        })
    }

    pub fn enrichments_for(
        &self,
        enrichable_type: &str,
        enrichable_id: &str,
    ) -> Result<Vec<EnrichmentRecord>, WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly)?;
        let sql = format!(
            "SELECT {ENRICHMENT_COLUMNS} FROM data_enrichments \
             WHERE enrichable_type = ? AND enrichable_id = ? \
             ORDER BY attribute_name, source"
        );
        let mut statement = connection.prepare(&sql)?;
        let rows = statement
            .query_map(params![enrichable_type, enrichable_id], read_enrichment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Inserts a provider merchant, failing with [`WarehouseError::Duplicate`]
    /// when `(name, source)` already exists.
    pub fn insert_provider_merchant(
        &self,
        merchant: &NewProviderMerchant,
    ) -> Result<ProviderMerchantRecord, WarehouseError> {
        require_non_empty("name", &merchant.name)?;
        require_non_empty("source", &merchant.source)?;

        let connection = self.pool.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<String, WarehouseError> {
            if find_merchant(&connection, &merchant.name, &merchant.source)?.is_some() {
                return Err(WarehouseError::Duplicate {
                    table: "provider_merchants",
                    key: format!("({}, {})", merchant.name, merchant.source),
                });
            }

            let id = Uuid::new_v4().to_string();
            connection.execute(
                "INSERT INTO provider_merchants (id, name, source, website_url, logo_url) \
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    id,
                    merchant.name,
                    merchant.source,
                    merchant.website_url,
                    merchant.logo_url
                ],
            )?;
            Ok(id)
        })();
        finalize_transaction(&connection, result)?;

        find_merchant(&connection, &merchant.name, &merchant.source)?.ok_or_else(|| {
            WarehouseError::InvalidRecord(String::from("provider merchant vanished after write"))
        })
    }

    pub fn find_or_create_provider_merchant(
        &self,
        merchant: &NewProviderMerchant,
    ) -> Result<ProviderMerchantRecord, WarehouseError> {
        if let Some(existing) = self.find_provider_merchant(&merchant.name, &merchant.source)? {
            return Ok(existing);
        }

        match self.insert_provider_merchant(merchant) {
            Err(WarehouseError::Duplicate { .. }) => self
                .find_provider_merchant(&merchant.name, &merchant.source)?
                .ok_or_else(|| {
                    WarehouseError::InvalidRecord(String::from(
                        "provider merchant reported duplicate but was not found",
                    ))
                }),
            other => other,
        }
    }

    pub fn find_provider_merchant(
        &self,
        name: &str,
        source: &str,
    ) -> Result<Option<ProviderMerchantRecord>, WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly)?;
        find_merchant(&connection, name, source)
    }

    pub fn provider_merchants(
        &self,
        source: Option<&str>,
    ) -> Result<Vec<ProviderMerchantRecord>, WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly)?;
        let rows = match source {
            Some(source) => {
                let sql = format!(
                    "SELECT {MERCHANT_COLUMNS} FROM provider_merchants WHERE source = ? ORDER BY name"
                );
                let mut statement = connection.prepare(&sql)?;
                let rows = statement
                    .query_map(params![source], read_merchant)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {MERCHANT_COLUMNS} FROM provider_merchants ORDER BY name, source"
                );
                let mut statement = connection.prepare(&sql)?;
                let rows = statement
                    .query_map([], read_merchant)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), WarehouseError> {
        require_non_empty("key", key)?;

        let connection = self.pool.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let updated = connection.execute(
                "UPDATE settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?",
                params![value, key],
            )?;
            if updated == 0 {
                connection.execute(
                    "INSERT INTO settings (key, value) VALUES (?, ?)",
                    params![key, value],
                )?;
            }
            Ok(())
        })();
        finalize_transaction(&connection, result)
    }

    pub fn setting(&self, key: &str) -> Result<Option<String>, WarehouseError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly)?;
        query_first(
            &connection,
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        )
    }
}

fn find_merchant(
    connection: &Connection,
    name: &str,
    source: &str,
) -> Result<Option<ProviderMerchantRecord>, WarehouseError> {
    let sql = format!("SELECT {MERCHANT_COLUMNS} FROM provider_merchants WHERE name = ? AND source = ?");
    query_first(connection, &sql, params![name, source], read_merchant)
}

fn query_first<T, F>(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ::duckdb::ToSql],
    map: F,
) -> Result<Option<T>, WarehouseError>
where
    F: FnMut(&Row<'_>) -> Result<T, ::duckdb::Error>,
{
    let mut statement = connection.prepare(sql)?;
    let mut rows = statement.query_map(params, map)?;
    rows.next().transpose().map_err(WarehouseError::from)
}

fn read_enrichment(row: &Row<'_>) -> Result<EnrichmentRecord, ::duckdb::Error> {
    Ok(EnrichmentRecord {
        id: row.get(0)?,
        enrichable_type: row.get(1)?,
        enrichable_id: row.get(2)?,
        source: row.get(3)?,
        attribute_name: row.get(4)?,
        value: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn read_merchant(row: &Row<'_>) -> Result<ProviderMerchantRecord, ::duckdb::Error> {
    Ok(ProviderMerchantRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        source: row.get(2)?,
        website_url: row.get(3)?,
        logo_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), WarehouseError> {
    if value.trim().is_empty() {
        return Err(WarehouseError::InvalidRecord(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn resolve_finwire_home() -> PathBuf {
    if let Some(path) = env::var_os("FINWIRE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".finwire");
    }

    PathBuf::from(".finwire")
}
