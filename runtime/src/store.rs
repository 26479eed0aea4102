//! Observation store — append-only price history in SQLite.
//!
//! Products are registered by display name (insert-if-absent) before any price is
//! recorded for them. Prices are kept in cents; timestamps as RFC 3339 UTC text
//! with fixed precision so lexical order is chronological order.

use crate::catalog::Catalog;
use crate::error::StoreError;
use crate::gate::{should_persist, Observation, PriceHistory};
use crate::price::Price;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        url TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS prices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL REFERENCES products(id),
        price_cents INTEGER NOT NULL CHECK (price_cents > 0),
        observed_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_prices_product_time
        ON prices (product_id, observed_at);
";

/// What a gated batch write did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PersistOutcome {
    pub persisted: Vec<Observation>,
    pub unchanged: Vec<Observation>,
}

/// Current price of one product, with basket total support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestPrice {
    pub product_name: String,
    pub url: String,
    pub price: Price,
    pub observed_at: DateTime<Utc>,
}

/// SQLite-backed observation store with a single connection.
pub struct ObservationStore {
    db: Connection,
}

impl ObservationStore {
    /// Open or create a store, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// A throwaway store, mostly for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self, StoreError> {
        db.execute_batch("PRAGMA foreign_keys = ON;")?;
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// Register every catalog product by display name, leaving existing rows alone.
    pub fn register_catalog(&self, catalog: &Catalog) -> Result<usize, StoreError> {
        let mut added = 0;
        for product in catalog {
            added += self.db.execute(
                "INSERT OR IGNORE INTO products (name, url) VALUES (?1, ?2)",
                params![product.display_name, product.url],
            )?;
        }
        debug!(added, "catalog registered");
        Ok(added)
    }

    /// Append one observation. The product must be registered.
    pub fn insert_observation(
        &self,
        product_name: &str,
        price: Price,
        observed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        insert(&self.db, product_name, price, observed_at)
    }

    /// Full history, newest first, optionally for one product and capped at `limit` rows.
    pub fn list_history(
        &self,
        product_name: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.db.prepare(
            "SELECT products.name, prices.price_cents, prices.observed_at
             FROM prices
             JOIN products ON prices.product_id = products.id
             WHERE ?1 IS NULL OR products.name = ?1
             ORDER BY prices.observed_at DESC, prices.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![product_name, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut history = Vec::new();
        for row in rows {
            let (name, cents, observed_at) = row?;
            history.push(Observation {
                product_name: name,
                price: price_from_row(cents)?,
                observed_at: time_from_row(&observed_at)?,
            });
        }
        Ok(history)
    }

    /// Latest price of every product that has one, in registration order.
    pub fn latest_prices(&self) -> Result<Vec<LatestPrice>, StoreError> {
        let mut stmt = self.db.prepare(
            "SELECT products.name, products.url, p.price_cents, p.observed_at
             FROM products
             JOIN prices p ON p.id = (
                 SELECT id FROM prices
                 WHERE product_id = products.id
                 ORDER BY observed_at DESC, id DESC
                 LIMIT 1
             )
             ORDER BY products.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut latest = Vec::new();
        for row in rows {
            let (product_name, url, cents, observed_at) = row?;
            latest.push(LatestPrice {
                product_name,
                url,
                price: price_from_row(cents)?,
                observed_at: time_from_row(&observed_at)?,
            });
        }
        Ok(latest)
    }

    /// Gate and write a batch in one transaction.
    ///
    /// Each observation is a lookup-then-insert pair judged independently.
    pub fn persist_changed(
        &mut self,
        batch: Vec<Observation>,
    ) -> Result<PersistOutcome, StoreError> {
        let tx = self.db.transaction()?;
        let mut outcome = PersistOutcome::default();
        for observation in batch {
            if should_persist(&ConnHistory(&tx), &observation.product_name, observation.price)? {
                insert(&tx, &observation.product_name, observation.price, observation.observed_at)?;
                outcome.persisted.push(observation);
            } else {
                outcome.unchanged.push(observation);
            }
        }
        tx.commit()?;
        Ok(outcome)
    }
}

impl PriceHistory for ObservationStore {
    fn latest_price(&self, product_name: &str) -> Result<Option<Price>, StoreError> {
        ConnHistory(&self.db).latest_price(product_name)
    }
}

/// History lookups on a borrowed connection or transaction.
struct ConnHistory<'a>(&'a Connection);

impl PriceHistory for ConnHistory<'_> {
    fn latest_price(&self, product_name: &str) -> Result<Option<Price>, StoreError> {
        let cents: Option<i64> = self
            .0
            .query_row(
                "SELECT prices.price_cents
                 FROM prices
                 JOIN products ON prices.product_id = products.id
                 WHERE products.name = ?1
                 ORDER BY prices.observed_at DESC, prices.id DESC
                 LIMIT 1",
                params![product_name],
                |row| row.get(0),
            )
            .optional()?;
        cents.map(price_from_row).transpose()
    }
}

fn insert(
    db: &Connection,
    product_name: &str,
    price: Price,
    observed_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let product_id: i64 = db
        .query_row(
            "SELECT id FROM products WHERE name = ?1",
            params![product_name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::UnknownProduct(product_name.to_string()))?;

    let cents = i64::try_from(price.cents())
        .map_err(|_| StoreError::CorruptRow(format!("price {price} does not fit")))?;

    db.execute(
        "INSERT INTO prices (product_id, price_cents, observed_at) VALUES (?1, ?2, ?3)",
        params![product_id, cents, format_time(observed_at)],
    )?;
    Ok(())
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn time_from_row(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("bad timestamp {text:?}: {e}")))
}

fn price_from_row(cents: i64) -> Result<Price, StoreError> {
    u64::try_from(cents)
        .map(Price::from_cents)
        .map_err(|_| StoreError::CorruptRow(format!("negative price {cents}")))
}
