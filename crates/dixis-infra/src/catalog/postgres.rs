//! PostgreSQL catalog: read-only warm-up queries over the marketplace tables.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, Database, DbBackend, DbConn, DbErr, FromQueryResult, JsonValue, Statement,
};
use serde_json::Value;

use dixis_core::error::SourceError;
use dixis_core::ports::{CatalogRecord, CatalogSource};

const FEATURED_PRODUCTS_SQL: &str = r#"
    SELECT p.id, p.name, p.slug, p.price::float8 AS price, p.producer_id, p.category_id,
           pr.business_name AS producer_name, c.name AS category_name
    FROM products p
    LEFT JOIN producers pr ON pr.id = p.producer_id
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE p.is_featured = TRUE AND p.is_active = TRUE
    ORDER BY p.id
    LIMIT $1
"#;

const CATEGORIES_SQL: &str = r#"
    SELECT id, name, slug, parent_id
    FROM categories
    ORDER BY name
"#;

const VERIFIED_PRODUCERS_SQL: &str = r#"
    SELECT pr.id, pr.business_name, pr.slug, pr.location, pr.user_id
    FROM producers pr
    WHERE pr.verified = TRUE
    ORDER BY pr.id
    LIMIT $1
"#;

/// Connection settings for the catalog database.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl CatalogConfig {
    /// Load from `DATABASE_URL`; `None` when unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(Self {
            url,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            connect_timeout: Duration::from_secs(
                std::env::var("DB_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }
}

/// Catalog backed by the marketplace's PostgreSQL database.
pub struct PostgresCatalog {
    db: DbConn,
}

impl PostgresCatalog {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn connect(config: &CatalogConfig) -> Result<Self, SourceError> {
        let opts = ConnectOptions::new(&config.url)
            .max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(config.connect_timeout)
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false)
            .to_owned();

        let db = Database::connect(opts)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        tracing::info!(pool = config.max_connections, "Catalog database connected");

        Ok(Self::new(db))
    }

    async fn rows(&self, sql: &str, limit: Option<usize>) -> Result<Vec<Value>, SourceError> {
        let values: Vec<sea_orm::Value> = limit.map(|l| (l as i64).into()).into_iter().collect();
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        JsonValue::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(query_err)
    }
}

fn query_err(e: DbErr) -> SourceError {
    match e {
        DbErr::Conn(inner) => SourceError::Connection(inner.to_string()),
        other => SourceError::Query(other.to_string()),
    }
}

/// Nest flat category rows into root categories with a `children` array.
///
/// Rows arrive ordered by name, so roots and children keep that order.
fn build_category_tree(rows: Vec<Value>) -> Vec<Value> {
    let mut children: HashMap<u64, Vec<Value>> = HashMap::new();
    let mut roots = Vec::new();

    for row in rows {
        match row.get("parent_id").and_then(Value::as_u64) {
            Some(parent) => children.entry(parent).or_default().push(row),
            None => roots.push(row),
        }
    }

    for root in &mut roots {
        let kids = root
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|id| children.remove(&id))
            .unwrap_or_default();
        if let Value::Object(map) = root {
            map.insert("children".to_string(), Value::Array(kids));
        }
    }

    roots
}

fn into_record(row: Value) -> Result<CatalogRecord, SourceError> {
    let id = row
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| SourceError::Decode(format!("producer row without numeric id: {row}")))?;
    Ok(CatalogRecord { id, data: row })
}

#[async_trait]
impl CatalogSource for PostgresCatalog {
    async fn featured_products(&self, limit: usize) -> Result<Vec<Value>, SourceError> {
        self.rows(FEATURED_PRODUCTS_SQL, Some(limit)).await
    }

    async fn category_tree(&self) -> Result<Vec<Value>, SourceError> {
        let rows = self.rows(CATEGORIES_SQL, None).await?;
        Ok(build_category_tree(rows))
    }

    async fn verified_producers(&self, limit: usize) -> Result<Vec<CatalogRecord>, SourceError> {
        self.rows(VERIFIED_PRODUCERS_SQL, Some(limit))
            .await?
            .into_iter()
            .map(into_record)
            .collect()
    }
}
