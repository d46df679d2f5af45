//! MySQL resource store implementation

use super::{BatchQuery, ResourceStore};
use crate::config::{MySqlStoreConfig, TableNames};
use crate::error::{StorageError, StorageResult};
use crate::policy::SlugResolver;
use crate::types::{Post, RawRow, Term};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{QueryBuilder, Row};
use tracing::debug;

/// MySQL store with connection pooling
pub struct MySqlResourceStore {
    pool: MySqlPool,
    tables: TableNames,
}

impl MySqlResourceStore {
    /// Connect a new pool
    ///
    /// # Example
    /// ```no_run
    /// use aam_resource::config::MySqlStoreConfig;
    /// use aam_resource::store::MySqlResourceStore;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = MySqlResourceStore::connect(&MySqlStoreConfig::from_env()?).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &MySqlStoreConfig) -> StorageResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| StorageError::ConnectionError {
                message: format!("Failed to connect to database: {}", e),
            })?;

        Ok(Self::with_pool(pool, config.tables()))
    }

    /// Wrap an existing pool
    pub fn with_pool(pool: MySqlPool, tables: TableNames) -> Self {
        Self { pool, tables }
    }

    /// Get database pool for advanced queries
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    fn term_select(&self) -> String {
        format!(
            "SELECT t.*, tt.* FROM {} AS t INNER JOIN {} AS tt ON t.term_id = tt.term_id",
            self.tables.terms, self.tables.term_taxonomy
        )
    }
}

fn post_row(row: &MySqlRow) -> StorageResult<RawRow> {
    let mut raw = RawRow::new();
    raw.insert("ID".into(), Value::from(row.try_get::<u64, _>("ID")?));
    raw.insert(
        "post_type".into(),
        Value::from(row.try_get::<String, _>("post_type")?),
    );
    raw.insert(
        "post_author".into(),
        Value::from(row.try_get::<u64, _>("post_author")?),
    );
    Ok(raw)
}

fn term_row(row: &MySqlRow) -> StorageResult<RawRow> {
    let mut raw = RawRow::new();
    raw.insert("term_id".into(), Value::from(row.try_get::<u64, _>("term_id")?));
    for column in ["name", "slug", "taxonomy", "description"] {
        raw.insert(column.into(), Value::from(row.try_get::<String, _>(column)?));
    }
    raw.insert(
        "term_group".into(),
        Value::from(row.try_get::<i64, _>("term_group")?),
    );
    raw.insert(
        "term_taxonomy_id".into(),
        Value::from(row.try_get::<u64, _>("term_taxonomy_id")?),
    );
    raw.insert("parent".into(), Value::from(row.try_get::<u64, _>("parent")?));
    raw.insert("count".into(), Value::from(row.try_get::<i64, _>("count")?));
    Ok(raw)
}

fn decode<T>(row: &RawRow, parse: fn(&RawRow) -> serde_json::Result<T>) -> StorageResult<T> {
    parse(row).map_err(|e| StorageError::SerializationError {
        message: e.to_string(),
    })
}

#[async_trait]
impl ResourceStore for MySqlResourceStore {
    async fn execute(&self, query: &BatchQuery) -> StorageResult<Vec<RawRow>> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(query.select_prefix(&self.tables));
        let mut ids = builder.separated(", ");
        for id in query.ids() {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        debug!("Executing batched query: {}", query.to_sql(&self.tables));

        let rows = builder.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| match query {
                BatchQuery::Posts { .. } => post_row(row),
                BatchQuery::TermsWithTaxonomy { .. } => term_row(row),
            })
            .collect()
    }

    async fn get_post(&self, id: u64) -> StorageResult<Option<Post>> {
        let sql = format!(
            "SELECT ID, post_type, post_author FROM {} WHERE ID = ?",
            self.tables.posts
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decode(&post_row(&row)?, Post::from_row))
            .transpose()
    }

    async fn get_term(&self, id: u64, taxonomy: &str) -> StorageResult<Option<Term>> {
        let sql = format!("{} WHERE t.term_id = ? AND tt.taxonomy = ?", self.term_select());
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(taxonomy)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decode(&term_row(&row)?, Term::from_row))
            .transpose()
    }
}

#[async_trait]
impl SlugResolver for MySqlResourceStore {
    async fn post_by_slug(&self, slug: &str, post_type: &str) -> StorageResult<Option<Post>> {
        let sql = format!(
            "SELECT ID, post_type, post_author FROM {} \
             WHERE post_name = ? AND post_type = ? ORDER BY ID LIMIT 1",
            self.tables.posts
        );
        let row = sqlx::query(&sql)
            .bind(slug)
            .bind(post_type)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decode(&post_row(&row)?, Post::from_row))
            .transpose()
    }

    async fn term_by_slug(&self, slug: &str, taxonomy: &str) -> StorageResult<Option<Term>> {
        let sql = format!(
            "{} WHERE t.slug = ? AND tt.taxonomy = ? LIMIT 1",
            self.term_select()
        );
        let row = sqlx::query(&sql)
            .bind(slug)
            .bind(taxonomy)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decode(&term_row(&row)?, Term::from_row))
            .transpose()
    }
}
