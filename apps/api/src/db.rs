use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

/// Failure talking to the document store. Callers treat read failures as misses
/// and write failures as best-effort.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the cache collections if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Cache schema ready");
    Ok(())
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS occupation_cache (
        code TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        record JSONB NOT NULL,
        version TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_occupation_cache_expires ON occupation_cache (expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS analysis_cache (
        id UUID PRIMARY KEY,
        subject_id TEXT NOT NULL,
        analysis_kind TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        schema_version TEXT NOT NULL,
        result JSONB NOT NULL,
        computed_at TIMESTAMPTZ NOT NULL,
        UNIQUE (subject_id, analysis_kind, content_hash)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_analysis_cache_subject ON analysis_cache (subject_id, analysis_kind, computed_at DESC)",
];
