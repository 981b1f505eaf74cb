use recon_core::{ReconConfig, ReconError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &str = include_str!("../../../schema.sql");

/// How long a writer waits on a locked database before erroring. The API
/// server and the scheduler agent share one file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the reconciliation database.
///
/// Each job owns one pool for its lifetime and commits once per logical
/// unit; cross-job coordination happens entirely through the database.
#[derive(Clone)]
pub struct ReconDb {
    pool: SqlitePool,
}

impl ReconDb {
    /// Open the configured database, sized by `DATABASE_MAX_CONNECTIONS`.
    pub async fn connect(config: &ReconConfig) -> Result<Self, ReconError> {
        Self::open(&config.database_url, config.database_max_connections).await
    }

    /// Open `database_url` with an explicit pool size (creating the file
    /// if missing) and bootstrap the schema. Tests pass 1 so an in-memory
    /// database stays on a single connection.
    pub async fn open(database_url: &str, max_connections: u32) -> Result<Self, ReconError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        bootstrap_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Replay the root schema file. sqlx executes a single statement per
/// query, so the file is applied statement by statement; every statement
/// is `IF NOT EXISTS` and safe to reapply on every startup.
async fn bootstrap_schema(pool: &SqlitePool) -> Result<(), ReconError> {
    let statements = SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty());

    let mut applied = 0usize;
    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
        applied += 1;
    }
    tracing::debug!("Schema bootstrap applied {applied} statements");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_and_bootstrap() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        assert!(db.pool().acquire().await.is_ok());

        // Schema is idempotent
        bootstrap_schema(db.pool()).await.unwrap();
    }
}
