use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use hcplog_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect_with_config(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&database.url, database.max_connections, database.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let in_memory = is_in_memory(database_url);
    // Every pooled connection to `sqlite::memory:` opens its own database.
    let max_connections = if in_memory { 1 } else { max_connections.max(1) };
    let url = if database_url == ":memory:" { "sqlite::memory:" } else { database_url };

    let mut options = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)));
    if in_memory {
        // Recycling the only connection would drop the database with it.
        options = options.idle_timeout(None).max_lifetime(None);
    }

    options
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                if !in_memory {
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                }
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(url)
        .await
}

fn is_in_memory(database_url: &str) -> bool {
    database_url == ":memory:" || database_url.starts_with("sqlite::memory:")
        || database_url.contains("mode=memory")
}
