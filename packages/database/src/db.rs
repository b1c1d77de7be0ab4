//! Database connection utilities.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::Credentials;

/// Default `SQLite` database location when `DATABASE_URL` is unset.
pub const DEFAULT_SQLITE_PATH: &str = "data/ingres.db";

/// Opens a database connection for `url`.
///
/// `postgres://` and `postgresql://` URLs connect to Postgres; anything else
/// is treated as a path to an `SQLite` file (an optional `sqlite://` prefix
/// is stripped). Missing parent directories of the `SQLite` file are
/// created.
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed or the connection fails.
pub async fn connect(url: &str) -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        // Strip query parameters (e.g., ?sslmode=require) that the
        // Credentials parser doesn't understand.
        let url_base = url.split('?').next().unwrap_or(url);

        let creds = Credentials::from_url(url_base)?;
        let db = switchy_database_connection::init_postgres_raw_native_tls(creds).await?;
        db.exec_raw("SET statement_timeout = '30s'").await?;
        return Ok(db);
    }

    let path = Path::new(url.strip_prefix("sqlite://").unwrap_or(url));
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = switchy_database_connection::init_sqlite_rusqlite(Some(path))?;
    Ok(db)
}

/// Creates a new database connection from the `DATABASE_URL` environment
/// variable, falling back to [`DEFAULT_SQLITE_PATH`].
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect_from_env() -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_SQLITE_PATH.to_string());
    connect(&url).await
}
