//! Server settings read from the environment at startup.

use ingres_database::db::DEFAULT_SQLITE_PATH;

/// Listener and storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `postgres://` URL or `SQLite` path.
    pub database_url: String,
    /// Interface to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_SQLITE_PATH.to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Reads `DATABASE_URL`, `BIND_ADDR`, and `PORT`, falling back to the
    /// defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid PORT '{raw}', using {}", defaults.port);
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
        }
    }
}
