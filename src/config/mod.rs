//! Configuration for the bookstore engine.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

/// Default remote mirror collection, matching the JSON server the app ships
/// against when nothing else is configured.
const DEFAULT_REMOTE_URL: &str = "http://192.168.1.8:5000/books";

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Base URL of the remote book collection
    pub remote_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("BOOKSTORE_DB_PATH")
            .unwrap_or_else(|_| "./data/bookstore.sqlite".to_string())
            .into();

        let remote_url =
            env::var("BOOKSTORE_REMOTE_URL").unwrap_or_else(|_| DEFAULT_REMOTE_URL.to_string());

        Self {
            db_path,
            remote_url,
        }
    }
}
