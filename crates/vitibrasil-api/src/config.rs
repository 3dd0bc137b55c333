//! Configuration resolution: explicit flag, then environment, then default.

use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "VITIBRASIL_DATA_DIR";
pub const BASE_URL_ENV: &str = "VITIBRASIL_BASE_URL";
pub const JWT_SECRET_ENV: &str = "VITIBRASIL_JWT_SECRET";
pub const ADDR_ENV: &str = "VITIBRASIL_ADDR";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DATABASE_FILE: &str = "vitibrasil.db";

fn resolve(explicit: Option<&str>, env: &str) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(env).ok())
        .filter(|v| !v.trim().is_empty())
}

/// Directory holding the dataset store.
pub fn resolve_data_dir(explicit: Option<&str>) -> PathBuf {
    PathBuf::from(resolve(explicit, DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()))
}

/// SQLite file inside the data directory.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Upstream page the resolver appends query parameters to.
pub fn resolve_base_url(explicit: Option<&str>) -> String {
    resolve(explicit, BASE_URL_ENV).unwrap_or_else(|| vitibrasil::DEFAULT_BASE_URL.to_string())
}

pub fn resolve_addr(explicit: Option<&str>) -> String {
    resolve(explicit, ADDR_ENV).unwrap_or_else(|| DEFAULT_ADDR.to_string())
}

/// Token signing secret. No default: serving without one is refused.
pub fn resolve_jwt_secret(explicit: Option<&str>) -> Option<String> {
    resolve(explicit, JWT_SECRET_ENV)
}
