use std::path::PathBuf;

use directories::ProjectDirs;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "PackOptimizer";
const APP_NAME: &str = "PackOptimizer";

const STORE_FILENAME: &str = "packs.json";
const FALLBACK_STORE_PATH: &str = "/tmp/packs.json";

/// `DB_PATH` value that selects the volatile in-memory store.
pub const MEMORY_STORE_PATH: &str = ":memory:";

/// Where the pack store lives when `DB_PATH` is not set.
pub fn default_store_path() -> PathBuf {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.data_dir().join(STORE_FILENAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_STORE_PATH))
}
