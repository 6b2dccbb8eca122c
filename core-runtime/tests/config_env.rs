//! Environment-driven configuration.

use core_runtime::config::{
    CoreConfig, ENV_BATCH_DELAY_MS, ENV_BATCH_SIZE, ENV_DATABASE, ENV_GOOGLE_BOOKS_API_KEY,
};
use core_runtime::Error;
use std::env;
use std::path::PathBuf;

fn clear() {
    for name in [
        ENV_DATABASE,
        ENV_GOOGLE_BOOKS_API_KEY,
        ENV_BATCH_SIZE,
        ENV_BATCH_DELAY_MS,
    ] {
        env::remove_var(name);
    }
}

// The process environment is shared, so every case runs in one test.
#[test]
fn test_from_env() {
    clear();
    assert!(matches!(CoreConfig::from_env(), Err(Error::Config(_))));

    env::set_var(ENV_DATABASE, "/tmp/readlist-env.db");
    let config = CoreConfig::from_env().unwrap();
    assert_eq!(config.database_path, PathBuf::from("/tmp/readlist-env.db"));
    assert!(config.cover_api.google_books_api_key.is_none());
    assert_eq!(config.enrichment.batch_size, 5);
    assert_eq!(config.enrichment.batch_delay_ms, 1000);

    env::set_var(ENV_GOOGLE_BOOKS_API_KEY, "key-from-env");
    env::set_var(ENV_BATCH_SIZE, "8");
    env::set_var(ENV_BATCH_DELAY_MS, "250");
    let config = CoreConfig::from_env().unwrap();
    assert_eq!(
        config.cover_api.google_books_api_key.as_deref(),
        Some("key-from-env")
    );
    assert_eq!(config.enrichment.batch_size, 8);
    assert_eq!(config.enrichment.batch_delay_ms, 250);

    env::set_var(ENV_BATCH_SIZE, "many");
    assert!(matches!(CoreConfig::from_env(), Err(Error::Config(_))));

    clear();
}
