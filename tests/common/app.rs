use std::sync::Arc;

use project_board::client::InMemoryClient;
use project_board::config::{Config, LogFormat};
use project_board::init_tracing;
use project_board::state::AppState;

/// Test configuration
pub fn test_config() -> Config {
    Config {
        datastore_url: "http://127.0.0.1:54321".to_string(),
        datastore_key: "test-anon-key".to_string(),
        request_timeout_secs: 5,
        log_format: LogFormat::Pretty,
    }
}

/// Test application wrapper
pub struct TestApp {
    pub state: AppState,
    pub store: InMemoryClient,
}

impl TestApp {
    /// Create a new test application backed by an in-memory datastore
    pub fn new() -> Self {
        init_tracing(LogFormat::Pretty);

        let store = InMemoryClient::with_board_schema();
        let state = AppState::with_client(test_config(), Arc::new(store.clone()));

        Self { state, store }
    }
}
