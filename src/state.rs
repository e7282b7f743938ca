use std::sync::Arc;

use crate::client::{ClientBuildError, PersistenceClient, RestClient};
use crate::config::Config;
use crate::repositories::{MemberRepository, ProjectRepository, TaskRepository};

/// Application state shared by every caller of the repositories
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn PersistenceClient>,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState talking to the hosted datastore
    pub fn new(config: Config) -> Result<Self, AppStateError> {
        let client = RestClient::new(
            &config.datastore_url,
            &config.datastore_key,
            config.request_timeout(),
        )?;

        tracing::info!(url = %config.datastore_url, "Datastore client ready");

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Create AppState with a custom client (for testing)
    pub fn with_client(config: Config, client: Arc<dyn PersistenceClient>) -> Self {
        Self { client, config }
    }

    pub fn projects(&self) -> ProjectRepository {
        ProjectRepository::new(self.client.clone())
    }

    pub fn members(&self) -> MemberRepository {
        MemberRepository::new(self.client.clone())
    }

    pub fn tasks(&self) -> TaskRepository {
        TaskRepository::new(self.client.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("Datastore client error: {0}")]
    Client(#[from] ClientBuildError),
}
