use std::sync::Arc;

use uuid::Uuid;

use crate::client::{DatastoreError, Filter, PersistenceClient, Select};
use crate::error::AppResult;
use crate::models::{CreateProject, Project, Record, UpdateProject};
use crate::repositories::{
    datastore_failure, decode_row, decode_rows, encode, lookup_failure, rejected,
};

/// Project repository for datastore operations
#[derive(Clone)]
pub struct ProjectRepository {
    client: Arc<dyn PersistenceClient>,
}

impl ProjectRepository {
    pub fn new(client: Arc<dyn PersistenceClient>) -> Self {
        Self { client }
    }

    /// List all projects, newest first
    pub async fn list_all(&self) -> AppResult<Vec<Project>> {
        let data = self
            .client
            .select(Select::from(Project::TABLE).order("created_at", false))
            .await
            .map_err(|e| datastore_failure::<Project>("list", e))?;

        decode_rows("list", data)
    }

    /// Find project by ID
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Project> {
        let data = self
            .client
            .select(Select::from(Project::TABLE).eq("id", id).single())
            .await
            .map_err(|e| lookup_failure::<Project>("get", e))?;

        match data {
            Some(row) => decode_row("get", row),
            None => Err(lookup_failure::<Project>(
                "get",
                DatastoreError::NotSingle { rows: 0 },
            )),
        }
    }

    /// Create a new project; the datastore assigns id and timestamps
    pub async fn create(&self, input: &CreateProject) -> AppResult<Project> {
        input
            .validate()
            .map_err(|e| rejected::<Project>("create", e))?;

        let row = encode::<Project, _>("create", input)?;
        let created = self
            .client
            .insert(Project::TABLE, row)
            .await
            .map_err(|e| datastore_failure::<Project>("create", e))?;

        decode_row("create", created)
    }

    /// Update the supplied fields of a project
    pub async fn update(&self, id: Uuid, input: &UpdateProject) -> AppResult<Project> {
        input
            .validate()
            .map_err(|e| rejected::<Project>("update", e))?;

        let patch = encode::<Project, _>("update", input)?;
        let updated = self
            .client
            .update(Project::TABLE, Filter::eq("id", id), patch)
            .await
            .map_err(|e| lookup_failure::<Project>("update", e))?;

        decode_row("update", updated)
    }

    /// Delete project. Members and tasks are left to the datastore's own rules.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.client
            .delete(Project::TABLE, Filter::eq("id", id))
            .await
            .map_err(|e| datastore_failure::<Project>("delete", e))
    }
}
