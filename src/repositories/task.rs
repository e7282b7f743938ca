use std::sync::Arc;

use uuid::Uuid;

use crate::client::{Filter, PersistenceClient, Select};
use crate::error::AppResult;
use crate::models::{CreateTask, Record, Task, UpdateTask};
use crate::repositories::{
    datastore_failure, decode_row, decode_rows, encode, lookup_failure, rejected,
};

/// Task repository for datastore operations
#[derive(Clone)]
pub struct TaskRepository {
    client: Arc<dyn PersistenceClient>,
}

impl TaskRepository {
    pub fn new(client: Arc<dyn PersistenceClient>) -> Self {
        Self { client }
    }

    /// List tasks of a project, newest first
    pub async fn list_by_project(&self, project_id: Uuid) -> AppResult<Vec<Task>> {
        let data = self
            .client
            .select(
                Select::from(Task::TABLE)
                    .eq("project_id", project_id)
                    .order("created_at", false),
            )
            .await
            .map_err(|e| datastore_failure::<Task>("list", e))?;

        decode_rows("list", data)
    }

    pub async fn create(&self, input: &CreateTask) -> AppResult<Task> {
        let row = encode::<Task, _>("create", input)?;
        let created = self
            .client
            .insert(Task::TABLE, row)
            .await
            .map_err(|e| datastore_failure::<Task>("create", e))?;

        decode_row("create", created)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateTask) -> AppResult<Task> {
        input.validate().map_err(|e| rejected::<Task>("update", e))?;

        let patch = encode::<Task, _>("update", input)?;
        let updated = self
            .client
            .update(Task::TABLE, Filter::eq("id", id), patch)
            .await
            .map_err(|e| lookup_failure::<Task>("update", e))?;

        decode_row("update", updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.client
            .delete(Task::TABLE, Filter::eq("id", id))
            .await
            .map_err(|e| datastore_failure::<Task>("delete", e))
    }
}
