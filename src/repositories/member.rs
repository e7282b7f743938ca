use std::sync::Arc;

use uuid::Uuid;

use crate::client::{Filter, PersistenceClient, Select};
use crate::error::AppResult;
use crate::models::{CreateMember, ProjectMember, Record, TeamPreview};
use crate::repositories::{datastore_failure, decode_row, decode_rows, encode};

/// Number of members a project card shows before collapsing into "+N"
pub const TEAM_PREVIEW_LIMIT: usize = 3;

/// Project member repository for datastore operations
#[derive(Clone)]
pub struct MemberRepository {
    client: Arc<dyn PersistenceClient>,
}

impl MemberRepository {
    pub fn new(client: Arc<dyn PersistenceClient>) -> Self {
        Self { client }
    }

    /// List members of a project, oldest first
    pub async fn list_by_project(&self, project_id: Uuid) -> AppResult<Vec<ProjectMember>> {
        let data = self
            .client
            .select(
                Select::from(ProjectMember::TABLE)
                    .eq("project_id", project_id)
                    .order("created_at", true),
            )
            .await
            .map_err(|e| datastore_failure::<ProjectMember>("list", e))?;

        decode_rows("list", data)
    }

    /// Add a member to a project
    pub async fn add(&self, input: &CreateMember) -> AppResult<ProjectMember> {
        let row = encode::<ProjectMember, _>("add", input)?;
        let created = self
            .client
            .insert(ProjectMember::TABLE, row)
            .await
            .map_err(|e| datastore_failure::<ProjectMember>("add", e))?;

        decode_row("add", created)
    }

    /// Remove a member row
    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        self.client
            .delete(ProjectMember::TABLE, Filter::eq("id", id))
            .await
            .map_err(|e| datastore_failure::<ProjectMember>("remove", e))
    }

    /// Team preview for a project card
    pub async fn team_preview(&self, project_id: Uuid) -> AppResult<TeamPreview> {
        let members = self.list_by_project(project_id).await?;
        Ok(TeamPreview::from_members(&members, TEAM_PREVIEW_LIMIT))
    }
}
