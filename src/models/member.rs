use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{nullable_string, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(default, deserialize_with = "nullable_string")]
    pub user_name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Record for ProjectMember {
    const TABLE: &'static str = "project_members";
    const KIND: &'static str = "ProjectMember";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMember {
    pub project_id: Uuid,
    pub user_name: String,
    pub role: String,
}

/// Compact team view for a project card: the first few names plus a "+N" overflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamPreview {
    pub shown: Vec<String>,
    pub overflow: usize,
}

impl TeamPreview {
    /// Keep the first `limit` members in list order
    pub fn from_members(members: &[ProjectMember], limit: usize) -> Self {
        Self {
            shown: members
                .iter()
                .take(limit)
                .map(|m| m.user_name.clone())
                .collect(),
            overflow: members.len().saturating_sub(limit),
        }
    }

    pub fn total(&self) -> usize {
        self.shown.len() + self.overflow
    }

    /// Uppercased first character of each shown name ("?" for blank names)
    pub fn initials(&self) -> Vec<String> {
        self.shown
            .iter()
            .map(|name| match name.trim().chars().next() {
                Some(c) => c.to_uppercase().collect(),
                None => "?".to_string(),
            })
            .collect()
    }
}
