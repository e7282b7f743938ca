use uuid::Uuid;

use project_board::models::{
    CreateMember, CreateProject, CreateTask, Project, ProjectMember, ProjectStatus, Task,
    TaskPriority,
};
use project_board::state::AppState;

/// Factory for creating test data
pub struct Factory<'a> {
    state: &'a AppState,
}

#[allow(dead_code)]
impl<'a> Factory<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Create a test project
    pub async fn create_project(&self) -> Project {
        let input = CreateProject {
            name: format!("Test Project {}", Uuid::new_v4()),
            description: "Test project description".to_string(),
            status: ProjectStatus::InProgress,
            progress: 25,
            due_date: None,
        };

        self.state.projects().create(&input).await.unwrap()
    }

    /// Create a test project with specific name
    pub async fn create_project_with_name(&self, name: &str) -> Project {
        self.state
            .projects()
            .create(&CreateProject::new(name, ""))
            .await
            .unwrap()
    }

    /// Add a member to a project
    pub async fn add_member(&self, project_id: Uuid, user_name: &str) -> ProjectMember {
        let input = CreateMember {
            project_id,
            user_name: user_name.to_string(),
            role: "developer".to_string(),
        };

        self.state.members().add(&input).await.unwrap()
    }

    /// Create a test task
    pub async fn create_task(&self, project_id: Uuid) -> Task {
        let input = CreateTask {
            description: "Test task description".to_string(),
            priority: TaskPriority::High,
            assigned_to: "tester".to_string(),
            ..CreateTask::new(project_id, format!("Test Task {}", Uuid::new_v4()))
        };

        self.state.tasks().create(&input).await.unwrap()
    }
}
