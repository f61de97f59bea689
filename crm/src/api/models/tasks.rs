//! API request/response models for tasks.

use super::pagination::{Pagination, paginated_response};
use super::summaries::{CompanySummary, ContactSummary, DealSummary, UserSummary};
use crate::db::models::tasks::TaskDBResponse;
use crate::types::{CompanyId, ContactId, DealId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Still needs doing: pending or in progress.
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

/// Urgency of a task or ticket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[sqlx(type_name = "priority_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assigned_to_id: Option<UserId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub deal_id: Option<DealId>,
}

/// Partial update. Setting `status` to `completed` stamps `completedAt`; any other status clears
/// it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub assigned_to_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<Option<ContactId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<Option<CompanyId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub deal_id: Option<Option<DealId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "uuid")]
    pub assigned_to_id: UserId,
    pub assigned_to: UserSummary,
    #[schema(value_type = String, format = "uuid")]
    pub created_by_id: UserId,
    pub created_by: UserSummary,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,
    pub contact: Option<ContactSummary>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub deal_id: Option<DealId>,
    pub deal: Option<DealSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

paginated_response!(TaskListResponse, TaskResponse, tasks);

/// Query parameters for listing tasks
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on title or description
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub assigned_to_id: Option<UserId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub created_by_id: Option<UserId>,

    pub status: Option<TaskStatus>,

    pub priority: Option<Priority>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub deal_id: Option<DealId>,
}

impl From<TaskDBResponse> for TaskResponse {
    fn from(db: TaskDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
            status: db.status,
            priority: db.priority,
            due_date: db.due_date,
            completed_at: db.completed_at,
            assigned_to_id: db.assigned_to_id,
            assigned_to: db.assigned_to,
            created_by_id: db.created_by_id,
            created_by: db.created_by,
            contact_id: db.contact_id,
            contact: db.contact,
            company_id: db.company_id,
            company: db.company,
            deal_id: db.deal_id,
            deal: db.deal,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
        assert_eq!(Priority::default(), Priority::Medium);
        assert!(Priority::Urgent > Priority::High);
    }

    #[test]
    fn test_open_statuses() {
        assert!(TaskStatus::Pending.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Completed.is_open());
        assert!(!TaskStatus::Cancelled.is_open());
    }

    #[test]
    fn test_update_clears_due_date() {
        let update: TaskUpdate = serde_json::from_value(json!({ "dueDate": null, "status": "in_progress" })).unwrap();
        assert_eq!(update.due_date, Some(None));
        assert_eq!(update.status, Some(TaskStatus::InProgress));
    }

    #[test]
    fn test_unknown_priority_is_rejected() {
        let result = serde_json::from_value::<TaskCreate>(json!({ "title": "Call back", "priority": "whenever" }));
        assert!(result.is_err());
    }
}
