//! Database models for tasks.

use crate::api::models::summaries::{CompanySummary, ContactSummary, DealSummary, UserSummary};
use crate::api::models::tasks::{Priority, TaskCreate, TaskStatus, TaskUpdate};
use crate::types::{CompanyId, ContactId, DealId, TaskId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new task
#[derive(Debug, Clone)]
pub struct TaskCreateDBRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to_id: UserId,
    pub created_by_id: UserId,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub deal_id: Option<DealId>,
}

impl TaskCreateDBRequest {
    /// The creator is always the current user; the assignee falls back to them.
    pub fn new(current_user_id: UserId, api: TaskCreate) -> Self {
        Self {
            title: api.title,
            description: api.description,
            status: api.status.unwrap_or_default(),
            priority: api.priority.unwrap_or_default(),
            due_date: api.due_date,
            assigned_to_id: api.assigned_to_id.unwrap_or(current_user_id),
            created_by_id: current_user_id,
            contact_id: api.contact_id,
            company_id: api.company_id,
            deal_id: api.deal_id,
        }
    }

    #[cfg(test)]
    pub fn minimal(title: &str, user_id: UserId) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            due_date: None,
            assigned_to_id: user_id,
            created_by_id: user_id,
            contact_id: None,
            company_id: None,
            deal_id: None,
        }
    }
}

/// Database request for updating a task
#[derive(Debug, Clone, Default)]
pub struct TaskUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to_id: Option<UserId>,
    pub contact_id: Option<Option<ContactId>>,
    pub company_id: Option<Option<CompanyId>>,
    pub deal_id: Option<Option<DealId>>,
}

impl From<TaskUpdate> for TaskUpdateDBRequest {
    fn from(api: TaskUpdate) -> Self {
        Self {
            title: api.title,
            description: api.description,
            status: api.status,
            priority: api.priority,
            due_date: api.due_date,
            assigned_to_id: api.assigned_to_id,
            contact_id: api.contact_id,
            company_id: api.company_id,
            deal_id: api.deal_id,
        }
    }
}

/// Database response for a task, with its people and linked records loaded
#[derive(Debug, Clone)]
pub struct TaskDBResponse {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub assigned_to_id: UserId,
    pub assigned_to: UserSummary,
    pub created_by_id: UserId,
    pub created_by: UserSummary,
    pub contact_id: Option<ContactId>,
    pub contact: Option<ContactSummary>,
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    pub deal_id: Option<DealId>,
    pub deal: Option<DealSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
