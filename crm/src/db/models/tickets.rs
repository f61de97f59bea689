//! Database models for tickets.

use crate::api::models::summaries::{CompanySummary, ContactSummary, DealSummary, UserSummary};
use crate::api::models::tasks::Priority;
use crate::api::models::tickets::{TicketCreate, TicketStatus, TicketUpdate};
use crate::types::{CompanyId, ContactId, DealId, TicketId, UserId};
use chrono::{DateTime, Utc};

/// Database request for opening a new ticket
#[derive(Debug, Clone)]
pub struct TicketCreateDBRequest {
    pub subject: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub assigned_to_id: UserId,
    pub created_by_id: UserId,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub deal_id: Option<DealId>,
}

impl TicketCreateDBRequest {
    /// The creator is always the current user; the assignee falls back to them.
    pub fn new(current_user_id: UserId, api: TicketCreate) -> Self {
        Self {
            subject: api.subject,
            description: api.description,
            status: api.status.unwrap_or_default(),
            priority: api.priority.unwrap_or_default(),
            category: api.category,
            assigned_to_id: api.assigned_to_id.unwrap_or(current_user_id),
            created_by_id: current_user_id,
            contact_id: api.contact_id,
            company_id: api.company_id,
            deal_id: api.deal_id,
        }
    }

    #[cfg(test)]
    pub fn minimal(subject: &str, user_id: UserId) -> Self {
        Self {
            subject: subject.to_string(),
            description: None,
            status: TicketStatus::Open,
            priority: Priority::Medium,
            category: None,
            assigned_to_id: user_id,
            created_by_id: user_id,
            contact_id: None,
            company_id: None,
            deal_id: None,
        }
    }
}

/// Database request for updating a ticket
#[derive(Debug, Clone, Default)]
pub struct TicketUpdateDBRequest {
    pub subject: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Option<String>>,
    pub assigned_to_id: Option<UserId>,
    pub contact_id: Option<Option<ContactId>>,
    pub company_id: Option<Option<CompanyId>>,
    pub deal_id: Option<Option<DealId>>,
}

impl From<TicketUpdate> for TicketUpdateDBRequest {
    fn from(api: TicketUpdate) -> Self {
        Self {
            subject: api.subject,
            description: api.description,
            status: api.status,
            priority: api.priority,
            category: api.category,
            assigned_to_id: api.assigned_to_id,
            contact_id: api.contact_id,
            company_id: api.company_id,
            deal_id: api.deal_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TicketDBResponse {
    pub id: TicketId,
    pub subject: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
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
