//! API request/response models for support tickets.

use super::pagination::{Pagination, paginated_response};
use super::summaries::{CompanySummary, ContactSummary, DealSummary, UserSummary};
use super::tasks::Priority;
use crate::db::models::tickets::TicketDBResponse;
use crate::types::{CompanyId, ContactId, DealId, TicketId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Waiting,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Resolved or closed; the ticket carries a `resolvedAt` timestamp.
    pub fn is_resolved(self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreate {
    pub subject: String,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
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

/// Partial update. Moving to `resolved`/`closed` stamps `resolvedAt`; reopening clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
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
pub struct TicketResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TicketId,
    pub subject: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
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

paginated_response!(TicketListResponse, TicketResponse, tickets);

/// Query parameters for listing tickets
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListTicketsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on subject, description or category
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub assigned_to_id: Option<UserId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub created_by_id: Option<UserId>,

    pub status: Option<TicketStatus>,

    pub priority: Option<Priority>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
}

impl From<TicketDBResponse> for TicketResponse {
    fn from(db: TicketDBResponse) -> Self {
        Self {
            id: db.id,
            subject: db.subject,
            description: db.description,
            status: db.status,
            priority: db.priority,
            category: db.category,
            resolved_at: db.resolved_at,
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
