//! API request/response models for activities (calls, emails, meetings and notes logged against
//! CRM records).

use super::pagination::{Pagination, paginated_response};
use super::summaries::{CompanySummary, ContactSummary, DealSummary, UserSummary};
use crate::db::models::activities::ActivityDBResponse;
use crate::types::{ActivityId, CompanyId, ContactId, DealId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "activity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Note,
    Task,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCreate {
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    /// Defaults to now
    pub occurred_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub deal_id: Option<DealId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdate {
    pub activity_type: Option<ActivityType>,
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub duration_minutes: Option<Option<i32>>,
    /// Reassigning the activity to another user requires a privileged role
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
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
pub struct ActivityResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ActivityId,
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub user: UserSummary,
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

paginated_response!(ActivityListResponse, ActivityResponse, activities);

/// Query parameters for listing activities
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListActivitiesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on subject or description
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,

    pub activity_type: Option<ActivityType>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub deal_id: Option<DealId>,
}

impl From<ActivityDBResponse> for ActivityResponse {
    fn from(db: ActivityDBResponse) -> Self {
        Self {
            id: db.id,
            activity_type: db.activity_type,
            subject: db.subject,
            description: db.description,
            occurred_at: db.occurred_at,
            duration_minutes: db.duration_minutes,
            user_id: db.user_id,
            user: db.user,
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
