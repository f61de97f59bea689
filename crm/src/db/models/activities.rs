//! Database models for activities.

use crate::api::models::activities::{ActivityCreate, ActivityType, ActivityUpdate};
use crate::api::models::summaries::{CompanySummary, ContactSummary, DealSummary, UserSummary};
use crate::types::{ActivityId, CompanyId, ContactId, DealId, UserId};
use chrono::{DateTime, Utc};

/// Database request for logging a new activity
#[derive(Debug, Clone)]
pub struct ActivityCreateDBRequest {
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    /// `None` records the insert time
    pub occurred_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub user_id: UserId,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub deal_id: Option<DealId>,
}

impl ActivityCreateDBRequest {
    pub fn new(current_user_id: UserId, api: ActivityCreate) -> Self {
        Self {
            activity_type: api.activity_type,
            subject: api.subject,
            description: api.description,
            occurred_at: api.occurred_at,
            duration_minutes: api.duration_minutes,
            user_id: api.user_id.unwrap_or(current_user_id),
            contact_id: api.contact_id,
            company_id: api.company_id,
            deal_id: api.deal_id,
        }
    }

    #[cfg(test)]
    pub fn minimal(activity_type: ActivityType, subject: &str, user_id: UserId) -> Self {
        Self {
            activity_type,
            subject: subject.to_string(),
            description: None,
            occurred_at: None,
            duration_minutes: None,
            user_id,
            contact_id: None,
            company_id: None,
            deal_id: None,
        }
    }
}

/// Database request for updating an activity
#[derive(Debug, Clone, Default)]
pub struct ActivityUpdateDBRequest {
    pub activity_type: Option<ActivityType>,
    pub subject: Option<String>,
    pub description: Option<Option<String>>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<Option<i32>>,
    pub user_id: Option<UserId>,
    pub contact_id: Option<Option<ContactId>>,
    pub company_id: Option<Option<CompanyId>>,
    pub deal_id: Option<Option<DealId>>,
}

impl From<ActivityUpdate> for ActivityUpdateDBRequest {
    fn from(api: ActivityUpdate) -> Self {
        Self {
            activity_type: api.activity_type,
            subject: api.subject,
            description: api.description,
            occurred_at: api.occurred_at,
            duration_minutes: api.duration_minutes,
            user_id: api.user_id,
            contact_id: api.contact_id,
            company_id: api.company_id,
            deal_id: api.deal_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityDBResponse {
    pub id: ActivityId,
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub user_id: UserId,
    pub user: UserSummary,
    pub contact_id: Option<ContactId>,
    pub contact: Option<ContactSummary>,
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    pub deal_id: Option<DealId>,
    pub deal: Option<DealSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
