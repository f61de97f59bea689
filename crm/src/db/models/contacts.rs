//! Database models for contacts.

use crate::api::models::contacts::{ContactCreate, ContactUpdate, LifecycleStage};
use crate::api::models::summaries::{CompanySummary, UserSummary};
use crate::types::{CompanyId, ContactId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new contact
#[derive(Debug, Clone)]
pub struct ContactCreateDBRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub lifecycle_stage: LifecycleStage,
    pub lead_source: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
}

impl ContactCreateDBRequest {
    /// The owner falls back to the creating user.
    pub fn new(current_user_id: UserId, api: ContactCreate) -> Self {
        Self {
            first_name: api.first_name,
            last_name: api.last_name,
            email: api.email,
            phone: api.phone,
            job_title: api.job_title,
            lifecycle_stage: api.lifecycle_stage.unwrap_or_default(),
            lead_source: api.lead_source,
            tags: api.tags.unwrap_or_default(),
            notes: api.notes,
            company_id: api.company_id,
            owner_id: api.owner_id.unwrap_or(current_user_id),
        }
    }

    #[cfg(test)]
    pub fn minimal(first_name: &str, last_name: &str, owner_id: UserId) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: None,
            phone: None,
            job_title: None,
            lifecycle_stage: LifecycleStage::Lead,
            lead_source: None,
            tags: vec![],
            notes: None,
            company_id: None,
            owner_id,
        }
    }
}

/// Database request for updating a contact
#[derive(Debug, Clone, Default)]
pub struct ContactUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub job_title: Option<Option<String>>,
    pub lifecycle_stage: Option<LifecycleStage>,
    pub lead_source: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
    pub company_id: Option<Option<CompanyId>>,
    pub owner_id: Option<UserId>,
}

impl From<ContactUpdate> for ContactUpdateDBRequest {
    fn from(api: ContactUpdate) -> Self {
        Self {
            first_name: api.first_name,
            last_name: api.last_name,
            email: api.email,
            phone: api.phone,
            job_title: api.job_title,
            lifecycle_stage: api.lifecycle_stage,
            lead_source: api.lead_source,
            tags: api.tags,
            notes: api.notes,
            company_id: api.company_id,
            owner_id: api.owner_id,
        }
    }
}

/// Database response for a contact, with owner and company loaded
#[derive(Debug, Clone)]
pub struct ContactDBResponse {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub lifecycle_stage: LifecycleStage,
    pub lead_source: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
