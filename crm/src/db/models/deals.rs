//! Database models for deals.

use crate::api::models::deals::{DealCreate, DealStage, DealUpdate};
use crate::api::models::summaries::{CompanySummary, ContactSummary, UserSummary};
use crate::types::{CompanyId, ContactId, DealId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Database request for creating a new deal
#[derive(Debug, Clone)]
pub struct DealCreateDBRequest {
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub stage: DealStage,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
}

impl DealCreateDBRequest {
    /// The owner falls back to the creating user.
    pub fn new(current_user_id: UserId, api: DealCreate) -> Self {
        Self {
            name: api.name,
            amount: api.amount.unwrap_or_default(),
            currency: api.currency.unwrap_or_else(|| "USD".to_string()),
            stage: api.stage.unwrap_or_default(),
            probability: api.probability.unwrap_or(0),
            expected_close_date: api.expected_close_date,
            description: api.description,
            contact_id: api.contact_id,
            company_id: api.company_id,
            owner_id: api.owner_id.unwrap_or(current_user_id),
        }
    }

    #[cfg(test)]
    pub fn minimal(name: &str, amount: Decimal, stage: DealStage, owner_id: UserId) -> Self {
        Self {
            name: name.to_string(),
            amount,
            currency: "USD".to_string(),
            stage,
            probability: 0,
            expected_close_date: None,
            description: None,
            contact_id: None,
            company_id: None,
            owner_id,
        }
    }
}

/// Database request for updating a deal
#[derive(Debug, Clone, Default)]
pub struct DealUpdateDBRequest {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub stage: Option<DealStage>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<Option<NaiveDate>>,
    pub description: Option<Option<String>>,
    pub contact_id: Option<Option<ContactId>>,
    pub company_id: Option<Option<CompanyId>>,
    pub owner_id: Option<UserId>,
}

impl From<DealUpdate> for DealUpdateDBRequest {
    fn from(api: DealUpdate) -> Self {
        Self {
            name: api.name,
            amount: api.amount,
            currency: api.currency,
            stage: api.stage,
            probability: api.probability,
            expected_close_date: api.expected_close_date,
            description: api.description,
            contact_id: api.contact_id,
            company_id: api.company_id,
            owner_id: api.owner_id,
        }
    }
}

/// Database response for a deal, with owner, contact and company loaded
#[derive(Debug, Clone)]
pub struct DealDBResponse {
    pub id: DealId,
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub stage: DealStage,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub closed_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub contact_id: Option<ContactId>,
    pub contact: Option<ContactSummary>,
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
