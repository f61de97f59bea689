//! Database models for companies.

use crate::api::models::companies::{CompanyCreate, CompanyUpdate};
use crate::api::models::contacts::LifecycleStage;
use crate::api::models::summaries::UserSummary;
use crate::types::{CompanyId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a new company
#[derive(Debug, Clone)]
pub struct CompanyCreateDBRequest {
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub employee_count: Option<i32>,
    pub annual_revenue: Option<Decimal>,
    pub lifecycle_stage: LifecycleStage,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub owner_id: UserId,
}

impl CompanyCreateDBRequest {
    /// The owner falls back to the creating user.
    pub fn new(current_user_id: UserId, api: CompanyCreate) -> Self {
        Self {
            name: api.name,
            domain: api.domain,
            industry: api.industry,
            phone: api.phone,
            address: api.address,
            city: api.city,
            country: api.country,
            employee_count: api.employee_count,
            annual_revenue: api.annual_revenue,
            lifecycle_stage: api.lifecycle_stage.unwrap_or_default(),
            tags: api.tags.unwrap_or_default(),
            notes: api.notes,
            owner_id: api.owner_id.unwrap_or(current_user_id),
        }
    }
}

/// Database request for updating a company
#[derive(Debug, Clone, Default)]
pub struct CompanyUpdateDBRequest {
    pub name: Option<String>,
    pub domain: Option<Option<String>>,
    pub industry: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub employee_count: Option<Option<i32>>,
    pub annual_revenue: Option<Option<Decimal>>,
    pub lifecycle_stage: Option<LifecycleStage>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
    pub owner_id: Option<UserId>,
}

impl From<CompanyUpdate> for CompanyUpdateDBRequest {
    fn from(api: CompanyUpdate) -> Self {
        Self {
            name: api.name,
            domain: api.domain,
            industry: api.industry,
            phone: api.phone,
            address: api.address,
            city: api.city,
            country: api.country,
            employee_count: api.employee_count,
            annual_revenue: api.annual_revenue,
            lifecycle_stage: api.lifecycle_stage,
            tags: api.tags,
            notes: api.notes,
            owner_id: api.owner_id,
        }
    }
}

/// Database response for a company, with its owner and contact count loaded
#[derive(Debug, Clone)]
pub struct CompanyDBResponse {
    pub id: CompanyId,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub employee_count: Option<i32>,
    pub annual_revenue: Option<Decimal>,
    pub lifecycle_stage: LifecycleStage,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub contacts_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
