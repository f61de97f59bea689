//! Database models for campaigns.

use crate::api::models::campaigns::{CampaignCreate, CampaignStatus, CampaignType, CampaignUpdate};
use crate::api::models::summaries::UserSummary;
use crate::types::{CampaignId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Database request for creating a new campaign
#[derive(Debug, Clone)]
pub struct CampaignCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
    pub spent: Decimal,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub owner_id: UserId,
}

impl CampaignCreateDBRequest {
    pub fn new(current_user_id: UserId, api: CampaignCreate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            campaign_type: api.campaign_type.unwrap_or_default(),
            status: api.status.unwrap_or_default(),
            start_date: api.start_date,
            end_date: api.end_date,
            budget: api.budget,
            spent: api.spent.unwrap_or_default(),
            impressions: api.impressions.unwrap_or(0),
            clicks: api.clicks.unwrap_or(0),
            conversions: api.conversions.unwrap_or(0),
            owner_id: api.owner_id.unwrap_or(current_user_id),
        }
    }

    #[cfg(test)]
    pub fn minimal(name: &str, owner_id: UserId) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            campaign_type: CampaignType::Email,
            status: CampaignStatus::Draft,
            start_date: None,
            end_date: None,
            budget: None,
            spent: Decimal::ZERO,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            owner_id,
        }
    }
}

/// Database request for updating a campaign
#[derive(Debug, Clone, Default)]
pub struct CampaignUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub campaign_type: Option<CampaignType>,
    pub status: Option<CampaignStatus>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub budget: Option<Option<Decimal>>,
    pub spent: Option<Decimal>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub conversions: Option<i64>,
    pub owner_id: Option<UserId>,
}

impl From<CampaignUpdate> for CampaignUpdateDBRequest {
    fn from(api: CampaignUpdate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            campaign_type: api.campaign_type,
            status: api.status,
            start_date: api.start_date,
            end_date: api.end_date,
            budget: api.budget,
            spent: api.spent,
            impressions: api.impressions,
            clicks: api.clicks,
            conversions: api.conversions,
            owner_id: api.owner_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CampaignDBResponse {
    pub id: CampaignId,
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
    pub spent: Decimal,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
