//! API request/response models for marketing campaigns.

use super::pagination::{Pagination, paginated_response};
use super::summaries::UserSummary;
use crate::db::models::campaigns::CampaignDBResponse;
use crate::types::{CampaignId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "campaign_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    #[default]
    Email,
    Social,
    Ads,
    Event,
    Webinar,
    Content,
    Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "campaign_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Scheduled,
    Active,
    Paused,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignCreate {
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: Option<CampaignType>,
    pub status: Option<CampaignStatus>,
    pub start_date: Option<NaiveDate>,
    /// Must not precede `startDate`
    pub end_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub budget: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub spent: Option<Decimal>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub conversions: Option<i64>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub campaign_type: Option<CampaignType>,
    pub status: Option<CampaignStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub budget: Option<Option<Decimal>>,
    #[schema(value_type = Option<String>)]
    pub spent: Option<Decimal>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub conversions: Option<i64>,
    /// Reassigning the owner requires a privileged role
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CampaignId,
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub budget: Option<Decimal>,
    #[schema(value_type = String)]
    pub spent: Decimal,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    /// clicks / impressions, null without impressions
    pub click_through_rate: Option<f64>,
    /// conversions / clicks, null without clicks
    pub conversion_rate: Option<f64>,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

paginated_response!(CampaignListResponse, CampaignResponse, campaigns);

/// Query parameters for listing campaigns
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListCampaignsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name or description
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,

    pub campaign_type: Option<CampaignType>,

    pub status: Option<CampaignStatus>,
}

fn ratio(numerator: i64, denominator: i64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

impl From<CampaignDBResponse> for CampaignResponse {
    fn from(db: CampaignDBResponse) -> Self {
        Self {
            click_through_rate: ratio(db.clicks, db.impressions),
            conversion_rate: ratio(db.conversions, db.clicks),
            id: db.id,
            name: db.name,
            description: db.description,
            campaign_type: db.campaign_type,
            status: db.status,
            start_date: db.start_date,
            end_date: db.end_date,
            budget: db.budget,
            spent: db.spent,
            impressions: db.impressions,
            clicks: db.clicks,
            conversions: db.conversions,
            owner_id: db.owner_id,
            owner: db.owner,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn campaign(impressions: i64, clicks: i64, conversions: i64) -> CampaignDBResponse {
        let owner_id = Uuid::new_v4();
        CampaignDBResponse {
            id: Uuid::new_v4(),
            name: "Spring launch".to_string(),
            description: None,
            campaign_type: CampaignType::Email,
            status: CampaignStatus::Active,
            start_date: None,
            end_date: None,
            budget: None,
            spent: Decimal::ZERO,
            impressions,
            clicks,
            conversions,
            owner_id,
            owner: UserSummary {
                id: owner_id,
                first_name: "Mia".to_string(),
                last_name: "Marketer".to_string(),
                email: "mia@example.com".to_string(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_derived_rates() {
        let response = CampaignResponse::from(campaign(1000, 50, 5));
        assert_eq!(response.click_through_rate, Some(0.05));
        assert_eq!(response.conversion_rate, Some(0.1));
    }

    #[test]
    fn test_rates_are_null_without_denominator() {
        let response = CampaignResponse::from(campaign(0, 0, 0));
        assert_eq!(response.click_through_rate, None);
        assert_eq!(response.conversion_rate, None);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["clickThroughRate"], json!(null));
        assert_eq!(value["campaignType"], json!("email"));
    }
}
