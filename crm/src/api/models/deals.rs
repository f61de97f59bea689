//! API request/response models for deals.

use super::pagination::{Pagination, paginated_response};
use super::summaries::{CompanySummary, ContactSummary, UserSummary};
use crate::db::models::deals::DealDBResponse;
use crate::types::{CompanyId, ContactId, DealId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "deal_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    #[default]
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    pub const ALL: [DealStage; 6] = [
        DealStage::Lead,
        DealStage::Qualified,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
    ];

    /// Won or lost; the deal carries a `closedAt` timestamp.
    pub fn is_closed(self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealCreate {
    pub name: String,
    /// Defaults to 0
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    /// ISO 4217 code, defaults to USD
    pub currency: Option<String>,
    pub stage: Option<DealStage>,
    /// 0-100
    pub probability: Option<i32>,
    pub expected_close_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

/// Partial update. Moving the stage to `closed_won`/`closed_lost` stamps `closedAt`; moving it
/// anywhere else clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealUpdate {
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub stage: Option<DealStage>,
    pub probability: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub expected_close_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<Option<ContactId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<Option<CompanyId>>,
    /// Reassigning the owner requires a privileged role
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: DealId,
    pub name: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    pub stage: DealStage,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub closed_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,
    pub contact: Option<ContactSummary>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

paginated_response!(DealListResponse, DealResponse, deals);

/// Query parameters for listing deals
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListDealsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name or description
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,

    pub stage: Option<DealStage>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
}

impl From<DealDBResponse> for DealResponse {
    fn from(db: DealDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            amount: db.amount,
            currency: db.currency,
            stage: db.stage,
            probability: db.probability,
            expected_close_date: db.expected_close_date,
            closed_at: db.closed_at,
            description: db.description,
            contact_id: db.contact_id,
            contact: db.contact,
            company_id: db.company_id,
            company: db.company,
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

    #[test]
    fn test_closed_stages() {
        assert!(DealStage::ClosedWon.is_closed());
        assert!(DealStage::ClosedLost.is_closed());
        assert!(!DealStage::Negotiation.is_closed());
        assert_eq!(serde_json::to_value(DealStage::ClosedWon).unwrap(), json!("closed_won"));
    }

    #[test]
    fn test_create_parses_dates_and_amounts() {
        let create: DealCreate = serde_json::from_value(json!({
            "name": "Renewal",
            "amount": "4999.99",
            "expectedCloseDate": "2026-03-31",
            "stage": "proposal"
        }))
        .unwrap();
        assert_eq!(create.amount, Some(Decimal::new(499999, 2)));
        assert_eq!(create.expected_close_date, NaiveDate::from_ymd_opt(2026, 3, 31));
        assert_eq!(create.stage, Some(DealStage::Proposal));
    }
}
