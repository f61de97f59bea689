//! API request/response models for companies.

use super::contacts::LifecycleStage;
use super::pagination::{Pagination, paginated_response};
use super::summaries::UserSummary;
use crate::db::models::companies::CompanyDBResponse;
use crate::types::{CompanyId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCreate {
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub employee_count: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub annual_revenue: Option<Decimal>,
    pub lifecycle_stage: Option<LifecycleStage>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

/// Partial update. Optional columns accept `null` to clear them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub domain: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub industry: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub city: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub country: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub employee_count: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub annual_revenue: Option<Option<Decimal>>,
    pub lifecycle_stage: Option<LifecycleStage>,
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    /// Reassigning the owner requires a privileged role
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CompanyId,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub employee_count: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub annual_revenue: Option<Decimal>,
    pub lifecycle_stage: LifecycleStage,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub owner: UserSummary,
    /// Number of contacts linked to this company
    pub contacts_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

paginated_response!(CompanyListResponse, CompanyResponse, companies);

/// Query parameters for listing companies
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListCompaniesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name, domain or industry
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,

    pub lifecycle_stage: Option<LifecycleStage>,

    /// Exact industry
    pub industry: Option<String>,
}

impl From<CompanyDBResponse> for CompanyResponse {
    fn from(db: CompanyDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            domain: db.domain,
            industry: db.industry,
            phone: db.phone,
            address: db.address,
            city: db.city,
            country: db.country,
            employee_count: db.employee_count,
            annual_revenue: db.annual_revenue,
            lifecycle_stage: db.lifecycle_stage,
            tags: db.tags,
            notes: db.notes,
            owner_id: db.owner_id,
            owner: db.owner,
            contacts_count: db.contacts_count,
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
    fn test_create_parses_revenue_and_stage() {
        let create: CompanyCreate = serde_json::from_value(json!({
            "name": "Acme",
            "annualRevenue": "1250000.50",
            "employeeCount": 40,
            "lifecycleStage": "customer"
        }))
        .unwrap();
        assert_eq!(create.annual_revenue, Some(Decimal::new(12500005, 1)));
        assert_eq!(create.lifecycle_stage, Some(LifecycleStage::Customer));
        assert_eq!(create.owner_id, None);
    }

    #[test]
    fn test_update_null_clears_and_absent_keeps() {
        let update: CompanyUpdate = serde_json::from_value(json!({ "domain": null, "name": "Acme 2" })).unwrap();
        assert_eq!(update.domain, Some(None));
        assert_eq!(update.industry, None);
        assert_eq!(update.name.as_deref(), Some("Acme 2"));
    }

    #[test]
    fn test_unknown_lifecycle_stage_is_rejected() {
        let result = serde_json::from_value::<CompanyCreate>(json!({ "name": "Acme", "lifecycleStage": "whale" }));
        assert!(result.is_err());
    }
}
