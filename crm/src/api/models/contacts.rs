//! API request/response models for contacts.

use super::pagination::{Pagination, paginated_response};
use super::summaries::{CompanySummary, UserSummary};
use crate::db::models::contacts::ContactDBResponse;
use crate::types::{CompanyId, ContactId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Marketing/sales funnel position, shared by contacts and companies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "lifecycle_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Subscriber,
    #[default]
    Lead,
    MarketingQualifiedLead,
    SalesQualifiedLead,
    Opportunity,
    Customer,
    Evangelist,
    Other,
}

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 8] = [
        LifecycleStage::Subscriber,
        LifecycleStage::Lead,
        LifecycleStage::MarketingQualifiedLead,
        LifecycleStage::SalesQualifiedLead,
        LifecycleStage::Opportunity,
        LifecycleStage::Customer,
        LifecycleStage::Evangelist,
        LifecycleStage::Other,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub lifecycle_stage: Option<LifecycleStage>,
    pub lead_source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

/// Partial update. Optional columns accept `null` to clear them; `"companyId": null` unlinks the
/// contact from its company.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub job_title: Option<Option<String>>,
    pub lifecycle_stage: Option<LifecycleStage>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub lead_source: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<Option<CompanyId>>,
    /// Reassigning the owner requires a privileged role
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    #[schema(value_type = String, format = "uuid")]
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
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

paginated_response!(ContactListResponse, ContactResponse, contacts);

/// Query parameters for listing contacts
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListContactsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on first name, last name or email
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,

    pub lifecycle_stage: Option<LifecycleStage>,
}

impl From<ContactDBResponse> for ContactResponse {
    fn from(db: ContactDBResponse) -> Self {
        Self {
            id: db.id,
            first_name: db.first_name,
            last_name: db.last_name,
            email: db.email,
            phone: db.phone,
            job_title: db.job_title,
            lifecycle_stage: db.lifecycle_stage,
            lead_source: db.lead_source,
            tags: db.tags,
            notes: db.notes,
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
    fn test_lifecycle_stage_wire_format() {
        assert_eq!(
            serde_json::to_value(LifecycleStage::MarketingQualifiedLead).unwrap(),
            json!("marketing_qualified_lead")
        );
        assert_eq!(LifecycleStage::default(), LifecycleStage::Lead);
    }

    #[test]
    fn test_update_can_unlink_company() {
        let update: ContactUpdate = serde_json::from_value(json!({ "companyId": null })).unwrap();
        assert_eq!(update.company_id, Some(None));

        let update: ContactUpdate = serde_json::from_value(json!({ "firstName": "Ada" })).unwrap();
        assert_eq!(update.company_id, None);
    }

    #[test]
    fn test_list_query_filters() {
        let company = uuid::Uuid::new_v4();
        let query: ListContactsQuery = serde_json::from_value(json!({
            "page": "2",
            "companyId": company.to_string(),
            "lifecycleStage": "customer"
        }))
        .unwrap();
        assert_eq!(query.pagination.page(), 2);
        assert_eq!(query.company_id, Some(company));
        assert_eq!(query.lifecycle_stage, Some(LifecycleStage::Customer));
    }
}
