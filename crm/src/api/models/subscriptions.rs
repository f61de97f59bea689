//! API request/response models for customer subscriptions.

use super::pagination::{Pagination, paginated_response};
use super::summaries::{CompanySummary, ContactSummary, UserSummary};
use crate::db::models::subscriptions::SubscriptionDBResponse;
use crate::types::{CompanyId, ContactId, SubscriptionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    #[default]
    Active,
    PastDue,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "billing_cycle", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCreate {
    pub plan_name: String,
    pub status: Option<SubscriptionStatus>,
    pub billing_cycle: Option<BillingCycle>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// ISO 4217 code, defaults to USD
    pub currency: Option<String>,
    /// Defaults to today
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdate {
    pub plan_name: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub billing_cycle: Option<BillingCycle>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub next_billing_date: Option<Option<NaiveDate>>,
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
pub struct SubscriptionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubscriptionId,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
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

paginated_response!(SubscriptionListResponse, SubscriptionResponse, subscriptions);

/// Query parameters for listing subscriptions
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListSubscriptionsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on plan name
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,

    pub status: Option<SubscriptionStatus>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub company_id: Option<CompanyId>,
}

impl From<SubscriptionDBResponse> for SubscriptionResponse {
    fn from(db: SubscriptionDBResponse) -> Self {
        Self {
            id: db.id,
            plan_name: db.plan_name,
            status: db.status,
            billing_cycle: db.billing_cycle,
            amount: db.amount,
            currency: db.currency,
            start_date: db.start_date,
            end_date: db.end_date,
            next_billing_date: db.next_billing_date,
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
    fn test_amount_is_required() {
        let missing = serde_json::from_value::<SubscriptionCreate>(json!({ "planName": "Pro" }));
        assert!(missing.is_err());

        let create: SubscriptionCreate =
            serde_json::from_value(json!({ "planName": "Pro", "amount": "49.00", "billingCycle": "yearly" })).unwrap();
        assert_eq!(create.amount, Decimal::new(4900, 2));
        assert_eq!(create.billing_cycle, Some(BillingCycle::Yearly));
        assert!(create.start_date.is_none());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_value(SubscriptionStatus::PastDue).unwrap(), json!("past_due"));
        assert_eq!(SubscriptionStatus::default(), SubscriptionStatus::Active);
    }
}
