//! Database models for subscriptions.

use crate::api::models::subscriptions::{BillingCycle, SubscriptionCreate, SubscriptionStatus, SubscriptionUpdate};
use crate::api::models::summaries::{CompanySummary, ContactSummary, UserSummary};
use crate::types::{CompanyId, ContactId, SubscriptionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Database request for creating a new subscription
#[derive(Debug, Clone)]
pub struct SubscriptionCreateDBRequest {
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub amount: Decimal,
    pub currency: String,
    /// `None` starts the subscription today
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
}

impl SubscriptionCreateDBRequest {
    pub fn new(current_user_id: UserId, api: SubscriptionCreate) -> Self {
        Self {
            plan_name: api.plan_name,
            status: api.status.unwrap_or_default(),
            billing_cycle: api.billing_cycle.unwrap_or_default(),
            amount: api.amount,
            currency: api.currency.unwrap_or_else(|| "USD".to_string()),
            start_date: api.start_date,
            end_date: api.end_date,
            next_billing_date: api.next_billing_date,
            contact_id: api.contact_id,
            company_id: api.company_id,
            owner_id: api.owner_id.unwrap_or(current_user_id),
        }
    }

    #[cfg(test)]
    pub fn minimal(plan_name: &str, amount: Decimal, owner_id: UserId) -> Self {
        Self {
            plan_name: plan_name.to_string(),
            status: SubscriptionStatus::Active,
            billing_cycle: BillingCycle::Monthly,
            amount,
            currency: "USD".to_string(),
            start_date: None,
            end_date: None,
            next_billing_date: None,
            contact_id: None,
            company_id: None,
            owner_id,
        }
    }
}

/// Database request for updating a subscription
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdateDBRequest {
    pub plan_name: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub billing_cycle: Option<BillingCycle>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub next_billing_date: Option<Option<NaiveDate>>,
    pub contact_id: Option<Option<ContactId>>,
    pub company_id: Option<Option<CompanyId>>,
    pub owner_id: Option<UserId>,
}

impl From<SubscriptionUpdate> for SubscriptionUpdateDBRequest {
    fn from(api: SubscriptionUpdate) -> Self {
        Self {
            plan_name: api.plan_name,
            status: api.status,
            billing_cycle: api.billing_cycle,
            amount: api.amount,
            currency: api.currency,
            start_date: api.start_date,
            end_date: api.end_date,
            next_billing_date: api.next_billing_date,
            contact_id: api.contact_id,
            company_id: api.company_id,
            owner_id: api.owner_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionDBResponse {
    pub id: SubscriptionId,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub amount: Decimal,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_billing_date: Option<NaiveDate>,
    pub contact_id: Option<ContactId>,
    pub contact: Option<ContactSummary>,
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
