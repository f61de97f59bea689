//! Database models for payments.

use crate::api::models::payments::{PaymentCreate, PaymentMethod, PaymentStatus, PaymentUpdate};
use crate::api::models::summaries::{CompanySummary, ContactSummary, SubscriptionSummary, UserSummary};
use crate::types::{CompanyId, ContactId, PaymentId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for recording a new payment
#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub subscription_id: Option<SubscriptionId>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
}

impl PaymentCreateDBRequest {
    pub fn new(current_user_id: UserId, api: PaymentCreate) -> Self {
        Self {
            amount: api.amount,
            currency: api.currency.unwrap_or_else(|| "USD".to_string()),
            status: api.status.unwrap_or_default(),
            method: api.method.unwrap_or_default(),
            paid_at: api.paid_at,
            reference: api.reference,
            notes: api.notes,
            subscription_id: api.subscription_id,
            contact_id: api.contact_id,
            company_id: api.company_id,
            owner_id: api.owner_id.unwrap_or(current_user_id),
        }
    }

    #[cfg(test)]
    pub fn minimal(amount: Decimal, owner_id: UserId) -> Self {
        Self {
            amount,
            currency: "USD".to_string(),
            status: PaymentStatus::Pending,
            method: PaymentMethod::Card,
            paid_at: None,
            reference: None,
            notes: None,
            subscription_id: None,
            contact_id: None,
            company_id: None,
            owner_id,
        }
    }
}

/// Database request for updating a payment
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdateDBRequest {
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub paid_at: Option<Option<DateTime<Utc>>>,
    pub reference: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub subscription_id: Option<Option<SubscriptionId>>,
    pub contact_id: Option<Option<ContactId>>,
    pub company_id: Option<Option<CompanyId>>,
    pub owner_id: Option<UserId>,
}

impl From<PaymentUpdate> for PaymentUpdateDBRequest {
    fn from(api: PaymentUpdate) -> Self {
        Self {
            amount: api.amount,
            currency: api.currency,
            status: api.status,
            method: api.method,
            paid_at: api.paid_at,
            reference: api.reference,
            notes: api.notes,
            subscription_id: api.subscription_id,
            contact_id: api.contact_id,
            company_id: api.company_id,
            owner_id: api.owner_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentDBResponse {
    pub id: PaymentId,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub subscription_id: Option<SubscriptionId>,
    pub subscription: Option<SubscriptionSummary>,
    pub contact_id: Option<ContactId>,
    pub contact: Option<ContactSummary>,
    pub company_id: Option<CompanyId>,
    pub company: Option<CompanySummary>,
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
