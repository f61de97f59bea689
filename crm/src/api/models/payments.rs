//! API request/response models for payments.

use super::pagination::{Pagination, paginated_response};
use super::summaries::{CompanySummary, ContactSummary, SubscriptionSummary, UserSummary};
use crate::db::models::payments::PaymentDBResponse;
use crate::types::{CompanyId, ContactId, PaymentId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    BankTransfer,
    Cash,
    Paypal,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreate {
    /// Must be positive
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// ISO 4217 code, defaults to USD
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub paid_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub subscription_id: Option<SubscriptionId>,
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
pub struct PaymentUpdate {
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub paid_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub reference: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub subscription_id: Option<Option<SubscriptionId>>,
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
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub subscription_id: Option<SubscriptionId>,
    pub subscription: Option<SubscriptionSummary>,
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

paginated_response!(PaymentListResponse, PaymentResponse, payments);

/// Query parameters for listing payments
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on reference or notes
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,

    pub status: Option<PaymentStatus>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub subscription_id: Option<SubscriptionId>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub contact_id: Option<ContactId>,
}

impl From<PaymentDBResponse> for PaymentResponse {
    fn from(db: PaymentDBResponse) -> Self {
        Self {
            id: db.id,
            amount: db.amount,
            currency: db.currency,
            status: db.status,
            method: db.method,
            paid_at: db.paid_at,
            reference: db.reference,
            notes: db.notes,
            subscription_id: db.subscription_id,
            subscription: db.subscription,
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
