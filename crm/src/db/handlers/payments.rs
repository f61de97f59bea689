//! Database repository for payments.

use crate::types::{CompanyId, ContactId, PaymentId, SubscriptionId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        payments::{PaymentMethod, PaymentStatus},
        summaries::{UserSummary, joined_summary},
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing payments
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub owner_id: Option<UserId>,
    pub status: Option<PaymentStatus>,
    pub subscription_id: Option<SubscriptionId>,
    pub contact_id: Option<ContactId>,
}

impl PaymentFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: String) -> Self {
        self.search = Some(search);
        self
    }
}

const SELECT_PAYMENTS: &str = r#"
    SELECT p.id, p.amount, p.currency, p.status, p.method, p.paid_at, p.reference, p.notes,
           p.subscription_id, p.contact_id, p.company_id, p.owner_id, p.created_at, p.updated_at,
           o.first_name AS owner_first_name, o.last_name AS owner_last_name, o.email AS owner_email,
           s.plan_name AS subscription_plan_name,
           ct.first_name AS contact_first_name, ct.last_name AS contact_last_name, ct.email AS contact_email,
           co.name AS company_name
    FROM payments p
    JOIN users o ON o.id = p.owner_id
    LEFT JOIN subscriptions s ON s.id = p.subscription_id
    LEFT JOIN contacts ct ON ct.id = p.contact_id
    LEFT JOIN companies co ON co.id = p.company_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Payment {
    pub id: PaymentId,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
    pub subscription_plan_name: Option<String>,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub contact_email: Option<String>,
    pub company_name: Option<String>,
}

impl From<Payment> for PaymentDBResponse {
    fn from(p: Payment) -> Self {
        Self {
            owner: UserSummary {
                id: p.owner_id,
                first_name: p.owner_first_name,
                last_name: p.owner_last_name,
                email: p.owner_email,
            },
            subscription: joined_summary!(SubscriptionSummary {
                id: p.subscription_id,
                plan_name: p.subscription_plan_name
            }),
            contact: joined_summary!(ContactSummary {
                id: p.contact_id,
                first_name: p.contact_first_name,
                last_name: p.contact_last_name,
                email: Some(p.contact_email),
            }),
            company: joined_summary!(CompanySummary {
                id: p.company_id,
                name: p.company_name
            }),
            id: p.id,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            method: p.method,
            paid_at: p.paid_at,
            reference: p.reference,
            notes: p.notes,
            subscription_id: p.subscription_id,
            contact_id: p.contact_id,
            company_id: p.company_id,
            owner_id: p.owner_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &PaymentFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["p.reference", "p.notes"], search);
    }
    push_eq(query, "p.owner_id", filter.owner_id);
    push_eq(query, "p.status", filter.status);
    push_eq(query, "p.subscription_id", filter.subscription_id);
    push_eq(query, "p.contact_id", filter.contact_id);
}

#[async_trait::async_trait]
impl<'c> Repository for Payments<'c> {
    type CreateRequest = PaymentCreateDBRequest;
    type UpdateRequest = PaymentUpdateDBRequest;
    type Response = PaymentDBResponse;
    type Id = PaymentId;
    type Filter = PaymentFilter;

    #[instrument(skip(self, request), fields(amount = %request.amount, owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: PaymentId = sqlx::query_scalar(
            r#"
            INSERT INTO payments (amount, currency, status, method, paid_at, reference, notes,
                                  subscription_id, contact_id, company_id, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.status)
        .bind(request.method)
        .bind(request.paid_at)
        .bind(&request.reference)
        .bind(&request.notes)
        .bind(request.subscription_id)
        .bind(request.contact_id)
        .bind(request.company_id)
        .bind(request.owner_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_PAYMENTS);
        query.push(" WHERE p.id = ");
        query.push_bind(id);

        let payment = query.build_query_as::<Payment>().fetch_optional(&mut *self.db).await?;
        Ok(payment.map(PaymentDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_PAYMENTS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY p.created_at DESC, p.id");
        push_page(&mut query, filter.skip, filter.limit);

        let payments = query.build_query_as::<Payment>().fetch_all(&mut *self.db).await?;
        Ok(payments.into_iter().map(PaymentDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM payments p WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("payments");
        update
            .set("amount", request.amount)
            .set("currency", request.currency.clone())
            .set("status", request.status)
            .set("method", request.method)
            .set("paid_at", request.paid_at)
            .set("reference", request.reference.clone())
            .set("notes", request.notes.clone())
            .set("subscription_id", request.subscription_id)
            .set("contact_id", request.contact_id)
            .set("company_id", request.company_id)
            .set("owner_id", request.owner_id);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}
