//! Database repository for subscriptions.

use crate::types::{CompanyId, ContactId, SubscriptionId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        subscriptions::{BillingCycle, SubscriptionStatus},
        summaries::{UserSummary, joined_summary},
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::subscriptions::{SubscriptionCreateDBRequest, SubscriptionDBResponse, SubscriptionUpdateDBRequest},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing subscriptions
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub owner_id: Option<UserId>,
    pub status: Option<SubscriptionStatus>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
}

impl SubscriptionFilter {
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

const SELECT_SUBSCRIPTIONS: &str = r#"
    SELECT s.id, s.plan_name, s.status, s.billing_cycle, s.amount, s.currency, s.start_date, s.end_date,
           s.next_billing_date, s.contact_id, s.company_id, s.owner_id, s.created_at, s.updated_at,
           o.first_name AS owner_first_name, o.last_name AS owner_last_name, o.email AS owner_email,
           ct.first_name AS contact_first_name, ct.last_name AS contact_last_name, ct.email AS contact_email,
           co.name AS company_name
    FROM subscriptions s
    JOIN users o ON o.id = s.owner_id
    LEFT JOIN contacts ct ON ct.id = s.contact_id
    LEFT JOIN companies co ON co.id = s.company_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Subscription {
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
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub contact_email: Option<String>,
    pub company_name: Option<String>,
}

impl From<Subscription> for SubscriptionDBResponse {
    fn from(s: Subscription) -> Self {
        Self {
            owner: UserSummary {
                id: s.owner_id,
                first_name: s.owner_first_name,
                last_name: s.owner_last_name,
                email: s.owner_email,
            },
            contact: joined_summary!(ContactSummary {
                id: s.contact_id,
                first_name: s.contact_first_name,
                last_name: s.contact_last_name,
                email: Some(s.contact_email),
            }),
            company: joined_summary!(CompanySummary {
                id: s.company_id,
                name: s.company_name
            }),
            id: s.id,
            plan_name: s.plan_name,
            status: s.status,
            billing_cycle: s.billing_cycle,
            amount: s.amount,
            currency: s.currency,
            start_date: s.start_date,
            end_date: s.end_date,
            next_billing_date: s.next_billing_date,
            contact_id: s.contact_id,
            company_id: s.company_id,
            owner_id: s.owner_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

pub struct Subscriptions<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &SubscriptionFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["s.plan_name"], search);
    }
    push_eq(query, "s.owner_id", filter.owner_id);
    push_eq(query, "s.status", filter.status);
    push_eq(query, "s.contact_id", filter.contact_id);
    push_eq(query, "s.company_id", filter.company_id);
}

#[async_trait::async_trait]
impl<'c> Repository for Subscriptions<'c> {
    type CreateRequest = SubscriptionCreateDBRequest;
    type UpdateRequest = SubscriptionUpdateDBRequest;
    type Response = SubscriptionDBResponse;
    type Id = SubscriptionId;
    type Filter = SubscriptionFilter;

    #[instrument(skip(self, request), fields(plan = %request.plan_name, owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: SubscriptionId = sqlx::query_scalar(
            r#"
            INSERT INTO subscriptions (plan_name, status, billing_cycle, amount, currency, start_date,
                                       end_date, next_billing_date, contact_id, company_id, owner_id)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, CURRENT_DATE), $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&request.plan_name)
        .bind(request.status)
        .bind(request.billing_cycle)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.next_billing_date)
        .bind(request.contact_id)
        .bind(request.company_id)
        .bind(request.owner_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_SUBSCRIPTIONS);
        query.push(" WHERE s.id = ");
        query.push_bind(id);

        let subscription = query.build_query_as::<Subscription>().fetch_optional(&mut *self.db).await?;
        Ok(subscription.map(SubscriptionDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_SUBSCRIPTIONS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY s.created_at DESC, s.id");
        push_page(&mut query, filter.skip, filter.limit);

        let subscriptions = query.build_query_as::<Subscription>().fetch_all(&mut *self.db).await?;
        Ok(subscriptions.into_iter().map(SubscriptionDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM subscriptions s WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("subscriptions");
        update
            .set("plan_name", request.plan_name.clone())
            .set("status", request.status)
            .set("billing_cycle", request.billing_cycle)
            .set("amount", request.amount)
            .set("currency", request.currency.clone())
            .set("start_date", request.start_date)
            .set("end_date", request.end_date)
            .set("next_billing_date", request.next_billing_date)
            .set("contact_id", request.contact_id)
            .set("company_id", request.company_id)
            .set("owner_id", request.owner_id);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_start_date_defaults_to_today(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let today: NaiveDate = sqlx::query_scalar("SELECT CURRENT_DATE").fetch_one(&mut *repo.db).await.unwrap();
        let subscription = repo
            .create(&SubscriptionCreateDBRequest::minimal("Starter", Decimal::new(1900, 2), owner.id))
            .await
            .unwrap();
        assert_eq!(subscription.start_date, today);
        assert_eq!(subscription.currency, "USD");
        assert_eq!(subscription.owner.id, owner.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_end_date_cannot_precede_start(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let result = repo
            .create(&SubscriptionCreateDBRequest {
                start_date: NaiveDate::from_ymd_opt(2026, 1, 31),
                end_date: NaiveDate::from_ymd_opt(2026, 1, 1),
                ..SubscriptionCreateDBRequest::minimal("Backwards", Decimal::ONE, owner.id)
            })
            .await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_filter(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let pro = repo
            .create(&SubscriptionCreateDBRequest {
                next_billing_date: NaiveDate::from_ymd_opt(2026, 2, 1),
                ..SubscriptionCreateDBRequest::minimal("Pro Annual", Decimal::new(49900, 2), owner.id)
            })
            .await
            .unwrap();
        repo.create(&SubscriptionCreateDBRequest::minimal("Starter", Decimal::TEN, owner.id))
            .await
            .unwrap();

        let cancelled = repo
            .update(
                pro.id,
                &SubscriptionUpdateDBRequest {
                    status: Some(SubscriptionStatus::Cancelled),
                    next_billing_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert_eq!(cancelled.next_billing_date, None);

        let filter = SubscriptionFilter {
            status: Some(SubscriptionStatus::Active),
            ..SubscriptionFilter::new(0, 10)
        };
        let active = repo.list(&filter).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].plan_name, "Starter");

        let search = SubscriptionFilter::new(0, 10).with_search("annual".to_string());
        assert_eq!(repo.count(&search).await.unwrap(), 1);
    }
}
