//! Database repository for deals.

use crate::types::{CompanyId, ContactId, DealId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        deals::DealStage,
        summaries::{UserSummary, joined_summary},
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::deals::{DealCreateDBRequest, DealDBResponse, DealUpdateDBRequest},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing deals
#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub owner_id: Option<UserId>,
    pub stage: Option<DealStage>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
}

impl DealFilter {
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

const SELECT_DEALS: &str = r#"
    SELECT d.id, d.name, d.amount, d.currency, d.stage, d.probability, d.expected_close_date,
           d.closed_at, d.description, d.contact_id, d.company_id, d.owner_id, d.created_at, d.updated_at,
           o.first_name AS owner_first_name, o.last_name AS owner_last_name, o.email AS owner_email,
           ct.first_name AS contact_first_name, ct.last_name AS contact_last_name, ct.email AS contact_email,
           co.name AS company_name
    FROM deals d
    JOIN users o ON o.id = d.owner_id
    LEFT JOIN contacts ct ON ct.id = d.contact_id
    LEFT JOIN companies co ON co.id = d.company_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Deal {
    pub id: DealId,
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub stage: DealStage,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub closed_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
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

impl From<Deal> for DealDBResponse {
    fn from(d: Deal) -> Self {
        Self {
            owner: UserSummary {
                id: d.owner_id,
                first_name: d.owner_first_name,
                last_name: d.owner_last_name,
                email: d.owner_email,
            },
            contact: joined_summary!(ContactSummary {
                id: d.contact_id,
                first_name: d.contact_first_name,
                last_name: d.contact_last_name,
                email: Some(d.contact_email),
            }),
            company: joined_summary!(CompanySummary {
                id: d.company_id,
                name: d.company_name
            }),
            id: d.id,
            name: d.name,
            amount: d.amount,
            currency: d.currency,
            stage: d.stage,
            probability: d.probability,
            expected_close_date: d.expected_close_date,
            closed_at: d.closed_at,
            description: d.description,
            contact_id: d.contact_id,
            company_id: d.company_id,
            owner_id: d.owner_id,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

pub struct Deals<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &DealFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["d.name", "d.description"], search);
    }
    push_eq(query, "d.owner_id", filter.owner_id);
    push_eq(query, "d.stage", filter.stage);
    push_eq(query, "d.contact_id", filter.contact_id);
    push_eq(query, "d.company_id", filter.company_id);
}

#[async_trait::async_trait]
impl<'c> Repository for Deals<'c> {
    type CreateRequest = DealCreateDBRequest;
    type UpdateRequest = DealUpdateDBRequest;
    type Response = DealDBResponse;
    type Id = DealId;
    type Filter = DealFilter;

    #[instrument(skip(self, request), fields(name = %request.name, owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: DealId = sqlx::query_scalar(
            r#"
            INSERT INTO deals (name, amount, currency, stage, probability, expected_close_date, closed_at,
                               description, contact_id, company_id, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $7 THEN NOW() END, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.stage)
        .bind(request.probability)
        .bind(request.expected_close_date)
        .bind(request.stage.is_closed())
        .bind(&request.description)
        .bind(request.contact_id)
        .bind(request.company_id)
        .bind(request.owner_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(deal_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_DEALS);
        query.push(" WHERE d.id = ");
        query.push_bind(id);

        let deal = query.build_query_as::<Deal>().fetch_optional(&mut *self.db).await?;
        Ok(deal.map(DealDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_DEALS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY d.created_at DESC, d.id");
        push_page(&mut query, filter.skip, filter.limit);

        let deals = query.build_query_as::<Deal>().fetch_all(&mut *self.db).await?;
        Ok(deals.into_iter().map(DealDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM deals d WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(deal_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(deal_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("deals");
        update
            .set("name", request.name.clone())
            .set("amount", request.amount)
            .set("currency", request.currency.clone())
            .set("stage", request.stage)
            .set("probability", request.probability)
            .set("expected_close_date", request.expected_close_date)
            .set("description", request.description.clone())
            .set("contact_id", request.contact_id)
            .set("company_id", request.company_id)
            .set("owner_id", request.owner_id);
        match request.stage {
            Some(stage) if stage.is_closed() => update.set_expr("closed_at", "COALESCE(closed_at, NOW())"),
            Some(_) => update.set_expr("closed_at", "NULL"),
            None => &mut update,
        };
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Deals<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::Contacts;
    use crate::db::models::contacts::ContactCreateDBRequest;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_contact(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let contact = Contacts::new(&mut conn)
            .create(&ContactCreateDBRequest {
                email: Some("buyer@example.com".to_string()),
                ..ContactCreateDBRequest::minimal("Bea", "Buyer", owner.id)
            })
            .await
            .unwrap();

        let mut repo = Deals::new(&mut conn);
        let deal = repo
            .create(&DealCreateDBRequest {
                contact_id: Some(contact.id),
                probability: 40,
                ..DealCreateDBRequest::minimal("Pilot", Decimal::new(1200, 0), DealStage::Proposal, owner.id)
            })
            .await
            .unwrap();

        assert_eq!(deal.amount, Decimal::new(1200, 0));
        assert_eq!(deal.currency, "USD");
        assert_eq!(deal.probability, 40);
        assert!(deal.closed_at.is_none());
        let summary = deal.contact.unwrap();
        assert_eq!(summary.id, contact.id);
        assert_eq!(summary.email.as_deref(), Some("buyer@example.com"));
        assert!(deal.company.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_closed_at_follows_stage(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Deals::new(&mut conn);

        let won_at_birth = repo
            .create(&DealCreateDBRequest::minimal("Instant", Decimal::ONE, DealStage::ClosedWon, owner.id))
            .await
            .unwrap();
        assert!(won_at_birth.closed_at.is_some());

        let deal = repo
            .create(&DealCreateDBRequest::minimal("Slow", Decimal::ONE, DealStage::Lead, owner.id))
            .await
            .unwrap();

        let closed = repo
            .update(
                deal.id,
                &DealUpdateDBRequest {
                    stage: Some(DealStage::ClosedLost),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let closed_at = closed.closed_at.expect("closing sets closed_at");

        // Renaming a closed deal keeps its close date
        let renamed = repo
            .update(
                deal.id,
                &DealUpdateDBRequest {
                    name: Some("Slow (lost)".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.closed_at, Some(closed_at));

        let reopened = repo
            .update(
                deal.id,
                &DealUpdateDBRequest {
                    stage: Some(DealStage::Negotiation),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(reopened.closed_at.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_check_constraints(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Deals::new(&mut conn);

        let negative = repo
            .create(&DealCreateDBRequest::minimal("Bad", Decimal::NEGATIVE_ONE, DealStage::Lead, owner.id))
            .await;
        assert!(matches!(negative, Err(DbError::CheckViolation { .. })));

        let improbable = repo
            .create(&DealCreateDBRequest {
                probability: 150,
                ..DealCreateDBRequest::minimal("Bad", Decimal::ONE, DealStage::Lead, owner.id)
            })
            .await;
        assert!(matches!(improbable, Err(DbError::CheckViolation { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_filters_and_search(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Deals::new(&mut conn);

        repo.create(&DealCreateDBRequest {
            description: Some("Annual SUPPORT contract".to_string()),
            ..DealCreateDBRequest::minimal("Support", Decimal::TEN, DealStage::Negotiation, owner.id)
        })
        .await
        .unwrap();
        repo.create(&DealCreateDBRequest::minimal("Licences", Decimal::TEN, DealStage::ClosedWon, owner.id))
            .await
            .unwrap();

        let search = DealFilter::new(0, 10).with_search("support contract".to_string());
        assert_eq!(repo.list(&search).await.unwrap().len(), 1);

        let won = DealFilter {
            stage: Some(DealStage::ClosedWon),
            ..DealFilter::new(0, 10)
        };
        let found = repo.list(&won).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Licences");
        assert_eq!(repo.count(&DealFilter::new(0, 1)).await.unwrap(), 2);
    }
}
