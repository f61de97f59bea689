//! Database repository for campaigns.

use crate::types::{CampaignId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        campaigns::{CampaignStatus, CampaignType},
        summaries::UserSummary,
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::campaigns::{CampaignCreateDBRequest, CampaignDBResponse, CampaignUpdateDBRequest},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing campaigns
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub owner_id: Option<UserId>,
    pub campaign_type: Option<CampaignType>,
    pub status: Option<CampaignStatus>,
}

impl CampaignFilter {
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

const SELECT_CAMPAIGNS: &str = r#"
    SELECT c.id, c.name, c.description, c.campaign_type, c.status, c.start_date, c.end_date,
           c.budget, c.spent, c.impressions, c.clicks, c.conversions, c.owner_id, c.created_at, c.updated_at,
           o.first_name AS owner_first_name, o.last_name AS owner_last_name, o.email AS owner_email
    FROM campaigns c
    JOIN users o ON o.id = c.owner_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
    pub spent: Decimal,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
}

impl From<Campaign> for CampaignDBResponse {
    fn from(c: Campaign) -> Self {
        Self {
            owner: UserSummary {
                id: c.owner_id,
                first_name: c.owner_first_name,
                last_name: c.owner_last_name,
                email: c.owner_email,
            },
            id: c.id,
            name: c.name,
            description: c.description,
            campaign_type: c.campaign_type,
            status: c.status,
            start_date: c.start_date,
            end_date: c.end_date,
            budget: c.budget,
            spent: c.spent,
            impressions: c.impressions,
            clicks: c.clicks,
            conversions: c.conversions,
            owner_id: c.owner_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

pub struct Campaigns<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &CampaignFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["c.name", "c.description"], search);
    }
    push_eq(query, "c.owner_id", filter.owner_id);
    push_eq(query, "c.campaign_type", filter.campaign_type);
    push_eq(query, "c.status", filter.status);
}

#[async_trait::async_trait]
impl<'c> Repository for Campaigns<'c> {
    type CreateRequest = CampaignCreateDBRequest;
    type UpdateRequest = CampaignUpdateDBRequest;
    type Response = CampaignDBResponse;
    type Id = CampaignId;
    type Filter = CampaignFilter;

    #[instrument(skip(self, request), fields(name = %request.name, owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: CampaignId = sqlx::query_scalar(
            r#"
            INSERT INTO campaigns (name, description, campaign_type, status, start_date, end_date,
                                   budget, spent, impressions, clicks, conversions, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.campaign_type)
        .bind(request.status)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.budget)
        .bind(request.spent)
        .bind(request.impressions)
        .bind(request.clicks)
        .bind(request.conversions)
        .bind(request.owner_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(campaign_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_CAMPAIGNS);
        query.push(" WHERE c.id = ");
        query.push_bind(id);

        let campaign = query.build_query_as::<Campaign>().fetch_optional(&mut *self.db).await?;
        Ok(campaign.map(CampaignDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_CAMPAIGNS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY c.created_at DESC, c.id");
        push_page(&mut query, filter.skip, filter.limit);

        let campaigns = query.build_query_as::<Campaign>().fetch_all(&mut *self.db).await?;
        Ok(campaigns.into_iter().map(CampaignDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM campaigns c WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(campaign_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(campaign_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("campaigns");
        update
            .set("name", request.name.clone())
            .set("description", request.description.clone())
            .set("campaign_type", request.campaign_type)
            .set("status", request.status)
            .set("start_date", request.start_date)
            .set("end_date", request.end_date)
            .set("budget", request.budget)
            .set("spent", request.spent)
            .set("impressions", request.impressions)
            .set("clicks", request.clicks)
            .set("conversions", request.conversions)
            .set("owner_id", request.owner_id);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Campaigns<'c> {
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
    async fn test_create_and_update_counters(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Campaigns::new(&mut conn);

        let campaign = repo
            .create(&CampaignCreateDBRequest {
                budget: Some(Decimal::new(500000, 2)),
                start_date: NaiveDate::from_ymd_opt(2026, 4, 1),
                end_date: NaiveDate::from_ymd_opt(2026, 4, 30),
                ..CampaignCreateDBRequest::minimal("April webinar", owner.id)
            })
            .await
            .unwrap();
        assert_eq!(campaign.budget, Some(Decimal::new(500000, 2)));
        assert_eq!(campaign.status, CampaignStatus::Draft);

        let updated = repo
            .update(
                campaign.id,
                &CampaignUpdateDBRequest {
                    status: Some(CampaignStatus::Active),
                    impressions: Some(1200),
                    clicks: Some(60),
                    budget: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, CampaignStatus::Active);
        assert_eq!(updated.impressions, 1200);
        assert_eq!(updated.clicks, 60);
        assert_eq!(updated.budget, None);
        assert_eq!(updated.name, "April webinar");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rejects_inverted_dates_and_negative_counters(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Campaigns::new(&mut conn);

        let inverted = repo
            .create(&CampaignCreateDBRequest {
                start_date: NaiveDate::from_ymd_opt(2026, 5, 10),
                end_date: NaiveDate::from_ymd_opt(2026, 5, 1),
                ..CampaignCreateDBRequest::minimal("Backwards", owner.id)
            })
            .await;
        assert!(matches!(inverted, Err(DbError::CheckViolation { .. })));

        let negative = repo
            .create(&CampaignCreateDBRequest {
                clicks: -1,
                ..CampaignCreateDBRequest::minimal("Negative", owner.id)
            })
            .await;
        assert!(matches!(negative, Err(DbError::CheckViolation { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_filters(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Campaigns::new(&mut conn);

        repo.create(&CampaignCreateDBRequest {
            campaign_type: CampaignType::Webinar,
            status: CampaignStatus::Active,
            ..CampaignCreateDBRequest::minimal("Live demo", owner.id)
        })
        .await
        .unwrap();
        repo.create(&CampaignCreateDBRequest::minimal("Newsletter", owner.id))
            .await
            .unwrap();

        let active = CampaignFilter {
            status: Some(CampaignStatus::Active),
            ..CampaignFilter::new(0, 10)
        };
        assert_eq!(repo.list(&active).await.unwrap()[0].name, "Live demo");

        let email = CampaignFilter {
            campaign_type: Some(CampaignType::Email),
            ..CampaignFilter::new(0, 10)
        };
        assert_eq!(repo.count(&email).await.unwrap(), 1);

        let search = CampaignFilter::new(0, 10).with_search("LETTER".to_string());
        assert_eq!(repo.list(&search).await.unwrap()[0].name, "Newsletter");
    }
}
