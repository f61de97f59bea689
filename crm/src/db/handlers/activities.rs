//! Database repository for activities.
//!
//! Activities are listed by `occurred_at` rather than insertion time, so a call logged after the
//! fact still lands in its place on the timeline.

use crate::types::{ActivityId, CompanyId, ContactId, DealId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        activities::ActivityType,
        deals::DealStage,
        summaries::{UserSummary, joined_summary},
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::activities::{ActivityCreateDBRequest, ActivityDBResponse, ActivityUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing activities
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub user_id: Option<UserId>,
    pub activity_type: Option<ActivityType>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub deal_id: Option<DealId>,
}

impl ActivityFilter {
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

const SELECT_ACTIVITIES: &str = r#"
    SELECT a.id, a.activity_type, a.subject, a.description, a.occurred_at, a.duration_minutes,
           a.user_id, a.contact_id, a.company_id, a.deal_id, a.created_at, a.updated_at,
           u.first_name AS user_first_name, u.last_name AS user_last_name, u.email AS user_email,
           ct.first_name AS contact_first_name, ct.last_name AS contact_last_name, ct.email AS contact_email,
           co.name AS company_name,
           d.name AS deal_name, d.stage AS deal_stage, d.amount AS deal_amount
    FROM activities a
    JOIN users u ON u.id = a.user_id
    LEFT JOIN contacts ct ON ct.id = a.contact_id
    LEFT JOIN companies co ON co.id = a.company_id
    LEFT JOIN deals d ON d.id = a.deal_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Activity {
    pub id: ActivityId,
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub user_id: UserId,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub deal_id: Option<DealId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_email: String,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub contact_email: Option<String>,
    pub company_name: Option<String>,
    pub deal_name: Option<String>,
    pub deal_stage: Option<DealStage>,
    pub deal_amount: Option<Decimal>,
}

impl From<Activity> for ActivityDBResponse {
    fn from(a: Activity) -> Self {
        Self {
            user: UserSummary {
                id: a.user_id,
                first_name: a.user_first_name,
                last_name: a.user_last_name,
                email: a.user_email,
            },
            contact: joined_summary!(ContactSummary {
                id: a.contact_id,
                first_name: a.contact_first_name,
                last_name: a.contact_last_name,
                email: Some(a.contact_email),
            }),
            company: joined_summary!(CompanySummary {
                id: a.company_id,
                name: a.company_name
            }),
            deal: joined_summary!(DealSummary {
                id: a.deal_id,
                name: a.deal_name,
                stage: a.deal_stage,
                amount: a.deal_amount,
            }),
            id: a.id,
            activity_type: a.activity_type,
            subject: a.subject,
            description: a.description,
            occurred_at: a.occurred_at,
            duration_minutes: a.duration_minutes,
            user_id: a.user_id,
            contact_id: a.contact_id,
            company_id: a.company_id,
            deal_id: a.deal_id,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

pub struct Activities<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ActivityFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["a.subject", "a.description"], search);
    }
    push_eq(query, "a.user_id", filter.user_id);
    push_eq(query, "a.activity_type", filter.activity_type);
    push_eq(query, "a.contact_id", filter.contact_id);
    push_eq(query, "a.company_id", filter.company_id);
    push_eq(query, "a.deal_id", filter.deal_id);
}

#[async_trait::async_trait]
impl<'c> Repository for Activities<'c> {
    type CreateRequest = ActivityCreateDBRequest;
    type UpdateRequest = ActivityUpdateDBRequest;
    type Response = ActivityDBResponse;
    type Id = ActivityId;
    type Filter = ActivityFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: ActivityId = sqlx::query_scalar(
            r#"
            INSERT INTO activities (activity_type, subject, description, occurred_at, duration_minutes,
                                    user_id, contact_id, company_id, deal_id)
            VALUES ($1, $2, $3, COALESCE($4, NOW()), $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(request.activity_type)
        .bind(&request.subject)
        .bind(&request.description)
        .bind(request.occurred_at)
        .bind(request.duration_minutes)
        .bind(request.user_id)
        .bind(request.contact_id)
        .bind(request.company_id)
        .bind(request.deal_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(activity_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_ACTIVITIES);
        query.push(" WHERE a.id = ");
        query.push_bind(id);

        let activity = query.build_query_as::<Activity>().fetch_optional(&mut *self.db).await?;
        Ok(activity.map(ActivityDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_ACTIVITIES);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY a.occurred_at DESC, a.id");
        push_page(&mut query, filter.skip, filter.limit);

        let activities = query.build_query_as::<Activity>().fetch_all(&mut *self.db).await?;
        Ok(activities.into_iter().map(ActivityDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM activities a WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(activity_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(activity_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("activities");
        update
            .set("activity_type", request.activity_type)
            .set("subject", request.subject.clone())
            .set("description", request.description.clone())
            .set("occurred_at", request.occurred_at)
            .set("duration_minutes", request.duration_minutes)
            .set("user_id", request.user_id)
            .set("contact_id", request.contact_id)
            .set("company_id", request.company_id)
            .set("deal_id", request.deal_id);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Activities<'c> {
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
    use chrono::Duration;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_listed_by_occurrence(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Activities::new(&mut conn);

        let now = Utc::now();
        repo.create(&ActivityCreateDBRequest {
            occurred_at: Some(now - Duration::days(3)),
            ..ActivityCreateDBRequest::minimal(ActivityType::Meeting, "Kickoff", user.id)
        })
        .await
        .unwrap();
        repo.create(&ActivityCreateDBRequest {
            occurred_at: Some(now - Duration::hours(1)),
            ..ActivityCreateDBRequest::minimal(ActivityType::Call, "Check-in", user.id)
        })
        .await
        .unwrap();
        repo.create(&ActivityCreateDBRequest {
            occurred_at: Some(now - Duration::days(1)),
            ..ActivityCreateDBRequest::minimal(ActivityType::Note, "Notes", user.id)
        })
        .await
        .unwrap();

        let subjects: Vec<_> = repo
            .list(&ActivityFilter::new(0, 10))
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.subject)
            .collect();
        assert_eq!(subjects, vec!["Check-in", "Notes", "Kickoff"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_occurred_at_defaults_to_now(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Activities::new(&mut conn);

        let before = Utc::now() - Duration::seconds(5);
        let activity = repo
            .create(&ActivityCreateDBRequest::minimal(ActivityType::Email, "Sent deck", user.id))
            .await
            .unwrap();
        assert!(activity.occurred_at >= before);
        assert_eq!(activity.user.id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_removed_with_contact(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let contact = Contacts::new(&mut conn)
            .create(&ContactCreateDBRequest::minimal("Short", "Lived", user.id))
            .await
            .unwrap();

        let activity = Activities::new(&mut conn)
            .create(&ActivityCreateDBRequest {
                contact_id: Some(contact.id),
                ..ActivityCreateDBRequest::minimal(ActivityType::Call, "Cold call", user.id)
            })
            .await
            .unwrap();
        assert_eq!(activity.contact.as_ref().map(|c| c.first_name.as_str()), Some("Short"));

        Contacts::new(&mut conn).delete(contact.id).await.unwrap();
        assert!(Activities::new(&mut conn).get_by_id(activity.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_filter_by_type_and_search(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Activities::new(&mut conn);

        repo.create(&ActivityCreateDBRequest {
            description: Some("Discussed PRICING tiers".to_string()),
            ..ActivityCreateDBRequest::minimal(ActivityType::Meeting, "Review", user.id)
        })
        .await
        .unwrap();
        repo.create(&ActivityCreateDBRequest::minimal(ActivityType::Call, "Quick call", user.id))
            .await
            .unwrap();

        let meetings = ActivityFilter {
            activity_type: Some(ActivityType::Meeting),
            ..ActivityFilter::new(0, 10)
        };
        assert_eq!(repo.count(&meetings).await.unwrap(), 1);

        let search = ActivityFilter::new(0, 10).with_search("pricing".to_string());
        let found = repo.list(&search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "Review");

        let updated = repo
            .update(
                found[0].id,
                &ActivityUpdateDBRequest {
                    duration_minutes: Some(Some(45)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.duration_minutes, Some(45));
    }
}
