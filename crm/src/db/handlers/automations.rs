//! Database repository for automations.

use crate::types::{AutomationId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        automations::{AutomationStatus, AutomationTrigger},
        summaries::UserSummary,
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::automations::{AutomationCreateDBRequest, AutomationDBResponse, AutomationUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing automations
#[derive(Debug, Clone, Default)]
pub struct AutomationFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub owner_id: Option<UserId>,
    pub trigger_type: Option<AutomationTrigger>,
    pub status: Option<AutomationStatus>,
}

impl AutomationFilter {
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

const SELECT_AUTOMATIONS: &str = r#"
    SELECT au.id, au.name, au.description, au.trigger_type, au.status, au.conditions, au.actions,
           au.owner_id, au.created_at, au.updated_at,
           o.first_name AS owner_first_name, o.last_name AS owner_last_name, o.email AS owner_email
    FROM automations au
    JOIN users o ON o.id = au.owner_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Automation {
    pub id: AutomationId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: AutomationTrigger,
    pub status: AutomationStatus,
    pub conditions: Value,
    pub actions: Value,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
}

impl From<Automation> for AutomationDBResponse {
    fn from(a: Automation) -> Self {
        Self {
            owner: UserSummary {
                id: a.owner_id,
                first_name: a.owner_first_name,
                last_name: a.owner_last_name,
                email: a.owner_email,
            },
            id: a.id,
            name: a.name,
            description: a.description,
            trigger_type: a.trigger_type,
            status: a.status,
            conditions: a.conditions,
            actions: a.actions,
            owner_id: a.owner_id,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

pub struct Automations<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &AutomationFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["au.name", "au.description"], search);
    }
    push_eq(query, "au.owner_id", filter.owner_id);
    push_eq(query, "au.trigger_type", filter.trigger_type);
    push_eq(query, "au.status", filter.status);
}

#[async_trait::async_trait]
impl<'c> Repository for Automations<'c> {
    type CreateRequest = AutomationCreateDBRequest;
    type UpdateRequest = AutomationUpdateDBRequest;
    type Response = AutomationDBResponse;
    type Id = AutomationId;
    type Filter = AutomationFilter;

    #[instrument(skip(self, request), fields(name = %request.name, owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: AutomationId = sqlx::query_scalar(
            r#"
            INSERT INTO automations (name, description, trigger_type, status, conditions, actions, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.trigger_type)
        .bind(request.status)
        .bind(&request.conditions)
        .bind(&request.actions)
        .bind(request.owner_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(automation_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_AUTOMATIONS);
        query.push(" WHERE au.id = ");
        query.push_bind(id);

        let automation = query.build_query_as::<Automation>().fetch_optional(&mut *self.db).await?;
        Ok(automation.map(AutomationDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_AUTOMATIONS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY au.created_at DESC, au.id");
        push_page(&mut query, filter.skip, filter.limit);

        let automations = query.build_query_as::<Automation>().fetch_all(&mut *self.db).await?;
        Ok(automations.into_iter().map(AutomationDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM automations au WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(automation_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM automations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(automation_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("automations");
        update
            .set("name", request.name.clone())
            .set("description", request.description.clone())
            .set("trigger_type", request.trigger_type)
            .set("status", request.status)
            .set("conditions", request.conditions.clone())
            .set("actions", request.actions.clone())
            .set("owner_id", request.owner_id);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Automations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}
