//! Database repository for companies.

use crate::types::{CompanyId, UserId, abbrev_uuid};
use crate::{
    api::models::{contacts::LifecycleStage, summaries::UserSummary},
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::companies::{CompanyCreateDBRequest, CompanyDBResponse, CompanyUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing companies
#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub owner_id: Option<UserId>,
    pub lifecycle_stage: Option<LifecycleStage>,
    pub industry: Option<String>,
}

impl CompanyFilter {
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

const SELECT_COMPANIES: &str = r#"
    SELECT c.id, c.name, c.domain, c.industry, c.phone, c.address, c.city, c.country,
           c.employee_count, c.annual_revenue, c.lifecycle_stage, c.tags, c.notes, c.owner_id,
           c.created_at, c.updated_at,
           o.first_name AS owner_first_name, o.last_name AS owner_last_name, o.email AS owner_email,
           (SELECT COUNT(*) FROM contacts ct WHERE ct.company_id = c.id) AS contacts_count
    FROM companies c
    JOIN users o ON o.id = c.owner_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Company {
    pub id: CompanyId,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub employee_count: Option<i32>,
    pub annual_revenue: Option<Decimal>,
    pub lifecycle_stage: LifecycleStage,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
    pub contacts_count: i64,
}

impl From<Company> for CompanyDBResponse {
    fn from(c: Company) -> Self {
        Self {
            owner: UserSummary {
                id: c.owner_id,
                first_name: c.owner_first_name,
                last_name: c.owner_last_name,
                email: c.owner_email,
            },
            id: c.id,
            name: c.name,
            domain: c.domain,
            industry: c.industry,
            phone: c.phone,
            address: c.address,
            city: c.city,
            country: c.country,
            employee_count: c.employee_count,
            annual_revenue: c.annual_revenue,
            lifecycle_stage: c.lifecycle_stage,
            tags: c.tags,
            notes: c.notes,
            owner_id: c.owner_id,
            contacts_count: c.contacts_count,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

pub struct Companies<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &CompanyFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["c.name", "c.domain", "c.industry"], search);
    }
    push_eq(query, "c.owner_id", filter.owner_id);
    push_eq(query, "c.lifecycle_stage", filter.lifecycle_stage);
    push_eq(query, "c.industry", filter.industry.clone());
}

#[async_trait::async_trait]
impl<'c> Repository for Companies<'c> {
    type CreateRequest = CompanyCreateDBRequest;
    type UpdateRequest = CompanyUpdateDBRequest;
    type Response = CompanyDBResponse;
    type Id = CompanyId;
    type Filter = CompanyFilter;

    #[instrument(skip(self, request), fields(name = %request.name, owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: CompanyId = sqlx::query_scalar(
            r#"
            INSERT INTO companies (name, domain, industry, phone, address, city, country, employee_count,
                                   annual_revenue, lifecycle_stage, tags, notes, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(&request.domain)
        .bind(&request.industry)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.country)
        .bind(request.employee_count)
        .bind(request.annual_revenue)
        .bind(request.lifecycle_stage)
        .bind(&request.tags)
        .bind(&request.notes)
        .bind(request.owner_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(company_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_COMPANIES);
        query.push(" WHERE c.id = ");
        query.push_bind(id);

        let company = query.build_query_as::<Company>().fetch_optional(&mut *self.db).await?;
        Ok(company.map(CompanyDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_COMPANIES);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY c.created_at DESC, c.id");
        push_page(&mut query, filter.skip, filter.limit);

        let companies = query.build_query_as::<Company>().fetch_all(&mut *self.db).await?;
        Ok(companies.into_iter().map(CompanyDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM companies c WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(company_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("companies");
        update
            .set("name", request.name.clone())
            .set("domain", request.domain.clone())
            .set("industry", request.industry.clone())
            .set("phone", request.phone.clone())
            .set("address", request.address.clone())
            .set("city", request.city.clone())
            .set("country", request.country.clone())
            .set("employee_count", request.employee_count)
            .set("annual_revenue", request.annual_revenue)
            .set("lifecycle_stage", request.lifecycle_stage)
            .set("tags", request.tags.clone())
            .set("notes", request.notes.clone())
            .set("owner_id", request.owner_id);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Companies<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::{Contacts, contacts::ContactFilter};
    use crate::db::models::contacts::ContactCreateDBRequest;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    fn company(name: &str, owner_id: UserId) -> CompanyCreateDBRequest {
        CompanyCreateDBRequest {
            name: name.to_string(),
            domain: None,
            industry: None,
            phone: None,
            address: None,
            city: None,
            country: None,
            employee_count: None,
            annual_revenue: None,
            lifecycle_stage: LifecycleStage::Lead,
            tags: vec![],
            notes: None,
            owner_id,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_loads_owner_and_defaults(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        let created = repo
            .create(&CompanyCreateDBRequest {
                tags: vec!["enterprise".to_string()],
                annual_revenue: Some(Decimal::new(1_500_000_00, 2)),
                ..company("Acme", owner.id)
            })
            .await
            .unwrap();

        assert_eq!(created.name, "Acme");
        assert_eq!(created.owner.id, owner.id);
        assert_eq!(created.owner.email, owner.email);
        assert_eq!(created.tags, vec!["enterprise".to_string()]);
        assert_eq!(created.contacts_count, 0);
        assert_eq!(created.annual_revenue, Some(Decimal::new(1_500_000, 0)));

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, created.name);
        assert_eq!(fetched.lifecycle_stage, LifecycleStage::Lead);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_contacts_count_and_set_null_on_delete(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();

        let acme = Companies::new(&mut conn).create(&company("Acme", owner.id)).await.unwrap();
        let contact = Contacts::new(&mut conn)
            .create(&ContactCreateDBRequest {
                company_id: Some(acme.id),
                ..ContactCreateDBRequest::minimal("Ada", "Lovelace", owner.id)
            })
            .await
            .unwrap();

        let mut repo = Companies::new(&mut conn);
        assert_eq!(repo.get_by_id(acme.id).await.unwrap().unwrap().contacts_count, 1);
        assert!(repo.delete(acme.id).await.unwrap());
        assert!(repo.get_by_id(acme.id).await.unwrap().is_none());

        let orphan = Contacts::new(&mut conn).get_by_id(contact.id).await.unwrap().unwrap();
        assert_eq!(orphan.company_id, None);
        assert!(orphan.company.is_none());
        assert_eq!(
            Contacts::new(&mut conn).count(&ContactFilter::new(0, 10)).await.unwrap(),
            1
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_is_case_insensitive_substring(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        repo.create(&CompanyCreateDBRequest {
            domain: Some("globex.io".to_string()),
            ..company("Globex Corporation", owner.id)
        })
        .await
        .unwrap();
        repo.create(&CompanyCreateDBRequest {
            industry: Some("Software".to_string()),
            ..company("Initech", owner.id)
        })
        .await
        .unwrap();

        let by_name = CompanyFilter::new(0, 10).with_search("gLoBeX".to_string());
        assert_eq!(repo.list(&by_name).await.unwrap().len(), 1);

        let by_industry = CompanyFilter::new(0, 10).with_search("soft".to_string());
        let found = repo.list(&by_industry).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Initech");

        let exact_industry = CompanyFilter {
            industry: Some("Software".to_string()),
            ..CompanyFilter::new(0, 10)
        };
        assert_eq!(repo.count(&exact_industry).await.unwrap(), 1);
        assert_eq!(repo.count(&CompanyFilter::new(0, 10)).await.unwrap(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_treats_like_wildcards_literally(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        for name in ["Acme", "Globex", "100% Juice", "snake_case Labs"] {
            repo.create(&company(name, owner.id)).await.unwrap();
        }

        let percent = repo
            .list(&CompanyFilter::new(0, 10).with_search("%".to_string()))
            .await
            .unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].name, "100% Juice");

        let underscore = repo
            .list(&CompanyFilter::new(0, 10).with_search("_".to_string()))
            .await
            .unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].name, "snake_case Labs");

        let backslash = CompanyFilter::new(0, 10).with_search("\\".to_string());
        assert_eq!(repo.count(&backslash).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_is_newest_first_and_paginated(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        for name in ["First", "Second", "Third"] {
            repo.create(&company(name, owner.id)).await.unwrap();
        }

        let page = repo.list(&CompanyFilter::new(0, 2)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "Third");

        let rest = repo.list(&CompanyFilter::new(2, 2)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "First");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_partial_and_clear(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let new_owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        let created = repo
            .create(&CompanyCreateDBRequest {
                city: Some("Madrid".to_string()),
                country: Some("Spain".to_string()),
                ..company("Acme", owner.id)
            })
            .await
            .unwrap();

        let updated = repo
            .update(
                created.id,
                &CompanyUpdateDBRequest {
                    city: Some(None),
                    lifecycle_stage: Some(LifecycleStage::Customer),
                    owner_id: Some(new_owner.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.city, None);
        assert_eq!(updated.country.as_deref(), Some("Spain"));
        assert_eq!(updated.lifecycle_stage, LifecycleStage::Customer);
        assert_eq!(updated.owner.id, new_owner.id);

        let missing = repo.update(uuid::Uuid::new_v4(), &CompanyUpdateDBRequest::default()).await;
        assert!(matches!(missing, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_owner_is_foreign_key_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        let err = repo.create(&company("Ghost", uuid::Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
