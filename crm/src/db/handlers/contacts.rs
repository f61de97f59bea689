//! Database repository for contacts.

use crate::types::{CompanyId, ContactId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        contacts::LifecycleStage,
        summaries::{UserSummary, joined_summary},
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::contacts::{ContactCreateDBRequest, ContactDBResponse, ContactUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing contacts
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub owner_id: Option<UserId>,
    pub company_id: Option<CompanyId>,
    pub lifecycle_stage: Option<LifecycleStage>,
}

impl ContactFilter {
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

const SELECT_CONTACTS: &str = r#"
    SELECT c.id, c.first_name, c.last_name, c.email, c.phone, c.job_title, c.lifecycle_stage,
           c.lead_source, c.tags, c.notes, c.company_id, c.owner_id, c.created_at, c.updated_at,
           o.first_name AS owner_first_name, o.last_name AS owner_last_name, o.email AS owner_email,
           co.name AS company_name
    FROM contacts c
    JOIN users o ON o.id = c.owner_id
    LEFT JOIN companies co ON co.id = c.company_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub lifecycle_stage: LifecycleStage,
    pub lead_source: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub company_id: Option<CompanyId>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
    pub company_name: Option<String>,
}

impl From<Contact> for ContactDBResponse {
    fn from(c: Contact) -> Self {
        Self {
            owner: UserSummary {
                id: c.owner_id,
                first_name: c.owner_first_name,
                last_name: c.owner_last_name,
                email: c.owner_email,
            },
            company: joined_summary!(CompanySummary {
                id: c.company_id,
                name: c.company_name
            }),
            id: c.id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            phone: c.phone,
            job_title: c.job_title,
            lifecycle_stage: c.lifecycle_stage,
            lead_source: c.lead_source,
            tags: c.tags,
            notes: c.notes,
            company_id: c.company_id,
            owner_id: c.owner_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

pub struct Contacts<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ContactFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["c.first_name", "c.last_name", "c.email"], search);
    }
    push_eq(query, "c.owner_id", filter.owner_id);
    push_eq(query, "c.company_id", filter.company_id);
    push_eq(query, "c.lifecycle_stage", filter.lifecycle_stage);
}

#[async_trait::async_trait]
impl<'c> Repository for Contacts<'c> {
    type CreateRequest = ContactCreateDBRequest;
    type UpdateRequest = ContactUpdateDBRequest;
    type Response = ContactDBResponse;
    type Id = ContactId;
    type Filter = ContactFilter;

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: ContactId = sqlx::query_scalar(
            r#"
            INSERT INTO contacts (first_name, last_name, email, phone, job_title, lifecycle_stage,
                                  lead_source, tags, notes, company_id, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.job_title)
        .bind(request.lifecycle_stage)
        .bind(&request.lead_source)
        .bind(&request.tags)
        .bind(&request.notes)
        .bind(request.company_id)
        .bind(request.owner_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(contact_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_CONTACTS);
        query.push(" WHERE c.id = ");
        query.push_bind(id);

        let contact = query.build_query_as::<Contact>().fetch_optional(&mut *self.db).await?;
        Ok(contact.map(ContactDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_CONTACTS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY c.created_at DESC, c.id");
        push_page(&mut query, filter.skip, filter.limit);

        let contacts = query.build_query_as::<Contact>().fetch_all(&mut *self.db).await?;
        Ok(contacts.into_iter().map(ContactDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM contacts c WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(contact_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(contact_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("contacts");
        update
            .set("first_name", request.first_name.clone())
            .set("last_name", request.last_name.clone())
            .set("email", request.email.clone())
            .set("phone", request.phone.clone())
            .set("job_title", request.job_title.clone())
            .set("lifecycle_stage", request.lifecycle_stage)
            .set("lead_source", request.lead_source.clone())
            .set("tags", request.tags.clone())
            .set("notes", request.notes.clone())
            .set("company_id", request.company_id)
            .set("owner_id", request.owner_id);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Contacts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::Companies;
    use crate::db::models::companies::CompanyCreateDBRequest;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_company_loads_associations(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();

        let company = Companies::new(&mut conn)
            .create(&CompanyCreateDBRequest {
                name: "Analytical Engines".to_string(),
                domain: None,
                industry: None,
                phone: None,
                address: None,
                city: None,
                country: None,
                employee_count: None,
                annual_revenue: None,
                lifecycle_stage: LifecycleStage::Customer,
                tags: vec![],
                notes: None,
                owner_id: owner.id,
            })
            .await
            .unwrap();

        let mut repo = Contacts::new(&mut conn);
        let contact = repo
            .create(&ContactCreateDBRequest {
                email: Some("ada@engines.example".to_string()),
                tags: vec!["vip".to_string()],
                company_id: Some(company.id),
                ..ContactCreateDBRequest::minimal("Ada", "Lovelace", owner.id)
            })
            .await
            .unwrap();

        let fetched = repo.get_by_id(contact.id).await.unwrap().unwrap();
        assert_eq!(fetched.first_name, "Ada");
        assert_eq!(fetched.email.as_deref(), Some("ada@engines.example"));
        assert_eq!(fetched.tags, vec!["vip".to_string()]);
        assert_eq!(fetched.owner.id, owner.id);
        let summary = fetched.company.unwrap();
        assert_eq!(summary.id, company.id);
        assert_eq!(summary.name, "Analytical Engines");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_filters_and_search(pool: PgPool) {
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contacts::new(&mut conn);

        repo.create(&ContactCreateDBRequest {
            email: Some("GRACE@navy.example".to_string()),
            ..ContactCreateDBRequest::minimal("Grace", "Hopper", alice.id)
        })
        .await
        .unwrap();
        repo.create(&ContactCreateDBRequest {
            lifecycle_stage: LifecycleStage::Customer,
            ..ContactCreateDBRequest::minimal("Alan", "Turing", bob.id)
        })
        .await
        .unwrap();

        let by_email = ContactFilter::new(0, 10).with_search("navy.EXAMPLE".to_string());
        let found = repo.list(&by_email).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].last_name, "Hopper");

        let by_owner = ContactFilter {
            owner_id: Some(bob.id),
            ..ContactFilter::new(0, 10)
        };
        assert_eq!(repo.count(&by_owner).await.unwrap(), 1);

        let by_stage = ContactFilter {
            lifecycle_stage: Some(LifecycleStage::Customer),
            ..ContactFilter::new(0, 10)
        };
        let customers = repo.list(&by_stage).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].first_name, "Alan");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_unlinks_company(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let company_id: CompanyId = sqlx::query_scalar("INSERT INTO companies (name, owner_id) VALUES ('Acme', $1) RETURNING id")
            .bind(owner.id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();

        let mut repo = Contacts::new(&mut conn);
        let contact = repo
            .create(&ContactCreateDBRequest {
                company_id: Some(company_id),
                ..ContactCreateDBRequest::minimal("Wile", "Coyote", owner.id)
            })
            .await
            .unwrap();
        assert!(contact.company.is_some());

        let updated = repo
            .update(
                contact.id,
                &ContactUpdateDBRequest {
                    company_id: Some(None),
                    job_title: Some(Some("Engineer".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.company_id, None);
        assert!(updated.company.is_none());
        assert_eq!(updated.job_title.as_deref(), Some("Engineer"));
        assert_eq!(updated.first_name, "Wile");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contacts::new(&mut conn);

        let contact = repo.create(&ContactCreateDBRequest::minimal("Temp", "Contact", owner.id)).await.unwrap();
        assert!(repo.delete(contact.id).await.unwrap());
        assert!(repo.get_by_id(contact.id).await.unwrap().is_none());
        assert!(!repo.delete(contact.id).await.unwrap());
    }
}
