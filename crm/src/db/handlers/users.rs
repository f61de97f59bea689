//! Database repository for users.

use crate::types::{Operation, UserId, abbrev_uuid};
use crate::{
    api::models::users::Role,
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserFilter {
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

const SELECT_USERS: &str = "SELECT id, email, password_hash, first_name, last_name, role, phone, avatar_url, \
     is_active, last_login_at, created_at, updated_at FROM users";

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            phone: user.phone,
            avatar_url: user.avatar_url,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["first_name", "last_name", "email"], search);
    }
    push_eq(query, "role", filter.role);
    push_eq(query, "is_active", filter.is_active);
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role, phone, avatar_url, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, email, password_hash, first_name, last_name, role, phone, avatar_url,
                      is_active, last_login_at, created_at, updated_at
            "#,
        )
        .bind(request.email.trim())
        .bind(&request.password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.role)
        .bind(&request.phone)
        .bind(&request.avatar_url)
        .bind(request.is_active)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(UserDBResponse::from(user))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USERS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_USERS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY first_name, last_name, id");
        push_page(&mut query, filter.skip, filter.limit);

        let users = query.build_query_as::<User>().fetch_all(&mut *self.db).await?;

        Ok(users.into_iter().map(UserDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *self.db).await;

        match result {
            Ok(result) => Ok(result.rows_affected() > 0),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(DbError::ProtectedEntity {
                operation: Operation::DeleteAll,
                reason: "the user still owns or is assigned CRM records; reassign them first".to_string(),
                entity_type: "user".to_string(),
                entity_id: Some(id.to_string()),
            }),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("users");
        update
            .set("email", request.email.as_deref().map(|e| e.trim().to_string()))
            .set("password_hash", request.password_hash.clone())
            .set("first_name", request.first_name.clone())
            .set("last_name", request.last_name.clone())
            .set("phone", request.phone.clone())
            .set("avatar_url", request.avatar_url.clone())
            .set("role", request.role)
            .set("is_active", request.is_active);
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Email lookup is case-insensitive, matching the unique index.
    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USERS} WHERE LOWER(email) = LOWER($1)"))
            .bind(email.trim())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn record_login(&mut self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use sqlx::PgPool;

    fn create_request(email: &str, first_name: &str, role: Role) -> UserCreateDBRequest {
        UserCreateDBRequest {
            email: email.to_string(),
            password_hash: None,
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            role,
            phone: None,
            avatar_url: None,
            is_active: true,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo
            .create(&create_request("ada@example.com", "Ada", Role::JefeComercial))
            .await
            .unwrap();
        assert_eq!(created.email, "ada@example.com");
        assert_eq!(created.role, Role::JefeComercial);
        assert!(created.is_active);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.first_name, "Ada");
        assert_eq!(fetched.role, Role::JefeComercial);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_user_by_email_is_case_insensitive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        repo.create(&create_request("Grace@Example.com", "Grace", Role::User)).await.unwrap();

        let found = repo.get_user_by_email("grace@example.COM").await.unwrap();
        assert!(found.is_some());
        assert!(repo.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        repo.create(&create_request("dup@example.com", "One", Role::User)).await.unwrap();

        let err = repo
            .create(&create_request("DUP@example.com", "Two", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_counts(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        repo.create(&create_request("a@example.com", "Alice", Role::Admin)).await.unwrap();
        repo.create(&create_request("b@example.com", "Bob", Role::User)).await.unwrap();
        repo.create(&create_request("c@example.com", "Carol", Role::User)).await.unwrap();

        let users_only = UserFilter {
            role: Some(Role::User),
            ..UserFilter::new(0, 10)
        };
        let listed = repo.list(&users_only).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].first_name, "Bob");
        assert_eq!(repo.count(&users_only).await.unwrap(), 2);

        let search = UserFilter::new(0, 10).with_search("ALI".to_string());
        let listed = repo.list(&search).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].email, "a@example.com");

        let page = repo.list(&UserFilter::new(2, 2)).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_update(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let mut request = create_request("upd@example.com", "Before", Role::User);
        request.phone = Some("+34 600 000 000".to_string());
        let user = repo.create(&request).await.unwrap();

        let updated = repo
            .update(
                user.id,
                &UserUpdateDBRequest {
                    first_name: Some("After".to_string()),
                    phone: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "After");
        assert_eq!(updated.last_name, "Tester");
        assert_eq!(updated.phone, None);
        assert!(updated.updated_at >= user.updated_at);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_user_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let err = repo.update(uuid::Uuid::new_v4(), &UserUpdateDBRequest::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_record_login_and_delete(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let user = repo.create(&create_request("gone@example.com", "Gone", Role::User)).await.unwrap();
        assert!(user.last_login_at.is_none());

        repo.record_login(user.id).await.unwrap();
        assert!(repo.get_by_id(user.id).await.unwrap().unwrap().last_login_at.is_some());

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }
}
