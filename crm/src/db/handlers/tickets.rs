//! Database repository for tickets.

use crate::types::{CompanyId, ContactId, DealId, TicketId, UserId, abbrev_uuid};
use crate::{
    api::models::{
        deals::DealStage,
        summaries::{UserSummary, joined_summary},
        tasks::Priority,
        tickets::TicketStatus,
    },
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            sql::{UpdateBuilder, push_eq, push_page, push_search},
        },
        models::tickets::{TicketCreateDBRequest, TicketDBResponse, TicketUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter for listing tickets
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub assigned_to_id: Option<UserId>,
    pub created_by_id: Option<UserId>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
}

impl TicketFilter {
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

const SELECT_TICKETS: &str = r#"
    SELECT tk.id, tk.subject, tk.description, tk.status, tk.priority, tk.category, tk.resolved_at,
           tk.assigned_to_id, tk.created_by_id, tk.contact_id, tk.company_id, tk.deal_id, tk.created_at, tk.updated_at,
           a.first_name AS assignee_first_name, a.last_name AS assignee_last_name, a.email AS assignee_email,
           cr.first_name AS creator_first_name, cr.last_name AS creator_last_name, cr.email AS creator_email,
           ct.first_name AS contact_first_name, ct.last_name AS contact_last_name, ct.email AS contact_email,
           co.name AS company_name,
           d.name AS deal_name, d.stage AS deal_stage, d.amount AS deal_amount
    FROM tickets tk
    JOIN users a ON a.id = tk.assigned_to_id
    JOIN users cr ON cr.id = tk.created_by_id
    LEFT JOIN contacts ct ON ct.id = tk.contact_id
    LEFT JOIN companies co ON co.id = tk.company_id
    LEFT JOIN deals d ON d.id = tk.deal_id
"#;

#[derive(Debug, Clone, FromRow)]
struct Ticket {
    pub id: TicketId,
    pub subject: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub assigned_to_id: UserId,
    pub created_by_id: UserId,
    pub contact_id: Option<ContactId>,
    pub company_id: Option<CompanyId>,
    pub deal_id: Option<DealId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignee_first_name: String,
    pub assignee_last_name: String,
    pub assignee_email: String,
    pub creator_first_name: String,
    pub creator_last_name: String,
    pub creator_email: String,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub contact_email: Option<String>,
    pub company_name: Option<String>,
    pub deal_name: Option<String>,
    pub deal_stage: Option<DealStage>,
    pub deal_amount: Option<Decimal>,
}

impl From<Ticket> for TicketDBResponse {
    fn from(t: Ticket) -> Self {
        Self {
            assigned_to: UserSummary {
                id: t.assigned_to_id,
                first_name: t.assignee_first_name,
                last_name: t.assignee_last_name,
                email: t.assignee_email,
            },
            created_by: UserSummary {
                id: t.created_by_id,
                first_name: t.creator_first_name,
                last_name: t.creator_last_name,
                email: t.creator_email,
            },
            contact: joined_summary!(ContactSummary {
                id: t.contact_id,
                first_name: t.contact_first_name,
                last_name: t.contact_last_name,
                email: Some(t.contact_email),
            }),
            company: joined_summary!(CompanySummary {
                id: t.company_id,
                name: t.company_name
            }),
            deal: joined_summary!(DealSummary {
                id: t.deal_id,
                name: t.deal_name,
                stage: t.deal_stage,
                amount: t.deal_amount,
            }),
            id: t.id,
            subject: t.subject,
            description: t.description,
            status: t.status,
            priority: t.priority,
            category: t.category,
            resolved_at: t.resolved_at,
            assigned_to_id: t.assigned_to_id,
            created_by_id: t.created_by_id,
            contact_id: t.contact_id,
            company_id: t.company_id,
            deal_id: t.deal_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

pub struct Tickets<'c> {
    db: &'c mut PgConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    if let Some(search) = &filter.search {
        push_search(query, &["tk.subject", "tk.description", "tk.category"], search);
    }
    push_eq(query, "tk.assigned_to_id", filter.assigned_to_id);
    push_eq(query, "tk.created_by_id", filter.created_by_id);
    push_eq(query, "tk.status", filter.status);
    push_eq(query, "tk.priority", filter.priority);
    push_eq(query, "tk.contact_id", filter.contact_id);
    push_eq(query, "tk.company_id", filter.company_id);
}

#[async_trait::async_trait]
impl<'c> Repository for Tickets<'c> {
    type CreateRequest = TicketCreateDBRequest;
    type UpdateRequest = TicketUpdateDBRequest;
    type Response = TicketDBResponse;
    type Id = TicketId;
    type Filter = TicketFilter;

    #[instrument(skip(self, request), fields(assigned_to = %abbrev_uuid(&request.assigned_to_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: TicketId = sqlx::query_scalar(
            r#"
            INSERT INTO tickets (subject, description, status, priority, category, resolved_at,
                                 assigned_to_id, created_by_id, contact_id, company_id, deal_id)
            VALUES ($1, $2, $3, $4, $5, CASE WHEN $6 THEN NOW() END, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&request.subject)
        .bind(&request.description)
        .bind(request.status)
        .bind(request.priority)
        .bind(&request.category)
        .bind(request.status.is_resolved())
        .bind(request.assigned_to_id)
        .bind(request.created_by_id)
        .bind(request.contact_id)
        .bind(request.company_id)
        .bind(request.deal_id)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(ticket_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_TICKETS);
        query.push(" WHERE tk.id = ");
        query.push_bind(id);

        let ticket = query.build_query_as::<Ticket>().fetch_optional(&mut *self.db).await?;
        Ok(ticket.map(TicketDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(SELECT_TICKETS);
        query.push(" WHERE TRUE");
        push_filters(&mut query, filter);
        query.push(" ORDER BY tk.created_at DESC, tk.id");
        push_page(&mut query, filter.skip, filter.limit);

        let tickets = query.build_query_as::<Ticket>().fetch_all(&mut *self.db).await?;
        Ok(tickets.into_iter().map(TicketDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM tickets tk WHERE TRUE");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(ticket_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(ticket_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut update = UpdateBuilder::new("tickets");
        update
            .set("subject", request.subject.clone())
            .set("description", request.description.clone())
            .set("status", request.status)
            .set("priority", request.priority)
            .set("category", request.category.clone())
            .set("assigned_to_id", request.assigned_to_id)
            .set("contact_id", request.contact_id)
            .set("company_id", request.company_id)
            .set("deal_id", request.deal_id);
        match request.status {
            Some(status) if status.is_resolved() => update.set_expr("resolved_at", "COALESCE(resolved_at, NOW())"),
            Some(_) => update.set_expr("resolved_at", "NULL"),
            None => &mut update,
        };
        update.execute(&mut *self.db, id).await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Tickets<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}
