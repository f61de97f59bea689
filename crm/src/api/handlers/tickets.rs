use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        tickets::{TicketCreate, TicketListResponse, TicketResponse, TicketUpdate, ListTicketsQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Tickets, Repository, tickets::TicketFilter},
        models::tickets::{TicketCreateDBRequest, TicketUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{TicketId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: TicketId) -> Error {
    Error::NotFound {
        resource: "Ticket".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "tickets",
    summary = "List tickets",
    params(ListTicketsQuery),
    responses(
        (status = 200, description = "Page of tickets", body = TicketListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<ListTicketsQuery>,
    _: RequiresPermission<resource::Tickets, operation::ReadAll>,
) -> Result<Json<TicketListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = TicketFilter {
        search: query.search,
        assigned_to_id: query.assigned_to_id,
        created_by_id: query.created_by_id,
        status: query.status,
        priority: query.priority,
        contact_id: query.contact_id,
        company_id: query.company_id,
        ..TicketFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tickets::new(&mut conn);
    let tickets = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(TicketListResponse::new(
        tickets.into_iter().map(TicketResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/tickets/{id}",
    tag = "tickets",
    summary = "Get ticket",
    responses(
        (status = 200, description = "Ticket with its assignee, creator and linked records", body = TicketResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Ticket ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    _: RequiresPermission<resource::Tickets, operation::ReadAll>,
) -> Result<Json<TicketResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let ticket = Tickets::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(TicketResponse::from(ticket)))
}

#[utoipa::path(
    post,
    path = "/tickets",
    tag = "tickets",
    summary = "Create ticket",
    description = "The caller is recorded as creator and, unless `assignedToId` is given, as assignee.",
    request_body = TicketCreate,
    responses(
        (status = 201, description = "Ticket created", body = TicketResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the ticket to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_ticket(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Tickets, operation::CreateOwn>,
    Json(create): Json<TicketCreate>,
) -> Result<(StatusCode, Json<TicketResponse>)> {
    check_owner_assignment(&current_user, Resource::Tickets, Operation::CreateOwn, create.assigned_to_id)?;
    let request = TicketCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let ticket = Tickets::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Tickets);
    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

#[utoipa::path(
    put,
    path = "/tickets/{id}",
    tag = "tickets",
    summary = "Update ticket",
    description = "Moving a ticket to `resolved` or `closed` stamps `resolvedAt`; reopening it clears the stamp.",
    request_body = TicketUpdate,
    responses(
        (status = 200, description = "Ticket updated", body = TicketResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither assignee nor creator of the ticket"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Ticket ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    current_user: RequiresPermission<resource::Tickets, operation::UpdateOwn>,
    Json(update): Json<TicketUpdate>,
) -> Result<Json<TicketResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tickets::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Tickets, Operation::UpdateOwn, id, &[existing.assigned_to_id, existing.created_by_id])?;
    check_owner_assignment(&current_user, Resource::Tickets, Operation::UpdateOwn, update.assigned_to_id)?;

    let ticket = repo.update(id, &TicketUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(TicketResponse::from(ticket)))
}

#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    tag = "tickets",
    summary = "Delete ticket",
    responses(
        (status = 200, description = "Ticket deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither assignee nor creator of the ticket"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Ticket ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    current_user: RequiresPermission<resource::Tickets, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tickets::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Tickets, Operation::DeleteOwn, id, &[existing.assigned_to_id, existing.created_by_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Tickets);
    Ok(Json(MessageResponse::deleted("Ticket")))
}
