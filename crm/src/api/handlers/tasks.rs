use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        tasks::{TaskCreate, TaskListResponse, TaskResponse, TaskUpdate, ListTasksQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Tasks, Repository, tasks::TaskFilter},
        models::tasks::{TaskCreateDBRequest, TaskUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{TaskId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: TaskId) -> Error {
    Error::NotFound {
        resource: "Task".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    summary = "List tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Page of tasks", body = TaskListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
    _: RequiresPermission<resource::Tasks, operation::ReadAll>,
) -> Result<Json<TaskListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = TaskFilter {
        search: query.search,
        assigned_to_id: query.assigned_to_id,
        created_by_id: query.created_by_id,
        status: query.status,
        priority: query.priority,
        contact_id: query.contact_id,
        deal_id: query.deal_id,
        ..TaskFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tasks::new(&mut conn);
    let tasks = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(TaskListResponse::new(
        tasks.into_iter().map(TaskResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Get task",
    responses(
        (status = 200, description = "Task with its assignee, creator and linked records", body = TaskResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Task not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Task ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    _: RequiresPermission<resource::Tasks, operation::ReadAll>,
) -> Result<Json<TaskResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let task = Tasks::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(TaskResponse::from(task)))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    summary = "Create task",
    description = "The caller is recorded as creator and, unless `assignedToId` is given, as assignee. Only privileged users may assign tasks to someone else.",
    request_body = TaskCreate,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the task to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Tasks, operation::CreateOwn>,
    Json(create): Json<TaskCreate>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    check_owner_assignment(&current_user, Resource::Tasks, Operation::CreateOwn, create.assigned_to_id)?;
    let request = TaskCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let task = Tasks::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Tasks);
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Update task",
    description = "The assignee, the creator and privileged users may update a task. Completing it stamps `completedAt`.",
    request_body = TaskUpdate,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither assignee nor creator of the task"),
        (status = 404, description = "Task not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Task ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    current_user: RequiresPermission<resource::Tasks, operation::UpdateOwn>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<TaskResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tasks::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Tasks, Operation::UpdateOwn, id, &[existing.assigned_to_id, existing.created_by_id])?;
    check_owner_assignment(&current_user, Resource::Tasks, Operation::UpdateOwn, update.assigned_to_id)?;

    let task = repo.update(id, &TaskUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(TaskResponse::from(task)))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Delete task",
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither assignee nor creator of the task"),
        (status = 404, description = "Task not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Task ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    current_user: RequiresPermission<resource::Tasks, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Tasks::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Tasks, Operation::DeleteOwn, id, &[existing.assigned_to_id, existing.created_by_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Tasks);
    Ok(Json(MessageResponse::deleted("Task")))
}
