use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        companies::{CompanyCreate, CompanyListResponse, CompanyResponse, CompanyUpdate, ListCompaniesQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Companies, Repository, companies::CompanyFilter},
        models::companies::{CompanyCreateDBRequest, CompanyUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{CompanyId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: CompanyId) -> Error {
    Error::NotFound {
        resource: "Company".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/companies",
    tag = "companies",
    summary = "List companies",
    params(ListCompaniesQuery),
    responses(
        (status = 200, description = "Page of companies", body = CompanyListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<ListCompaniesQuery>,
    _: RequiresPermission<resource::Companies, operation::ReadAll>,
) -> Result<Json<CompanyListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = CompanyFilter {
        search: query.search,
        owner_id: query.owner_id,
        lifecycle_stage: query.lifecycle_stage,
        industry: query.industry,
        ..CompanyFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Companies::new(&mut conn);
    let companies = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(CompanyListResponse::new(
        companies.into_iter().map(CompanyResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/companies/{id}",
    tag = "companies",
    summary = "Get company",
    responses(
        (status = 200, description = "Company with its owner and contact count", body = CompanyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Company not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Company ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<CompanyId>,
    _: RequiresPermission<resource::Companies, operation::ReadAll>,
) -> Result<Json<CompanyResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let company = Companies::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(CompanyResponse::from(company)))
}

#[utoipa::path(
    post,
    path = "/companies",
    tag = "companies",
    summary = "Create company",
    description = "The owner defaults to the caller. Only privileged users may create companies for someone else.",
    request_body = CompanyCreate,
    responses(
        (status = 201, description = "Company created", body = CompanyResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the company to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_company(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Companies, operation::CreateOwn>,
    Json(create): Json<CompanyCreate>,
) -> Result<(StatusCode, Json<CompanyResponse>)> {
    check_owner_assignment(&current_user, Resource::Companies, Operation::CreateOwn, create.owner_id)?;
    let request = CompanyCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let company = Companies::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Companies);
    Ok((StatusCode::CREATED, Json(CompanyResponse::from(company))))
}

#[utoipa::path(
    put,
    path = "/companies/{id}",
    tag = "companies",
    summary = "Update company",
    request_body = CompanyUpdate,
    responses(
        (status = 200, description = "Company updated", body = CompanyResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the company's owner"),
        (status = 404, description = "Company not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Company ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<CompanyId>,
    current_user: RequiresPermission<resource::Companies, operation::UpdateOwn>,
    Json(update): Json<CompanyUpdate>,
) -> Result<Json<CompanyResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Companies::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Companies, Operation::UpdateOwn, id, &[existing.owner_id])?;
    check_owner_assignment(&current_user, Resource::Companies, Operation::UpdateOwn, update.owner_id)?;

    let company = repo.update(id, &CompanyUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CompanyResponse::from(company)))
}

#[utoipa::path(
    delete,
    path = "/companies/{id}",
    tag = "companies",
    summary = "Delete company",
    description = "Contacts, deals, tickets and billing records at the company are unlinked; activities logged against it are deleted.",
    responses(
        (status = 200, description = "Company deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the company's owner"),
        (status = 404, description = "Company not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Company ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<CompanyId>,
    current_user: RequiresPermission<resource::Companies, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Companies::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Companies, Operation::DeleteOwn, id, &[existing.owner_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Companies);
    Ok(Json(MessageResponse::deleted("Company")))
}
