//! Tag handlers. Reads are public; writes are admin-only.

use actix_web::{HttpResponse, http::StatusCode, web};

use quill_core::domain::{TagId, TagInput};
use quill_core::policy::{self, Action};
use quill_core::services::tags;
use quill_shared::dto::TagRequest;

use crate::envelope;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /v1/tags
pub async fn index(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let tags = state.store.tags().list().await?;

    Ok(envelope::success(
        StatusCode::OK,
        "Successfully retrieved all tags",
        tags,
    ))
}

/// GET /v1/tags/{id}
pub async fn show(state: web::Data<AppState>, path: web::Path<TagId>) -> AppResult<HttpResponse> {
    let tag = state
        .store
        .tags()
        .find(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    Ok(envelope::success(
        StatusCode::OK,
        "Successfully retrieved tag details",
        tag,
    ))
}

/// POST /v1/tags
pub async fn store(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<TagRequest>,
) -> AppResult<HttpResponse> {
    policy::authorize(identity.role, Action::ManageTags)?;
    let input = tag_input(body.into_inner())?;

    let tx = state.store.begin().await?;
    let outcome = tags::create(tx.as_ref(), input).await;
    let tag = envelope::commit_or_rollback(tx, outcome).await?;

    tracing::info!(tag_id = tag.id, name = %tag.name, "Tag created");

    Ok(envelope::success(
        StatusCode::CREATED,
        "Tag created successfully",
        tag,
    ))
}

/// PUT|PATCH /v1/tags/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<TagId>,
    body: web::Json<TagRequest>,
) -> AppResult<HttpResponse> {
    policy::authorize(identity.role, Action::ManageTags)?;
    let input = tag_input(body.into_inner())?;

    let tx = state.store.begin().await?;
    let outcome = tags::update(tx.as_ref(), path.into_inner(), input).await;
    let tag = envelope::commit_or_rollback(tx, outcome).await?;

    Ok(envelope::success(
        StatusCode::OK,
        "Tag updated successfully",
        tag,
    ))
}

/// DELETE /v1/tags/{id}
pub async fn destroy(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<TagId>,
) -> AppResult<HttpResponse> {
    policy::authorize(identity.role, Action::ManageTags)?;

    let tx = state.store.begin().await?;
    let outcome = tags::delete(tx.as_ref(), path.into_inner()).await;
    let tag = envelope::commit_or_rollback(tx, outcome).await?;

    tracing::info!(tag_id = tag.id, "Tag deleted");

    Ok(envelope::success(
        StatusCode::OK,
        "Tag deleted successfully",
        tag,
    ))
}

fn tag_input(req: TagRequest) -> Result<TagInput, AppError> {
    let input = TagInput {
        name: req.name.unwrap_or_default(),
    };
    input.validate()?;
    Ok(input)
}
