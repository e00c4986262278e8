//! Post handlers.
//!
//! Every write runs in one transaction that ends in
//! [`envelope::commit_or_rollback`]. Image files live outside the transaction:
//! a new file is written before it and removed again if it rolls back, and a
//! replaced or orphaned file is removed only after commit.

use actix_multipart::form::{MultipartForm, tempfile::TempFile};
use actix_web::{HttpResponse, http::StatusCode, web};
use serde_json::Value;
use uuid::Uuid;

use quill_core::domain::{PostDetails, PostInput, PostStatus, TagId};
use quill_core::policy::{self, Action};
use quill_core::services::post_sync;
use quill_core::validation::{self, ValidationErrors};
use quill_shared::dto::PostRequest;

use crate::envelope;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Largest accepted image, in KiB.
pub const MAX_IMAGE_KIB: usize = 5000;

/// Accepted image extensions.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "svg"];

/// Multipart body of the image upload.
#[derive(MultipartForm)]
pub struct ImageUpload {
    image_path: Option<TempFile>,
}

/// GET /v1/posts
pub async fn index(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.store.posts().list().await?;

    Ok(envelope::success(
        StatusCode::OK,
        "Successfully retrieved all posts",
        posts,
    ))
}

/// GET /v1/posts/{id}
pub async fn show(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;

    Ok(envelope::success(
        StatusCode::OK,
        "Successfully retrieved post details",
        post,
    ))
}

/// POST /v1/posts
pub async fn store(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    policy::authorize(identity.role, Action::WritePosts)?;
    let input = post_input(body.into_inner())?;

    let tx = state.store.begin().await?;
    let outcome = post_sync::create(tx.as_ref(), identity.user_id, input).await;
    let post = envelope::commit_or_rollback(tx, outcome).await?;

    tracing::info!(post_id = %post.post.id, tags = post.tags.len(), "Post created");

    Ok(envelope::success(
        StatusCode::CREATED,
        "Post created successfully",
        post,
    ))
}

/// PUT|PATCH /v1/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let existing = find_post(&state, post_id).await?;
    policy::authorize_owner(identity.user_id, identity.role, existing.post.user_id)?;
    let input = post_input(body.into_inner())?;

    let tx = state.store.begin().await?;
    let outcome = post_sync::update(tx.as_ref(), post_id, input).await;
    let post = envelope::commit_or_rollback(tx, outcome).await?;

    tracing::info!(%post_id, tags = post.tags.len(), "Post updated");

    Ok(envelope::success(
        StatusCode::OK,
        "Post updated successfully",
        post,
    ))
}

/// DELETE /v1/posts/{id}
pub async fn destroy(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let existing = find_post(&state, post_id).await?;
    policy::authorize_owner(identity.user_id, identity.role, existing.post.user_id)?;

    let tx = state.store.begin().await?;
    let outcome = post_sync::delete(tx.as_ref(), post_id).await;
    let snapshot = envelope::commit_or_rollback(tx, outcome).await?;

    if let Some(image) = snapshot.post.image_path.as_deref() {
        discard_file(&state, image).await;
    }

    tracing::info!(%post_id, "Post deleted");

    Ok(envelope::success(
        StatusCode::OK,
        "Post deleted successfully",
        snapshot,
    ))
}

/// POST /v1/posts/{id}/upload-image
pub async fn upload_image(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    MultipartForm(form): MultipartForm<ImageUpload>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let existing = find_post(&state, post_id).await?;
    policy::authorize_owner(identity.user_id, identity.role, existing.post.user_id)?;

    let file = check_image(form.image_path)?;
    let bytes = tokio::fs::read(file.file.path())
        .await
        .map_err(|e| AppError::Internal(format!("reading upload: {e}")))?;

    let stored_path = image_path_for(
        chrono::Utc::now().timestamp(),
        file.file_name.as_deref().unwrap_or("image"),
    );
    state.files.store(&stored_path, &bytes).await?;

    let attached = match state.store.begin().await {
        Ok(tx) => {
            let outcome =
                post_sync::attach_image(tx.as_ref(), post_id, stored_path.clone()).await;
            envelope::commit_or_rollback(tx, outcome).await
        }
        Err(e) => Err(e.into()),
    };
    let (previous, post) = match attached {
        Ok(done) => done,
        Err(err) => {
            // Same-second re-upload of the same name overwrote the live image in place.
            if existing.post.image_path.as_deref() != Some(stored_path.as_str()) {
                discard_file(&state, &stored_path).await;
            }
            return Err(err);
        }
    };

    if let Some(previous) = previous.as_deref().filter(|p| *p != stored_path) {
        discard_file(&state, previous).await;
    }

    tracing::info!(%post_id, image = %stored_path, "Post image updated");

    Ok(envelope::success(
        StatusCode::OK,
        "Post image updated successfully",
        post,
    ))
}

async fn find_post(state: &AppState, post_id: Uuid) -> AppResult<PostDetails> {
    state
        .store
        .posts()
        .find(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

/// Best-effort removal of a file whose record is gone or no longer points at it.
async fn discard_file(state: &AppState, path: &str) {
    if !state.files.exists(path).await {
        return;
    }
    if let Err(e) = state.files.delete(path).await {
        tracing::warn!(path, error = %e, "Failed to delete image file");
    }
}

/// Turn the raw request into a [`PostInput`], collecting every field error.
fn post_input(req: PostRequest) -> Result<PostInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let status = match req.status.as_deref() {
        None | Some("") => {
            errors.add("status", validation::required("status"));
            None
        }
        Some(raw) => match raw.parse::<PostStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                errors.add("status", validation::invalid_selection("status"));
                None
            }
        },
    };

    let tag_ids = match req.tag_ids {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut ids = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match tag_id_of(item) {
                    Some(id) => ids.push(id),
                    None => errors.add(
                        format!("tag_ids.{i}"),
                        format!("The tag_ids.{i} field must be an integer."),
                    ),
                }
            }
            ids
        }
        Some(_) => {
            errors.add("tag_ids", "The tag_ids field must be an array.");
            Vec::new()
        }
    };

    let input = PostInput {
        title: req.title.unwrap_or_default(),
        content: req.content.unwrap_or_default(),
        status: status.unwrap_or(PostStatus::Draft),
        tag_ids,
    }
    .trimmed();

    if let Err(rule_errors) = input.validate() {
        errors.merge_new_fields(rule_errors);
    }

    errors.into_result().map(|()| input)
}

/// An integer tag id, given either as a JSON number or as a numeric string.
fn tag_id_of(item: &Value) -> Option<TagId> {
    match item {
        Value::Number(n) => n.as_i64().and_then(|n| TagId::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_image(file: Option<TempFile>) -> Result<TempFile, ValidationErrors> {
    let Some(file) = file else {
        return Err(ValidationErrors::single(
            "image_path",
            validation::required("image_path"),
        ));
    };

    let mut errors = ValidationErrors::new();

    let is_image = file
        .content_type
        .as_ref()
        .is_none_or(|mime| mime.type_().as_str() == "image");
    if !is_image {
        errors.add("image_path", "The image_path field must be an image.");
    }

    let extension = file
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    if !extension.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str())) {
        errors.add(
            "image_path",
            format!(
                "The image_path field must be a file of type: {}.",
                IMAGE_EXTENSIONS.join(", ")
            ),
        );
    }

    if file.size > MAX_IMAGE_KIB * 1024 {
        errors.add(
            "image_path",
            format!("The image_path field must not be greater than {MAX_IMAGE_KIB} kilobytes."),
        );
    }

    errors.into_result().map(|()| file)
}

/// Storage path of an uploaded image: `posts/<unix-ts>-<sanitized name>`.
fn image_path_for(timestamp: i64, original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() {
        format!("posts/{timestamp}-image")
    } else {
        format!("posts/{timestamp}-{sanitized}")
    }
}
