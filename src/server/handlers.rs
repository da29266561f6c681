//! HTTP handlers for the book catalog
//!
//! Every handler returns [`CatalogResult`]; failures are rendered by the
//! `IntoResponse` implementation on [`CatalogError`].

use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::PaginationTotal;
use crate::core::auth::AuthContext;
use crate::core::book::{Book, BookPatch, NewBook};
use crate::core::error::{CatalogError, CatalogResult, FieldValidationError};
use crate::core::hooks::{apply_patch, prepare_new_book};
use crate::core::query::ListingFilterRequest;
use crate::core::upload::{PhotoUpload, UPLOAD_FIELD, UploadError};
use crate::server::response::{DataResponse, ListResponse};
use crate::server::state::AppState;

/// Parse a path identifier; malformed ids are reported with the raw text
fn parse_id(raw: &str) -> CatalogResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| CatalogError::InvalidId {
        value: raw.to_string(),
    })
}

fn not_found(id: &Uuid) -> CatalogError {
    CatalogError::NotFound { id: id.to_string() }
}

/// Unwrap a JSON body, reporting malformed input in the error envelope
fn payload<T>(body: Result<Json<T>, JsonRejection>) -> CatalogResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        CatalogError::Validation(vec![FieldValidationError::new(
            "body",
            rejection.body_text(),
        )])
    })
}

async fn fetch(state: &AppState, id: &Uuid) -> CatalogResult<Book> {
    state.store.get(id).await?.ok_or_else(|| not_found(id))
}

/// GET /api/v1/books
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> CatalogResult<Json<ListResponse>> {
    let query = ListingFilterRequest::from_pairs(params).translate()?;

    let total = match state.config.pagination_total {
        PaginationTotal::Collection => state.store.count(None).await?,
        PaginationTotal::Filtered => state.store.count(Some(&query.filter)).await?,
    };
    let data = state.store.find(&query).await?;

    tracing::debug!(
        clauses = query.filter.clauses.len(),
        page = query.window.page,
        limit = query.window.limit,
        total,
        returned = data.len(),
        "listed books"
    );

    Ok(Json(ListResponse::new(data, query.window.links(total))))
}

/// GET /api/v1/books/{id}
pub async fn get_book(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> CatalogResult<Json<DataResponse<Book>>> {
    let id = parse_id(&raw_id)?;
    let book = fetch(&state, &id).await?;
    Ok(Json(DataResponse::new(book)))
}

/// POST /api/v1/books
pub async fn create_book(
    State(state): State<AppState>,
    body: Result<Json<NewBook>, JsonRejection>,
) -> CatalogResult<impl IntoResponse> {
    let new_book = payload(body)?;
    let book = prepare_new_book(new_book, state.geocoder.as_ref()).await?;
    let book = state.store.insert(book).await?;

    tracing::info!(id = %book.id, slug = %book.slug, "book created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(book))))
}

/// PUT /api/v1/books/{id}
pub async fn update_book(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<BookPatch>, JsonRejection>,
) -> CatalogResult<Json<DataResponse<Book>>> {
    let id = parse_id(&raw_id)?;
    let patch = payload(body)?;
    let existing = fetch(&state, &id).await?;

    let updated = apply_patch(existing, patch, state.geocoder.as_ref()).await?;
    let updated = state.store.replace(updated).await?;

    tracing::info!(id = %updated.id, "book updated");
    Ok(Json(DataResponse::new(updated)))
}

/// DELETE /api/v1/books/{id}
pub async fn delete_book(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> CatalogResult<Json<DataResponse<Value>>> {
    let id = parse_id(&raw_id)?;
    if !state.store.delete(&id).await? {
        return Err(not_found(&id));
    }

    tracing::info!(%id, "book deleted");
    Ok(Json(DataResponse::new(json!({}))))
}

/// PUT /api/v1/books/{id}/photo
///
/// Checks run in order and each failure returns at once: the record must
/// exist, a `file` part must be present, it must be an image within the size
/// ceiling. Only then is anything written.
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> CatalogResult<Json<DataResponse<String>>> {
    let id = parse_id(&raw_id)?;
    let mut book = fetch(&state, &id).await?;

    let Ok(mut multipart) = multipart else {
        return Err(UploadError::MissingFile.into());
    };
    let upload = read_upload(&mut multipart, state.config.uploads.max_file_upload)
        .await?
        .ok_or(UploadError::MissingFile)?;

    upload.validate(state.config.uploads.max_file_upload)?;

    let stored = upload
        .persist(&state.config.uploads.path, &id.to_string())
        .await?;
    book.photo = stored.clone();
    state.store.replace(book).await?;

    tracing::info!(%id, photo = %stored, bytes = upload.size(), "photo uploaded");
    Ok(Json(DataResponse::new(stored)))
}

/// Pull the `file` part out of a multipart body
async fn read_upload(
    multipart: &mut Multipart,
    max_size: usize,
) -> CatalogResult<Option<PhotoUpload>> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(multipart_error(e.status(), e.body_text(), max_size)),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e.status(), e.body_text(), max_size))?;

        return Ok(Some(PhotoUpload {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
}

fn multipart_error(status: StatusCode, message: String, max_size: usize) -> CatalogError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge {
            size: max_size.saturating_add(1),
            max: max_size,
        }
        .into();
    }
    CatalogError::field(UPLOAD_FIELD, message)
}

/// GET /api/v1/auth/me
pub async fn current_principal(
    Extension(context): Extension<AuthContext>,
) -> Json<DataResponse<AuthContext>> {
    Json(DataResponse::new(context))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "shelfkeep",
        "store": state.store.backend(),
    }))
}
