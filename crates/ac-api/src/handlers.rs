//! # ac-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core
//! `ThreadService`. The multipart reader enforces the upload cap while
//! streaming, so an oversized body is cut off early rather than buffered.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Responder, ResponseError};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

use ac_core::error::AppError;
use ac_core::models::{PostRequest, Upload};
use ac_core::service::ThreadService;
use ac_core::traits::TokenVerifier;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub service: ThreadService,
    pub tokens: Arc<dyn TokenVerifier>,
    pub per_page: u64,
    pub max_upload_bytes: u64,
}

/// Wraps `AppError` so the domain crate stays free of HTTP concerns.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.user_message())
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedType(_) | AppError::DecodeFailure(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ResampleFailure(_) | AppError::Storage(_) | AppError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("request failed: {}", self.0);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.0.user_message() }))
    }
}

/// `GET /api/token` — an opaque form token for the next submission.
pub async fn issue_token(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "token": data.tokens.issue() }))
}

#[derive(Deserialize)]
pub struct BoardQuery {
    pub page: Option<u64>,
}

/// `GET /api/board?page=N` — one page of threads, newest bump first.
pub async fn board_index(
    data: web::Data<AppState>,
    query: web::Query<BoardQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let board = data.service.board_page(page, data.per_page).await?;
    Ok(HttpResponse::Ok().json(board))
}

/// `GET /api/thread/{id}` — a thread with its replies in posting order.
pub async fn view_thread(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let view = data.service.thread_view(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// `POST /api/post` — multipart form with `token`, `parent`, `title`,
/// `message` and an optional `file`.
pub async fn create_post(
    data: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let client_id = req
        .peer_addr()
        .map(|a| a.ip().to_string())
        .unwrap_or_default();

    let form = read_form(&mut payload, data.max_upload_bytes).await?;
    let request = PostRequest {
        token: form.token.unwrap_or_default(),
        parent: form.parent.unwrap_or(0),
        client_id,
        title: form.title,
        message: form.message.unwrap_or_default(),
        upload: form.upload,
    };

    let id = data.service.submit_post(request).await?;
    Ok(HttpResponse::Ok().json(json!({ "id": id })))
}

#[derive(Default)]
struct PostForm {
    token: Option<String>,
    parent: Option<i64>,
    title: Option<String>,
    message: Option<String>,
    upload: Option<Upload>,
}

async fn read_form(payload: &mut Multipart, max_upload_bytes: u64) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(malformed)?;
        let name = field.name().to_string();

        let mut value = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(malformed)?;
            if name == "file" && (value.len() + chunk.len()) as u64 > max_upload_bytes {
                return Err(ApiError(AppError::FileTooLarge {
                    declared: (value.len() + chunk.len()) as u64,
                    limit: max_upload_bytes,
                }));
            }
            value.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "token" => form.token = Some(text(value)?),
            "parent" => {
                let raw = text(value)?;
                let raw = raw.trim().to_string();
                form.parent = Some(if raw.is_empty() {
                    0
                } else {
                    raw.parse().map_err(|_| {
                        ApiError(AppError::Validation("parent must be a post id".to_string()))
                    })?
                });
            }
            "title" => form.title = Some(text(value)?),
            "message" => form.message = Some(text(value)?),
            "file" if !value.is_empty() => {
                let declared = value.len() as u64;
                form.upload = Some(Upload { data: value, declared_size: declared });
            }
            _ => {}
        }
    }

    Ok(form)
}

fn malformed(e: actix_multipart::MultipartError) -> ApiError {
    ApiError(AppError::Validation(format!("malformed form: {e}")))
}

fn text(value: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(value)
        .map_err(|_| ApiError(AppError::Validation("form fields must be UTF-8".to_string())))
}
