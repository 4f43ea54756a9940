use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections render as the application's JSON error body.
///
/// Malformed or incomplete payloads become `400 ValidationFailed` instead of
/// axum's plain-text 4xx responses.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
