// src/errors.rs

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Błąd SQLx: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Błąd wejścia/wyjścia: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Nie znaleziono zasobu")]
    NotFound,

    #[error("Błędy walidacji")]
    ValidationError(#[from] ValidationErrors),

    #[error("Nieprawidłowe dane wejściowe: {0}")]
    BadRequest(String),

    #[error("Brak uprawnień administratora")]
    Unauthorized,

    #[error("Wystąpił konflikt: {0}")]
    Conflict(String),

    #[error("Plik jest za duży")]
    PayloadTooLarge,

    #[error("Wewnętrzny błąd serwera: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SqlxError(_) | AppError::IoError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Komunikat pokazywany operatorowi w panelu (bez szczegółów z bazy).
    pub fn public_message(&self) -> String {
        match self {
            AppError::SqlxError(_) => "Wystąpił wewnętrzny błąd serwera (baza danych)".to_string(),
            AppError::IoError(_) => "Wystąpił wewnętrzny błąd serwera (pliki)".to_string(),
            AppError::NotFound => "Nie znaleziono zasobu".to_string(),
            AppError::ValidationError(errors) => flatten_validation_errors(errors),
            AppError::BadRequest(message)
            | AppError::Conflict(message)
            | AppError::InternalServerError(message) => message.clone(),
            AppError::Unauthorized => "Nieprawidłowe hasło administratora".to_string(),
            AppError::PayloadTooLarge => "Plik jest za duży".to_string(),
        }
    }
}

pub fn flatten_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let msg = error.message.as_ref().map_or_else(
                || format!("Pole '{}' jest nieprawidłowe", field),
                |m| format!("Pole '{}': {}", field, m),
            );
            messages.push(msg);
        }
    }
    if messages.is_empty() {
        "Nieprawidłowe dane".to_string()
    } else {
        messages.sort();
        messages.join("; ")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::SqlxError(e) => tracing::error!("Błąd SQLx: {:?}", e),
            AppError::IoError(e) => tracing::error!("Błąd I/O: {:?}", e),
            AppError::InternalServerError(m) => tracing::error!("Błąd wewnętrzny: {}", m),
            other => tracing::warn!("Żądanie odrzucone: {}", other),
        }

        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        tracing::error!("Błąd przetwarzania Multipart: {:?}", err);
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::BadRequest(format!("Błąd przetwarzania danych formularza: {}", err))
    }
}

/// Mapuje naruszenie unikalności sluga na 409, resztę zostawia jako błąd bazy.
pub fn map_unique_violation(err: sqlx::Error, message: impl Into<String>) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.into())
        }
        _ => AppError::SqlxError(err),
    }
}
