// src/extractor.rs
//
// Ekstraktory axum, których odrzucenia trafiają do `AppError`,
// dzięki czemu błędne dane wejściowe dostają odpowiedź `{"error": ...}`.

use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{StatusCode, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

fn rejection_error(status: StatusCode, body_text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else if status.is_server_error() {
        AppError::InternalServerError(body_text)
    } else {
        AppError::BadRequest(body_text)
    }
}

/// Ciało JSON.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(rejection_error(
                rejection.status(),
                format!("Nieprawidłowe dane JSON: {}", rejection.body_text()),
            )),
        }
    }
}

/// Formularz `application/x-www-form-urlencoded`.
pub struct AppForm<T>(pub T);

impl<T, S> FromRequest<S> for AppForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(Form(value)) => Ok(AppForm(value)),
            Err(rejection) => Err(rejection_error(
                rejection.status(),
                format!("Nieprawidłowe dane formularza: {}", rejection.body_text()),
            )),
        }
    }
}

/// Parametry ścieżki, np. identyfikator UUID.
pub struct AppPath<T>(pub T);

impl<T, S> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(AppPath(value)),
            Err(rejection) => Err(rejection_error(
                rejection.status(),
                format!("Nieprawidłowy adres: {}", rejection.body_text()),
            )),
        }
    }
}

/// Parametry zapytania.
pub struct AppQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(AppQuery(value)),
            Err(rejection) => Err(rejection_error(
                rejection.status(),
                format!("Nieprawidłowe parametry zapytania: {}", rejection.body_text()),
            )),
        }
    }
}
