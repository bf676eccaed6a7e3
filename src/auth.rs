// src/auth.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use constant_time_eq::constant_time_eq;

use crate::{errors::AppError, state::AppState};

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Dowód, że żądanie przyszło z poprawnym hasłem administratora.
/// Wystarczy dodać go do argumentów handlera.
#[derive(Debug, Clone, Copy)]
pub struct AdminGuard;

/// Porównanie w stałym czasie, niezależnym od miejsca pierwszej różnicy.
pub fn password_matches(expected: &str, provided: &str) -> bool {
    !expected.is_empty() && constant_time_eq(expected.as_bytes(), provided.as_bytes())
}

fn check_admin_header(parts: &Parts, expected: &str) -> Result<AdminGuard, AppError> {
    let provided = parts
        .headers
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Brak nagłówka {} dla {}", ADMIN_PASSWORD_HEADER, parts.uri);
            AppError::Unauthorized
        })?;

    if password_matches(expected, provided) {
        Ok(AdminGuard)
    } else {
        tracing::warn!("Nieprawidłowe hasło administratora dla {}", parts.uri);
        Err(AppError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        check_admin_header(parts, &state.config.admin_password)
    }
}
