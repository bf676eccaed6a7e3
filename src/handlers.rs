// src/handlers.rs
//
// Handlery API JSON: publiczne (/api/*) i administracyjne (/api/admin/*).

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::AdminGuard;
use crate::catalog::load_catalog;
use crate::errors::AppError;
use crate::extractor::{AppJson, AppPath, AppQuery};
use crate::models::{
    Category, CreateCategoryPayload, CreateItemPayload, CreateWoodItemPayload, Item, MovePayload,
    UpdateCategoryPayload, UpdateItemPayload, UpdateWoodItemPayload, WoodItem,
};
use crate::services;
use crate::state::AppState;
use crate::uploads::{MultipartForm, store_image};

// --- PUBLICZNE ---

pub async fn catalog_handler(State(app_state): State<AppState>) -> Result<Response, AppError> {
    let catalog = load_catalog(&app_state).await?;
    Ok(Json(&*catalog).into_response())
}

pub async fn wood_list_handler(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<WoodItem>>, AppError> {
    let items = services::list_wood_items(&app_state.db_pool).await?;
    Ok(Json(items))
}

pub async fn visits_handler(State(app_state): State<AppState>) -> Result<Json<Value>, AppError> {
    let count = app_state.visits.increment().await?;
    tracing::debug!("Licznik odwiedzin: {}", count);
    Ok(Json(json!({ "count": count })))
}

// --- KATEGORIE ---

pub async fn list_categories_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(services::list_categories(&app_state.db_pool).await?))
}

pub async fn create_category_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<CreateCategoryPayload>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    tracing::info!("POST /api/admin/categories - {}", payload.name);
    let category = services::create_category(&app_state, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(services::get_category(&app_state.db_pool, id).await?))
}

pub async fn update_category_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateCategoryPayload>,
) -> Result<Json<Category>, AppError> {
    tracing::info!("PATCH /api/admin/categories/{}", id);
    Ok(Json(services::update_category(&app_state, id, payload).await?))
}

pub async fn delete_category_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("DELETE /api/admin/categories/{}", id);
    let deleted_items = services::delete_category(&app_state, id).await?;
    Ok(Json(json!({ "ok": true, "deleted_items": deleted_items })))
}

pub async fn move_category_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<MovePayload>,
) -> Result<Json<Value>, AppError> {
    let outcome = services::move_category(&app_state, id, payload.direction).await?;
    Ok(Json(json!({ "moved": outcome.moved() })))
}

// --- PRZEDMIOTY ---

#[derive(Debug, Deserialize)]
pub struct ItemListQuery {
    pub category_id: Option<Uuid>,
}

pub async fn list_items_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<ItemListQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(
        services::list_items(&app_state.db_pool, query.category_id).await?,
    ))
}

pub async fn create_item_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<CreateItemPayload>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    tracing::info!("POST /api/admin/items - kategoria {}", payload.category_id);
    let item = services::create_item(&app_state, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(services::get_item(&app_state.db_pool, id).await?))
}

pub async fn update_item_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateItemPayload>,
) -> Result<Json<Item>, AppError> {
    tracing::info!("PATCH /api/admin/items/{}", id);
    Ok(Json(services::update_item(&app_state, id, payload).await?))
}

pub async fn delete_item_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("DELETE /api/admin/items/{}", id);
    services::delete_item(&app_state, id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn move_item_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<MovePayload>,
) -> Result<Json<Value>, AppError> {
    let outcome = services::move_item(&app_state, id, payload.direction).await?;
    Ok(Json(json!({ "moved": outcome.moved() })))
}

// --- WYROBY Z DREWNA ---

pub async fn admin_list_wood_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
) -> Result<Json<Vec<WoodItem>>, AppError> {
    Ok(Json(services::list_wood_items(&app_state.db_pool).await?))
}

pub async fn create_wood_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<CreateWoodItemPayload>,
) -> Result<(StatusCode, Json<WoodItem>), AppError> {
    tracing::info!("POST /api/admin/wood");
    let item = services::create_wood_item(&app_state, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_wood_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateWoodItemPayload>,
) -> Result<Json<WoodItem>, AppError> {
    tracing::info!("PATCH /api/admin/wood/{}", id);
    Ok(Json(services::update_wood_item(&app_state, id, payload).await?))
}

pub async fn delete_wood_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("DELETE /api/admin/wood/{}", id);
    services::delete_wood_item(&app_state, id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn move_wood_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<MovePayload>,
) -> Result<Json<Value>, AppError> {
    let outcome = services::move_wood_item(&app_state, id, payload.direction).await?;
    Ok(Json(json!({ "moved": outcome.moved() })))
}

// --- UPLOAD ---

pub async fn upload_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::BadRequest("Brak pliku w polu 'file'".to_string()))?;

    let url = store_image(&app_state.config.images_dir, &file).await?;
    tracing::info!("Przesłano plik {}", url);
    Ok((StatusCode::CREATED, Json(json!({ "url": url }))))
}
