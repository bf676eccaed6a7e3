// src/services.rs
//
// Operacje na bazie wspólne dla API JSON i panelu htmx.
// Każdy zapis kończy się unieważnieniem cache'u katalogu.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::fetch_sorted_categories;
use crate::errors::{AppError, map_unique_violation};
use crate::models::{
    Category, CreateCategoryPayload, CreateItemPayload, CreateWoodItemPayload, Item,
    MoveDirection, UpdateCategoryPayload, UpdateItemPayload, UpdateWoodItemPayload, WoodItem,
    slugify,
};
use crate::ordering::{MoveOutcome, OrderedTable, next_order_key, swap_with_neighbour};
use crate::state::AppState;

fn slug_conflict(slug: &str) -> AppError {
    AppError::Conflict(format!("Kategoria o slugu '{}' już istnieje", slug))
}

// --- KATEGORIE ---

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, AppError> {
    fetch_sorted_categories(pool).await
}

pub async fn get_category(pool: &PgPool, id: Uuid) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

async fn slug_taken(
    tx: &mut Transaction<'_, Postgres>,
    slug: &str,
    except: Option<Uuid>,
) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(slug)
    .bind(except)
    .fetch_one(&mut **tx)
    .await?;
    Ok(taken)
}

pub async fn create_category(
    app_state: &AppState,
    payload: CreateCategoryPayload,
) -> Result<Category, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let name = payload.name;
    let slug = payload.slug.unwrap_or_else(|| slugify(&name));
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Nie da się utworzyć sluga z podanej nazwy".to_string(),
        ));
    }

    let mut tx = app_state.db_pool.begin().await?;

    if slug_taken(&mut tx, &slug, None).await? {
        return Err(slug_conflict(&slug));
    }

    let order = match payload.order {
        Some(order) => order,
        None => next_order_key(&mut tx, OrderedTable::Categories).await?,
    };

    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (id, name, slug, sort_order)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&slug)
    .bind(order)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, format!("Kategoria o slugu '{}' już istnieje", slug)))?;

    tx.commit().await?;
    app_state.invalidate_catalog().await;

    tracing::info!("Utworzono kategorię {} ({})", category.name, category.id);
    Ok(category)
}

pub async fn update_category(
    app_state: &AppState,
    id: Uuid,
    payload: UpdateCategoryPayload,
) -> Result<Category, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let mut tx = app_state.db_pool.begin().await?;

    let existing =
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;

    let name = payload.name.unwrap_or(existing.name);
    let slug = payload.slug.unwrap_or(existing.slug);
    let order = payload.order.unwrap_or(existing.order);

    if slug_taken(&mut tx, &slug, Some(id)).await? {
        return Err(slug_conflict(&slug));
    }

    let category = sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories
        SET name = $1, slug = $2, sort_order = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&slug)
    .bind(order)
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, format!("Kategoria o slugu '{}' już istnieje", slug)))?;

    tx.commit().await?;
    app_state.invalidate_catalog().await;

    tracing::info!("Zaktualizowano kategorię {}", id);
    Ok(category)
}

/// Usuwa kategorię razem z jej przedmiotami. Zwraca liczbę usuniętych przedmiotów.
pub async fn delete_category(app_state: &AppState, id: Uuid) -> Result<u64, AppError> {
    let mut tx = app_state.db_pool.begin().await?;

    let removed_items = sqlx::query("DELETE FROM items WHERE category_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let removed = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound);
    }

    tx.commit().await?;
    app_state.invalidate_catalog().await;

    tracing::info!(
        "Usunięto kategorię {} wraz z {} przedmiotami",
        id,
        removed_items
    );
    Ok(removed_items)
}

pub async fn move_category(
    app_state: &AppState,
    id: Uuid,
    direction: MoveDirection,
) -> Result<MoveOutcome, AppError> {
    let mut tx = app_state.db_pool.begin().await?;
    let outcome = swap_with_neighbour(&mut tx, OrderedTable::Categories, id, direction).await?;
    tx.commit().await?;
    if outcome.moved() {
        app_state.invalidate_catalog().await;
    }
    Ok(outcome)
}

// --- PRZEDMIOTY ---

pub async fn list_items(pool: &PgPool, category_id: Option<Uuid>) -> Result<Vec<Item>, AppError> {
    let items = sqlx::query_as::<_, Item>(
        r#"
        SELECT * FROM items
        WHERE ($1::uuid IS NULL OR category_id = $1)
        ORDER BY belt_number ASC, created_at ASC
        "#,
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

pub async fn get_item(pool: &PgPool, id: Uuid) -> Result<Item, AppError> {
    sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

async fn ensure_category_exists(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Uuid,
) -> Result<(), AppError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(category_id)
            .fetch_one(&mut **tx)
            .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Kategoria {} nie istnieje",
            category_id
        )))
    }
}

pub async fn create_item(app_state: &AppState, payload: CreateItemPayload) -> Result<Item, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let mut tx = app_state.db_pool.begin().await?;
    ensure_category_exists(&mut tx, payload.category_id).await?;

    let belt_number = match payload.belt_number {
        Some(number) => number,
        None => {
            next_order_key(
                &mut tx,
                OrderedTable::Items {
                    category_id: payload.category_id,
                },
            )
            .await?
        }
    };

    let item = sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items (
            id, category_id, title_pl, title_en, description_pl, description_en,
            size_from, size_to, main_size, buckle_size, price, belt_number, images
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.category_id)
    .bind(&payload.title_pl)
    .bind(&payload.title_en)
    .bind(&payload.description_pl)
    .bind(&payload.description_en)
    .bind(payload.size_from)
    .bind(payload.size_to)
    .bind(payload.main_size)
    .bind(payload.buckle_size)
    .bind(payload.price)
    .bind(belt_number)
    .bind(Json(&payload.images))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    app_state.invalidate_catalog().await;

    tracing::info!(
        "Utworzono przedmiot nr {} w kategorii {}",
        item.belt_number,
        item.category_id
    );
    Ok(item)
}

pub async fn update_item(
    app_state: &AppState,
    id: Uuid,
    payload: UpdateItemPayload,
) -> Result<Item, AppError> {
    let payload = payload.normalized();
    payload.validate()?;
    payload.check_optional_sizes()?;

    let mut tx = app_state.db_pool.begin().await?;

    let existing = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

    let category_id = payload.category_id.unwrap_or(existing.category_id);
    if category_id != existing.category_id {
        ensure_category_exists(&mut tx, category_id).await?;
    }

    let title_pl = payload.title_pl.unwrap_or(existing.title_pl);
    let title_en = payload.title_en.unwrap_or(existing.title_en);
    let images = payload.images.unwrap_or(existing.images.0);

    let item = sqlx::query_as::<_, Item>(
        r#"
        UPDATE items SET
            category_id = $1, title_pl = $2, title_en = $3,
            description_pl = $4, description_en = $5,
            size_from = $6, size_to = $7, main_size = $8, buckle_size = $9,
            price = $10, belt_number = $11, images = $12, updated_at = NOW()
        WHERE id = $13
        RETURNING *
        "#,
    )
    .bind(category_id)
    .bind(title_pl)
    .bind(title_en)
    .bind(payload.description_pl.unwrap_or(existing.description_pl))
    .bind(payload.description_en.unwrap_or(existing.description_en))
    .bind(payload.size_from.unwrap_or(existing.size_from))
    .bind(payload.size_to.unwrap_or(existing.size_to))
    .bind(payload.main_size.unwrap_or(existing.main_size))
    .bind(payload.buckle_size.unwrap_or(existing.buckle_size))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.belt_number.unwrap_or(existing.belt_number))
    .bind(Json(images))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    app_state.invalidate_catalog().await;

    tracing::info!("Zaktualizowano przedmiot {}", id);
    Ok(item)
}

pub async fn delete_item(app_state: &AppState, id: Uuid) -> Result<(), AppError> {
    let removed = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(AppError::NotFound);
    }
    app_state.invalidate_catalog().await;
    tracing::info!("Usunięto przedmiot {}", id);
    Ok(())
}

pub async fn move_item(
    app_state: &AppState,
    id: Uuid,
    direction: MoveDirection,
) -> Result<MoveOutcome, AppError> {
    let mut tx = app_state.db_pool.begin().await?;
    let category_id = sqlx::query_scalar::<_, Uuid>("SELECT category_id FROM items WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

    let outcome =
        swap_with_neighbour(&mut tx, OrderedTable::Items { category_id }, id, direction).await?;
    tx.commit().await?;
    if outcome.moved() {
        app_state.invalidate_catalog().await;
    }
    Ok(outcome)
}

// --- WYROBY Z DREWNA ---

pub async fn list_wood_items(pool: &PgPool) -> Result<Vec<WoodItem>, AppError> {
    let items = sqlx::query_as::<_, WoodItem>(
        "SELECT * FROM wood_items ORDER BY sort_order ASC, created_at ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(items)
}

pub async fn get_wood_item(pool: &PgPool, id: Uuid) -> Result<WoodItem, AppError> {
    sqlx::query_as::<_, WoodItem>("SELECT * FROM wood_items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn create_wood_item(
    app_state: &AppState,
    payload: CreateWoodItemPayload,
) -> Result<WoodItem, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let mut tx = app_state.db_pool.begin().await?;
    let order = match payload.order {
        Some(order) => order,
        None => next_order_key(&mut tx, OrderedTable::WoodItems).await?,
    };

    let item = sqlx::query_as::<_, WoodItem>(
        r#"
        INSERT INTO wood_items (id, description_pl, description_en, price, image_url, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.description_pl)
    .bind(&payload.description_en)
    .bind(payload.price)
    .bind(&payload.image_url)
    .bind(order)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    app_state.invalidate_catalog().await;

    tracing::info!("Dodano wyrób z drewna {}", item.id);
    Ok(item)
}

pub async fn update_wood_item(
    app_state: &AppState,
    id: Uuid,
    payload: UpdateWoodItemPayload,
) -> Result<WoodItem, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let mut tx = app_state.db_pool.begin().await?;
    let existing =
        sqlx::query_as::<_, WoodItem>("SELECT * FROM wood_items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;

    let item = sqlx::query_as::<_, WoodItem>(
        r#"
        UPDATE wood_items SET
            description_pl = $1, description_en = $2, price = $3,
            image_url = $4, sort_order = $5, updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(payload.description_pl.unwrap_or(existing.description_pl))
    .bind(payload.description_en.unwrap_or(existing.description_en))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.image_url.unwrap_or(existing.image_url))
    .bind(payload.order.unwrap_or(existing.order))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    app_state.invalidate_catalog().await;

    tracing::info!("Zaktualizowano wyrób z drewna {}", id);
    Ok(item)
}

pub async fn delete_wood_item(app_state: &AppState, id: Uuid) -> Result<(), AppError> {
    let removed = sqlx::query("DELETE FROM wood_items WHERE id = $1")
        .bind(id)
        .execute(&app_state.db_pool)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(AppError::NotFound);
    }
    app_state.invalidate_catalog().await;
    tracing::info!("Usunięto wyrób z drewna {}", id);
    Ok(())
}

pub async fn move_wood_item(
    app_state: &AppState,
    id: Uuid,
    direction: MoveDirection,
) -> Result<MoveOutcome, AppError> {
    let mut tx = app_state.db_pool.begin().await?;
    let outcome = swap_with_neighbour(&mut tx, OrderedTable::WoodItems, id, direction).await?;
    tx.commit().await?;
    if outcome.moved() {
        app_state.invalidate_catalog().await;
    }
    Ok(outcome)
}
