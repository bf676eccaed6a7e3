// src/catalog.rs

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Category, Item, ItemImage};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub categories: Vec<CatalogCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub items: Vec<CatalogItem>,
    /// Zdjęcie główne (albo pierwsze) każdego przedmiotu, w kolejności przedmiotów.
    pub images: Vec<ItemImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title_pl: String,
    pub title_en: String,
    pub description_pl: String,
    pub description_en: String,
    pub size_from: f64,
    pub size_to: f64,
    pub main_size: Option<f64>,
    pub buckle_size: Option<f64>,
    pub price: f64,
    pub belt_number: i32,
    pub images: Vec<ItemImage>,
}

impl CatalogItem {
    pub fn from_item(item: Item) -> Self {
        CatalogItem {
            id: item.id,
            category_id: item.category_id,
            title_pl: item.title_pl,
            title_en: item.title_en,
            description_pl: item.description_pl,
            description_en: item.description_en,
            size_from: item.size_from,
            size_to: item.size_to,
            main_size: item.main_size,
            buckle_size: item.buckle_size,
            price: item.price,
            belt_number: item.belt_number,
            images: normalize_images(item.images.0),
        }
    }

    pub fn size_span(&self) -> (f64, f64) {
        (
            self.size_from.min(self.size_to),
            self.size_from.max(self.size_to),
        )
    }

    /// Zdjęcie główne, a gdy go brak - pierwsze.
    pub fn cover_image(&self) -> Option<&ItemImage> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
    }

    pub fn primary_index(&self) -> usize {
        self.images
            .iter()
            .position(|img| img.is_primary)
            .unwrap_or(0)
    }
}

/// Porządkuje listę zdjęć przedmiotu:
/// usuwa puste adresy, uzupełnia brakujący `order` indeksem,
/// sortuje po `order` i zostawia dokładnie jedno zdjęcie główne.
pub fn normalize_images(images: Vec<ItemImage>) -> Vec<ItemImage> {
    let mut images: Vec<ItemImage> = images
        .into_iter()
        .enumerate()
        .filter(|(_, img)| !img.url.trim().is_empty())
        .map(|(index, mut img)| {
            if img.order.is_none() {
                img.order = Some(index as i32);
            }
            img
        })
        .collect();

    images.sort_by_key(|img| img.order.unwrap_or_default());

    let mut primary_seen = false;
    for img in images.iter_mut() {
        if img.is_primary {
            if primary_seen {
                img.is_primary = false;
            }
            primary_seen = true;
        }
    }
    if !primary_seen {
        if let Some(first) = images.first_mut() {
            first.is_primary = true;
        }
    }

    images
}

/// Okładki kategorii: zdjęcie główne (lub pierwsze) każdego przedmiotu.
pub fn fallback_images<'a, I>(items: I) -> Vec<ItemImage>
where
    I: IntoIterator<Item = &'a CatalogItem>,
{
    items
        .into_iter()
        .filter_map(|item| item.cover_image().cloned())
        .collect()
}

/// Składa odpowiedź katalogu. Wejście musi być już posortowane:
/// kategorie po (order, created_at), przedmioty po (belt_number, created_at).
pub fn build_catalog(categories: Vec<Category>, items: Vec<Item>) -> CatalogResponse {
    let mut by_category: HashMap<Uuid, Vec<CatalogItem>> = HashMap::new();
    for item in items {
        by_category
            .entry(item.category_id)
            .or_default()
            .push(CatalogItem::from_item(item));
    }

    let categories = categories
        .into_iter()
        .map(|category| {
            let items = by_category.remove(&category.id).unwrap_or_default();
            let images = fallback_images(&items);
            CatalogCategory {
                id: category.id,
                name: category.name,
                slug: category.slug,
                order: category.order,
                items,
                images,
            }
        })
        .collect();

    if !by_category.is_empty() {
        tracing::warn!(
            "Pominięto przedmioty z {} nieistniejących kategorii",
            by_category.len()
        );
    }

    CatalogResponse { categories }
}

pub async fn fetch_sorted_categories(pool: &PgPool) -> Result<Vec<Category>, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories ORDER BY sort_order ASC, created_at ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn fetch_sorted_items(pool: &PgPool) -> Result<Vec<Item>, AppError> {
    let items = sqlx::query_as::<_, Item>(
        "SELECT * FROM items ORDER BY belt_number ASC, created_at ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Pobiera katalog z cache'u, a przy braku składa go z bazy.
pub async fn load_catalog(app_state: &AppState) -> Result<Arc<CatalogResponse>, AppError> {
    if let Some(cached) = app_state.catalog_cache.get(&()).await {
        tracing::debug!("Cache HIT dla katalogu");
        return Ok(cached);
    }

    tracing::info!("Cache MISS dla katalogu. Pobieranie z bazy.");
    let categories = fetch_sorted_categories(&app_state.db_pool).await?;
    let items = fetch_sorted_items(&app_state.db_pool).await?;
    let catalog = Arc::new(build_catalog(categories, items));

    app_state.catalog_cache.insert((), catalog.clone()).await;
    Ok(catalog)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sqlx::types::Json;

    pub fn image(url: &str, is_primary: bool, order: Option<i32>) -> ItemImage {
        ItemImage {
            url: url.to_string(),
            alt_pl: format!("{} pl", url),
            alt_en: format!("{} en", url),
            is_primary,
            order,
        }
    }

    pub fn category(name: &str, order: i32) -> Category {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: crate::models::slugify(name),
            order,
            created_at: ts,
            updated_at: ts,
        }
    }

    pub fn item(category_id: Uuid, belt_number: i32, images: Vec<ItemImage>) -> Item {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        Item {
            id: Uuid::new_v4(),
            category_id,
            title_pl: format!("Pasek {}", belt_number),
            title_en: format!("Belt {}", belt_number),
            description_pl: "Skóra licowa".to_string(),
            description_en: "Full grain leather".to_string(),
            size_from: 110.0,
            size_to: 95.0,
            main_size: Some(100.0),
            buckle_size: Some(4.0),
            price: 250.0,
            belt_number,
            images: Json(images),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn primary_count(images: &[ItemImage]) -> usize {
        images.iter().filter(|img| img.is_primary).count()
    }

    #[test]
    fn first_image_becomes_primary_when_none_flagged() {
        let out = normalize_images(vec![image("a.jpg", false, None), image("b.jpg", false, None)]);
        assert_eq!(primary_count(&out), 1);
        assert!(out[0].is_primary);
        assert_eq!(out[0].url, "a.jpg");
    }

    #[test]
    fn extra_primaries_after_first_are_cleared() {
        let out = normalize_images(vec![
            image("a.jpg", false, Some(0)),
            image("b.jpg", true, Some(1)),
            image("c.jpg", true, Some(2)),
        ]);
        assert_eq!(primary_count(&out), 1);
        assert!(out[1].is_primary);
        assert!(!out[2].is_primary);
    }

    #[test]
    fn empty_urls_are_dropped_and_order_is_respected() {
        let out = normalize_images(vec![
            image("c.jpg", false, Some(5)),
            image("   ", true, Some(0)),
            image("a.jpg", false, None),
            image("b.jpg", false, Some(1)),
        ]);
        let urls: Vec<&str> = out.iter().map(|img| img.url.as_str()).collect();
        // "a.jpg" bez order dostaje indeks 2
        assert_eq!(urls, vec!["b.jpg", "a.jpg", "c.jpg"]);
        assert_eq!(out[1].order, Some(2));
        assert_eq!(primary_count(&out), 1);
        assert!(out[0].is_primary);
    }

    #[test]
    fn empty_list_stays_empty() {
        assert!(normalize_images(vec![]).is_empty());
        assert!(normalize_images(vec![image("", true, None)]).is_empty());
    }

    #[test]
    fn exactly_one_primary_for_every_non_empty_list() {
        let flags = [
            vec![false, false, false],
            vec![true, true, true],
            vec![false, true, false],
            vec![true, false, true],
        ];
        for pattern in flags {
            let images = pattern
                .iter()
                .enumerate()
                .map(|(i, &p)| image(&format!("{}.jpg", i), p, Some((3 - i) as i32)))
                .collect();
            assert_eq!(primary_count(&normalize_images(images)), 1);
        }
    }

    #[test]
    fn items_are_grouped_under_their_categories() {
        let belts = category("Paski", 0);
        let buckles = category("Klamry", 1);
        let empty = category("Puste", 2);

        let items = vec![
            item(belts.id, 1, vec![image("p1.jpg", false, None)]),
            item(buckles.id, 2, vec![image("k1.jpg", false, None), image("k2.jpg", true, None)]),
            item(belts.id, 3, vec![image("p3a.jpg", false, None), image("p3b.jpg", false, None)]),
            item(Uuid::new_v4(), 4, vec![image("orphan.jpg", false, None)]),
        ];

        let catalog = build_catalog(vec![belts.clone(), buckles.clone(), empty.clone()], items);
        assert_eq!(catalog.categories.len(), 3);

        let belts_out = &catalog.categories[0];
        assert_eq!(belts_out.id, belts.id);
        assert_eq!(
            belts_out.items.iter().map(|i| i.belt_number).collect::<Vec<_>>(),
            vec![1, 3]
        );
        let fallback: Vec<&str> = belts_out.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(fallback, vec!["p1.jpg", "p3a.jpg"]);

        let buckles_out = &catalog.categories[1];
        assert_eq!(buckles_out.images[0].url, "k2.jpg");

        assert!(catalog.categories[2].items.is_empty());
        assert!(catalog.categories[2].images.is_empty());
    }

    #[test]
    fn catalog_serializes_nested_structure() {
        let belts = category("Paski", 0);
        let catalog = build_catalog(
            vec![belts.clone()],
            vec![item(belts.id, 1, vec![image("p1.jpg", false, None)])],
        );
        let value = serde_json::to_value(&catalog).unwrap();
        assert_eq!(value["categories"][0]["slug"], "paski");
        assert_eq!(value["categories"][0]["items"][0]["images"][0]["is_primary"], true);
        assert_eq!(value["categories"][0]["images"][0]["url"], "p1.jpg");
    }
}
