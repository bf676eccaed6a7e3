// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::types::Json;
use strum_macros::{Display, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- KATEGORIE ---

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[sqlx(rename = "sort_order")]
    #[serde(rename = "order")]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 120, message = "Nazwa musi mieć od 1 do 120 znaków"))]
    pub name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl CreateCategoryPayload {
    /// Przycina pola przed walidacją, żeby same spacje nie przeszły jako nazwa.
    pub fn normalized(self) -> Self {
        CreateCategoryPayload {
            name: self.name.trim().to_string(),
            slug: self.slug.map(|s| s.trim().to_string()),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryPayload {
    #[validate(length(min = 1, max = 120, message = "Nazwa musi mieć od 1 do 120 znaków"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    pub order: Option<i32>,
}

impl UpdateCategoryPayload {
    pub fn normalized(self) -> Self {
        UpdateCategoryPayload {
            name: trim_opt(self.name),
            slug: trim_opt(self.slug),
            ..self
        }
    }
}

// --- PRZEDMIOTY (PASKI) ---

/// Zdjęcie osadzone w przedmiocie (kolumna JSONB).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ItemImage {
    #[validate(length(min = 1, max = 1000, message = "Adres zdjęcia jest wymagany"))]
    pub url: String,
    #[serde(default)]
    pub alt_pl: String,
    #[serde(default)]
    pub alt_en: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Item {
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
    pub images: Json<Vec<ItemImage>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItemPayload {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Tytuł (PL) musi mieć od 1 do 200 znaków"))]
    pub title_pl: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title_en: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_pl: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_en: String,
    #[validate(range(min = 0.0, message = "Rozmiar nie może być ujemny"))]
    pub size_from: f64,
    #[validate(range(min = 0.0, message = "Rozmiar nie może być ujemny"))]
    pub size_to: f64,
    #[validate(range(min = 0.0, message = "Rozmiar nie może być ujemny"))]
    pub main_size: Option<f64>,
    #[validate(range(min = 0.0, message = "Rozmiar klamry nie może być ujemny"))]
    pub buckle_size: Option<f64>,
    #[validate(range(min = 0.0, message = "Cena nie może być ujemna"))]
    pub price: f64,
    #[serde(default, alias = "numerPaska")]
    pub belt_number: Option<i32>,
    #[validate(
        length(min = 1, message = "Przedmiot musi mieć co najmniej jedno zdjęcie"),
        nested
    )]
    pub images: Vec<ItemImage>,
}

impl CreateItemPayload {
    pub fn normalized(self) -> Self {
        CreateItemPayload {
            title_pl: self.title_pl.trim().to_string(),
            title_en: self.title_en.trim().to_string(),
            images: trim_image_urls(self.images),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemPayload {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Tytuł (PL) musi mieć od 1 do 200 znaków"))]
    pub title_pl: Option<String>,
    #[validate(length(max = 200))]
    pub title_en: Option<String>,
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_pl: Option<String>,
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_en: Option<String>,
    #[validate(range(min = 0.0, message = "Rozmiar nie może być ujemny"))]
    pub size_from: Option<f64>,
    #[validate(range(min = 0.0, message = "Rozmiar nie może być ujemny"))]
    pub size_to: Option<f64>,
    /// `null` czyści wartość, brak pola zostawia ją bez zmian.
    #[serde(default, deserialize_with = "double_option")]
    pub main_size: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub buckle_size: Option<Option<f64>>,
    #[validate(range(min = 0.0, message = "Cena nie może być ujemna"))]
    pub price: Option<f64>,
    #[serde(default, alias = "numerPaska")]
    pub belt_number: Option<i32>,
    #[validate(
        length(min = 1, message = "Przedmiot musi mieć co najmniej jedno zdjęcie"),
        nested
    )]
    pub images: Option<Vec<ItemImage>>,
}

impl UpdateItemPayload {
    pub fn normalized(self) -> Self {
        UpdateItemPayload {
            title_pl: trim_opt(self.title_pl),
            title_en: trim_opt(self.title_en),
            images: self.images.map(trim_image_urls),
            ..self
        }
    }

    /// Walidacja pól nullable, których nie obsługuje derive.
    pub fn check_optional_sizes(&self) -> Result<(), validator::ValidationErrors> {
        let mut errors = validator::ValidationErrors::new();
        if let Some(Some(v)) = self.main_size {
            if v < 0.0 {
                errors.add("main_size", negative_error());
            }
        }
        if let Some(Some(v)) = self.buckle_size {
            if v < 0.0 {
                errors.add("buckle_size", negative_error());
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn negative_error() -> ValidationError {
    let mut err = ValidationError::new("range");
    err.message = Some("Rozmiar nie może być ujemny".into());
    err
}

// --- WYROBY Z DREWNA ---

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WoodItem {
    pub id: Uuid,
    pub description_pl: String,
    pub description_en: String,
    pub price: f64,
    pub image_url: String,
    #[sqlx(rename = "sort_order")]
    #[serde(rename = "order")]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWoodItemPayload {
    #[serde(default)]
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_pl: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_en: String,
    #[validate(range(min = 0.0, message = "Cena nie może być ujemna"))]
    pub price: f64,
    #[validate(length(min = 1, max = 1000, message = "Zdjęcie jest wymagane"))]
    pub image_url: String,
    #[serde(default)]
    pub order: Option<i32>,
}

impl CreateWoodItemPayload {
    pub fn normalized(self) -> Self {
        CreateWoodItemPayload {
            image_url: self.image_url.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWoodItemPayload {
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_pl: Option<String>,
    #[validate(length(max = 5000, message = "Opis jest za długi"))]
    pub description_en: Option<String>,
    #[validate(range(min = 0.0, message = "Cena nie może być ujemna"))]
    pub price: Option<f64>,
    #[validate(length(min = 1, max = 1000, message = "Zdjęcie jest wymagane"))]
    pub image_url: Option<String>,
    pub order: Option<i32>,
}

impl UpdateWoodItemPayload {
    pub fn normalized(self) -> Self {
        UpdateWoodItemPayload {
            image_url: trim_opt(self.image_url),
            ..self
        }
    }
}

// --- KOLEJNOŚĆ ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovePayload {
    pub direction: MoveDirection,
}

// --- POMOCNICZE ---

/// Slug z nazwy: małe litery, polskie znaki bez ogonków, reszta jako '-'.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ź' | 'ż' => 'z',
            c if c.is_ascii_alphanumeric() => c,
            _ => '-',
        };
        if mapped == '-' {
            if !last_dash {
                slug.push('-');
            }
            last_dash = true;
        } else {
            slug.push(mapped);
            last_dash = false;
        }
    }
    slug.trim_end_matches('-').to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 120
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug");
        err.message = Some("Slug może zawierać tylko małe litery, cyfry i '-'".into());
        Err(err)
    }
}

/// Przycięta wartość; `Some("  ")` zostaje `Some("")`, żeby walidacja długości ją odrzuciła.
fn trim_opt(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn trim_image_urls(images: Vec<ItemImage>) -> Vec<ItemImage> {
    images
        .into_iter()
        .map(|image| ItemImage {
            url: image.url.trim().to_string(),
            ..image
        })
        .collect()
}

pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
