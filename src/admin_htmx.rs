// src/admin_htmx.rs
//
// Fragmenty panelu administratora: listy, formularze edycji w miejscu
// (`#draft-<id>`), zapis, anulowanie, usuwanie i zmiana kolejności.

use std::path::Path as FsPath;
use std::str::FromStr;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
};
use maud::{Markup, html};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminGuard;
use crate::errors::AppError;
use crate::extractor::{AppForm, AppPath, AppQuery};
use crate::filters::empty_as_none;
use crate::i18n::{Lang, format_price, format_size_range};
use crate::models::{
    Category, CreateCategoryPayload, CreateItemPayload, CreateWoodItemPayload, Item, ItemImage,
    MoveDirection, UpdateCategoryPayload, UpdateItemPayload, UpdateWoodItemPayload, WoodItem,
    empty_string_as_none,
};
use crate::ordering::MoveOutcome;
use crate::response::{ADMIN_SHELL, Toast, serve_shell, toast_headers};
use crate::services;
use crate::state::AppState;
use crate::uploads::{ImageChoice, MultipartForm, StoredUploads};

type Fragment = Result<(HeaderMap, Markup), AppError>;

/// Górna granica `image_count` z formularza.
const MAX_IMAGES_PER_ITEM: usize = 30;

pub async fn admin_shell_handler() -> Result<Response, AppError> {
    serve_shell(ADMIN_SHELL).await
}

// --- POMOCNICZE ---

fn parse_number<T: FromStr>(form: &MultipartForm, name: &str) -> Result<Option<T>, AppError> {
    match form.text(name) {
        None => Ok(None),
        Some(raw) => raw
            .replace(',', ".")
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Pole '{}' musi być liczbą", name))),
    }
}

fn require_number<T: FromStr>(form: &MultipartForm, name: &str) -> Result<T, AppError> {
    parse_number(form, name)?
        .ok_or_else(|| AppError::BadRequest(format!("Pole '{}' jest wymagane", name)))
}

fn text_or_empty(form: &MultipartForm, name: &str) -> String {
    form.text(name).unwrap_or_default().to_string()
}

/// Składa listę zdjęć z formularza. Istniejące zdjęcia zachowują ścieżkę,
/// chyba że wybrano dla nich nowy plik.
pub async fn collect_images(
    form: &mut MultipartForm,
    images_dir: &FsPath,
    uploads: &mut StoredUploads,
) -> Result<Vec<ItemImage>, AppError> {
    let count: usize = parse_number(form, "image_count")?.unwrap_or(0);
    if count > MAX_IMAGES_PER_ITEM {
        return Err(AppError::BadRequest(format!(
            "Przedmiot może mieć najwyżej {} zdjęć",
            MAX_IMAGES_PER_ITEM
        )));
    }
    let primary: Option<usize> = parse_number(form, "primary")?;
    let mut images = Vec::new();

    for index in 0..count {
        if form.text(&format!("image_remove_{}", index)).is_some() {
            continue;
        }
        let existing = form
            .text(&format!("image_url_{}", index))
            .map(str::to_string);
        let file = form.take_file(&format!("image_file_{}", index));
        let Some(choice) = ImageChoice::from_form(existing, file) else {
            continue;
        };
        let url = uploads.resolve(images_dir, choice).await?;
        images.push(ItemImage {
            url,
            alt_pl: text_or_empty(form, &format!("image_alt_pl_{}", index)),
            alt_en: text_or_empty(form, &format!("image_alt_en_{}", index)),
            is_primary: primary == Some(index),
            order: Some(images.len() as i32),
        });
    }

    if let Some(file) = form
        .take_file("image_file_new")
        .filter(|file| !file.bytes.is_empty())
    {
        let url = uploads.store(images_dir, &file).await?;
        images.push(ItemImage {
            url,
            alt_pl: text_or_empty(form, "image_alt_pl_new"),
            alt_en: text_or_empty(form, "image_alt_en_new"),
            is_primary: primary == Some(count),
            order: Some(images.len() as i32),
        });
    }

    Ok(images)
}

/// Pola przedmiotu wspólne dla tworzenia i edycji.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
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
    pub belt_number: Option<i32>,
}

impl ItemFields {
    pub fn from_form(form: &MultipartForm) -> Result<Self, AppError> {
        let category_id = form
            .text("category_id")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| AppError::BadRequest("Wybierz kategorię".to_string()))?;

        Ok(ItemFields {
            category_id,
            title_pl: text_or_empty(form, "title_pl"),
            title_en: text_or_empty(form, "title_en"),
            description_pl: text_or_empty(form, "description_pl"),
            description_en: text_or_empty(form, "description_en"),
            size_from: require_number(form, "size_from")?,
            size_to: require_number(form, "size_to")?,
            main_size: parse_number(form, "main_size")?,
            buckle_size: parse_number(form, "buckle_size")?,
            price: require_number(form, "price")?,
            belt_number: parse_number(form, "belt_number")?,
        })
    }

    pub fn into_create(self, images: Vec<ItemImage>) -> CreateItemPayload {
        CreateItemPayload {
            category_id: self.category_id,
            title_pl: self.title_pl,
            title_en: self.title_en,
            description_pl: self.description_pl,
            description_en: self.description_en,
            size_from: self.size_from,
            size_to: self.size_to,
            main_size: self.main_size,
            buckle_size: self.buckle_size,
            price: self.price,
            belt_number: self.belt_number,
            images,
        }
    }

    /// Formularz wysyła komplet pól, więc puste rozmiary czyszczą wartość.
    pub fn into_update(self, images: Vec<ItemImage>) -> UpdateItemPayload {
        UpdateItemPayload {
            category_id: Some(self.category_id),
            title_pl: Some(self.title_pl),
            title_en: Some(self.title_en),
            description_pl: Some(self.description_pl),
            description_en: Some(self.description_en),
            size_from: Some(self.size_from),
            size_to: Some(self.size_to),
            main_size: Some(self.main_size),
            buckle_size: Some(self.buckle_size),
            price: Some(self.price),
            belt_number: self.belt_number,
            images: Some(images),
        }
    }
}

fn move_buttons(url_prefix: &str, target: &str) -> Markup {
    html! {
        button type="button" title="W górę"
            hx-post={(url_prefix) "/move/up"} hx-target=(target) { "↑" }
        button type="button" title="W dół"
            hx-post={(url_prefix) "/move/down"} hx-target=(target) { "↓" }
    }
}

/// Przesunięcie na brzeg listy jest ciche; kolizja numerów wymaga poprawki w edycji.
fn move_toast(outcome: MoveOutcome) -> HeaderMap {
    match outcome {
        MoveOutcome::SameKey => toast_headers(
            "Sąsiedni element ma ten sam numer kolejności. Zmień numer w edycji.",
            Toast::Error,
        ),
        MoveOutcome::Moved | MoveOutcome::AtEdge => HeaderMap::new(),
    }
}

fn image_preview_input(name: &str) -> Markup {
    html! {
        input type="file" name=(name) accept="image/jpeg,image/png,image/webp,image/gif"
            onchange="previewImage(this)";
        img .preview."h-20"."w-20"."object-cover" data-preview hidden;
    }
}

// --- KATEGORIE ---

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub order: Option<i32>,
}

fn render_category_row(category: &Category) -> Markup {
    let row_id = format!("category-{}", category.id);
    let url = format!("/htmx/admin/categories/{}", category.id);
    html! {
        div .admin-row ."flex items-center gap-3 py-2 border-b" id=(row_id) {
            span ."font-semibold w-1/4" { (category.name) }
            span ."text-gray-500 w-1/4" { (category.slug) }
            span ."w-12" { (category.order) }
            button type="button"
                hx-get={"/htmx/admin/items?category_id=" (category.id.to_string())}
                hx-target="#admin-content" { "Przedmioty" }
            button type="button" hx-get={(url) "/edit"} hx-target={"#" (row_id)} hx-swap="outerHTML" { "Edytuj" }
            (move_buttons(&url, "#admin-content"))
            button ."text-red-600" type="button"
                hx-delete=(url)
                hx-confirm={"Usunąć kategorię \"" (category.name) "\" razem z przedmiotami?"}
                hx-target={"#" (row_id)} hx-swap="outerHTML" { "Usuń" }
        }
    }
}

fn render_category_form(category: Option<&Category>) -> Markup {
    match category {
        Some(category) => {
            let draft_id = format!("draft-{}", category.id);
            let url = format!("/htmx/admin/categories/{}", category.id);
            html! {
                form .admin-draft ."flex items-center gap-3 py-2 border-b bg-yellow-50" id=(draft_id)
                    hx-post=(url) hx-target="this" hx-swap="outerHTML" {
                    input type="text" name="name" required maxlength="120" value=(category.name);
                    input type="text" name="slug" maxlength="120" value=(category.slug);
                    input type="number" name="order" value=(category.order);
                    button type="submit" { "Zapisz" }
                    button type="button" hx-get={(url) "/row"} hx-target={"#" (draft_id)} hx-swap="outerHTML" { "Anuluj" }
                }
            }
        }
        None => html! {
            form #new-category ."flex items-center gap-3 mb-4"
                hx-post="/htmx/admin/categories" hx-target="#admin-content" {
                input type="text" name="name" required maxlength="120" placeholder="Nazwa";
                input type="text" name="slug" maxlength="120" placeholder="slug (opcjonalnie)";
                input type="number" name="order" placeholder="Kolejność";
                button type="submit" { "Dodaj kategorię" }
            }
        },
    }
}

pub fn render_categories_panel(categories: &[Category]) -> Markup {
    html! {
        h2 ."text-xl font-semibold mb-3" { "Kategorie" }
        (render_category_form(None))
        div #category-list {
            @if categories.is_empty() {
                p ."text-gray-500" { "Brak kategorii." }
            }
            @for category in categories {
                (render_category_row(category))
            }
        }
    }
}

async fn categories_panel(app_state: &AppState) -> Result<Markup, AppError> {
    let categories = services::list_categories(&app_state.db_pool).await?;
    Ok(render_categories_panel(&categories))
}

pub async fn categories_panel_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
) -> Result<Markup, AppError> {
    tracing::info!("MAUD: /htmx/admin/categories");
    categories_panel(&app_state).await
}

pub async fn create_category_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppForm(form): AppForm<CategoryForm>,
) -> Fragment {
    let category = services::create_category(
        &app_state,
        CreateCategoryPayload {
            name: form.name,
            slug: form.slug,
            order: form.order,
        },
    )
    .await?;
    let message = format!("Dodano kategorię \"{}\"", category.name);
    Ok((
        toast_headers(&message, Toast::Success),
        categories_panel(&app_state).await?,
    ))
}

pub async fn category_edit_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Markup, AppError> {
    let category = services::get_category(&app_state.db_pool, id).await?;
    Ok(render_category_form(Some(&category)))
}

pub async fn category_row_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Markup, AppError> {
    let category = services::get_category(&app_state.db_pool, id).await?;
    Ok(render_category_row(&category))
}

pub async fn update_category_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppForm(form): AppForm<CategoryForm>,
) -> Fragment {
    let category = services::update_category(
        &app_state,
        id,
        UpdateCategoryPayload {
            name: Some(form.name),
            slug: form.slug,
            order: form.order,
        },
    )
    .await?;
    Ok((
        toast_headers("Zapisano kategorię", Toast::Success),
        render_category_row(&category),
    ))
}

pub async fn delete_category_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Fragment {
    let removed_items = services::delete_category(&app_state, id).await?;
    let message = format!("Usunięto kategorię i {} przedmiotów", removed_items);
    Ok((toast_headers(&message, Toast::Success), html! {}))
}

pub async fn move_category_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath((id, direction)): AppPath<(Uuid, MoveDirection)>,
) -> Fragment {
    let outcome = services::move_category(&app_state, id, direction).await?;
    Ok((move_toast(outcome), categories_panel(&app_state).await?))
}

// --- PRZEDMIOTY ---

#[derive(Debug, Deserialize)]
pub struct ItemsPanelQuery {
    pub category_id: Uuid,
}

fn render_item_row(item: &Item) -> Markup {
    let row_id = format!("item-{}", item.id);
    let url = format!("/htmx/admin/items/{}", item.id);
    let cover = item
        .images
        .0
        .iter()
        .find(|img| img.is_primary)
        .or_else(|| item.images.0.first());
    html! {
        div .admin-row ."flex items-center gap-3 py-2 border-b" id=(row_id) {
            @if let Some(cover) = cover {
                img src=(cover.url) alt=(cover.alt_pl) class="h-12 w-12 object-cover";
            }
            span ."w-12" { "Nr " (item.belt_number) }
            span ."font-semibold w-1/3" { (item.title_pl) }
            span { (format_size_range(item.size_from, item.size_to)) }
            span { (format_price(item.price, Lang::Pl)) }
            button type="button" hx-get={(url) "/edit"} hx-target={"#" (row_id)} hx-swap="outerHTML" { "Edytuj" }
            (move_buttons(&url, "#admin-content"))
            button ."text-red-600" type="button"
                hx-delete=(url)
                hx-confirm={"Usunąć przedmiot nr " (item.belt_number) "?"}
                hx-target={"#" (row_id)} hx-swap="outerHTML" { "Usuń" }
        }
    }
}

fn render_images_fieldset(images: &[ItemImage]) -> Markup {
    let primary = images.iter().position(|img| img.is_primary).unwrap_or(0);
    html! {
        fieldset ."grid gap-2" {
            legend { "Zdjęcia" }
            input type="hidden" name="image_count" value=(images.len());
            @for (index, image) in images.iter().enumerate() {
                div ."flex items-center gap-2" {
                    img src=(image.url) alt=(image.alt_pl) class="h-16 w-16 object-cover";
                    input type="hidden" name={"image_url_" (index)} value=(image.url);
                    input type="text" name={"image_alt_pl_" (index)} value=(image.alt_pl) placeholder="Opis PL";
                    input type="text" name={"image_alt_en_" (index)} value=(image.alt_en) placeholder="Opis EN";
                    label { input type="radio" name="primary" value=(index) checked[index == primary]; " Główne" }
                    label { input type="checkbox" name={"image_remove_" (index)} value="1"; " Usuń" }
                    (image_preview_input(&format!("image_file_{}", index)))
                }
            }
            div ."flex items-center gap-2" {
                span { "Nowe zdjęcie:" }
                (image_preview_input("image_file_new"))
                input type="text" name="image_alt_pl_new" placeholder="Opis PL";
                input type="text" name="image_alt_en_new" placeholder="Opis EN";
                label { input type="radio" name="primary" value=(images.len()) checked[images.is_empty()]; " Główne" }
            }
        }
    }
}

fn render_item_fields(item: Option<&Item>, category_id: Uuid, categories: &[Category]) -> Markup {
    let selected = item.map_or(category_id, |i| i.category_id);
    html! {
        select name="category_id" {
            @for category in categories {
                option value=(category.id.to_string()) selected[category.id == selected] { (category.name) }
            }
        }
        input type="text" name="title_pl" required maxlength="200" placeholder="Tytuł PL"
            value=[item.map(|i| i.title_pl.as_str())];
        input type="text" name="title_en" maxlength="200" placeholder="Tytuł EN"
            value=[item.map(|i| i.title_en.as_str())];
        textarea name="description_pl" rows="3" placeholder="Opis PL" {
            (item.map_or("", |i| i.description_pl.as_str()))
        }
        textarea name="description_en" rows="3" placeholder="Opis EN" {
            (item.map_or("", |i| i.description_en.as_str()))
        }
        div ."grid grid-cols-3 gap-2" {
            input type="number" step="any" min="0" name="size_from" required placeholder="Rozmiar od"
                value=[item.map(|i| i.size_from)];
            input type="number" step="any" min="0" name="size_to" required placeholder="Rozmiar do"
                value=[item.map(|i| i.size_to)];
            input type="number" step="any" min="0" name="main_size" placeholder="Długość"
                value=[item.and_then(|i| i.main_size)];
            input type="number" step="any" min="0" name="buckle_size" placeholder="Klamra"
                value=[item.and_then(|i| i.buckle_size)];
            input type="number" step="any" min="0" name="price" required placeholder="Cena (PLN)"
                value=[item.map(|i| i.price)];
            input type="number" name="belt_number" placeholder="Nr paska"
                value=[item.map(|i| i.belt_number)];
        }
        (render_images_fieldset(item.map_or(&[][..], |i| i.images.0.as_slice())))
    }
}

fn render_item_draft(item: &Item, categories: &[Category]) -> Markup {
    let draft_id = format!("draft-{}", item.id);
    let url = format!("/htmx/admin/items/{}", item.id);
    html! {
        form .admin-draft ."grid gap-2 py-3 border-b bg-yellow-50" id=(draft_id)
            hx-post=(url) hx-encoding="multipart/form-data"
            hx-target="this" hx-swap="outerHTML"
            "hx-on::before-request"="releasePreviews(this)" {
            (render_item_fields(Some(item), item.category_id, categories))
            div ."flex gap-2" {
                button type="submit" { "Zapisz" }
                button type="button" onclick="releasePreviews(this.closest('form'))"
                    hx-get={(url) "/row"} hx-target={"#" (draft_id)} hx-swap="outerHTML" { "Anuluj" }
            }
        }
    }
}

pub fn render_items_panel(category: &Category, items: &[Item], categories: &[Category]) -> Markup {
    html! {
        div ."flex items-center gap-3 mb-3" {
            button type="button" hx-get="/htmx/admin/categories" hx-target="#admin-content" { "← Kategorie" }
            h2 ."text-xl font-semibold" { (category.name) }
        }
        details ."mb-4" {
            summary { "Dodaj przedmiot" }
            form #new-item ."grid gap-2"
                hx-post="/htmx/admin/items" hx-encoding="multipart/form-data"
                hx-target="#admin-content"
                "hx-on::before-request"="releasePreviews(this)" {
                (render_item_fields(None, category.id, categories))
                button type="submit" { "Dodaj" }
            }
        }
        div #item-list {
            @if items.is_empty() {
                p ."text-gray-500" { "Brak przedmiotów w tej kategorii." }
            }
            @for item in items {
                (render_item_row(item))
            }
        }
    }
}

async fn items_panel(app_state: &AppState, category_id: Uuid) -> Result<Markup, AppError> {
    let category = services::get_category(&app_state.db_pool, category_id).await?;
    let categories = services::list_categories(&app_state.db_pool).await?;
    let items = services::list_items(&app_state.db_pool, Some(category_id)).await?;
    Ok(render_items_panel(&category, &items, &categories))
}

pub async fn items_panel_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<ItemsPanelQuery>,
) -> Result<Markup, AppError> {
    tracing::info!("MAUD: /htmx/admin/items dla kategorii {}", query.category_id);
    items_panel(&app_state, query.category_id).await
}

pub async fn create_item_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Fragment {
    let mut form = MultipartForm::read(multipart).await?;
    let fields = ItemFields::from_form(&form)?;
    let images_dir = app_state.config.images_dir.as_path();
    let mut uploads = StoredUploads::default();

    let result: Result<Item, AppError> = async {
        let images = collect_images(&mut form, images_dir, &mut uploads).await?;
        services::create_item(&app_state, fields.into_create(images)).await
    }
    .await;
    let item = uploads.settle(images_dir, result).await?;
    let message = format!("Dodano przedmiot nr {}", item.belt_number);
    Ok((
        toast_headers(&message, Toast::Success),
        items_panel(&app_state, item.category_id).await?,
    ))
}

pub async fn item_edit_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Markup, AppError> {
    let item = services::get_item(&app_state.db_pool, id).await?;
    let categories = services::list_categories(&app_state.db_pool).await?;
    Ok(render_item_draft(&item, &categories))
}

pub async fn item_row_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Markup, AppError> {
    let item = services::get_item(&app_state.db_pool, id).await?;
    Ok(render_item_row(&item))
}

pub async fn update_item_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    multipart: Multipart,
) -> Fragment {
    let mut form = MultipartForm::read(multipart).await?;
    let fields = ItemFields::from_form(&form)?;
    let images_dir = app_state.config.images_dir.as_path();
    let mut uploads = StoredUploads::default();

    let result: Result<Item, AppError> = async {
        let images = collect_images(&mut form, images_dir, &mut uploads).await?;
        services::update_item(&app_state, id, fields.into_update(images)).await
    }
    .await;
    let item = uploads.settle(images_dir, result).await?;
    Ok((
        toast_headers("Zapisano przedmiot", Toast::Success),
        render_item_row(&item),
    ))
}

pub async fn delete_item_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Fragment {
    services::delete_item(&app_state, id).await?;
    Ok((toast_headers("Usunięto przedmiot", Toast::Success), html! {}))
}

pub async fn move_item_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath((id, direction)): AppPath<(Uuid, MoveDirection)>,
) -> Fragment {
    let outcome = services::move_item(&app_state, id, direction).await?;
    let item = services::get_item(&app_state.db_pool, id).await?;
    Ok((
        move_toast(outcome),
        items_panel(&app_state, item.category_id).await?,
    ))
}

// --- WYROBY Z DREWNA ---

fn render_wood_row(item: &WoodItem) -> Markup {
    let row_id = format!("wood-{}", item.id);
    let url = format!("/htmx/admin/wood/{}", item.id);
    html! {
        div .admin-row ."flex items-center gap-3 py-2 border-b" id=(row_id) {
            img src=(item.image_url) alt=(item.description_pl) class="h-12 w-12 object-cover";
            span ."w-1/2 truncate" { (item.description_pl) }
            span { (format_price(item.price, Lang::Pl)) }
            button type="button" hx-get={(url) "/edit"} hx-target={"#" (row_id)} hx-swap="outerHTML" { "Edytuj" }
            (move_buttons(&url, "#admin-content"))
            button ."text-red-600" type="button"
                hx-delete=(url) hx-confirm="Usunąć ten wyrób?"
                hx-target={"#" (row_id)} hx-swap="outerHTML" { "Usuń" }
        }
    }
}

fn render_wood_fields(item: Option<&WoodItem>) -> Markup {
    html! {
        textarea name="description_pl" rows="2" placeholder="Opis PL" {
            (item.map_or("", |i| i.description_pl.as_str()))
        }
        textarea name="description_en" rows="2" placeholder="Opis EN" {
            (item.map_or("", |i| i.description_en.as_str()))
        }
        input type="number" step="any" min="0" name="price" required placeholder="Cena (PLN)"
            value=[item.map(|i| i.price)];
        @if let Some(item) = item {
            img src=(item.image_url) alt="" class="h-16 w-16 object-cover";
            input type="hidden" name="image_url" value=(item.image_url);
        }
        (image_preview_input("image_file"))
    }
}

fn render_wood_draft(item: &WoodItem) -> Markup {
    let draft_id = format!("draft-{}", item.id);
    let url = format!("/htmx/admin/wood/{}", item.id);
    html! {
        form .admin-draft ."grid gap-2 py-3 border-b bg-yellow-50" id=(draft_id)
            hx-post=(url) hx-encoding="multipart/form-data"
            hx-target="this" hx-swap="outerHTML"
            "hx-on::before-request"="releasePreviews(this)" {
            (render_wood_fields(Some(item)))
            div ."flex gap-2" {
                button type="submit" { "Zapisz" }
                button type="button" onclick="releasePreviews(this.closest('form'))"
                    hx-get={(url) "/row"} hx-target={"#" (draft_id)} hx-swap="outerHTML" { "Anuluj" }
            }
        }
    }
}

pub fn render_wood_panel(items: &[WoodItem]) -> Markup {
    html! {
        h2 ."text-xl font-semibold mb-3" { "Wyroby z drewna" }
        details ."mb-4" {
            summary { "Dodaj wyrób" }
            form #new-wood ."grid gap-2"
                hx-post="/htmx/admin/wood" hx-encoding="multipart/form-data"
                hx-target="#admin-content"
                "hx-on::before-request"="releasePreviews(this)" {
                (render_wood_fields(None))
                button type="submit" { "Dodaj" }
            }
        }
        div #wood-list {
            @if items.is_empty() {
                p ."text-gray-500" { "Brak wyrobów." }
            }
            @for item in items {
                (render_wood_row(item))
            }
        }
    }
}

async fn wood_panel(app_state: &AppState) -> Result<Markup, AppError> {
    let items = services::list_wood_items(&app_state.db_pool).await?;
    Ok(render_wood_panel(&items))
}

/// Zdjęcie wyrobu: nowy plik albo dotychczasowy adres.
async fn wood_image_from_form(
    form: &mut MultipartForm,
    images_dir: &FsPath,
    uploads: &mut StoredUploads,
) -> Result<String, AppError> {
    let existing = form.text("image_url").map(str::to_string);
    let file = form.take_file("image_file");
    let choice = ImageChoice::from_form(existing, file)
        .ok_or_else(|| AppError::BadRequest("Zdjęcie jest wymagane".to_string()))?;
    uploads.resolve(images_dir, choice).await
}

pub async fn wood_panel_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
) -> Result<Markup, AppError> {
    tracing::info!("MAUD: /htmx/admin/wood");
    wood_panel(&app_state).await
}

pub async fn create_wood_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Fragment {
    let mut form = MultipartForm::read(multipart).await?;
    let price = require_number(&form, "price")?;
    let images_dir = app_state.config.images_dir.as_path();
    let mut uploads = StoredUploads::default();

    let result: Result<WoodItem, AppError> = async {
        let image_url = wood_image_from_form(&mut form, images_dir, &mut uploads).await?;
        services::create_wood_item(
            &app_state,
            CreateWoodItemPayload {
                description_pl: text_or_empty(&form, "description_pl"),
                description_en: text_or_empty(&form, "description_en"),
                price,
                image_url,
                order: None,
            },
        )
        .await
    }
    .await;
    uploads.settle(images_dir, result).await?;
    Ok((
        toast_headers("Dodano wyrób z drewna", Toast::Success),
        wood_panel(&app_state).await?,
    ))
}

pub async fn wood_edit_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Markup, AppError> {
    let item = services::get_wood_item(&app_state.db_pool, id).await?;
    Ok(render_wood_draft(&item))
}

pub async fn wood_row_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Markup, AppError> {
    let item = services::get_wood_item(&app_state.db_pool, id).await?;
    Ok(render_wood_row(&item))
}

pub async fn update_wood_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    multipart: Multipart,
) -> Fragment {
    let mut form = MultipartForm::read(multipart).await?;
    let price = require_number(&form, "price")?;
    let images_dir = app_state.config.images_dir.as_path();
    let mut uploads = StoredUploads::default();

    let result: Result<WoodItem, AppError> = async {
        let image_url = wood_image_from_form(&mut form, images_dir, &mut uploads).await?;
        services::update_wood_item(
            &app_state,
            id,
            UpdateWoodItemPayload {
                description_pl: Some(text_or_empty(&form, "description_pl")),
                description_en: Some(text_or_empty(&form, "description_en")),
                price: Some(price),
                image_url: Some(image_url),
                order: None,
            },
        )
        .await
    }
    .await;
    let item = uploads.settle(images_dir, result).await?;
    Ok((
        toast_headers("Zapisano wyrób", Toast::Success),
        render_wood_row(&item),
    ))
}

pub async fn delete_wood_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Fragment {
    services::delete_wood_item(&app_state, id).await?;
    Ok((toast_headers("Usunięto wyrób", Toast::Success), html! {}))
}

pub async fn move_wood_htmx_handler(
    _admin: AdminGuard,
    State(app_state): State<AppState>,
    AppPath((id, direction)): AppPath<(Uuid, MoveDirection)>,
) -> Fragment {
    let outcome = services::move_wood_item(&app_state, id, direction).await?;
    Ok((move_toast(outcome), wood_panel(&app_state).await?))
}
