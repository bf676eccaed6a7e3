// src/htmx_handlers.rs
//
// Publiczna część strony: katalog z filtrami, galerie kategorii i wyroby z drewna.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Response,
};
use maud::{Markup, html};
use serde::Deserialize;
use strum_macros::EnumString;
use uuid::Uuid;

use crate::catalog::{CatalogItem, load_catalog};
use crate::errors::AppError;
use crate::extractor::{AppPath, AppQuery};
use crate::filters::{CatalogFilter, FilteredCategory, empty_as_none, filter_catalog};
use crate::gallery::{GalleryState, Swipe};
use crate::i18n::{Lang, format_price, format_size_range};
use crate::models::WoodItem;
use crate::response::build_response;
use crate::services;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GalleryNav {
    Next,
    Prev,
    Item,
    Image,
    Swipe,
}

/// Stan galerii przekazywany w adresie fragmentu.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub item: Option<usize>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image: Option<usize>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub nav: Option<GalleryNav>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub to: Option<usize>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub dx: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub dy: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub ticket: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LangQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub lang: Option<Lang>,
}

/// Wykonuje krok nawigacji; zwraca bilet ładowania, gdy obraz się zmienia.
pub fn apply_navigation(state: &mut GalleryState, query: &GalleryQuery) -> Option<u64> {
    if state.is_empty() {
        return None;
    }
    match query.nav? {
        GalleryNav::Next => state.next_item(),
        GalleryNav::Prev => state.previous_item(),
        GalleryNav::Item => state.select_item(query.to?),
        GalleryNav::Image => state.select_image(query.to?),
        GalleryNav::Swipe => {
            let gesture = Swipe::from_delta(query.dx?, query.dy.unwrap_or(0.0))?;
            state.swipe(gesture)
        }
    }
}

// --- STRONY ---

pub async fn home_page_handler(
    headers: HeaderMap,
    State(app_state): State<AppState>,
    AppQuery(filter): AppQuery<CatalogFilter>,
) -> Result<Response, AppError> {
    tracing::info!("MAUD: / z filtrami: {:?}", filter);
    let catalog = load_catalog(&app_state).await?;
    let filtered = filter_catalog(&catalog.categories, &filter);

    let content = html! {
        (render_header(&filter, "/"))
        (render_filter_form(&filter))
        (render_catalog(&filtered, &filter))
    };
    build_response(&headers, content).await
}

pub async fn catalog_htmx_handler(
    State(app_state): State<AppState>,
    AppQuery(filter): AppQuery<CatalogFilter>,
) -> Result<Markup, AppError> {
    tracing::info!("MAUD: /htmx/catalog z filtrami: {:?}", filter);
    let catalog = load_catalog(&app_state).await?;
    let filtered = filter_catalog(&catalog.categories, &filter);
    Ok(render_catalog(&filtered, &filter))
}

pub async fn gallery_htmx_handler(
    State(app_state): State<AppState>,
    AppPath(category_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<GalleryQuery>,
    AppQuery(filter): AppQuery<CatalogFilter>,
) -> Result<Markup, AppError> {
    tracing::debug!("MAUD: /htmx/gallery/{} {:?}", category_id, query);
    let catalog = load_catalog(&app_state).await?;
    let category = catalog
        .categories
        .iter()
        .find(|c| c.id == category_id)
        .ok_or_else(|| {
            tracing::warn!("MAUD: Nie znaleziono kategorii {}", category_id);
            AppError::NotFound
        })?;

    let items: Vec<&CatalogItem> = category
        .items
        .iter()
        .filter(|item| filter.matches(item))
        .collect();

    let mut state = GalleryState::restore(
        &items,
        query.item.unwrap_or(0),
        query.image,
        query.ticket.unwrap_or(0),
    );
    apply_navigation(&mut state, &query);

    Ok(render_gallery(category_id, &items, &state, &filter))
}

pub async fn wood_page_handler(
    headers: HeaderMap,
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<LangQuery>,
) -> Result<Response, AppError> {
    let lang = query.lang.unwrap_or_default();
    tracing::info!("MAUD: /drewno ({})", lang);
    let items = services::list_wood_items(&app_state.db_pool).await?;
    let filter = CatalogFilter {
        lang: Some(lang),
        ..CatalogFilter::default()
    };

    let content = html! {
        (render_header(&filter, "/drewno"))
        (render_wood_grid(&items, lang))
    };
    build_response(&headers, content).await
}

// --- WIDOKI ---

fn render_header(filter: &CatalogFilter, path: &str) -> Markup {
    let lang = filter.lang();
    let switched = CatalogFilter {
        lang: Some(lang.other()),
        ..filter.clone()
    };
    let lang_code = lang.to_string();
    html! {
        header ."flex items-center justify-between py-4" {
            nav ."flex gap-4" {
                a href={"/?lang=" (lang_code)} hx-get={"/?lang=" (lang_code)} hx-target="#content" hx-push-url="true" {
                    (lang.pick("Paski", "Belts"))
                }
                a href={"/drewno?lang=" (lang_code)} hx-get={"/drewno?lang=" (lang_code)} hx-target="#content" hx-push-url="true" {
                    (lang.pick("Drewno", "Wood"))
                }
            }
            a .lang-switch
                href={(path) "?" (switched.to_query_string())}
                hx-get={(path) "?" (switched.to_query_string())}
                hx-target="#content"
                hx-push-url="true" {
                (lang.other().to_string().to_uppercase())
            }
        }
    }
}

fn render_filter_form(filter: &CatalogFilter) -> Markup {
    let lang = filter.lang();
    let lang_code = lang.to_string();
    html! {
        form #filters ."grid grid-cols-2 md:grid-cols-4 gap-3 mb-6"
            hx-get="/htmx/catalog"
            hx-target="#catalog"
            hx-swap="outerHTML"
            hx-trigger="input changed delay:400ms, submit" {
            input type="hidden" name="lang" value=(lang_code);
            input type="search" name="q" value=[filter.q.as_deref()]
                placeholder=(lang.pick("Szukaj…", "Search…"));
            input type="number" name="belt" min="0" value=[filter.belt]
                placeholder=(lang.pick("Nr paska", "Belt no."));
            input type="number" name="price_min" min="0" step="any" value=[filter.price_min]
                placeholder=(lang.pick("Cena od", "Price from"));
            input type="number" name="price_max" min="0" step="any" value=[filter.price_max]
                placeholder=(lang.pick("Cena do", "Price to"));
            input type="number" name="size_min" min="0" step="any" value=[filter.size_min]
                placeholder=(lang.pick("Długość od (cm)", "Length from (cm)"));
            input type="number" name="size_max" min="0" step="any" value=[filter.size_max]
                placeholder=(lang.pick("Długość do (cm)", "Length to (cm)"));
            input type="number" name="buckle_min" min="0" step="any" value=[filter.buckle_min]
                placeholder=(lang.pick("Klamra od (cm)", "Buckle from (cm)"));
            input type="number" name="buckle_max" min="0" step="any" value=[filter.buckle_max]
                placeholder=(lang.pick("Klamra do (cm)", "Buckle to (cm)"));
            button type="submit" { (lang.pick("Filtruj", "Filter")) }
            @if filter.is_active() {
                a href={"/?lang=" (lang_code)} hx-get={"/?lang=" (lang_code)} hx-target="#content" {
                    (lang.pick("Wyczyść", "Clear"))
                }
            }
        }
    }
}

pub fn render_catalog(categories: &[FilteredCategory<'_>], filter: &CatalogFilter) -> Markup {
    let lang = filter.lang();
    html! {
        div #catalog {
            @if categories.is_empty() {
                p ."text-center text-gray-500 py-8" {
                    (lang.pick("Brak produktów spełniających kryteria.", "No products match the filters."))
                }
            }
            @for filtered in categories {
                section ."mb-10" id=(filtered.category.slug) {
                    h2 ."text-2xl font-semibold mb-3" { (filtered.category.name) }
                    @if filtered.items.is_empty() {
                        div ."flex gap-2" {
                            @for cover in &filtered.images {
                                img src=(cover.url) alt=(lang.pick(&cover.alt_pl, &cover.alt_en))
                                    loading="lazy" class="h-24 w-24 object-cover";
                            }
                        }
                    } @else {
                        (render_gallery(
                            filtered.category.id,
                            &filtered.items,
                            &GalleryState::new(&filtered.items),
                            filter,
                        ))
                    }
                }
            }
        }
    }
}

fn gallery_url(category_id: Uuid, state: &GalleryState, nav: &str, filter: &CatalogFilter) -> String {
    format!(
        "/htmx/gallery/{}?item={}&image={}&ticket={}&{}&{}",
        category_id,
        state.active_item(),
        state.active_image(),
        state.generation(),
        nav,
        filter.to_query_string()
    )
}

pub fn render_gallery(
    category_id: Uuid,
    items: &[&CatalogItem],
    state: &GalleryState,
    filter: &CatalogFilter,
) -> Markup {
    let lang = filter.lang();
    let gallery_id = format!("gallery-{}", category_id);
    let target = format!("#{}", gallery_id);
    let ticket = state.generation();

    let Some(item) = items.get(state.active_item()) else {
        return html! {
            div .gallery id=(gallery_id) {
                p ."text-gray-500" { (lang.pick("Brak produktów.", "No products.")) }
            }
        };
    };
    let active_image = item.images.get(state.active_image());
    let alt = active_image.map_or("", |img| lang.pick(&img.alt_pl, &img.alt_en));

    html! {
        div .gallery id=(gallery_id) data-ticket=(ticket)
            data-swipe-url=(gallery_url(category_id, state, "nav=swipe", filter))
            data-target=(target) {
            div .gallery-stage ."relative" {
                @match state.crossfade() {
                    Some(fade) => {
                        img .gallery-image.gallery-previous src=(fade.previous_url) alt=(alt);
                        img .gallery-image.gallery-next src=(fade.next_url) alt=(alt)
                            data-ticket=(fade.ticket) style="opacity: 0";
                    }
                    None => {
                        @if let Some(url) = state.current_url() {
                            img .gallery-image src=(url) alt=(alt);
                        }
                    }
                }
                @if state.len() > 1 {
                    button .gallery-prev type="button"
                        hx-get=(gallery_url(category_id, state, "nav=prev", filter))
                        hx-target=(target) hx-swap="outerHTML" { "‹" }
                    button .gallery-next-btn type="button"
                        hx-get=(gallery_url(category_id, state, "nav=next", filter))
                        hx-target=(target) hx-swap="outerHTML" { "›" }
                }
            }

            @if item.images.len() > 1 {
                div .gallery-thumbs ."flex gap-2 mt-2" {
                    @for (index, image) in item.images.iter().enumerate() {
                        button .active[index == state.active_image()]
                            type="button"
                            hx-get=(gallery_url(category_id, state, &format!("nav=image&to={}", index), filter))
                            hx-target=(target) hx-swap="outerHTML" {
                            img src=(image.url) alt=(lang.pick(&image.alt_pl, &image.alt_en))
                                loading="lazy" class="h-16 w-16 object-cover";
                        }
                    }
                }
            }

            (render_item_details(item, lang))
            (render_inquiry_form(item, lang))

            @if items.len() > 1 {
                div .gallery-items ."flex gap-2 mt-4 overflow-x-auto" {
                    @for (index, other) in items.iter().enumerate() {
                        @if let Some(cover) = other.cover_image() {
                            button .active[index == state.active_item()]
                                type="button"
                                hx-get=(gallery_url(category_id, state, &format!("nav=item&to={}", index), filter))
                                hx-target=(target) hx-swap="outerHTML" {
                                img src=(cover.url) alt=(lang.pick(&other.title_pl, &other.title_en))
                                    loading="lazy" class="h-20 w-20 object-cover";
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_item_details(item: &CatalogItem, lang: Lang) -> Markup {
    html! {
        div .item-details ."mt-4" {
            p ."text-sm text-gray-500" { (lang.pick("Nr ", "No. ")) (item.belt_number) }
            h3 ."text-xl font-semibold" { (lang.pick(&item.title_pl, &item.title_en)) }
            p ."whitespace-pre-line" { (lang.pick(&item.description_pl, &item.description_en)) }
            dl ."grid grid-cols-2 gap-1 mt-2" {
                dt { (lang.pick("Rozmiar", "Size")) }
                dd { (format_size_range(item.size_from, item.size_to)) }
                @if let Some(main) = item.main_size {
                    dt { (lang.pick("Długość", "Length")) }
                    dd { (format_size_range(main, main)) }
                }
                @if let Some(buckle) = item.buckle_size {
                    dt { (lang.pick("Klamra", "Buckle")) }
                    dd { (format_size_range(buckle, buckle)) }
                }
                dt { (lang.pick("Cena", "Price")) }
                dd .price { (format_price(item.price, lang)) }
            }
        }
    }
}

fn render_inquiry_form(item: &CatalogItem, lang: Lang) -> Markup {
    html! {
        form .inquiry-form ."mt-4 grid gap-2"
            hx-post="/api/inquiry"
            hx-swap="none"
            data-inquiry {
            input type="hidden" name="product_number" value=(item.belt_number);
            input type="email" name="email" required
                placeholder=(lang.pick("Twój e-mail", "Your e-mail"));
            input type="text" name="name" maxlength="120"
                placeholder=(lang.pick("Imię (opcjonalnie)", "Name (optional)"));
            textarea name="message" maxlength="2000" rows="3"
                placeholder=(lang.pick("Wiadomość", "Message")) {}
            div style="display: none" aria-hidden="true" {
                input type="text" name="website" tabindex="-1" autocomplete="off";
            }
            button type="submit" { (lang.pick("Zapytaj o ten produkt", "Ask about this product")) }
        }
    }
}

pub fn render_wood_grid(items: &[WoodItem], lang: Lang) -> Markup {
    html! {
        section #wood ."grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-3 gap-6" {
            @if items.is_empty() {
                p ."col-span-full text-center text-gray-500 py-8" {
                    (lang.pick("Wkrótce nowe wyroby.", "New pieces coming soon."))
                }
            }
            @for item in items {
                article ."border rounded-lg p-4" {
                    img src=(item.image_url)
                        alt=(lang.pick(&item.description_pl, &item.description_en))
                        loading="lazy" class="w-full object-cover";
                    p ."mt-2 whitespace-pre-line" { (lang.pick(&item.description_pl, &item.description_en)) }
                    p .price ."font-semibold" { (format_price(item.price, lang)) }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_catalog;
    use crate::catalog::tests::{category, image, item};

    fn catalog() -> crate::catalog::CatalogResponse {
        let belts = category("Paski", 0);
        let empty = category("Portfele", 1);
        build_catalog(
            vec![belts.clone(), empty],
            vec![
                item(belts.id, 1, vec![image("1a.jpg", false, None), image("1b.jpg", false, None)]),
                item(belts.id, 2, vec![image("2a.jpg", false, None)]),
            ],
        )
    }

    fn nav(nav: GalleryNav, to: Option<usize>) -> GalleryQuery {
        GalleryQuery {
            nav: Some(nav),
            to,
            ..GalleryQuery::default()
        }
    }

    #[test]
    fn catalog_renders_visible_categories_only() {
        let catalog = catalog();
        let filter = CatalogFilter::default();
        let markup = render_catalog(&filter_catalog(&catalog.categories, &filter), &filter)
            .into_string();

        assert!(markup.contains("id=\"paski\""));
        assert!(!markup.contains("Portfele"));
        assert!(markup.contains("250 PLN"));
        assert!(markup.contains("95–110 cm"));
    }

    #[test]
    fn english_mode_shows_dollars_and_translations() {
        let catalog = catalog();
        let filter = CatalogFilter {
            lang: Some(Lang::En),
            ..CatalogFilter::default()
        };
        let markup = render_catalog(&filter_catalog(&catalog.categories, &filter), &filter)
            .into_string();
        assert!(markup.contains("$62.50"));
        assert!(markup.contains("Belt 1"));
        assert!(markup.contains("lang=en"));
    }

    #[test]
    fn empty_result_shows_message() {
        let catalog = catalog();
        let filter = CatalogFilter {
            belt: Some(99),
            ..CatalogFilter::default()
        };
        let markup = render_catalog(&filter_catalog(&catalog.categories, &filter), &filter)
            .into_string();
        assert!(markup.contains("Brak produktów spełniających kryteria."));
    }

    #[test]
    fn navigation_steps_produce_crossfade_markup() {
        let catalog = catalog();
        let items: Vec<&CatalogItem> = catalog.categories[0].items.iter().collect();
        let mut state = GalleryState::restore(&items, 0, None, 0);

        let ticket = apply_navigation(&mut state, &nav(GalleryNav::Next, None)).unwrap();
        assert_eq!(state.active_item(), 1);

        let markup = render_gallery(
            catalog.categories[0].id,
            &items,
            &state,
            &CatalogFilter::default(),
        )
        .into_string();
        assert!(markup.contains("gallery-previous"));
        assert!(markup.contains(&format!("data-ticket=\"{}\"", ticket)));
        assert!(markup.contains("src=\"1a.jpg\""));
        assert!(markup.contains("src=\"2a.jpg\""));
        assert!(markup.contains(&format!("ticket={}", ticket)));
    }

    #[test]
    fn ticket_from_the_url_carries_into_the_next_fragment() {
        let catalog = catalog();
        let items: Vec<&CatalogItem> = catalog.categories[0].items.iter().collect();
        let query = GalleryQuery {
            item: Some(0),
            ticket: Some(7),
            ..nav(GalleryNav::Next, None)
        };
        let mut state = GalleryState::restore(&items, 0, None, query.ticket.unwrap_or(0));
        assert_eq!(apply_navigation(&mut state, &query), Some(8));

        let markup = render_gallery(
            catalog.categories[0].id,
            &items,
            &state,
            &CatalogFilter::default(),
        )
        .into_string();
        assert!(markup.contains("data-ticket=\"8\""));
        assert!(markup.contains("ticket=8"));
        assert!(!markup.contains("data-ticket=\"1\""));
    }

    #[test]
    fn navigation_on_an_empty_gallery_is_ignored() {
        let mut state = GalleryState::restore(&[], 0, None, 3);
        assert!(apply_navigation(&mut state, &nav(GalleryNav::Next, None)).is_none());
        assert_eq!(state.generation(), 3);
    }

    #[test]
    fn image_and_swipe_navigation() {
        let catalog = catalog();
        let items: Vec<&CatalogItem> = catalog.categories[0].items.iter().collect();
        let mut state = GalleryState::restore(&items, 0, None, 0);

        apply_navigation(&mut state, &nav(GalleryNav::Image, Some(1)));
        assert_eq!(state.current_url(), Some("1b.jpg"));

        // brak indeksu - nic się nie dzieje
        assert!(apply_navigation(&mut state, &nav(GalleryNav::Item, None)).is_none());

        let swipe_left = GalleryQuery {
            nav: Some(GalleryNav::Swipe),
            dx: Some(-120.0),
            dy: Some(10.0),
            ..GalleryQuery::default()
        };
        apply_navigation(&mut state, &swipe_left);
        assert_eq!(state.active_item(), 1);

        let too_short = GalleryQuery {
            dx: Some(10.0),
            ..swipe_left
        };
        assert!(apply_navigation(&mut state, &too_short).is_none());
        assert_eq!(state.active_item(), 1);
    }

    #[test]
    fn wood_grid_formats_prices() {
        let ts = chrono::Utc::now();
        let items = vec![WoodItem {
            id: Uuid::new_v4(),
            description_pl: "Deska do krojenia".to_string(),
            description_en: String::new(),
            price: 120.0,
            image_url: "/images/deska.jpg".to_string(),
            order: 0,
            created_at: ts,
            updated_at: ts,
        }];
        let markup = render_wood_grid(&items, Lang::En).into_string();
        assert!(markup.contains("$30.00"));
        // brak tłumaczenia - polski opis
        assert!(markup.contains("Deska do krojenia"));
    }
}
