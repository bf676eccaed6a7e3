// src/filters.rs
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::catalog::{CatalogCategory, CatalogItem, fallback_images};
use crate::i18n::Lang;
use crate::models::ItemImage;

/// Parametry filtrowania galerii. Puste pola formularza traktowane są jak brak filtra.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub q: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub price_min: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub price_max: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub size_min: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub size_max: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub buckle_min: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub buckle_max: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub belt: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub lang: Option<Lang>,
}

/// Zakres liczbowy z opcjonalnymi końcami.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => Range {
                min: Some(hi),
                max: Some(lo),
            },
            _ => Range { min, max },
        }
    }

    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|lo| value >= lo) && self.max.is_none_or(|hi| value <= hi)
    }

    /// Czy przedział [lo, hi] ma część wspólną z zakresem.
    pub fn intersects(&self, lo: f64, hi: f64) -> bool {
        self.min.is_none_or(|min| hi >= min) && self.max.is_none_or(|max| lo <= max)
    }
}

impl CatalogFilter {
    pub fn lang(&self) -> Lang {
        self.lang.unwrap_or_default()
    }

    pub fn query(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    pub fn price(&self) -> Range {
        Range::new(self.price_min, self.price_max)
    }

    pub fn size(&self) -> Range {
        Range::new(self.size_min, self.size_max)
    }

    pub fn buckle(&self) -> Range {
        Range::new(self.buckle_min, self.buckle_max)
    }

    pub fn is_active(&self) -> bool {
        self.query().is_some()
            || self.price().is_active()
            || self.size().is_active()
            || self.buckle().is_active()
            || self.belt.is_some()
    }

    /// Przedmiot pasuje tylko wtedy, gdy spełnia wszystkie aktywne filtry naraz.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        self.matches_text(item)
            && self.price().contains(item.price)
            && self.matches_size(item)
            && self.matches_buckle(item)
            && self.belt.is_none_or(|belt| item.belt_number == belt)
    }

    fn matches_text(&self, item: &CatalogItem) -> bool {
        let Some(query) = self.query() else {
            return true;
        };
        let haystack = format!(
            "{} {} {} {}",
            item.title_pl, item.title_en, item.description_pl, item.description_en
        )
        .to_lowercase();
        haystack.contains(&query)
    }

    fn matches_size(&self, item: &CatalogItem) -> bool {
        let range = self.size();
        if !range.is_active() {
            return true;
        }
        match item.main_size {
            Some(main) => range.contains(main),
            None => {
                let (lo, hi) = item.size_span();
                range.intersects(lo, hi)
            }
        }
    }

    fn matches_buckle(&self, item: &CatalogItem) -> bool {
        let range = self.buckle();
        if !range.is_active() {
            return true;
        }
        item.buckle_size.is_some_and(|size| range.contains(size))
    }

    /// Zapytanie dla linków htmx, bez pustych pól.
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(q) = self.q.as_deref().filter(|q| !q.trim().is_empty()) {
            parts.push(format!("q={}", urlencoding::encode(q)));
        }
        push_opt(&mut parts, "price_min", self.price_min);
        push_opt(&mut parts, "price_max", self.price_max);
        push_opt(&mut parts, "size_min", self.size_min);
        push_opt(&mut parts, "size_max", self.size_max);
        push_opt(&mut parts, "buckle_min", self.buckle_min);
        push_opt(&mut parts, "buckle_max", self.buckle_max);
        push_opt(&mut parts, "belt", self.belt);
        parts.push(format!("lang={}", self.lang()));
        parts.join("&")
    }
}

fn push_opt<T: Display>(parts: &mut Vec<String>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        parts.push(format!("{}={}", key, v));
    }
}

/// Kategoria po filtrowaniu; okładki liczone są tylko z pasujących przedmiotów.
#[derive(Debug, Clone)]
pub struct FilteredCategory<'a> {
    pub category: &'a CatalogCategory,
    pub items: Vec<&'a CatalogItem>,
    pub images: Vec<ItemImage>,
}

impl FilteredCategory<'_> {
    pub fn is_visible(&self) -> bool {
        !self.items.is_empty() || !self.images.is_empty()
    }
}

/// Filtruje katalog i ukrywa kategorie bez pasujących przedmiotów i bez okładek.
pub fn filter_catalog<'a>(
    categories: &'a [CatalogCategory],
    filter: &CatalogFilter,
) -> Vec<FilteredCategory<'a>> {
    categories
        .iter()
        .map(|category| {
            let items: Vec<&CatalogItem> = category
                .items
                .iter()
                .filter(|item| filter.matches(item))
                .collect();
            let images = fallback_images(items.iter().copied());
            FilteredCategory {
                category,
                items,
                images,
            }
        })
        .filter(|filtered| filtered.is_visible())
        .collect()
}

pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_catalog;
    use crate::catalog::tests::{category, image, item};

    fn sample_item() -> CatalogItem {
        let cat = category("Paski", 0);
        CatalogItem::from_item(item(cat.id, 7, vec![image("a.jpg", false, None)]))
    }

    fn parse(query: &str) -> CatalogFilter {
        serde_json::from_value(serde_json::Value::Object(
            query
                .split('&')
                .filter(|kv| !kv.is_empty())
                .map(|kv| {
                    let (k, v) = kv.split_once('=').unwrap_or((kv, ""));
                    (k.to_string(), serde_json::Value::String(v.to_string()))
                })
                .collect(),
        ))
        .unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = parse("q=&price_min=&belt=");
        assert!(!filter.is_active());
        assert!(filter.matches(&sample_item()));
    }

    #[test]
    fn text_filter_is_case_insensitive_across_languages() {
        let it = sample_item();
        assert!(parse("q=PASEK").matches(&it));
        assert!(parse("q=grain leather").matches(&it));
        assert!(parse("q=  skóra ").matches(&it));
        assert!(!parse("q=zegarek").matches(&it));
    }

    #[test]
    fn price_range_is_inclusive_and_swaps_reversed_bounds() {
        let it = sample_item();
        assert!(parse("price_min=250&price_max=250").matches(&it));
        assert!(parse("price_min=300&price_max=200").matches(&it));
        assert!(!parse("price_max=249.99").matches(&it));
    }

    #[test]
    fn size_filter_prefers_main_size_then_span() {
        let mut it = sample_item();
        assert!(parse("size_min=100&size_max=100").matches(&it));
        assert!(!parse("size_min=105").matches(&it));

        it.main_size = None;
        // rozpiętość 95..110 przecina 105..200
        assert!(parse("size_min=105&size_max=200").matches(&it));
        assert!(!parse("size_min=111").matches(&it));
    }

    #[test]
    fn buckle_filter_rejects_items_without_buckle_size() {
        let mut it = sample_item();
        assert!(parse("buckle_min=3&buckle_max=4").matches(&it));
        it.buckle_size = None;
        assert!(!parse("buckle_min=3").matches(&it));
        assert!(parse("").matches(&it));
    }

    #[test]
    fn all_active_filters_must_hold() {
        let it = sample_item();
        assert!(parse("q=pasek&price_max=300&size_min=90&buckle_max=5&belt=7").matches(&it));
        // każdy pojedynczy filtr psuje dopasowanie
        for breaking in [
            "q=klamra&price_max=300&size_min=90&buckle_max=5&belt=7",
            "q=pasek&price_max=100&size_min=90&buckle_max=5&belt=7",
            "q=pasek&price_max=300&size_min=120&buckle_max=5&belt=7",
            "q=pasek&price_max=300&size_min=90&buckle_max=3&belt=7",
            "q=pasek&price_max=300&size_min=90&buckle_max=5&belt=8",
        ] {
            assert!(!parse(breaking).matches(&it), "{}", breaking);
        }
    }

    #[test]
    fn categories_without_matches_are_hidden() {
        let belts = category("Paski", 0);
        let wallets = category("Portfele", 1);
        let catalog = build_catalog(
            vec![belts.clone(), wallets.clone()],
            vec![
                item(belts.id, 1, vec![image("p1.jpg", false, None)]),
                item(belts.id, 2, vec![image("p2.jpg", false, None)]),
            ],
        );

        let all = filter_catalog(&catalog.categories, &CatalogFilter::default());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].category.id, belts.id);

        let only_two = filter_catalog(&catalog.categories, &parse("belt=2"));
        assert_eq!(only_two[0].items.len(), 1);
        assert_eq!(only_two[0].images.len(), 1);
        assert_eq!(only_two[0].images[0].url, "p2.jpg");

        assert!(filter_catalog(&catalog.categories, &parse("belt=99")).is_empty());
    }

    #[test]
    fn query_string_round_trips_active_fields() {
        let filter = parse("q=skóra brąz&price_max=300&lang=en");
        let qs = filter.to_query_string();
        assert!(qs.contains("q=sk%C3%B3ra%20br%C4%85z"));
        assert!(qs.contains("price_max=300"));
        assert!(qs.ends_with("lang=en"));
        assert!(!qs.contains("price_min"));
    }
}
