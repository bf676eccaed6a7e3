// src/sitemap_generator.rs

use axum::{
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use quick_xml::se::to_string;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::Category;
use crate::services;
use crate::state::AppState;

const SITEMAP_XMLNS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Serialize)]
#[serde(rename = "urlset")]
pub struct UrlSet {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "url")]
    pub urls: Vec<UrlEntry>,
}

#[derive(Serialize)]
pub struct UrlEntry {
    #[serde(rename = "loc")]
    pub location: String,
    #[serde(rename = "lastmod")]
    pub last_modified: String,
    #[serde(rename = "changefreq")]
    pub change_frequency: ChangeFreq,
    #[serde(rename = "priority")]
    pub priority: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

/// Strona główna, strona wyrobów z drewna i kotwica każdej kategorii.
pub fn build_sitemap(base_url: &str, categories: &[Category], now: DateTime<Utc>) -> UrlSet {
    let mut urls = vec![
        UrlEntry {
            location: format!("{}/", base_url),
            last_modified: now.to_rfc3339(),
            change_frequency: ChangeFreq::Daily,
            priority: 1.0,
        },
        UrlEntry {
            location: format!("{}/drewno", base_url),
            last_modified: now.to_rfc3339(),
            change_frequency: ChangeFreq::Weekly,
            priority: 0.8,
        },
    ];

    urls.extend(categories.iter().map(|category| UrlEntry {
        location: format!("{}/#{}", base_url, category.slug),
        last_modified: category.updated_at.to_rfc3339(),
        change_frequency: ChangeFreq::Monthly,
        priority: 0.6,
    }));

    UrlSet {
        xmlns: SITEMAP_XMLNS.to_string(),
        urls,
    }
}

pub fn render_sitemap(url_set: &UrlSet) -> Result<String, AppError> {
    let mut xml_output = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_string();
    xml_output.push_str(&to_string(url_set).map_err(|e| {
        AppError::InternalServerError(format!("Błąd podczas generowania XML mapy strony: {}", e))
    })?);
    Ok(xml_output)
}

pub async fn sitemap_handler(State(app_state): State<AppState>) -> Result<Response, AppError> {
    let categories = services::list_categories(&app_state.db_pool).await?;
    let url_set = build_sitemap(&app_state.config.site_url, &categories, Utc::now());
    let xml_output = render_sitemap(&url_set)?;

    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/xml; charset=utf-8"),
        )],
        xml_output,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::category;

    #[test]
    fn lists_pages_and_category_anchors() {
        let categories = vec![category("Paski Skórzane", 0), category("Klamry", 1)];
        let url_set = build_sitemap("https://pracownia.example", &categories, Utc::now());
        let xml = render_sitemap(&url_set).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#));
        assert!(xml.contains("<loc>https://pracownia.example/</loc>"));
        assert!(xml.contains("<loc>https://pracownia.example/drewno</loc>"));
        assert!(xml.contains("<loc>https://pracownia.example/#paski-skorzane</loc>"));
        assert!(xml.contains("<changefreq>monthly</changefreq>"));
        assert_eq!(xml.matches("<url>").count(), 4);
    }
}
