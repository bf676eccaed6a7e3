// src/main.rs

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Deklaracje modułów
mod admin_htmx; // fragmenty panelu administratora
mod auth; // nagłówek x-admin-password
mod catalog; // agregacja katalogu
mod config; // zmienne środowiskowe
mod email_service; // SMTP
mod errors;
mod extractor; // odrzucenia ekstraktorów jako AppError
mod filters;
mod gallery;
mod handlers; // API JSON
mod htmx_handlers; // strona publiczna
mod i18n;
mod inquiry;
mod models;
mod ordering;
mod response;
mod services;
mod sitemap_generator;
mod state;
mod uploads;
mod visits;

use crate::admin_htmx::*;
use crate::config::AppConfig;
use crate::email_service::{Mailer, SmtpMailer};
use crate::handlers::*;
use crate::htmx_handlers::*;
use crate::inquiry::inquiry_handler;
use crate::sitemap_generator::sitemap_handler;
use crate::state::AppState;

pub fn app_router(app_state: AppState) -> Router {
    let images_dir = app_state.config.images_dir.clone();
    let body_limit = app_state.config.max_upload_bytes;

    let public_api = Router::new()
        .route("/api/catalog", get(catalog_handler))
        .route("/api/wood", get(wood_list_handler))
        .route("/api/inquiry", post(inquiry_handler))
        .route("/api/visits", get(visits_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        );

    let admin_api = Router::new()
        .route(
            "/api/admin/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route(
            "/api/admin/categories/{id}",
            get(get_category_handler)
                .patch(update_category_handler)
                .delete(delete_category_handler),
        )
        .route("/api/admin/categories/{id}/move", post(move_category_handler))
        .route(
            "/api/admin/items",
            get(list_items_handler).post(create_item_handler),
        )
        .route(
            "/api/admin/items/{id}",
            get(get_item_handler)
                .patch(update_item_handler)
                .delete(delete_item_handler),
        )
        .route("/api/admin/items/{id}/move", post(move_item_handler))
        .route(
            "/api/admin/wood",
            get(admin_list_wood_handler).post(create_wood_handler),
        )
        .route(
            "/api/admin/wood/{id}",
            axum::routing::patch(update_wood_handler).delete(delete_wood_handler),
        )
        .route("/api/admin/wood/{id}/move", post(move_wood_handler))
        .route("/api/admin/upload", post(upload_handler));

    let admin_htmx = Router::new()
        .route("/admin", get(admin_shell_handler))
        .route(
            "/htmx/admin/categories",
            get(categories_panel_handler).post(create_category_htmx_handler),
        )
        .route(
            "/htmx/admin/categories/{id}",
            post(update_category_htmx_handler).delete(delete_category_htmx_handler),
        )
        .route("/htmx/admin/categories/{id}/edit", get(category_edit_handler))
        .route("/htmx/admin/categories/{id}/row", get(category_row_handler))
        .route(
            "/htmx/admin/categories/{id}/move/{direction}",
            post(move_category_htmx_handler),
        )
        .route(
            "/htmx/admin/items",
            get(items_panel_handler).post(create_item_htmx_handler),
        )
        .route(
            "/htmx/admin/items/{id}",
            post(update_item_htmx_handler).delete(delete_item_htmx_handler),
        )
        .route("/htmx/admin/items/{id}/edit", get(item_edit_handler))
        .route("/htmx/admin/items/{id}/row", get(item_row_handler))
        .route(
            "/htmx/admin/items/{id}/move/{direction}",
            post(move_item_htmx_handler),
        )
        .route(
            "/htmx/admin/wood",
            get(wood_panel_handler).post(create_wood_htmx_handler),
        )
        .route(
            "/htmx/admin/wood/{id}",
            post(update_wood_htmx_handler).delete(delete_wood_htmx_handler),
        )
        .route("/htmx/admin/wood/{id}/edit", get(wood_edit_handler))
        .route("/htmx/admin/wood/{id}/row", get(wood_row_handler))
        .route(
            "/htmx/admin/wood/{id}/move/{direction}",
            post(move_wood_htmx_handler),
        );

    let pages = Router::new()
        .route("/", get(home_page_handler))
        .route("/drewno", get(wood_page_handler))
        .route("/htmx/catalog", get(catalog_htmx_handler))
        .route("/htmx/gallery/{category_id}", get(gallery_htmx_handler))
        .route("/sitemap.xml", get(sitemap_handler));

    Router::new()
        .merge(public_api)
        .merge(admin_api)
        .merge(admin_htmx)
        .merge(pages)
        .nest_service("/images", ServeDir::new(images_dir))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Inicjalizacja systemu logowania (tracing)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pracownia_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Inicjalizacja serwera...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Błąd konfiguracji: {}", e);
            std::process::exit(1);
        }
    };

    // --- Połączenie z bazą danych ---
    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Pomyślnie połączono z bazą danych");
            pool
        }
        Err(err) => {
            tracing::error!("Nie można połączyć z bazą danych: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!().run(&pool).await {
        tracing::error!("Błąd migracji bazy danych: {:?}", err);
        std::process::exit(1);
    }

    // --- Poczta ---
    let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!("Skonfigurowano SMTP: {}:{}", smtp.host, smtp.port);
                Some(Arc::new(mailer))
            }
            Err(e) => {
                tracing::warn!("Nie można skonfigurować SMTP: {}", e);
                None
            }
        },
        None => None,
    };

    let addr = config.bind_addr;
    let app_state = AppState::new(pool, config, mailer);
    let app = app_router(app_state);

    tracing::info!("Serwer nasłuchuje na {}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Nie można powiązać adresu {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        tracing::error!("Błąd serwera: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ADMIN_PASSWORD_HEADER;
    use crate::config::tests::{TEST_PASSWORD, test_config};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use std::path::Path;
    use tower::ServiceExt;

    const PASSWORD: &str = TEST_PASSWORD;

    /// Stan bez prawdziwej bazy: pula łączy się dopiero przy pierwszym zapytaniu.
    fn test_app(dir: &Path) -> Router {
        let config = test_config(dir);
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        app_router(AppState::new(pool, config, None))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn admin_api_requires_password_header() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/admin/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(json_body(response).await["error"].is_string());

        let response = app
            .oneshot(
                Request::delete(format!("/htmx/admin/items/{}", uuid::Uuid::new_v4()))
                    .header(ADMIN_PASSWORD_HEADER, "zle-haslo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn visits_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        for expected in 1..=2 {
            let response = app
                .clone()
                .oneshot(Request::get("/api/visits").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["count"], expected);
        }
    }

    #[tokio::test]
    async fn inquiry_reports_error_codes() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let invalid = app
            .clone()
            .oneshot(
                Request::post("/api/inquiry")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"zly","productNumber":"1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        let body = json_body(invalid).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let unconfigured = app
            .oneshot(
                Request::post("/api/inquiry")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=klient%40example.com&product_number=12"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unconfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(unconfigured).await["error"], "CONFIG_ERROR");
    }

    fn upload_request(content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"zdjecie\"\r\nContent-Type: {}\r\n\r\n",
                content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n--XYZ--\r\n");

        Request::post("/api/admin/upload")
            .header(ADMIN_PASSWORD_HEADER, PASSWORD)
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn upload_stores_and_serves_images() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let rejected = app
            .clone()
            .oneshot(upload_request("text/plain", b"hello"))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A];
        let created = app
            .clone()
            .oneshot(upload_request("image/png", &png))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let url = json_body(created).await["url"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(url.starts_with("/images/"));
        assert!(url.ends_with(".png"));

        let served = app
            .oneshot(Request::get(url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(served.status(), StatusCode::OK);
        let bytes = to_bytes(served.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], &png[..]);
    }

    #[tokio::test]
    async fn admin_shell_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(Request::get("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("admin-content"));
    }

    #[tokio::test]
    async fn malformed_admin_input_gets_json_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/admin/categories")
                    .header(ADMIN_PASSWORD_HEADER, PASSWORD)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("name"));

        let response = app
            .oneshot(
                Request::get("/api/admin/categories/nie-uuid")
                    .header(ADMIN_PASSWORD_HEADER, PASSWORD)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }
}
