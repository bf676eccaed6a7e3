// src/response.rs

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use lol_html::html_content::ContentType;
use lol_html::{HtmlRewriter, Settings, element};
use maud::Markup;
use serde_json::json;

use crate::errors::AppError;

pub const PUBLIC_SHELL: &str = "static/index.html";
pub const ADMIN_SHELL: &str = "static/admin.html";

/// Rodzaj komunikatu wyświetlanego w dymku po stronie klienta.
#[derive(Debug, Clone, Copy)]
pub enum Toast {
    Success,
    Error,
}

impl Toast {
    fn as_str(&self) -> &'static str {
        match self {
            Toast::Success => "success",
            Toast::Error => "error",
        }
    }
}

/// Nagłówek `HX-Trigger` z komunikatem dla klienta.
pub fn toast_headers(message: &str, kind: Toast) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let payload = json!({
        "showMessage": { "message": message, "type": kind.as_str() }
    });
    match HeaderValue::from_str(&ascii_json(&payload.to_string())) {
        Ok(val) => {
            headers.insert("HX-Trigger", val);
        }
        Err(e) => tracing::warn!("Nie udało się zbudować nagłówka HX-Trigger: {}", e),
    }
    headers
}

/// Nagłówki przyjmują tylko ASCII, więc polskie znaki idą jako `\uXXXX`.
fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Wstawia treść w `#content` szablonu i usuwa atrybuty htmx,
/// które po załadowaniu pobrałyby ją drugi raz.
pub fn render_into_shell(shell: &[u8], content: &str) -> Result<Vec<u8>, AppError> {
    let mut output = Vec::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("#content", |el| {
                el.set_inner_content(content, ContentType::Html);
                el.remove_attribute("hx-trigger");
                el.remove_attribute("hx-get");
                Ok(())
            })],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    let rewrite_error =
        |e: lol_html::errors::RewritingError| AppError::InternalServerError(format!("Błąd przetwarzania szablonu: {}", e));
    rewriter.write(shell).map_err(rewrite_error)?;
    rewriter.end().map_err(rewrite_error)?;
    Ok(output)
}

async fn read_shell(path: &str) -> Result<Vec<u8>, AppError> {
    tokio::fs::read(path).await.map_err(|e| {
        tracing::error!("Nie można wczytać pliku szablonu {}: {}", path, e);
        AppError::InternalServerError("Błąd wczytywania szablonu strony".to_string())
    })
}

fn html_response(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Body::from(body),
    )
        .into_response()
}

/// Żądanie htmx dostaje sam fragment, pełne odświeżenie - całą stronę.
pub async fn build_response(headers: &HeaderMap, page_content: Markup) -> Result<Response, AppError> {
    if headers.contains_key("HX-Request") {
        return Ok(page_content.into_response());
    }
    let shell = read_shell(PUBLIC_SHELL).await?;
    let body = render_into_shell(&shell, &page_content.into_string())?;
    Ok(html_response(body))
}

/// Strona bez treści serwerowej, np. powłoka panelu administratora.
pub async fn serve_shell(path: &str) -> Result<Response, AppError> {
    Ok(html_response(read_shell(path).await?))
}
