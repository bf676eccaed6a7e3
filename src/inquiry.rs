// src/inquiry.rs
//
// Formularz zapytania o produkt. Odpowiada zawsze JSON-em
// `{"ok": ...}` z własnymi kodami błędów, niezależnie od AppError.

use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use validator::Validate;

use crate::email_service::{InquiryEmail, MailError, Mailer, build_inquiry_email};
use crate::errors::flatten_validation_errors;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum InquiryError {
    #[error("{0}")]
    Validation(String),

    #[error("Formularz zapytań nie jest skonfigurowany")]
    Config,

    #[error("Nie udało się połączyć z serwerem poczty")]
    SmtpVerify(String),

    #[error("Nie udało się wysłać wiadomości")]
    Send(String),

    #[error("Wystąpił nieoczekiwany błąd")]
    Unexpected(String),
}

impl InquiryError {
    pub fn code(&self) -> &'static str {
        match self {
            InquiryError::Validation(_) => "VALIDATION_ERROR",
            InquiryError::Config => "CONFIG_ERROR",
            InquiryError::SmtpVerify(_) => "SMTP_VERIFY_FAILED",
            InquiryError::Send(_) => "SEND_FAILED",
            InquiryError::Unexpected(_) => "UNEXPECTED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            InquiryError::Validation(_) => StatusCode::BAD_REQUEST,
            InquiryError::Config | InquiryError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            InquiryError::SmtpVerify(_) | InquiryError::Send(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for InquiryError {
    fn into_response(self) -> Response {
        match &self {
            InquiryError::Validation(msg) => tracing::warn!("Odrzucono zapytanie: {}", msg),
            InquiryError::Config => tracing::error!("Zapytanie bez konfiguracji SMTP"),
            InquiryError::SmtpVerify(e) | InquiryError::Send(e) | InquiryError::Unexpected(e) => {
                tracing::error!("Błąd wysyłki zapytania ({}): {}", self.code(), e)
            }
        }

        let body = Json(json!({
            "ok": false,
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct InquiryPayload {
    #[serde(default)]
    #[validate(email(message = "Podaj poprawny adres e-mail"))]
    pub email: String,
    #[serde(default, alias = "productNumber")]
    #[validate(length(min = 1, max = 32, message = "Numer produktu musi mieć od 1 do 32 znaków"))]
    pub product_number: String,
    #[serde(default)]
    #[validate(length(max = 120, message = "Imię jest za długie"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Wiadomość jest za długa"))]
    pub message: Option<String>,
    /// Pole-pułapka ukryte przed ludźmi.
    #[serde(default)]
    pub website: Option<String>,
}

impl InquiryPayload {
    /// Przycina pola tekstowe; puste opcjonalne pola zamienia na `None`.
    pub fn normalized(self) -> Self {
        fn trim_opt(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        InquiryPayload {
            email: self.email.trim().to_string(),
            product_number: self.product_number.trim().to_string(),
            name: trim_opt(self.name),
            message: trim_opt(self.message),
            website: trim_opt(self.website),
        }
    }

    pub fn check(&self) -> Result<(), InquiryError> {
        if self.website.is_some() {
            return Err(InquiryError::Validation(
                "Zgłoszenie odrzucone przez filtr antyspamowy".to_string(),
            ));
        }
        self.validate()
            .map_err(|errors| InquiryError::Validation(flatten_validation_errors(&errors)))
    }
}

/// Ekstraktor przyjmujący JSON, formularz urlencoded albo multipart.
#[derive(Debug)]
pub struct InquiryForm(pub InquiryPayload);

impl<S> FromRequest<S> for InquiryForm
where
    S: Send + Sync,
{
    type Rejection = InquiryError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let payload = if content_type.starts_with("application/json") {
            let Json(payload) = Json::<InquiryPayload>::from_request(req, state)
                .await
                .map_err(|e| InquiryError::Validation(e.body_text()))?;
            payload
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(payload) = Form::<InquiryPayload>::from_request(req, state)
                .await
                .map_err(|e| InquiryError::Validation(e.body_text()))?;
            payload
        } else if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| InquiryError::Validation(e.body_text()))?;
            payload_from_multipart(multipart).await?
        } else {
            return Err(InquiryError::Validation(format!(
                "Nieobsługiwany typ treści: '{}'",
                content_type
            )));
        };

        Ok(InquiryForm(payload))
    }
}

async fn payload_from_multipart(mut multipart: Multipart) -> Result<InquiryPayload, InquiryError> {
    let mut fields: HashMap<String, Value> = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InquiryError::Validation(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let text = field
            .text()
            .await
            .map_err(|e| InquiryError::Validation(e.body_text()))?;
        fields.insert(name, Value::String(text));
    }

    serde_json::from_value(Value::Object(fields.into_iter().collect()))
        .map_err(|e| InquiryError::Validation(e.to_string()))
}

/// Sprawdza zapytanie, weryfikuje połączenie SMTP i wysyła wiadomość.
pub async fn process_inquiry(
    mailer: Option<&dyn Mailer>,
    payload: InquiryPayload,
) -> Result<(), InquiryError> {
    let payload = payload.normalized();
    payload.check()?;

    let mailer = mailer.ok_or(InquiryError::Config)?;

    mailer.verify().await.map_err(|e| match e {
        MailError::Verify(msg) => InquiryError::SmtpVerify(msg),
        other => InquiryError::Unexpected(other.to_string()),
    })?;

    let email = build_inquiry_email(&InquiryEmail {
        email: &payload.email,
        product_number: &payload.product_number,
        name: payload.name.as_deref(),
        message: payload.message.as_deref(),
    });

    mailer.send(email).await.map_err(|e| match e {
        MailError::Send(msg) => InquiryError::Send(msg),
        other => InquiryError::Unexpected(other.to_string()),
    })?;

    tracing::info!(
        "Wysłano zapytanie o produkt nr {} od {}",
        payload.product_number,
        payload.email
    );
    Ok(())
}

pub async fn inquiry_handler(
    State(app_state): State<AppState>,
    InquiryForm(payload): InquiryForm,
) -> Result<Json<Value>, InquiryError> {
    tracing::info!("Otrzymano zapytanie o produkt");
    process_inquiry(app_state.mailer.as_deref(), payload).await?;
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::email_service::OutgoingEmail;
    use async_trait::async_trait;
    use axum::body::Body;
    use std::sync::Mutex;

    /// Atrapa serwera poczty zapisująca wysłane wiadomości.
    #[derive(Default)]
    pub struct FakeMailer {
        pub fail_verify: bool,
        pub fail_send: bool,
        pub sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn verify(&self) -> Result<(), MailError> {
            if self.fail_verify {
                Err(MailError::Verify("connection refused".to_string()))
            } else {
                Ok(())
            }
        }

        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            if self.fail_send {
                return Err(MailError::Send("550 mailbox unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }

    fn valid() -> InquiryPayload {
        InquiryPayload {
            email: " klient@example.com ".to_string(),
            product_number: " 17 ".to_string(),
            name: Some("Jan".to_string()),
            message: Some("Czy jest dostępny?".to_string()),
            website: Some("   ".to_string()),
        }
    }

    #[tokio::test]
    async fn sends_trimmed_inquiry() {
        let mailer = FakeMailer::default();
        process_inquiry(Some(&mailer), valid()).await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to, "klient@example.com");
        assert_eq!(sent[0].subject, "Zapytanie o produkt nr 17");
    }

    #[tokio::test]
    async fn filled_honeypot_is_rejected() {
        let mailer = FakeMailer::default();
        let payload = InquiryPayload {
            website: Some("http://spam.example".to_string()),
            ..valid()
        };
        let err = process_inquiry(Some(&mailer), payload).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_fields_are_validation_errors() {
        let mailer = FakeMailer::default();
        for payload in [
            InquiryPayload {
                email: "nie-email".to_string(),
                ..valid()
            },
            InquiryPayload {
                product_number: "   ".to_string(),
                ..valid()
            },
            InquiryPayload {
                product_number: "x".repeat(33),
                ..valid()
            },
            InquiryPayload {
                message: Some("a".repeat(2001)),
                ..valid()
            },
        ] {
            let err = process_inquiry(Some(&mailer), payload).await.unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn smtp_failures_map_to_codes() {
        let err = process_inquiry(None, valid()).await.unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let verify_fails = FakeMailer {
            fail_verify: true,
            ..Default::default()
        };
        let err = process_inquiry(Some(&verify_fails), valid()).await.unwrap_err();
        assert_eq!(err.code(), "SMTP_VERIFY_FAILED");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let send_fails = FakeMailer {
            fail_send: true,
            ..Default::default()
        };
        let err = process_inquiry(Some(&send_fails), valid()).await.unwrap_err();
        assert_eq!(err.code(), "SEND_FAILED");
    }

    #[tokio::test]
    async fn error_body_has_code_and_message() {
        let response = InquiryError::Config.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"], "CONFIG_ERROR");
        assert!(value["message"].as_str().is_some());
    }

    async fn extract(content_type: &str, body: impl Into<Body>) -> Result<InquiryPayload, InquiryError> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/inquiry")
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap();
        InquiryForm::from_request(req, &()).await.map(|f| f.0)
    }

    #[tokio::test]
    async fn accepts_json_form_and_multipart() {
        let json = extract(
            "application/json",
            r#"{"email":"a@b.pl","productNumber":"5"}"#,
        )
        .await
        .unwrap();
        assert_eq!(json.product_number, "5");

        let form = extract(
            "application/x-www-form-urlencoded",
            "email=a%40b.pl&product_number=6&website=",
        )
        .await
        .unwrap();
        assert_eq!(form.email, "a@b.pl");
        assert_eq!(form.product_number, "6");

        let multipart_body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"email\"\r\n\r\n\
            a@b.pl\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"productNumber\"\r\n\r\n\
            7\r\n\
            --XYZ--\r\n";
        let multipart = extract("multipart/form-data; boundary=XYZ", multipart_body)
            .await
            .unwrap();
        assert_eq!(multipart.product_number, "7");

        let err = extract("text/plain", "hello").await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
