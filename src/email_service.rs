// src/email_service.rs

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use maud::{Markup, PreEscaped, html};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Nieprawidłowy adres: {0}")]
    Address(String),

    #[error("Nie udało się zbudować wiadomości: {0}")]
    Build(String),

    #[error("Serwer SMTP niedostępny: {0}")]
    Verify(String),

    #[error("Błąd wysyłki: {0}")]
    Send(String),
}

/// Gotowa wiadomość do wysłania.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sprawdza połączenie z serwerem przed wysyłką.
    async fn verify(&self) -> Result<(), MailError>;

    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Verify(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(SmtpMailer {
            transport,
            from: parse_mailbox(&config.from)?,
            to: parse_mailbox(&config.inquiry_recipient)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Verify(
                "Serwer nie odpowiedział poprawnie".to_string(),
            )),
            Err(e) => Err(MailError::Verify(e.to_string())),
        }
    }

    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .reply_to(parse_mailbox(&email.reply_to)?)
            .to(self.to.clone())
            .subject(email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| MailError::Address(address.to_string()))
}

/// Dane zapytania potrzebne do treści wiadomości.
#[derive(Debug, Clone)]
pub struct InquiryEmail<'a> {
    pub email: &'a str,
    pub product_number: &'a str,
    pub name: Option<&'a str>,
    pub message: Option<&'a str>,
}

pub fn build_inquiry_email(inquiry: &InquiryEmail<'_>) -> OutgoingEmail {
    let subject = format!("Zapytanie o produkt nr {}", inquiry.product_number);

    let mut text = format!(
        "Nowe zapytanie ze strony.\n\nNumer produktu: {}\nE-mail: {}\n",
        inquiry.product_number, inquiry.email
    );
    if let Some(name) = inquiry.name {
        text.push_str(&format!("Imię: {}\n", name));
    }
    if let Some(message) = inquiry.message {
        text.push_str(&format!("\nWiadomość:\n{}\n", message));
    }

    OutgoingEmail {
        reply_to: inquiry.email.to_string(),
        subject,
        text,
        html: render_inquiry_email_html(inquiry).into_string(),
    }
}

fn render_inquiry_email_html(inquiry: &InquiryEmail<'_>) -> Markup {
    html! {
        (PreEscaped("<!DOCTYPE html>"))
        html lang="pl" {
            head {
                meta charset="UTF-8";
                title { "Zapytanie o produkt" }
            }
            body style="font-family: Arial, sans-serif; color: #333;" {
                h2 { "Zapytanie o produkt nr " (inquiry.product_number) }
                p { "Od: " a href=(format!("mailto:{}", inquiry.email)) { (inquiry.email) } }
                @if let Some(name) = inquiry.name {
                    p { "Imię: " (name) }
                }
                @if let Some(message) = inquiry.message {
                    h4 { "Wiadomość" }
                    p style="white-space: pre-wrap;" { (message) }
                }
                p style="color: #888; font-size: 12px;" {
                    "Odpowiedz na tę wiadomość, aby napisać bezpośrednio do klienta."
                }
            }
        }
    }
}
