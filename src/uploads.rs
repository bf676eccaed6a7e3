// src/uploads.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::Multipart;
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::errors::AppError;

/// Publiczna ścieżka, pod którą serwowany jest katalog zdjęć.
pub const PUBLIC_IMAGES_PREFIX: &str = "/images";

const RANDOM_SUFFIX_LEN: usize = 6;

/// Plik przesłany w formularzu, jeszcze nie zapisany na dysku.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Odczytany formularz multipart: pola tekstowe i pliki osobno.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub text_fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(field_name) = field.name().map(str::to_string) else {
                tracing::warn!("Odebrano pole multipart bez nazwy, pomijam");
                continue;
            };

            if field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                tracing::debug!(
                    "Pole pliku {}: {} ({} bajtów)",
                    field_name,
                    content_type,
                    bytes.len()
                );
                form.files.insert(
                    field_name,
                    UploadedFile {
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            } else {
                let value = field.text().await?;
                form.text_fields.insert(field_name, value);
            }
        }

        Ok(form)
    }

    /// Przycięta wartość pola tekstowego; puste traktowane jak brak.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text_fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Wybór zdjęcia przy zapisie formularza: nowy plik albo dotychczasowa ścieżka.
#[derive(Debug, Clone)]
pub enum ImageChoice {
    Keep(String),
    Replace(UploadedFile),
}

impl ImageChoice {
    /// Pusty plik z formularza oznacza "bez zmian".
    pub fn from_form(existing: Option<String>, file: Option<UploadedFile>) -> Option<Self> {
        match file.filter(|f| !f.bytes.is_empty()) {
            Some(file) => Some(ImageChoice::Replace(file)),
            None => existing
                .filter(|path| !path.trim().is_empty())
                .map(ImageChoice::Keep),
        }
    }
}

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Nazwa pliku odporna na kolizje: znacznik czasu + losowy sufiks.
pub fn unique_file_name(extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}.{}", millis, suffix, extension)
}

/// Zapisuje zdjęcie w katalogu publicznym i zwraca jego adres URL.
pub async fn store_image(images_dir: &Path, file: &UploadedFile) -> Result<String, AppError> {
    let extension = extension_for(&file.content_type).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Nieobsługiwany typ pliku: {}",
            file.content_type
        ))
    })?;
    if file.bytes.is_empty() {
        return Err(AppError::BadRequest("Przesłany plik jest pusty".to_string()));
    }

    tokio::fs::create_dir_all(images_dir).await?;

    let mut file_name = unique_file_name(extension);
    let mut target: PathBuf = images_dir.join(&file_name);
    while tokio::fs::try_exists(&target).await? {
        file_name = unique_file_name(extension);
        target = images_dir.join(&file_name);
    }

    tokio::fs::write(&target, &file.bytes).await?;
    tracing::info!(
        "Zapisano zdjęcie {} ({} bajtów)",
        target.display(),
        file.bytes.len()
    );

    Ok(format!("{}/{}", PUBLIC_IMAGES_PREFIX, file_name))
}

/// Pliki zapisane podczas obsługi jednego formularza.
/// Jeśli zapis w bazie się nie uda, są usuwane, żeby nie zostały sieroty.
#[derive(Debug, Default)]
pub struct StoredUploads {
    urls: Vec<String>,
}

impl StoredUploads {
    pub async fn store(&mut self, images_dir: &Path, file: &UploadedFile) -> Result<String, AppError> {
        let url = store_image(images_dir, file).await?;
        self.urls.push(url.clone());
        Ok(url)
    }

    /// Zapisuje plik tylko wtedy, gdy wybrano nowy; w przeciwnym razie zwraca starą ścieżkę.
    pub async fn resolve(&mut self, images_dir: &Path, choice: ImageChoice) -> Result<String, AppError> {
        match choice {
            ImageChoice::Keep(path) => Ok(path),
            ImageChoice::Replace(file) => self.store(images_dir, &file).await,
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Przy błędzie usuwa zapisane pliki i oddaje błąd dalej.
    pub async fn settle<T>(self, images_dir: &Path, result: Result<T, AppError>) -> Result<T, AppError> {
        if result.is_err() {
            self.discard(images_dir).await;
        }
        result
    }

    pub async fn discard(self, images_dir: &Path) {
        for url in &self.urls {
            let Some(name) = url.strip_prefix(&format!("{}/", PUBLIC_IMAGES_PREFIX)) else {
                continue;
            };
            match tokio::fs::remove_file(images_dir.join(name)).await {
                Ok(()) => tracing::info!("Usunięto nieużyte zdjęcie {}", url),
                Err(e) => tracing::warn!("Nie można usunąć zdjęcia {}: {}", url, e),
            }
        }
    }
}
