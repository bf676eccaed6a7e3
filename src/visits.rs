// src/visits.rs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Licznik odwiedzin trzymany w pliku tekstowym.
/// Odczyt i zapis bez blokady: przy równoległych wejściach część może przepaść.
#[derive(Debug, Clone)]
pub struct VisitCounter {
    path: PathBuf,
}

impl VisitCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VisitCounter { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn current(&self) -> std::io::Result<u64> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(
                    "Nieczytelny licznik odwiedzin w {}, zaczynam od zera",
                    self.path.display()
                );
                0
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    pub async fn increment(&self) -> std::io::Result<u64> {
        let next = self.current().await?.saturating_add(1);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, next.to_string()).await?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_starts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let counter = VisitCounter::new(dir.path().join("nested/visits.txt"));
        assert_eq!(counter.current().await.unwrap(), 0);
        assert_eq!(counter.increment().await.unwrap(), 1);
        assert_eq!(counter.increment().await.unwrap(), 2);
        assert_eq!(
            std::fs::read_to_string(counter.path()).unwrap(),
            "2"
        );
    }

    #[tokio::test]
    async fn garbage_resets_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.txt");
        std::fs::write(&path, "not a number").unwrap();
        let counter = VisitCounter::new(&path);
        assert_eq!(counter.increment().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn continues_from_stored_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.txt");
        std::fs::write(&path, "41\n").unwrap();
        assert_eq!(VisitCounter::new(&path).increment().await.unwrap(), 42);
    }
}
