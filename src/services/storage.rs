// src/services/storage.rs

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::common::error::AppError;

/// Onde as imagens dos classificados ficam guardadas.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Grava `bytes` sob `key` e devolve a URL pública.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, AppError>;
}

// Disco local, servido pelo ServeDir em /uploads
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        // Só caminhos relativos simples: nada de "..", raiz ou prefixo
        let relative = Path::new(key);
        if key.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AppError::InternalServerError(anyhow::anyhow!("Chave de objeto inválida: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::info!("Arquivo gravado em {}", path.display());
        Ok(format!("{}/uploads/{}", self.public_base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_under_the_root_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost:3000/");

        let url = storage.put("tenant/foto.png", vec![1, 2, 3]).await.unwrap();

        assert_eq!(url, "http://localhost:3000/uploads/tenant/foto.png");
        let written = tokio::fs::read(dir.path().join("tenant/foto.png")).await.unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn rejects_keys_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost:3000");

        assert!(storage.put("../fora.png", vec![1]).await.is_err());
        assert!(storage.put("/etc/passwd", vec![1]).await.is_err());
    }
}
