// src/services/classified_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ClassifiedStore,
    models::{
        classifieds::{apply_query, facets, Classified, ClassifiedPage, ClassifiedPayload, ClassifiedQuery, Facets, ImageUploadResponse},
        tenancy::TenantScope,
    },
    services::storage::ObjectStorage,
};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

// Tipos aceitos e a extensão gravada
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

#[derive(Clone)]
pub struct ClassifiedService {
    store: Arc<dyn ClassifiedStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl ClassifiedService {
    pub fn new(store: Arc<dyn ClassifiedStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    pub async fn create(&self, scope: &TenantScope, payload: ClassifiedPayload) -> Result<Classified, AppError> {
        self.store.insert_classified(scope, trimmed(payload)).await
    }

    pub async fn get(&self, scope: &TenantScope, id: i64) -> Result<Classified, AppError> {
        self.store
            .find_classified(scope, id)
            .await?
            .ok_or(AppError::ClassifiedNotFound(id))
    }

    pub async fn update(&self, scope: &TenantScope, id: i64, payload: ClassifiedPayload) -> Result<Classified, AppError> {
        self.owned(scope, id).await?;
        self.store
            .update_classified(scope, id, trimmed(payload))
            .await?
            .ok_or(AppError::ClassifiedNotFound(id))
    }

    pub async fn delete(&self, scope: &TenantScope, id: i64) -> Result<(), AppError> {
        self.owned(scope, id).await?;
        if !self.store.delete_classified(scope, id).await? {
            return Err(AppError::ClassifiedNotFound(id));
        }
        tracing::info!("Classificado {} removido", id);
        Ok(())
    }

    /// Filtro, ordenação e paginação em memória sobre os anúncios da organização.
    pub async fn list(&self, scope: &TenantScope, query: &ClassifiedQuery) -> Result<ClassifiedPage, AppError> {
        let rows = self.store.list_classifieds(scope).await?;
        Ok(apply_query(rows, query))
    }

    pub async fn facets(&self, scope: &TenantScope) -> Result<Facets, AppError> {
        let rows = self.store.list_classifieds(scope).await?;
        Ok(facets(&rows))
    }

    /// Guarda a imagem em `{tenant_id}/{uuid}.{ext}` e devolve a URL pública.
    pub async fn upload_image(
        &self,
        scope: &TenantScope,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<ImageUploadResponse, AppError> {
        let content_type = content_type.unwrap_or("application/octet-stream");
        let ext = image_extension(content_type)
            .ok_or_else(|| AppError::UnsupportedMediaType(content_type.to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::InvalidField { field: "file", key: "missing_file" });
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::PayloadTooLarge(MAX_IMAGE_BYTES));
        }

        let key = format!("{}/{}.{}", scope.tenant_id, Uuid::new_v4(), ext);
        let url = self.storage.put(&key, bytes).await?;
        Ok(ImageUploadResponse { url })
    }

    async fn owned(&self, scope: &TenantScope, id: i64) -> Result<Classified, AppError> {
        let classified = self.get(scope, id).await?;
        if classified.user_id != scope.user_id {
            return Err(AppError::NotClassifiedOwner);
        }
        Ok(classified)
    }
}

fn trimmed(mut payload: ClassifiedPayload) -> ClassifiedPayload {
    payload.title = payload.title.trim().to_string();
    payload.description = payload.description.trim().to_string();
    payload.category = payload.category.trim().to_string();
    payload.location = payload.location.trim().to_string();
    payload.contact_info = payload.contact_info.trim().to_string();
    payload
}
