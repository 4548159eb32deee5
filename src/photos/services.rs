use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use bytes::Bytes;
use uuid::Uuid;

use tracing::warn;

use crate::storage::{StorageClient, ANALYSIS_PHOTOS_BUCKET};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// A stored photo made consumable by the model and the client.
#[derive(Debug, Clone)]
pub struct ResolvedPhoto {
    pub path: String,
    pub signed_url: String,
    pub data_url: String,
}

/// Uploads analysis photos and returns their object paths in upload order.
/// A failed upload removes the photos already stored for this call.
pub async fn upload_analysis_photos(
    storage: &dyn StorageClient,
    user_id: Uuid,
    analysis_id: Uuid,
    images: Vec<UploadItem>,
) -> anyhow::Result<Vec<String>> {
    anyhow::ensure!(!images.is_empty(), "no images provided");

    let mut paths = Vec::with_capacity(images.len());
    for img in images {
        let ext = ext_from_mime(&img.content_type).unwrap_or("bin");
        let key = format!("{}/{}/{}.{}", user_id, analysis_id, Uuid::new_v4(), ext);
        if let Err(e) = storage
            .put_object(ANALYSIS_PHOTOS_BUCKET, &key, img.body, &img.content_type)
            .await
        {
            remove_photos(storage, &paths).await;
            return Err(e.context(format!("put_object {}", key)));
        }
        paths.push(key);
    }
    Ok(paths)
}

/// Best-effort delete of analysis photos; failures are only logged.
pub async fn remove_photos(storage: &dyn StorageClient, paths: &[String]) {
    for path in paths {
        if let Err(e) = storage.delete_object(ANALYSIS_PHOTOS_BUCKET, path).await {
            warn!(path = %path, error = %e, "could not remove orphaned photo");
        }
    }
}

pub async fn presign_many(
    storage: &dyn StorageClient,
    bucket: &str,
    keys: &[String],
    expires_seconds: u64,
) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::with_capacity(keys.len());
    for k in keys {
        out.push(storage.presign_get(bucket, k, expires_seconds).await?);
    }
    Ok(out)
}

/// Signs the photo and inlines its bytes as a base64 `data:` URL.
pub async fn resolve_photo(
    storage: &dyn StorageClient,
    path: &str,
    ttl_secs: u64,
) -> anyhow::Result<ResolvedPhoto> {
    let signed_url = storage
        .presign_get(ANALYSIS_PHOTOS_BUCKET, path, ttl_secs)
        .await
        .with_context(|| format!("sign photo {}", path))?;
    let body = storage
        .get_object(ANALYSIS_PHOTOS_BUCKET, path)
        .await
        .with_context(|| format!("fetch photo {}", path))?;
    anyhow::ensure!(!body.is_empty(), "photo {} is empty", path);

    Ok(ResolvedPhoto {
        path: path.to_string(),
        signed_url,
        data_url: format!("data:{};base64,{}", mime_from_path(path), B64.encode(&body)),
    })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn mime_from_path(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

pub fn is_supported_image(ct: &str) -> bool {
    ext_from_mime(ct).is_some()
}
