use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt as _;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth;
use crate::config::AppConfig;
use crate::db;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

/// Multipart image upload: validated, pushed to the public storage bucket,
/// public URL returned.
pub async fn upload_image(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> HttpResponse {
    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let user = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                return HttpResponse::BadRequest()
                    .json(json!({"error": format!("Malformed upload: {}", e)}));
            }
        };
        if field.name() != "file" {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_default();
        let extension = match extension_for(&content_type) {
            Some(ext) => ext,
            None => {
                return HttpResponse::BadRequest()
                    .json(json!({"error": "Unsupported image type"}));
            }
        };

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    return HttpResponse::BadRequest()
                        .json(json!({"error": format!("Malformed upload: {}", e)}));
                }
            };
            if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
                return HttpResponse::BadRequest()
                    .json(json!({"error": "Image exceeds the 5MB limit"}));
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return HttpResponse::BadRequest().json(json!({"error": "Empty file"}));
        }

        let object_path = format!("{}/{}.{}", user.id, Uuid::new_v4(), extension);
        let client = reqwest::Client::new();
        let stored = client
            .post(format!(
                "{}/object/{}/{}",
                config.storage_url, config.storage_bucket, object_path
            ))
            .bearer_auth(&config.storage_api_key)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await;

        return match stored {
            Ok(res) if res.status().is_success() => {
                let url = format!(
                    "{}/object/public/{}/{}",
                    config.storage_url, config.storage_bucket, object_path
                );
                info!("User {} uploaded {}", user.id, object_path);
                HttpResponse::Ok().json(json!({"url": url}))
            }
            Ok(res) => {
                error!("Storage upload failed with status {}", res.status());
                HttpResponse::BadGateway().json(json!({"error": "Storage upload failed"}))
            }
            Err(e) => {
                error!("Storage upload request failed: {}", e);
                HttpResponse::BadGateway().json(json!({"error": "Storage upload failed"}))
            }
        };
    }

    HttpResponse::BadRequest().json(json!({"error": "No file field in upload"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_types_are_accepted() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("image/gif"), Some("gif"));
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for("text/html"), None);
        assert_eq!(extension_for(""), None);
    }
}
