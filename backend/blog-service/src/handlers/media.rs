use actix_web::{http::header, web, HttpResponse};

use crate::app::AppState;
use crate::error::{AppError, Result};

fn content_type_for(path: &str) -> mime::Mime {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "gif" => mime::IMAGE_GIF,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "bmp" => mime::IMAGE_BMP,
        "webp" => "image/webp"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// GET /media/{path}
pub async fn serve_media(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let relative = path.into_inner();
    let file = state
        .media
        .resolve(&relative)
        .ok_or_else(|| AppError::NotFound(format!("media '{}'", relative)))?;

    let data = match tokio::fs::read(&file).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("media '{}'", relative)))
        }
        Err(e) => return Err(AppError::Media(e.to_string())),
    };

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&relative))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(data))
}
