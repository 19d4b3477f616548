use actix_files::NamedFile;
use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{HttpRequest, HttpResponse, web};
use futures::TryStreamExt;
use log::{info, warn};
use shared::{ErrorResponse, HealthResponse, InfoResponse};

use crate::analysis::{AnalysisError, Analyzer, ErrorCategory, UploadedArtifact};

const UPLOAD_FIELD: &str = "file";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/analyze").route(web::post().to(handle_analyze)))
        .service(web::resource("/api/images/{filename}").route(web::get().to(get_image)))
        .service(web::resource("/api/info").route(web::get().to(get_info)))
        .service(web::resource("/api/health").route(web::get().to(health_check)));
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("Endpoint not found"))
}

pub fn error_response(err: &AnalysisError) -> HttpResponse {
    let body = ErrorResponse::new(err.message());
    if let AnalysisError::FileTooLarge { .. } = err {
        return HttpResponse::PayloadTooLarge().json(body);
    }
    match err.category() {
        ErrorCategory::Input => HttpResponse::BadRequest().json(body),
        ErrorCategory::ServiceUnavailable => HttpResponse::ServiceUnavailable().json(body),
        ErrorCategory::Internal => HttpResponse::InternalServerError().json(body),
        ErrorCategory::NotFound => HttpResponse::NotFound().json(body),
    }
}

async fn handle_analyze(analyzer: web::Data<Analyzer>, payload: Multipart) -> HttpResponse {
    let upload = match read_upload(payload, analyzer.max_upload_bytes()).await {
        Ok(upload) => upload,
        Err(e) => {
            warn!("Malformed upload request: {}", e);
            None
        }
    };

    match analyzer.analyze(upload).await {
        Ok(result) => HttpResponse::Ok().json(result.to_response()),
        Err(e) => {
            match e.category() {
                ErrorCategory::Internal => log::error!("Analysis failed: {}", e),
                _ => info!("Analysis rejected: {}", e),
            }
            error_response(&e)
        }
    }
}

/// Pulls the `file` part out of the form. Bytes past `limit` are counted but
/// not buffered so oversized uploads cost no memory.
async fn read_upload(
    mut payload: Multipart,
    limit: u64,
) -> Result<Option<UploadedArtifact>, MultipartError> {
    let mut upload = None;

    while let Some(mut field) = payload.try_next().await? {
        if upload.is_some() || field.name() != Some(UPLOAD_FIELD) {
            drain(&mut field).await?;
            continue;
        }

        let original_filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut image_data = Vec::new();
        let mut received: u64 = 0;
        while let Some(chunk) = field.try_next().await? {
            received += chunk.len() as u64;
            if received <= limit {
                image_data.extend_from_slice(&chunk);
            }
        }
        if received > limit {
            image_data = Vec::new();
        }

        upload = Some(UploadedArtifact {
            bytes: image_data,
            content_type,
            original_filename,
            declared_size: received,
        });
    }

    Ok(upload)
}

async fn drain(field: &mut Field) -> Result<(), MultipartError> {
    while field.try_next().await?.is_some() {}
    Ok(())
}

async fn get_image(
    req: HttpRequest,
    analyzer: web::Data<Analyzer>,
    path: web::Path<String>,
) -> HttpResponse {
    let filename = path.into_inner();
    let image_path = match analyzer.resolve_image(&filename).await {
        Ok(image_path) => image_path,
        Err(e) => return error_response(&e),
    };
    match NamedFile::open_async(&image_path).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            warn!("Failed to open {}: {}", image_path.display(), e);
            error_response(&AnalysisError::NotFound)
        }
    }
}

async fn get_info(analyzer: web::Data<Analyzer>) -> HttpResponse {
    HttpResponse::Ok().json(InfoResponse {
        success: true,
        classifications: analyzer.table().to_info(),
    })
}

async fn health_check(analyzer: web::Data<Analyzer>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: analyzer.is_ready(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
