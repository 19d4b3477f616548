use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use dermscan::analysis::Analyzer;
use dermscan::classification::ClassificationTable;
use dermscan::config::AppConfig;
use dermscan::inference::{InferenceEngine, Preprocessor, Tensor};
use dermscan::routes::{configure_routes, not_found};
use dermscan::storage::LocalStorage;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let storage = LocalStorage::new(&config.storage.upload_dir);
    if let Err(e) = storage.ensure_dir().await {
        log::error!(
            "Failed to create upload directory {}: {}",
            config.storage.upload_dir.display(),
            e
        );
        return Err(std::io::Error::other(e.to_string()));
    }

    let table = ClassificationTable::skin_lesions().map_err(|e| {
        log::error!("Invalid classification table: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })?;
    let preprocessor = Preprocessor::new(&config.image);
    let sample_input = Tensor::zeros(preprocessor.input_shape());

    // A missing or unreadable artifact leaves the service up in 503 mode. A
    // build without a model backend, or a model whose output is not a
    // distribution over the table, never serves.
    let engine = InferenceEngine::load(
        &config.model.path,
        &table,
        &sample_input,
        config.model.apply_softmax,
    )
    .map_err(|e| {
        log::error!("Model rejected at startup: {}", e);
        std::io::Error::other(format!("Model validation failed: {}", e))
    })?;
    if !engine.is_ready() {
        log::warn!("Model not loaded. Analysis requests will return 503.");
    }

    let analyzer = Analyzer::new(
        Arc::new(engine),
        storage,
        preprocessor,
        table,
        config.storage.max_upload_bytes,
    );

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);
    log::info!(
        "Storing uploads in {}",
        config.storage.upload_dir.display()
    );

    let analyzer = web::Data::new(analyzer);
    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(analyzer.clone())
            .configure(configure_routes)
            .default_service(web::to(not_found))
    })
    .bind(&bind_address)?
    .run()
    .await
}
