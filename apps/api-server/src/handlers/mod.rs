//! HTTP handlers and route configuration.

mod auth;
mod health;
mod posts;
mod tags;

#[cfg(test)]
mod tests;

use actix_multipart::form::MultipartFormConfig;
use actix_web::web;

use crate::middleware::error::AppError;

/// Upper bound on a whole multipart body; the image rule itself is checked in the handler.
const MULTIPART_LIMIT: usize = 10 * 1024 * 1024;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(multipart_config())
        // Public routes
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/v1")
                // Auth routes
                .route("/login", web::post().to(auth::login))
                .route("/register", web::post().to(auth::register))
                .service(
                    web::scope("/posts")
                        .route("", web::get().to(posts::index))
                        .route("", web::post().to(posts::store))
                        .route("/{id}", web::get().to(posts::show))
                        .route("/{id}", web::put().to(posts::update))
                        .route("/{id}", web::patch().to(posts::update))
                        .route("/{id}", web::delete().to(posts::destroy))
                        .route("/{id}/upload-image", web::post().to(posts::upload_image)),
                )
                .service(
                    web::scope("/tags")
                        .route("", web::get().to(tags::index))
                        .route("", web::post().to(tags::store))
                        .route("/{id}", web::get().to(tags::show))
                        .route("/{id}", web::put().to(tags::update))
                        .route("/{id}", web::patch().to(tags::update))
                        .route("/{id}", web::delete().to(tags::destroy)),
                ),
        );
}

// Extractor failures are rendered as envelopes too.

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::NotFound("Resource not found".to_string()).into())
}

fn multipart_config() -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(MULTIPART_LIMIT)
        .memory_limit(MULTIPART_LIMIT)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}
