//! HTTP transport: a single POST endpoint carrying SOAP envelopes.

use crate::config::ServerConfig;
use crate::response::SoapResponse;
use crate::service::PersonService;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap};
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(service: Arc<PersonService>, config: &ServerConfig) -> Router {
    Router::new()
        .route(&config.endpoint_path, post(soap_endpoint))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn soap_endpoint(
    State(service): State<Arc<PersonService>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> SoapResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return service.reject(&rejection.body_text()),
    };

    let authorization = headers.get(header::AUTHORIZATION).map(|value| value.as_bytes());

    service.handle(&body, authorization).await
}
