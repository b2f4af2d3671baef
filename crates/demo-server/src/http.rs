//! Routes of the demo server.
//!
//! A single route, `/example`, answers `GET` with a JSON message and the
//! current time. Every other method gets `405 Method Not Supported`.

use crate::error::DemoServerError;
use axum::Router;
use axum::extract::{ConnectInfo, Request};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Only route served
pub const EXAMPLE_PATH: &str = "/example";
/// Message returned by `GET /example`
pub const EXAMPLE_MESSAGE: &str = "Automate all the things again!";
/// Body of the 405 response
pub const METHOD_NOT_SUPPORTED_BODY: &str = "Method Not Supported";

/// Body of `GET /example`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ExampleResponse {
    /// Fixed greeting
    pub message: String,
    /// RFC 3339 timestamp
    pub time: String,
}

impl ExampleResponse {
    /// Greeting stamped with the current time
    pub fn now() -> Self {
        Self {
            message: EXAMPLE_MESSAGE.to_string(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Serializes `body` as a JSON response, or fails with a 500.
pub fn json_response<T: Serialize>(body: &T) -> Result<Response, DemoServerError> {
    let bytes = serde_json::to_vec(body)?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

async fn example() -> Result<Response, DemoServerError> {
    json_response(&ExampleResponse::now())
}

async fn method_not_supported() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_SUPPORTED_BODY)
}

async fn log_client(request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    info!("{} {} from {}", request.method(), request.uri().path(), client);
    next.run(request).await
}

/// Builds the demo router
pub fn router() -> Router {
    Router::new()
        .route(EXAMPLE_PATH, get(example).fallback(method_not_supported))
        .layer(middleware::from_fn(log_client))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request as HttpRequest};
    use tower::ServiceExt;

    async fn send(method: Method, path: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = router()
            .oneshot(HttpRequest::builder().method(method).uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn test_get_returns_message_and_time() {
        let (status, content_type, body) = send(Method::GET, EXAMPLE_PATH).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));

        let parsed: ExampleResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.message, "Automate all the things again!");
        assert!(chrono::DateTime::parse_from_rfc3339(&parsed.time).is_ok(), "{}", parsed.time);
    }

    #[tokio::test]
    async fn test_other_methods_are_not_supported() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            let (status, _, body) = send(method.clone(), EXAMPLE_PATH).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(body, METHOD_NOT_SUPPORTED_BODY.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (status, _, _) = send(Method::GET, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_serialization_failure_is_internal_error() {
        struct Unserializable;
        impl Serialize for Unserializable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("refused"))
            }
        }

        let response = match json_response(&Unserializable) {
            Ok(_) => panic!("serialization should fail"),
            Err(e) => e.into_response(),
        };
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
