//! # HTTP Server
//!
//! Hosts the prediction pipeline over HTTP/1.1.
//!
//! | Route               | Behavior                                         |
//! |---------------------|--------------------------------------------------|
//! | `POST /predict`     | Runs the pipeline; 200 with the outcome JSON     |
//! | `GET /health/live`  | Always `OK`                                      |
//! | `GET /health/ready` | Classifier readiness; 503 when it fails          |
//! | `GET /metrics`      | Prometheus exposition (when export is enabled)   |
//! | `OPTIONS *`         | CORS preflight, 204                              |
//!
//! Routing is a plain async function over the request parts so it can be
//! exercised without sockets.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::server::conn::http1;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, Instrument};

use crate::classifier::ClassificationAdapter;
use crate::config::ServerConfig;
use crate::errors::error_logging;
use crate::observability;
use crate::pipeline::PredictionPipeline;
use crate::upload::{self, UploadError};

/// Shared state of all connections
pub struct AppState<C> {
    pipeline: Arc<PredictionPipeline<C>>,
    server: ServerConfig,
    metrics: Option<PrometheusHandle>,
    next_request_id: AtomicU64,
}

impl<C: ClassificationAdapter> AppState<C> {
    pub fn new(
        pipeline: Arc<PredictionPipeline<C>>,
        server: ServerConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            pipeline,
            server,
            metrics,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn pipeline(&self) -> &PredictionPipeline<C> {
        &self.pipeline
    }

    fn request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Route one request whose body has already been read
pub async fn route<C: ClassificationAdapter>(
    state: &AppState<C>,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let mut response = match (method, path) {
        (&Method::OPTIONS, _) => preflight_response(headers),
        (&Method::POST, "/predict") => handle_predict(state, headers, body).await,
        (&Method::GET, "/health/live") => text_response(StatusCode::OK, "OK".to_string()),
        (&Method::GET, "/health/ready") => {
            match observability::perform_readiness_checks(state.pipeline.classifier()).await {
                Ok(()) => text_response(StatusCode::OK, "OK".to_string()),
                Err(e) => text_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("NOT READY: {}", e),
                ),
            }
        }
        (&Method::GET, "/metrics") => match &state.metrics {
            Some(handle) => {
                let mut response = text_response(StatusCode::OK, handle.render());
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
                );
                response
            }
            None => error_response(StatusCode::NOT_FOUND, "Metrics export is disabled"),
        },
        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    apply_cors(&state.server, headers, response.headers_mut());
    response
}

async fn handle_predict<C: ClassificationAdapter>(
    state: &AppState<C>,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let limit = state.pipeline.config().max_upload_bytes;

    let image = match upload::extract_image(content_type, body, limit).await {
        Ok(image) => image,
        Err(e) => return upload_error_response(&e),
    };

    let request_id = state.request_id();
    let outcome = state
        .pipeline
        .predict(&image)
        .instrument(observability::prediction_span(request_id))
        .await;

    json_response(StatusCode::OK, &outcome)
}

/// Serve one connection's request: enforce the body limit, then route
pub async fn handle<C: ClassificationAdapter>(
    state: &AppState<C>,
    req: Request<hyper::body::Incoming>,
) -> Response<Full<Bytes>> {
    let start = Instant::now();
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();
    let limit = state.pipeline.config().max_upload_bytes;

    let content_length = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok());

    let response = match upload::check_content_length(content_length, limit) {
        Err(e) => {
            let mut response = upload_error_response(&e);
            apply_cors(&state.server, &parts.headers, response.headers_mut());
            response
        }
        Ok(()) => match Limited::new(body, limit).collect().await {
            Ok(collected) => {
                route(state, &parts.method, &path, &parts.headers, collected.to_bytes()).await
            }
            Err(e) => {
                let mut response = if e.is::<http_body_util::LengthLimitError>() {
                    upload_error_response(&UploadError::TooLarge { limit })
                } else {
                    error_logging::log_request_error(&e, parts.method.as_str(), &path, None);
                    error_response(StatusCode::BAD_REQUEST, "Failed to read request body")
                };
                apply_cors(&state.server, &parts.headers, response.headers_mut());
                response
            }
        },
    };

    observability::record_request_metrics(
        method_label(&parts.method),
        route_label(&path),
        response.status().as_u16(),
        start.elapsed(),
    );
    response
}

/// Metrics label for a request path. Unknown paths share `other` so the
/// label set stays fixed.
pub fn route_label(path: &str) -> &'static str {
    match path {
        "/predict" => "/predict",
        "/health/live" => "/health/live",
        "/health/ready" => "/health/ready",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Metrics label for a request method; extension methods share `OTHER`
pub fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::OPTIONS => "OPTIONS",
        Method::HEAD => "HEAD",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        _ => "OTHER",
    }
}

/// Accept connections until the listener fails
pub async fn serve<C>(listener: TcpListener, state: Arc<AppState<C>>) -> Result<()>
where
    C: ClassificationAdapter + 'static,
{
    info!(address = %listener.local_addr()?, "Prediction server listening");

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let state = state.clone();

                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service =
                        hyper::service::service_fn(move |req: Request<hyper::body::Incoming>| {
                            let state = state.clone();
                            async move { Ok::<_, Infallible>(handle(&state, req).await) }
                        });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        tracing::error!("Error serving connection: {:?}", err);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Error accepting connection: {}", e);
            }
        }
    }
}

/// Bind the configured address and serve
pub async fn run<C>(state: Arc<AppState<C>>) -> Result<()>
where
    C: ClassificationAdapter + 'static,
{
    let address = state.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", address, e))?;
    serve(listener, state).await
}

fn apply_cors(config: &ServerConfig, request: &HeaderMap, response: &mut HeaderMap) {
    let origin = match request.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) if config.is_origin_allowed(origin) => origin,
        _ => return,
    };

    if let Ok(value) = HeaderValue::from_str(origin) {
        response.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        response.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        response.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

fn preflight_response(request: &HeaderMap) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;

    // Credentialed requests cannot use `*`, so the requested values are echoed
    let methods = request
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("GET, POST, OPTIONS"));
    let headers = request
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("content-type"));

    let response_headers = response.headers_mut();
    response_headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    response_headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, headers);
    response_headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("600"));
    response
}

fn upload_error_response(error: &UploadError) -> Response<Full<Bytes>> {
    let status = match error {
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::MissingFile | UploadError::Malformed(_) => StatusCode::BAD_REQUEST,
    };
    error_response(status, &error.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { error: message })
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(r#"{{"error":"Failed to serialize response: {}"}}"#, e).into_bytes(),
        ),
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}
