use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::wire::{ErrorResponse, PredictResponse};
use crate::config::{FILE_FIELD, MAX_UPLOAD_BYTES, PREDICT_PATH};
use crate::error::GuideError;
use crate::vision::ClassificationService;

/// Route reporting liveness and the size of the label set.
pub const HEALTH_PATH: &str = "/healthz";

struct ServiceState<S> {
    classifier: Arc<Mutex<S>>,
    label_count: usize,
}

impl<S> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
            label_count: self.label_count,
        }
    }
}

/// Build the vision service router.
///
/// The classifier sits behind a single mutex, so inference requests are
/// served one at a time.
pub fn router<S>(classifier: S, label_count: usize) -> Router
where
    S: ClassificationService + Send + 'static,
{
    let state = ServiceState {
        classifier: Arc::new(Mutex::new(classifier)),
        label_count,
    };

    Router::new()
        .route(PREDICT_PATH, post(predict::<S>))
        .route(HEALTH_PATH, get(healthz::<S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve<S>(addr: &str, classifier: S, label_count: usize) -> anyhow::Result<()>
where
    S: ClassificationService + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind vision service to {addr}"))?;
    info!(bind_addr = %listener.local_addr()?, labels = label_count, "Vision service listening");

    axum::serve(listener, router(classifier, label_count))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Failed to listen for shutdown signal");
            }
        })
        .await
        .context("Vision service failed")
}

async fn healthz<S>(State(state): State<ServiceState<S>>) -> Json<Value>
where
    S: ClassificationService + Send + 'static,
{
    Json(json!({
        "status": "ok",
        "labels": state.label_count,
    }))
}

async fn predict<S>(
    State(state): State<ServiceState<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    S: ClassificationService + Send + 'static,
{
    let Ok(mut multipart) = multipart else {
        return error_response(StatusCode::BAD_REQUEST, "No file provided".to_string());
    };
    let image = match read_file_field(&mut multipart).await {
        Ok(Some(image)) => image,
        Ok(None) => {
            return error_response(StatusCode::BAD_REQUEST, "No file provided".to_string());
        }
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    debug!(bytes = image.len(), "Received image");

    let classifier = Arc::clone(&state.classifier);
    let outcome = tokio::task::spawn_blocking(move || {
        let mut classifier = classifier.lock().unwrap_or_else(|poisoned| {
            warn!("Classifier lock poisoned by an earlier request; recovering");
            PoisonError::into_inner(poisoned)
        });
        classifier.classify(&image)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => Json(PredictResponse::from(result)).into_response(),
        Ok(Err(GuideError::InvalidImage(detail))) => {
            error_response(StatusCode::BAD_REQUEST, format!("invalid image: {detail}"))
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Classification failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(err) => {
            warn!(error = %err, "Classification task aborted");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("classification task failed: {err}"),
            )
        }
    }
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Bytes>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field.bytes().await.map_err(|e| e.to_string())?;
            return Ok(Some(bytes));
        }
    }
    Ok(None)
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
