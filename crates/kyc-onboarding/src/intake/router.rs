use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, rejection::BytesRejection, DefaultBodyLimit, Multipart,
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::form::MultipartForm;
use super::service::{IntakeError, IntakeService};
use super::storage::UploadStore;
use crate::envelope::{ApiEnvelope, ErrorCode};

const MALFORMED_MULTIPART: &str = "Request body must be multipart/form-data.";
const UNREADABLE_BODY: &str = "Request body could not be read.";
const BODY_TOO_LARGE: &str = "Request body exceeds the upload size limit.";

/// Router exposing the onboarding submission endpoints under `/kyc`.
pub fn intake_router<S>(service: Arc<IntakeService<S>>, body_limit: usize) -> Router
where
    S: UploadStore + 'static,
{
    Router::new()
        .route("/kyc/register", post(register_handler::<S>))
        .route("/kyc/selfie", post(selfie_handler::<S>))
        .route("/kyc/id-docs", post(id_docs_handler::<S>))
        .route("/kyc/address", post(address_handler::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

pub(crate) async fn register_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    S: UploadStore + 'static,
{
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "request body rejected");
            return body_rejected(rejection.status(), UNREADABLE_BODY);
        }
    };
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    envelope_response(service.register(&payload).await)
}

pub(crate) async fn selfie_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    S: UploadStore + 'static,
{
    match read_form(multipart).await {
        Ok(form) => envelope_response(service.upload_selfie(form.into()).await),
        Err(rejected) => rejected,
    }
}

pub(crate) async fn id_docs_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    S: UploadStore + 'static,
{
    match read_form(multipart).await {
        Ok(form) => envelope_response(service.upload_id_documents(form.into()).await),
        Err(rejected) => rejected,
    }
}

pub(crate) async fn address_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    S: UploadStore + 'static,
{
    match read_form(multipart).await {
        Ok(form) => envelope_response(service.upload_proof_of_address(form.into()).await),
        Err(rejected) => rejected,
    }
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<MultipartForm, Response> {
    let multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "multipart extraction rejected");
        body_rejected(StatusCode::BAD_REQUEST, MALFORMED_MULTIPART)
    })?;
    MultipartForm::read(multipart).await.map_err(|err| {
        warn!(error = %err, "multipart body could not be read");
        body_rejected(err.status(), MALFORMED_MULTIPART)
    })
}

/// `INVALID_BODY` envelope for a body the extractors refused. A body over the
/// configured limit keeps its 413 status.
fn body_rejected(status: StatusCode, message: &str) -> Response {
    let (status, message) = if status == StatusCode::PAYLOAD_TOO_LARGE {
        (status, BODY_TOO_LARGE)
    } else {
        (StatusCode::BAD_REQUEST, message)
    };
    let body: ApiEnvelope<()> = ApiEnvelope::failure(ErrorCode::InvalidBody, message);
    (status, Json(body)).into_response()
}

fn envelope_response<T: Serialize>(result: Result<T, IntakeError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiEnvelope::success(data))).into_response(),
        Err(err) => {
            let status = StatusCode::from_u16(err.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body: ApiEnvelope<()> = ApiEnvelope::failure(err.code, err.message);
            (status, Json(body)).into_response()
        }
    }
}
