use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;

use crate::intake::form::{AddressSubmission, DocumentSubmission, IdDocsSubmission};
use crate::intake::service::IntakeService;
use crate::intake::storage::{AuditEvent, FsUploadStore, StoreError, UploadStore};
use crate::onboarding::domain::UploadFile;

pub(super) const BOUNDARY: &str = "kyc-test-boundary";

pub(super) fn fs_service() -> (TempDir, Arc<IntakeService<FsUploadStore>>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsUploadStore::new(dir.path().join("uploads"), dir.path().join("logs/api.log"));
    let service = IntakeService::with_latency(Arc::new(store), false);
    (dir, Arc::new(service))
}

pub(super) fn audit_lines(store: &FsUploadStore) -> Vec<Value> {
    std::fs::read_to_string(store.audit_log())
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("audit line is json"))
        .collect()
}

pub(super) fn stored_files(store: &FsUploadStore) -> Vec<PathBuf> {
    match std::fs::read_dir(store.uploads_dir()) {
        Ok(entries) => entries
            .map(|entry| entry.expect("dir entry").path())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Store that refuses every write.
#[derive(Default)]
pub(super) struct BrokenStore {
    pub(super) audit: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl UploadStore for BrokenStore {
    async fn store(&self, prefix: &str, _file: &UploadFile) -> Result<PathBuf, StoreError> {
        Err(StoreError::Write {
            path: PathBuf::from(format!("/read-only/{prefix}")),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    async fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError> {
        self.audit.lock().expect("lock").push(event.clone());
        Ok(())
    }
}

pub(super) fn image(name: &str) -> UploadFile {
    UploadFile::new(name, Some("image/jpeg"), vec![0xFF, 0xD8, 0xFF])
}

pub(super) fn document(doc_type: &str) -> DocumentSubmission {
    DocumentSubmission {
        doc_type: Some(doc_type.to_string()),
        front: Some(image("front.jpg")),
        back: Some(image("back.jpg")),
    }
}

pub(super) fn id_docs(first: &str, second: &str) -> IdDocsSubmission {
    IdDocsSubmission {
        applicant_id: Some("app_test".to_string()),
        documents: [document(first), document(second)],
    }
}

pub(super) fn address() -> AddressSubmission {
    AddressSubmission {
        applicant_id: Some("app_test".to_string()),
        document: Some(UploadFile::new("bill.pdf", Some("application/pdf"), b"%PDF".to_vec())),
        doc_type: Some("Utility Bill".to_string()),
        issuer: Some("PG&E".to_string()),
        country: None,
        issue_date: Some("2025-12-01".to_string()),
    }
}

pub(super) fn registration_body() -> Value {
    serde_json::json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "phone": "+14155550134",
        "dob": "1990-04-12",
        "gender": "female",
        "addressStreet": "500 Howard St",
        "addressCity": "San Francisco",
        "addressRegion": "CA",
        "addressPostalCode": "94105",
        "addressCountry": "US"
    })
}

pub(super) enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub(super) fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub(super) fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
