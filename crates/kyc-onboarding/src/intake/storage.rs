use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::onboarding::domain::UploadFile;

const FALLBACK_EXTENSION: &str = ".bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    SelfieUpload,
    IdDocsUpload,
    AddressUpload,
}

/// One line of the append-only audit log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event: AuditKind,
    pub applicant_id: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl AuditEvent {
    pub fn new(event: AuditKind, applicant_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
            applicant_id: applicant_id.into(),
            details: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to create {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to append to audit log {path}: {source}")]
    Audit {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to encode audit event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence for accepted uploads and their audit trail.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Write `file` under a fresh collision-resistant name and return its path.
    async fn store(&self, prefix: &str, file: &UploadFile) -> Result<PathBuf, StoreError>;

    async fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError>;
}

/// Filesystem-backed store: one file per upload, JSON lines for the audit log.
#[derive(Debug, Clone)]
pub struct FsUploadStore {
    uploads_dir: PathBuf,
    audit_log: PathBuf,
}

impl FsUploadStore {
    pub fn new(uploads_dir: impl Into<PathBuf>, audit_log: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            audit_log: audit_log.into(),
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(config.uploads_dir.clone(), config.audit_log.clone())
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn audit_log(&self) -> &Path {
        &self.audit_log
    }
}

async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| StoreError::Prepare {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl UploadStore for FsUploadStore {
    async fn store(&self, prefix: &str, file: &UploadFile) -> Result<PathBuf, StoreError> {
        ensure_dir(&self.uploads_dir).await?;
        let name = format!(
            "{}-{}{}",
            sanitize_prefix(prefix),
            Uuid::new_v4(),
            extension_for(file)
        );
        let target = self.uploads_dir.join(name);
        fs::write(&target, &file.bytes)
            .await
            .map_err(|source| StoreError::Write {
                path: target.clone(),
                source,
            })?;
        Ok(target)
    }

    async fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError> {
        if let Some(parent) = self.audit_log.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            ensure_dir(parent).await?;
        }
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let audit_error = |source| StoreError::Audit {
            path: self.audit_log.clone(),
            source,
        };
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log)
            .await
            .map_err(audit_error)?;
        handle.write_all(line.as_bytes()).await.map_err(audit_error)?;
        handle.flush().await.map_err(audit_error)
    }
}

/// Keep `[A-Za-z0-9_-]`; anything else becomes `_`.
pub fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension of the stored file, dot included: from the original name, then
/// the declared content type, then `.bin`.
pub fn extension_for(file: &UploadFile) -> String {
    let from_name = Path::new(&file.file_name)
        .file_name()
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|ch| ch.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return format!(".{ext}");
    }

    file.content_type
        .as_deref()
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|extensions| extensions.first())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}
