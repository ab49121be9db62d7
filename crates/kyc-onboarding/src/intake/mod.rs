//! Backend for the onboarding submissions: validates each step's upload,
//! persists the files, appends the audit trail, and answers in the shared
//! response envelope.

pub mod form;
pub mod router;
pub mod service;
pub mod storage;

pub use form::{
    AddressSubmission, DocumentSubmission, IdDocsSubmission, MultipartForm, SelfieSubmission,
};
pub use router::intake_router;
pub use service::{IntakeError, IntakeService, REGISTER_REQUIRED_FIELDS};
pub use storage::{AuditEvent, AuditKind, FsUploadStore, StoreError, UploadStore};

#[cfg(test)]
mod tests;
