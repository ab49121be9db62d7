//! The applicant-facing side of onboarding: identity validation, document
//! rules, the step state machine, and the gateway it submits through.

pub mod camera;
pub mod documents;
pub mod domain;
pub mod flow;
pub mod gateway;
pub mod validation;

pub use camera::{CameraAvailability, CameraError, CameraSession, FrameResult, FrameSource};
pub use documents::{is_primary_identity_doc_type, ID_DOC_TYPES, PRIMARY_ID_DOC_TYPES};
pub use domain::{
    format_full_name, format_physical_address, AddressMeta, AddressVerification, ApplicantSession,
    IdDocsReceipt, IdDocumentDraft, IdentityForm, ParsedAddress, Registration, SelfieDraft,
    SelfieVerdict, StepId, UploadFile,
};
pub use flow::{AdvanceOutcome, DocumentSlot, KycFlow, PendingIndicator};
pub use gateway::{GatewayError, HttpKycGateway, KycGateway};
pub use validation::{validate_identity, validate_identity_on, IdentityField, IdentityFieldErrors};

#[cfg(test)]
mod tests;
