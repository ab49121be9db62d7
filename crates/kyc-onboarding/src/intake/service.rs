use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::form::{AddressSubmission, IdDocsSubmission, SelfieSubmission};
use super::storage::{AuditEvent, AuditKind, StoreError, UploadStore};
use crate::config::IntakeConfig;
use crate::envelope::ErrorCode;
use crate::onboarding::documents::is_primary_identity_doc_type;
use crate::onboarding::domain::{
    AddressVerification, IdDocsReceipt, ParsedAddress, Registration, SelfieVerdict, StepId,
    UploadFile,
};

/// Fields `POST /kyc/register` insists on, in reporting order.
pub const REGISTER_REQUIRED_FIELDS: [&str; 11] = [
    "email",
    "phone",
    "firstName",
    "lastName",
    "dob",
    "gender",
    "addressStreet",
    "addressCity",
    "addressRegion",
    "addressPostalCode",
    "addressCountry",
];

const REGISTER_DELAY: Duration = Duration::from_millis(700);
const SELFIE_DELAY: Duration = Duration::from_millis(800);
const ADDRESS_DELAY: Duration = Duration::from_millis(900);

const DEFAULT_COUNTRY: &str = "US";
const MISSING_APPLICANT: &str = "Missing applicantId.";

/// A rejected submission: machine code plus the message the applicant sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", code.as_str())]
pub struct IntakeError {
    pub code: ErrorCode,
    pub message: String,
}

impl IntakeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.code.status()
    }
}

/// Backend for the four onboarding submissions.
pub struct IntakeService<S> {
    store: Arc<S>,
    simulate_latency: bool,
}

impl<S> IntakeService<S>
where
    S: UploadStore + 'static,
{
    pub fn new(store: Arc<S>, config: &IntakeConfig) -> Self {
        Self::with_latency(store, config.simulate_latency)
    }

    pub fn with_latency(store: Arc<S>, simulate_latency: bool) -> Self {
        Self {
            store,
            simulate_latency,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn register(&self, body: &Value) -> Result<Registration, IntakeError> {
        let missing: Vec<&str> = REGISTER_REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| {
                !body
                    .get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|value| !value.trim().is_empty())
            })
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, "registration rejected");
            return Err(IntakeError::new(
                ErrorCode::InvalidBody,
                format!("Missing fields: {}", missing.join(", ")),
            ));
        }

        self.pause(REGISTER_DELAY).await;
        let applicant_id = format!("app_{}", Uuid::new_v4().simple());
        info!(applicant_id = %applicant_id, "applicant registered");
        Ok(Registration {
            applicant_id,
            otp_channels: vec!["email".to_string(), "sms".to_string()],
        })
    }

    pub async fn upload_selfie(
        &self,
        submission: SelfieSubmission,
    ) -> Result<SelfieVerdict, IntakeError> {
        let applicant_id = require_applicant(submission.applicant_id.as_deref(), StepId::Selfie)?;

        let has_selfie = submission.selfie.is_some();
        let id_pair = match (&submission.id_front, &submission.id_back) {
            (Some(front), Some(back)) => Some((front, back)),
            _ => None,
        };
        let has_passport = submission.passport.is_some();
        if !has_selfie && id_pair.is_none() && !has_passport {
            warn!(%applicant_id, "selfie rejected: no qualifying media");
            return Err(IntakeError::new(
                ErrorCode::MissingMedia,
                "Provide a selfie or upload both sides of the ID/passport.",
            ));
        }

        let mut uploads: Vec<(String, &UploadFile)> = Vec::new();
        if let Some(selfie) = &submission.selfie {
            uploads.push((format!("selfie-{applicant_id}"), selfie));
        }
        if let Some((front, back)) = id_pair {
            uploads.push((format!("id-front-{applicant_id}"), front));
            uploads.push((format!("id-back-{applicant_id}"), back));
        }
        if let Some(passport) = &submission.passport {
            uploads.push((format!("passport-{applicant_id}"), passport));
        }

        let event = AuditEvent::new(AuditKind::SelfieUpload, applicant_id)
            .with("hasSelfie", has_selfie)
            .with("validIdPair", id_pair.is_some())
            .with("hasPassport", has_passport);
        let stored = self
            .persist(&uploads, event)
            .await
            .map_err(|err| store_failed(StepId::Selfie, applicant_id, "Failed to persist media.", err))?;

        info!(%applicant_id, files = stored.len(), "selfie evidence accepted");
        self.pause(SELFIE_DELAY).await;
        Ok(SelfieVerdict {
            liveness_score: if has_selfie { 0.94 } else { 0.8 },
            matched: true,
            next_step: StepId::IdDocs,
        })
    }

    pub async fn upload_id_documents(
        &self,
        submission: IdDocsSubmission,
    ) -> Result<IdDocsReceipt, IntakeError> {
        let applicant_id = require_applicant(submission.applicant_id.as_deref(), StepId::IdDocs)?;

        let mut uploads: Vec<(String, &UploadFile)> = Vec::new();
        let mut doc_types: Vec<&str> = Vec::new();
        for (index, document) in submission.documents.iter().enumerate() {
            let (Some(doc_type), Some(front), Some(back)) =
                (&document.doc_type, &document.front, &document.back)
            else {
                let message = format!(
                    "Document {} requires a type plus front and back images.",
                    index + 1
                );
                warn!(%applicant_id, document = index + 1, "id documents rejected: incomplete");
                return Err(IntakeError::new(ErrorCode::InvalidBody, message));
            };
            uploads.push((format!("id{index}-front-{applicant_id}"), front));
            uploads.push((format!("id{index}-back-{applicant_id}"), back));
            doc_types.push(doc_type);
        }

        if !doc_types
            .iter()
            .any(|doc_type| is_primary_identity_doc_type(doc_type))
        {
            warn!(%applicant_id, ?doc_types, "id documents rejected: no primary document");
            return Err(IntakeError::new(
                ErrorCode::MissingPrimaryId,
                "At least one document must be a passport, driver's license, or identification card.",
            ));
        }

        let event =
            AuditEvent::new(AuditKind::IdDocsUpload, applicant_id).with("docTypes", json!(doc_types));
        let stored = self.persist(&uploads, event).await.map_err(|err| {
            store_failed(StepId::IdDocs, applicant_id, "Failed to persist ID documents.", err)
        })?;

        info!(%applicant_id, files = stored.len(), "id documents accepted");
        Ok(IdDocsReceipt {
            status: "uploaded".to_string(),
        })
    }

    pub async fn upload_proof_of_address(
        &self,
        submission: AddressSubmission,
    ) -> Result<AddressVerification, IntakeError> {
        let applicant_id = require_applicant(submission.applicant_id.as_deref(), StepId::Address)?;

        let Some(document) = &submission.document else {
            warn!(%applicant_id, "address rejected: no document");
            return Err(IntakeError::new(ErrorCode::MissingDocument, "Upload a document."));
        };
        let (Some(doc_type), Some(issuer), Some(issue_date)) = (
            &submission.doc_type,
            &submission.issuer,
            &submission.issue_date,
        ) else {
            warn!(%applicant_id, "address rejected: incomplete metadata");
            return Err(IntakeError::new(
                ErrorCode::InvalidBody,
                "Document type, issuer, and issue date are required.",
            ));
        };
        let country = submission
            .country
            .clone()
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        let uploads = [(format!("address-{applicant_id}"), document)];
        let event = AuditEvent::new(AuditKind::AddressUpload, applicant_id)
            .with("docType", doc_type.as_str())
            .with("issuer", issuer.as_str())
            .with("issueDate", issue_date.as_str())
            .with("country", country.as_str())
            .with("size", document.len());
        self.persist(&uploads, event).await.map_err(|err| {
            store_failed(StepId::Address, applicant_id, "Failed to persist document.", err)
        })?;

        info!(%applicant_id, %doc_type, "proof of address accepted");
        self.pause(ADDRESS_DELAY).await;
        Ok(AddressVerification {
            parsed_address: ParsedAddress {
                line1: "123 Market St".to_string(),
                city: "San Francisco".to_string(),
                region: "CA".to_string(),
                postal_code: "94105".to_string(),
                country,
            },
            issuer: issuer.clone(),
            status: "submitted".to_string(),
        })
    }

    /// Store every file, then record the audit line listing where they went.
    async fn persist(
        &self,
        uploads: &[(String, &UploadFile)],
        event: AuditEvent,
    ) -> Result<Vec<PathBuf>, StoreError> {
        let mut stored = Vec::with_capacity(uploads.len());
        for (prefix, file) in uploads {
            stored.push(self.store.store(prefix, file).await?);
        }
        let paths: Vec<String> = stored
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        self.store
            .append_audit(&event.with("stored", json!(paths)))
            .await?;
        Ok(stored)
    }

    async fn pause(&self, delay: Duration) {
        if self.simulate_latency {
            tokio::time::sleep(delay).await;
        }
    }
}

fn require_applicant(applicant_id: Option<&str>, step: StepId) -> Result<&str, IntakeError> {
    applicant_id.ok_or_else(|| {
        warn!(%step, "submission rejected: missing applicant id");
        IntakeError::new(ErrorCode::InvalidBody, MISSING_APPLICANT)
    })
}

fn store_failed(step: StepId, applicant_id: &str, message: &str, err: StoreError) -> IntakeError {
    error!(%step, %applicant_id, error = %err, "failed to persist submission");
    IntakeError::new(ErrorCode::StoreFailed, message)
}
