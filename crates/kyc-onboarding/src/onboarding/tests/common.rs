use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::onboarding::camera::{Detection, FrameResult, FrameSource};
use crate::onboarding::domain::{
    AddressMeta, AddressVerification, IdDocsReceipt, IdDocumentDraft, IdentityForm,
    ParsedAddress, Registration, SelfieDraft, SelfieVerdict, StepId, UploadFile,
};
use crate::onboarding::flow::{DocumentSlot, KycFlow};
use crate::onboarding::gateway::{GatewayError, KycGateway};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date")
}

pub(super) fn valid_identity() -> IdentityForm {
    IdentityForm {
        first_name: "Ada".to_string(),
        middle_name: String::new(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+1 (415) 555-0134".to_string(),
        dob: "1990-04-12".to_string(),
        gender: "female".to_string(),
        address_street: "500 Howard St".to_string(),
        address_city: "San Francisco".to_string(),
        address_region: "CA".to_string(),
        address_postal_code: "94105".to_string(),
        address_country: "US".to_string(),
    }
}

pub(super) fn image(name: &str) -> UploadFile {
    UploadFile::new(name, Some("image/jpeg"), vec![0xFF, 0xD8, 0xFF, 0xE0])
}

pub(super) fn document(doc_type: &str) -> IdDocumentDraft {
    IdDocumentDraft::new(doc_type, image("front.jpg"), image("back.jpg"))
}

pub(super) fn address_meta() -> AddressMeta {
    AddressMeta {
        issuer: "PG&E".to_string(),
        doc_type: "Utility Bill".to_string(),
        country: "US".to_string(),
        issue_date: "2025-12-01".to_string(),
    }
}

/// How a stubbed call should misbehave.
#[derive(Debug, Clone)]
pub(super) enum Fault {
    Reject(String),
    Transport,
    Hang,
}

#[derive(Default)]
pub(super) struct StubGateway {
    calls: Mutex<Vec<StepId>>,
    registrations: AtomicUsize,
    faults: Mutex<Vec<(StepId, Fault)>>,
}

impl StubGateway {
    pub(super) fn failing(step: StepId, fault: Fault) -> Self {
        let gateway = Self::default();
        gateway.fail_next(step, fault);
        gateway
    }

    pub(super) fn fail_next(&self, step: StepId, fault: Fault) {
        self.faults.lock().expect("lock").push((step, fault));
    }

    pub(super) fn calls(&self) -> Vec<StepId> {
        self.calls.lock().expect("lock").clone()
    }

    async fn record(&self, step: StepId) -> Result<(), GatewayError> {
        self.calls.lock().expect("lock").push(step);
        let fault = {
            let mut faults = self.faults.lock().expect("lock");
            faults
                .iter()
                .position(|(faulty, _)| *faulty == step)
                .map(|index| faults.remove(index).1)
        };
        match fault {
            None => Ok(()),
            Some(Fault::Reject(message)) => Err(GatewayError::Rejected {
                status: 400,
                code: Some("INVALID_BODY".to_string()),
                message,
            }),
            Some(Fault::Transport) => Err(GatewayError::Transport("connection refused".into())),
            Some(Fault::Hang) => std::future::pending().await,
        }
    }
}

#[async_trait]
impl KycGateway for StubGateway {
    async fn register(&self, _identity: &IdentityForm) -> Result<Registration, GatewayError> {
        self.record(StepId::Identity).await?;
        let sequence = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Registration {
            applicant_id: format!("app_stub{sequence}"),
            otp_channels: vec!["email".to_string(), "sms".to_string()],
        })
    }

    async fn upload_selfie(
        &self,
        _applicant_id: &str,
        evidence: &SelfieDraft,
    ) -> Result<SelfieVerdict, GatewayError> {
        self.record(StepId::Selfie).await?;
        Ok(SelfieVerdict {
            liveness_score: if evidence.has_selfie() { 0.94 } else { 0.8 },
            matched: true,
            next_step: StepId::IdDocs,
        })
    }

    async fn upload_id_documents(
        &self,
        _applicant_id: &str,
        _documents: &[IdDocumentDraft; 2],
    ) -> Result<IdDocsReceipt, GatewayError> {
        self.record(StepId::IdDocs).await?;
        Ok(IdDocsReceipt {
            status: "uploaded".to_string(),
        })
    }

    async fn upload_proof_of_address(
        &self,
        _applicant_id: &str,
        _document: &UploadFile,
        meta: &AddressMeta,
    ) -> Result<AddressVerification, GatewayError> {
        self.record(StepId::Address).await?;
        Ok(AddressVerification {
            parsed_address: ParsedAddress {
                line1: "123 Market St".to_string(),
                city: "San Francisco".to_string(),
                region: "CA".to_string(),
                postal_code: "94105".to_string(),
                country: meta.country.clone(),
            },
            issuer: meta.issuer.clone(),
            status: "submitted".to_string(),
        })
    }
}

/// A flow with every draft filled in, sitting on the identity step.
pub(super) fn ready_flow(gateway: StubGateway) -> KycFlow<StubGateway> {
    let mut flow = KycFlow::new(gateway).with_today(today());
    flow.set_identity(valid_identity());
    flow.set_selfie(Some(image("selfie.jpg")));
    flow.set_id_document(DocumentSlot::First, document("Passport"));
    flow.set_id_document(DocumentSlot::Second, document("Birth Certificate"));
    flow.set_address_document(Some(UploadFile::new(
        "bill.pdf",
        Some("application/pdf"),
        b"%PDF-1.7".to_vec(),
    )));
    flow.set_address_meta(address_meta());
    flow
}

/// Emits the given face counts, then keeps the stream open.
pub(super) struct FixedFaces(pub(super) Vec<usize>);

#[async_trait]
impl FrameSource for FixedFaces {
    async fn next_frame(&mut self) -> Option<FrameResult> {
        if self.0.is_empty() {
            return std::future::pending().await;
        }
        let count = self.0.remove(0);
        Some(FrameResult {
            detections: vec![
                Detection {
                    x_center: 0.5,
                    y_center: 0.5,
                    width: 0.3,
                    height: 0.4,
                };
                count
            ],
        })
    }
}
