use async_trait::async_trait;
use chrono::NaiveDate;
use kyc_onboarding::intake::{
    AddressSubmission, IdDocsSubmission, IntakeError, IntakeService, SelfieSubmission, UploadStore,
};
use kyc_onboarding::onboarding::{
    AddressMeta, AddressVerification, GatewayError, IdDocsReceipt, IdDocumentDraft, IdentityForm,
    KycGateway, Registration, SelfieDraft, SelfieVerdict, UploadFile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Gateway that calls the intake service directly instead of over HTTP.
pub(crate) struct InProcessGateway<S> {
    service: Arc<IntakeService<S>>,
}

impl<S> InProcessGateway<S>
where
    S: UploadStore + 'static,
{
    pub(crate) fn new(service: Arc<IntakeService<S>>) -> Self {
        Self { service }
    }
}

fn rejected(err: IntakeError) -> GatewayError {
    GatewayError::Rejected {
        status: err.status(),
        code: Some(err.code.as_str().to_string()),
        message: err.message,
    }
}

#[async_trait]
impl<S> KycGateway for InProcessGateway<S>
where
    S: UploadStore + 'static,
{
    async fn register(&self, identity: &IdentityForm) -> Result<Registration, GatewayError> {
        let body = serde_json::to_value(identity)
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        self.service.register(&body).await.map_err(rejected)
    }

    async fn upload_selfie(
        &self,
        applicant_id: &str,
        evidence: &SelfieDraft,
    ) -> Result<SelfieVerdict, GatewayError> {
        self.service
            .upload_selfie(SelfieSubmission::from_draft(applicant_id, evidence))
            .await
            .map_err(rejected)
    }

    async fn upload_id_documents(
        &self,
        applicant_id: &str,
        documents: &[IdDocumentDraft; 2],
    ) -> Result<IdDocsReceipt, GatewayError> {
        self.service
            .upload_id_documents(IdDocsSubmission::from_drafts(applicant_id, documents))
            .await
            .map_err(rejected)
    }

    async fn upload_proof_of_address(
        &self,
        applicant_id: &str,
        document: &UploadFile,
        meta: &AddressMeta,
    ) -> Result<AddressVerification, GatewayError> {
        self.service
            .upload_proof_of_address(AddressSubmission::from_draft(applicant_id, document, meta))
            .await
            .map_err(rejected)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
