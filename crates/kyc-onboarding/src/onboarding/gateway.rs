//! Outbound client for the intake endpoints.
//!
//! The gateway owns no wizard state. It turns drafts into requests and
//! collapses the response envelope into `Ok(data)` or a [`GatewayError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::domain::{
    present, AddressMeta, AddressVerification, IdDocsReceipt, IdDocumentDraft, IdentityForm,
    Registration, SelfieDraft, SelfieVerdict, UploadFile,
};
use crate::config::{ConfigError, GatewayConfig};
use crate::envelope::ApiEnvelope;

const PATH_PREFIX: &str = "/kyc";

/// Failure of a gateway call. Only [`GatewayError::Rejected`] carries text
/// meant for the applicant.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request rejected ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("response carried no data (status {status})")]
    MissingData { status: u16 },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Message for the step's error slot: the backend's own words when it sent
    /// any, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            GatewayError::Rejected { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// The four submissions the wizard makes, one per forward transition.
#[async_trait]
pub trait KycGateway: Send + Sync {
    async fn register(&self, identity: &IdentityForm) -> Result<Registration, GatewayError>;

    async fn upload_selfie(
        &self,
        applicant_id: &str,
        evidence: &SelfieDraft,
    ) -> Result<SelfieVerdict, GatewayError>;

    async fn upload_id_documents(
        &self,
        applicant_id: &str,
        documents: &[IdDocumentDraft; 2],
    ) -> Result<IdDocsReceipt, GatewayError>;

    async fn upload_proof_of_address(
        &self,
        applicant_id: &str,
        document: &UploadFile,
        meta: &AddressMeta,
    ) -> Result<AddressVerification, GatewayError>;
}

/// Build the endpoint URL: `{base}/kyc{path}` with the base's trailing
/// slashes removed and a leading slash ensured on the path.
pub fn kyc_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{PATH_PREFIX}{path}")
    } else {
        format!("{base}{PATH_PREFIX}/{path}")
    }
}

/// Reqwest-backed gateway talking to a remote intake service.
#[derive(Debug, Clone)]
pub struct HttpKycGateway {
    client: Client,
    base_url: String,
}

impl HttpKycGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or(ConfigError::MissingBaseUrl)?;
        Self::new(base_url, config.timeout).map_err(|_| ConfigError::InvalidValue {
            variable: "KYC_API_BASE_URL",
            value: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(kyc_url(&self.base_url, path))
    }

    async fn request<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        let envelope = serde_json::from_slice::<ApiEnvelope<T>>(&body).ok();
        decode_envelope(status.as_u16(), status.is_success(), envelope)
    }
}

/// Apply the envelope rules: any non-2xx status, any error body, or a null
/// payload is a failure.
pub(crate) fn decode_envelope<T>(
    status: u16,
    success: bool,
    envelope: Option<ApiEnvelope<T>>,
) -> Result<T, GatewayError> {
    let Some(envelope) = envelope else {
        return Err(if success {
            GatewayError::MissingData { status }
        } else {
            GatewayError::Rejected {
                status,
                code: None,
                message: String::new(),
            }
        });
    };

    match envelope.into_result() {
        Ok(data) if success => Ok(data),
        Ok(_) | Err(None) if !success => Err(GatewayError::Rejected {
            status,
            code: None,
            message: String::new(),
        }),
        Ok(_) | Err(None) => Err(GatewayError::MissingData { status }),
        Err(Some(error)) => Err(GatewayError::Rejected {
            status,
            code: Some(error.code),
            message: error.message,
        }),
    }
}

fn file_part(file: &UploadFile) -> Result<Part, GatewayError> {
    let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    match file.content_type.as_deref() {
        Some(mime) => part
            .mime_str(mime)
            .map_err(|err| GatewayError::Transport(err.to_string())),
        None => Ok(part),
    }
}

fn attach(form: Form, name: &str, file: &Option<UploadFile>) -> Result<Form, GatewayError> {
    match present(file) {
        Some(file) => Ok(form.part(name.to_string(), file_part(file)?)),
        None => Ok(form),
    }
}

#[async_trait]
impl KycGateway for HttpKycGateway {
    async fn register(&self, identity: &IdentityForm) -> Result<Registration, GatewayError> {
        self.request(self.post("/register").json(identity)).await
    }

    async fn upload_selfie(
        &self,
        applicant_id: &str,
        evidence: &SelfieDraft,
    ) -> Result<SelfieVerdict, GatewayError> {
        let mut form = Form::new().text("applicantId", applicant_id.to_string());
        form = attach(form, "selfie", &evidence.selfie)?;
        form = attach(form, "idFront", &evidence.id_front)?;
        form = attach(form, "idBack", &evidence.id_back)?;
        form = attach(form, "passport", &evidence.passport)?;
        self.request(self.post("/selfie").multipart(form)).await
    }

    async fn upload_id_documents(
        &self,
        applicant_id: &str,
        documents: &[IdDocumentDraft; 2],
    ) -> Result<IdDocsReceipt, GatewayError> {
        let mut form = Form::new().text("applicantId", applicant_id.to_string());
        for (index, document) in documents.iter().enumerate() {
            form = form.text(format!("docType_{index}"), document.doc_type.clone());
            form = attach(form, &format!("front_{index}"), &document.front_file)?;
            form = attach(form, &format!("back_{index}"), &document.back_file)?;
        }
        self.request(self.post("/id-docs").multipart(form)).await
    }

    async fn upload_proof_of_address(
        &self,
        applicant_id: &str,
        document: &UploadFile,
        meta: &AddressMeta,
    ) -> Result<AddressVerification, GatewayError> {
        let form = Form::new()
            .text("applicantId", applicant_id.to_string())
            .part("document", file_part(document)?)
            .text("docType", meta.doc_type.clone())
            .text("issuer", meta.issuer.clone())
            .text("country", meta.country.clone())
            .text("issueDate", meta.issue_date.clone());
        self.request(self.post("/address").multipart(form)).await
    }
}
