use std::fmt;

use serde::{Deserialize, Serialize};

/// Wizard steps in forward order. `Success` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    Identity,
    Selfie,
    IdDocs,
    Address,
    Success,
}

impl StepId {
    pub const ALL: [StepId; 5] = [
        StepId::Identity,
        StepId::Selfie,
        StepId::IdDocs,
        StepId::Address,
        StepId::Success,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            StepId::Identity => "identity",
            StepId::Selfie => "selfie",
            StepId::IdDocs => "id-docs",
            StepId::Address => "address",
            StepId::Success => "success",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            StepId::Identity => "Identity Basics",
            StepId::Selfie => "Selfie Capture",
            StepId::IdDocs => "ID Upload",
            StepId::Address => "Proof of Address",
            StepId::Success => "Complete",
        }
    }

    /// Text shown by the loading indicator while the step's submission is in flight.
    pub const fn loading_message(self) -> Option<&'static str> {
        match self {
            StepId::Identity => Some("Registering applicant..."),
            StepId::Selfie => Some("Uploading biometric evidence..."),
            StepId::IdDocs => Some("Uploading ID documents..."),
            StepId::Address => Some("Uploading proof of address..."),
            StepId::Success => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            StepId::Identity => 0,
            StepId::Selfie => 1,
            StepId::IdDocs => 2,
            StepId::Address => 3,
            StepId::Success => 4,
        }
    }

    pub const fn next(self) -> Option<StepId> {
        match self {
            StepId::Identity => Some(StepId::Selfie),
            StepId::Selfie => Some(StepId::IdDocs),
            StepId::IdDocs => Some(StepId::Address),
            StepId::Address => Some(StepId::Success),
            StepId::Success => None,
        }
    }

    /// Step reachable with "Back". Neither the first step nor the terminal one has one.
    pub const fn previous(self) -> Option<StepId> {
        match self {
            StepId::Identity | StepId::Success => None,
            StepId::Selfie => Some(StepId::Identity),
            StepId::IdDocs => Some(StepId::Selfie),
            StepId::Address => Some(StepId::IdDocs),
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Applicant identity data captured on the first step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityForm {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// ISO `YYYY-MM-DD`.
    pub dob: String,
    pub gender: String,
    pub address_street: String,
    pub address_city: String,
    pub address_region: String,
    pub address_postal_code: String,
    pub address_country: String,
}

/// An uploaded binary: original name, declared content type, and bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Treats empty uploads the same as missing ones.
pub(crate) fn present(file: &Option<UploadFile>) -> Option<&UploadFile> {
    file.as_ref().filter(|file| !file.is_empty())
}

/// One of the two typed identity documents collected on the id-docs step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdDocumentDraft {
    pub doc_type: String,
    pub front_file: Option<UploadFile>,
    pub back_file: Option<UploadFile>,
}

impl IdDocumentDraft {
    pub fn new(doc_type: impl Into<String>, front: UploadFile, back: UploadFile) -> Self {
        Self {
            doc_type: doc_type.into(),
            front_file: Some(front),
            back_file: Some(back),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.doc_type.trim().is_empty()
            && present(&self.front_file).is_some()
            && present(&self.back_file).is_some()
    }
}

/// Biometric evidence: a live selfie, or the alternate ID pair / passport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfieDraft {
    pub selfie: Option<UploadFile>,
    pub id_front: Option<UploadFile>,
    pub id_back: Option<UploadFile>,
    pub passport: Option<UploadFile>,
}

impl SelfieDraft {
    pub fn has_selfie(&self) -> bool {
        present(&self.selfie).is_some()
    }

    pub fn has_id_pair(&self) -> bool {
        present(&self.id_front).is_some() && present(&self.id_back).is_some()
    }

    pub fn has_passport(&self) -> bool {
        present(&self.passport).is_some()
    }

    pub fn has_evidence(&self) -> bool {
        self.has_selfie() || self.has_id_pair() || self.has_passport()
    }
}

/// Metadata describing the proof-of-address document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressMeta {
    pub issuer: String,
    pub doc_type: String,
    pub country: String,
    pub issue_date: String,
}

/// Applicant identity assigned by the backend plus the wizard position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantSession {
    pub applicant_id: Option<String>,
    pub current_step: StepId,
}

impl Default for ApplicantSession {
    fn default() -> Self {
        Self {
            applicant_id: None,
            current_step: StepId::Identity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub applicant_id: String,
    pub otp_channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfieVerdict {
    pub liveness_score: f32,
    #[serde(rename = "match")]
    pub matched: bool,
    pub next_step: StepId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdDocsReceipt {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAddress {
    pub line1: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressVerification {
    pub parsed_address: ParsedAddress,
    pub issuer: String,
    pub status: String,
}

pub fn format_full_name(identity: &IdentityForm) -> String {
    [
        identity.first_name.as_str(),
        identity.middle_name.as_str(),
        identity.last_name.as_str(),
    ]
    .into_iter()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

pub fn format_physical_address(identity: &IdentityForm) -> String {
    let locality = [
        identity.address_city.trim(),
        identity.address_region.trim(),
        identity.address_postal_code.trim(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ");

    [
        identity.address_street.trim(),
        locality.as_str(),
        identity.address_country.trim(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}
