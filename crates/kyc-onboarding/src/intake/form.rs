//! Typed submissions accepted by the intake handlers, and the multipart
//! reader that produces them.

use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};

use crate::onboarding::domain::{
    present, AddressMeta, IdDocumentDraft, SelfieDraft, UploadFile,
};

/// Number of typed documents the id-docs step collects.
pub const ID_DOCUMENT_SLOTS: usize = 2;

/// Text and file fields of one multipart body, keyed by field name. A repeated
/// field keeps its last value.
#[derive(Debug, Default)]
pub struct MultipartForm {
    texts: HashMap<String, String>,
    files: HashMap<String, UploadFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    form.files.insert(
                        name,
                        UploadFile::new(file_name, content_type.as_deref(), bytes.to_vec()),
                    );
                }
                None => {
                    let value = field.text().await?;
                    form.texts.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.texts.insert(name.into(), value.into());
    }

    pub fn insert_file(&mut self, name: impl Into<String>, file: UploadFile) {
        self.files.insert(name.into(), file);
    }

    /// Trimmed text value; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Non-empty file upload.
    pub fn take_file(&mut self, name: &str) -> Option<UploadFile> {
        self.files.remove(name).filter(|file| !file.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelfieSubmission {
    pub applicant_id: Option<String>,
    pub selfie: Option<UploadFile>,
    pub id_front: Option<UploadFile>,
    pub id_back: Option<UploadFile>,
    pub passport: Option<UploadFile>,
}

impl SelfieSubmission {
    pub fn from_draft(applicant_id: &str, draft: &SelfieDraft) -> Self {
        Self {
            applicant_id: Some(applicant_id.to_string()),
            selfie: present(&draft.selfie).cloned(),
            id_front: present(&draft.id_front).cloned(),
            id_back: present(&draft.id_back).cloned(),
            passport: present(&draft.passport).cloned(),
        }
    }
}

impl From<MultipartForm> for SelfieSubmission {
    fn from(mut form: MultipartForm) -> Self {
        Self {
            applicant_id: form.text("applicantId"),
            selfie: form.take_file("selfie"),
            id_front: form.take_file("idFront"),
            id_back: form.take_file("idBack"),
            passport: form.take_file("passport"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentSubmission {
    pub doc_type: Option<String>,
    pub front: Option<UploadFile>,
    pub back: Option<UploadFile>,
}

#[derive(Debug, Clone, Default)]
pub struct IdDocsSubmission {
    pub applicant_id: Option<String>,
    pub documents: [DocumentSubmission; ID_DOCUMENT_SLOTS],
}

impl IdDocsSubmission {
    pub fn from_drafts(applicant_id: &str, drafts: &[IdDocumentDraft; ID_DOCUMENT_SLOTS]) -> Self {
        Self {
            applicant_id: Some(applicant_id.to_string()),
            documents: drafts.clone().map(|draft| DocumentSubmission {
                doc_type: Some(draft.doc_type.trim().to_string()).filter(|t| !t.is_empty()),
                front: draft.front_file.filter(|file| !file.is_empty()),
                back: draft.back_file.filter(|file| !file.is_empty()),
            }),
        }
    }
}

impl From<MultipartForm> for IdDocsSubmission {
    fn from(mut form: MultipartForm) -> Self {
        let applicant_id = form.text("applicantId");
        let documents = std::array::from_fn(|index| DocumentSubmission {
            doc_type: form.text(&format!("docType_{index}")),
            front: form.take_file(&format!("front_{index}")),
            back: form.take_file(&format!("back_{index}")),
        });
        Self {
            applicant_id,
            documents,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressSubmission {
    pub applicant_id: Option<String>,
    pub document: Option<UploadFile>,
    pub doc_type: Option<String>,
    pub issuer: Option<String>,
    pub country: Option<String>,
    pub issue_date: Option<String>,
}

impl AddressSubmission {
    pub fn from_draft(applicant_id: &str, document: &UploadFile, meta: &AddressMeta) -> Self {
        let value = |raw: &str| Some(raw.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            applicant_id: Some(applicant_id.to_string()),
            document: Some(document.clone()).filter(|file| !file.is_empty()),
            doc_type: value(&meta.doc_type),
            issuer: value(&meta.issuer),
            country: value(&meta.country),
            issue_date: value(&meta.issue_date),
        }
    }
}

impl From<MultipartForm> for AddressSubmission {
    fn from(mut form: MultipartForm) -> Self {
        Self {
            applicant_id: form.text("applicantId"),
            document: form.take_file("document"),
            doc_type: form.text("docType"),
            issuer: form.text("issuer"),
            country: form.text("country"),
            issue_date: form.text("issueDate"),
        }
    }
}
