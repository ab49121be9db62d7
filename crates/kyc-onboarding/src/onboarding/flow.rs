use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::camera::{CameraError, CameraSession};
use super::documents::is_primary_identity_doc_type;
use super::domain::{
    present, AddressMeta, AddressVerification, ApplicantSession, IdDocumentDraft, IdentityForm,
    SelfieDraft, SelfieVerdict, StepId, UploadFile,
};
use super::gateway::KycGateway;
use super::validation::{validate_identity_on, IdentityFieldErrors};

const REGISTER_FIRST: &str = "Register the applicant first.";
const IDENTITY_INCOMPLETE: &str = "Please complete the required identity fields.";
const SELFIE_MISSING: &str = "Provide a selfie or upload both sides of your ID/passport.";
const ID_DOCS_INCOMPLETE: &str =
    "Upload front and back images for both documents and select document types.";
const ID_DOCS_NO_PRIMARY: &str =
    "At least one uploaded document must be a passport, driver’s license, or identification card.";
const ADDRESS_INCOMPLETE: &str = "Upload a document and complete the form.";

const REGISTER_FAILED: &str = "Unable to register applicant.";
const SELFIE_FAILED: &str = "Selfie upload failed.";
const ID_DOCS_FAILED: &str = "ID upload failed.";
const ADDRESS_FAILED: &str = "Proof-of-address upload failed.";

/// Which of the two id-document drafts to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSlot {
    First,
    Second,
}

impl DocumentSlot {
    const fn index(self) -> usize {
        match self {
            DocumentSlot::First => 0,
            DocumentSlot::Second => 1,
        }
    }
}

/// Result of a forward transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The submission succeeded and the wizard moved on.
    Advanced { from: StepId, to: StepId },
    /// The address step opened its review dialog; call `confirm_address`.
    AwaitingConfirmation,
    /// A local gate failed before any request was sent.
    Blocked { step: StepId, message: String },
    /// The gateway call failed; the wizard stays put so the user can retry.
    Failed { step: StepId, message: String },
    /// Nothing to do from the current state.
    Ignored,
}

/// What a UI sees while a submission is in flight: the loading message of the
/// step being submitted, or `None` when idle.
pub type PendingIndicator = watch::Receiver<Option<&'static str>>;

/// Publishes the step's loading message for as long as it lives, and clears it
/// even if the transition future is dropped mid-flight.
struct PendingGuard<'a>(&'a watch::Sender<Option<&'static str>>);

impl<'a> PendingGuard<'a> {
    fn begin(indicator: &'a watch::Sender<Option<&'static str>>, step: StepId) -> Self {
        indicator.send_replace(step.loading_message());
        Self(indicator)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(None);
    }
}

/// The onboarding wizard controller.
///
/// Owns the applicant session and every per-step draft. All mutation goes
/// through the transition and setter methods below; forward transitions take
/// `&mut self`, so two submissions can never be in flight at once. Code that
/// renders the loading state holds a [`PendingIndicator`] instead.
pub struct KycFlow<G> {
    gateway: G,
    session: ApplicantSession,
    identity: IdentityForm,
    selfie: SelfieDraft,
    id_documents: [IdDocumentDraft; 2],
    address_document: Option<UploadFile>,
    address_meta: AddressMeta,
    selfie_verdict: Option<SelfieVerdict>,
    verification: Option<AddressVerification>,
    errors: BTreeMap<StepId, String>,
    confirm_open: bool,
    pending: watch::Sender<Option<&'static str>>,
    today: Option<NaiveDate>,
}

impl<G: KycGateway> KycFlow<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            session: ApplicantSession::default(),
            identity: IdentityForm::default(),
            selfie: SelfieDraft::default(),
            id_documents: Default::default(),
            address_document: None,
            address_meta: AddressMeta::default(),
            selfie_verdict: None,
            verification: None,
            errors: BTreeMap::new(),
            confirm_open: false,
            pending: watch::Sender::new(None),
            today: None,
        }
    }

    /// Pin the date used for date-of-birth bounds instead of the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn session(&self) -> &ApplicantSession {
        &self.session
    }

    pub fn current_step(&self) -> StepId {
        self.session.current_step
    }

    pub fn applicant_id(&self) -> Option<&str> {
        self.session.applicant_id.as_deref()
    }

    pub fn error(&self, step: StepId) -> Option<&str> {
        self.errors.get(&step).map(String::as_str)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    pub fn loading_message(&self) -> Option<&'static str> {
        *self.pending.borrow()
    }

    /// Subscribe to the loading state. The receiver stays readable while
    /// `advance` or `confirm_address` holds the flow.
    pub fn pending_indicator(&self) -> PendingIndicator {
        self.pending.subscribe()
    }

    pub fn confirmation_open(&self) -> bool {
        self.confirm_open
    }

    pub fn selfie_verdict(&self) -> Option<&SelfieVerdict> {
        self.selfie_verdict.as_ref()
    }

    pub fn verification(&self) -> Option<&AddressVerification> {
        self.verification.as_ref()
    }

    /// `(n, total)` for the "Step n of total" indicator; `None` once complete.
    pub fn step_number(&self) -> Option<(usize, usize)> {
        match self.session.current_step {
            StepId::Success => None,
            step => Some((step.index() + 1, StepId::ALL.len() - 1)),
        }
    }

    // ---- drafts -----------------------------------------------------------

    pub fn identity(&self) -> &IdentityForm {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut IdentityForm {
        &mut self.identity
    }

    pub fn set_identity(&mut self, identity: IdentityForm) {
        self.identity = identity;
    }

    pub fn identity_field_errors(&self) -> IdentityFieldErrors {
        validate_identity_on(&self.identity, self.today())
    }

    pub fn selfie(&self) -> &SelfieDraft {
        &self.selfie
    }

    pub fn set_selfie(&mut self, selfie: Option<UploadFile>) {
        self.selfie.selfie = selfie;
    }

    /// Alternate biometric evidence when no camera is available.
    pub fn set_id_pair(&mut self, front: Option<UploadFile>, back: Option<UploadFile>) {
        self.selfie.id_front = front;
        self.selfie.id_back = back;
    }

    pub fn set_passport(&mut self, passport: Option<UploadFile>) {
        self.selfie.passport = passport;
    }

    /// Store a camera frame as the selfie, provided a face is currently detected.
    pub fn capture_selfie(
        &mut self,
        camera: &CameraSession,
        frame: UploadFile,
    ) -> Result<(), CameraError> {
        let error = if !camera.face_present() {
            CameraError::NoFaceDetected
        } else if frame.is_empty() {
            CameraError::EmptyCapture
        } else {
            self.selfie.selfie = Some(frame);
            self.errors.remove(&StepId::Selfie);
            return Ok(());
        };
        self.errors.insert(StepId::Selfie, error.to_string());
        Err(error)
    }

    pub fn id_documents(&self) -> &[IdDocumentDraft; 2] {
        &self.id_documents
    }

    pub fn id_document_mut(&mut self, slot: DocumentSlot) -> &mut IdDocumentDraft {
        &mut self.id_documents[slot.index()]
    }

    pub fn set_id_document(&mut self, slot: DocumentSlot, draft: IdDocumentDraft) {
        self.id_documents[slot.index()] = draft;
    }

    pub fn address_document(&self) -> Option<&UploadFile> {
        self.address_document.as_ref()
    }

    pub fn set_address_document(&mut self, document: Option<UploadFile>) {
        self.address_document = document;
    }

    pub fn address_meta(&self) -> &AddressMeta {
        &self.address_meta
    }

    pub fn address_meta_mut(&mut self) -> &mut AddressMeta {
        &mut self.address_meta
    }

    pub fn set_address_meta(&mut self, meta: AddressMeta) {
        self.address_meta = meta;
    }

    // ---- gates ------------------------------------------------------------

    /// Gating predicate of the current step; drives the "Next" button.
    pub fn can_advance(&self) -> bool {
        if self.is_pending() {
            return false;
        }
        match self.session.current_step {
            StepId::Identity => self.identity_field_errors().is_empty(),
            StepId::Selfie => self.selfie.has_evidence(),
            StepId::IdDocs => self.id_documents_problem().is_none(),
            StepId::Address => self.address_ready(),
            StepId::Success => false,
        }
    }

    fn id_documents_problem(&self) -> Option<&'static str> {
        let completed: Vec<&IdDocumentDraft> = self
            .id_documents
            .iter()
            .filter(|draft| draft.is_complete())
            .collect();
        if completed.len() < self.id_documents.len() {
            return Some(ID_DOCS_INCOMPLETE);
        }
        if !completed
            .iter()
            .any(|draft| is_primary_identity_doc_type(&draft.doc_type))
        {
            return Some(ID_DOCS_NO_PRIMARY);
        }
        None
    }

    fn address_ready(&self) -> bool {
        present(&self.address_document).is_some()
            && !self.address_meta.doc_type.trim().is_empty()
            && !self.address_meta.issuer.trim().is_empty()
            && !self.address_meta.issue_date.trim().is_empty()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    // ---- transitions ------------------------------------------------------

    /// Attempt the forward transition of the current step.
    pub async fn advance(&mut self) -> AdvanceOutcome {
        match self.session.current_step {
            StepId::Identity => self.submit_identity().await,
            StepId::Selfie => self.submit_selfie().await,
            StepId::IdDocs => self.submit_id_documents().await,
            StepId::Address => self.request_confirmation(),
            StepId::Success => AdvanceOutcome::Ignored,
        }
    }

    /// Close the review dialog without submitting.
    pub fn cancel_confirmation(&mut self) {
        self.confirm_open = false;
    }

    /// Submit proof of address after the review dialog was accepted.
    pub async fn confirm_address(&mut self) -> AdvanceOutcome {
        if self.session.current_step != StepId::Address || !self.confirm_open {
            return AdvanceOutcome::Ignored;
        }
        self.confirm_open = false;

        let Some(applicant_id) = self.session.applicant_id.clone() else {
            return self.block(StepId::Address, REGISTER_FIRST);
        };
        let document = match present(&self.address_document) {
            Some(document) if self.address_ready() => document,
            _ => return self.block(StepId::Address, ADDRESS_INCOMPLETE),
        };

        self.errors.remove(&StepId::Address);
        let result = {
            let _pending = PendingGuard::begin(&self.pending, StepId::Address);
            self.gateway
                .upload_proof_of_address(&applicant_id, document, &self.address_meta)
                .await
        };

        match result {
            Ok(verification) => {
                self.verification = Some(verification);
                self.move_forward(StepId::Address)
            }
            Err(err) => self.fail(StepId::Address, err.user_message(ADDRESS_FAILED)),
        }
    }

    /// Move one step back. Drafts are left untouched.
    pub fn back(&mut self) -> bool {
        if self.is_pending() {
            return false;
        }
        match self.session.current_step.previous() {
            Some(previous) => {
                self.confirm_open = false;
                self.session.current_step = previous;
                true
            }
            None => false,
        }
    }

    /// Discard every draft and the session and return to the first step.
    pub fn restart(&mut self) {
        self.session = ApplicantSession::default();
        self.identity = IdentityForm::default();
        self.selfie = SelfieDraft::default();
        self.id_documents = Default::default();
        self.address_document = None;
        self.address_meta = AddressMeta::default();
        self.selfie_verdict = None;
        self.verification = None;
        self.errors.clear();
        self.confirm_open = false;
        info!("onboarding restarted");
    }

    async fn submit_identity(&mut self) -> AdvanceOutcome {
        if !self.identity_field_errors().is_empty() {
            return self.block(StepId::Identity, IDENTITY_INCOMPLETE);
        }

        self.errors.remove(&StepId::Identity);
        let result = {
            let _pending = PendingGuard::begin(&self.pending, StepId::Identity);
            self.gateway.register(&self.identity).await
        };

        match result {
            Ok(registration) => {
                let applicant_id = self
                    .session
                    .applicant_id
                    .get_or_insert(registration.applicant_id);
                info!(applicant_id = %applicant_id, "applicant registered");
                self.move_forward(StepId::Identity)
            }
            Err(err) => self.fail(StepId::Identity, err.user_message(REGISTER_FAILED)),
        }
    }

    async fn submit_selfie(&mut self) -> AdvanceOutcome {
        let Some(applicant_id) = self.session.applicant_id.clone() else {
            return self.block(StepId::Selfie, REGISTER_FIRST);
        };
        if !self.selfie.has_evidence() {
            return self.block(StepId::Selfie, SELFIE_MISSING);
        }

        self.errors.remove(&StepId::Selfie);
        let result = {
            let _pending = PendingGuard::begin(&self.pending, StepId::Selfie);
            self.gateway.upload_selfie(&applicant_id, &self.selfie).await
        };

        match result {
            Ok(verdict) => {
                debug!(liveness = verdict.liveness_score, "selfie verdict received");
                self.selfie_verdict = Some(verdict);
                self.move_forward(StepId::Selfie)
            }
            Err(err) => self.fail(StepId::Selfie, err.user_message(SELFIE_FAILED)),
        }
    }

    async fn submit_id_documents(&mut self) -> AdvanceOutcome {
        let Some(applicant_id) = self.session.applicant_id.clone() else {
            return self.block(StepId::IdDocs, REGISTER_FIRST);
        };
        if let Some(problem) = self.id_documents_problem() {
            return self.block(StepId::IdDocs, problem);
        }

        self.errors.remove(&StepId::IdDocs);
        let result = {
            let _pending = PendingGuard::begin(&self.pending, StepId::IdDocs);
            self.gateway
                .upload_id_documents(&applicant_id, &self.id_documents)
                .await
        };

        match result {
            Ok(_) => self.move_forward(StepId::IdDocs),
            Err(err) => self.fail(StepId::IdDocs, err.user_message(ID_DOCS_FAILED)),
        }
    }

    fn request_confirmation(&mut self) -> AdvanceOutcome {
        if self.session.applicant_id.is_none() {
            return self.block(StepId::Address, REGISTER_FIRST);
        }
        if !self.address_ready() {
            return self.block(StepId::Address, ADDRESS_INCOMPLETE);
        }
        self.errors.remove(&StepId::Address);
        self.confirm_open = true;
        AdvanceOutcome::AwaitingConfirmation
    }

    fn move_forward(&mut self, from: StepId) -> AdvanceOutcome {
        match from.next() {
            Some(to) => {
                self.session.current_step = to;
                AdvanceOutcome::Advanced { from, to }
            }
            None => AdvanceOutcome::Ignored,
        }
    }

    fn block(&mut self, step: StepId, message: &str) -> AdvanceOutcome {
        self.errors.insert(step, message.to_string());
        AdvanceOutcome::Blocked {
            step,
            message: message.to_string(),
        }
    }

    fn fail(&mut self, step: StepId, message: String) -> AdvanceOutcome {
        warn!(%step, %message, "onboarding submission failed");
        self.errors.insert(step, message.clone());
        AdvanceOutcome::Failed { step, message }
    }
}
