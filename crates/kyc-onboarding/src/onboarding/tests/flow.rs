use std::time::Duration;

use super::common::*;
use crate::onboarding::camera::{CameraError, CameraSession};
use crate::onboarding::domain::{IdDocumentDraft, StepId, UploadFile};
use crate::onboarding::flow::{AdvanceOutcome, DocumentSlot, KycFlow};

async fn walk_to(flow: &mut KycFlow<StubGateway>, target: StepId) {
    while flow.current_step() != target {
        let outcome = flow.advance().await;
        assert!(
            matches!(outcome, AdvanceOutcome::Advanced { .. }),
            "expected to advance from {}, got {outcome:?}",
            flow.current_step()
        );
    }
}

#[tokio::test]
async fn completes_every_step_in_order() {
    let mut flow = ready_flow(StubGateway::default());
    assert_eq!(flow.step_number(), Some((1, 4)));

    walk_to(&mut flow, StepId::Address).await;
    assert_eq!(flow.applicant_id(), Some("app_stub1"));
    assert_eq!(flow.selfie_verdict().map(|verdict| verdict.matched), Some(true));

    assert_eq!(flow.advance().await, AdvanceOutcome::AwaitingConfirmation);
    assert!(flow.confirmation_open());
    assert_eq!(flow.current_step(), StepId::Address);

    assert_eq!(
        flow.confirm_address().await,
        AdvanceOutcome::Advanced {
            from: StepId::Address,
            to: StepId::Success,
        }
    );
    let verification = flow.verification().expect("verification stored");
    assert_eq!(verification.parsed_address.line1, "123 Market St");
    assert_eq!(verification.status, "submitted");
    assert_eq!(flow.step_number(), None);
    assert_eq!(
        flow.gateway().calls(),
        vec![StepId::Identity, StepId::Selfie, StepId::IdDocs, StepId::Address]
    );
}

#[tokio::test]
async fn invalid_identity_blocks_without_calling_the_gateway() {
    let mut flow = ready_flow(StubGateway::default());
    flow.identity_mut().email = "not-an-email".to_string();

    assert!(!flow.can_advance());
    let outcome = flow.advance().await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Blocked {
            step: StepId::Identity,
            message: "Please complete the required identity fields.".to_string(),
        }
    );
    assert_eq!(flow.current_step(), StepId::Identity);
    assert!(flow.gateway().calls().is_empty());
    assert!(flow.applicant_id().is_none());
}

#[tokio::test]
async fn selfie_step_accepts_alternate_evidence() {
    let mut flow = ready_flow(StubGateway::default());
    flow.set_selfie(None);
    walk_to(&mut flow, StepId::Selfie).await;

    let outcome = flow.advance().await;
    assert!(matches!(outcome, AdvanceOutcome::Blocked { step: StepId::Selfie, .. }));
    assert_eq!(
        flow.error(StepId::Selfie),
        Some("Provide a selfie or upload both sides of your ID/passport.")
    );

    flow.set_id_pair(Some(image("front.jpg")), None);
    assert!(!flow.can_advance(), "one side of the ID pair is not enough");

    flow.set_passport(Some(image("passport.jpg")));
    assert!(flow.can_advance());
    walk_to(&mut flow, StepId::IdDocs).await;
    assert!(flow.error(StepId::Selfie).is_none());
    let verdict = flow.selfie_verdict().expect("verdict stored");
    assert!((verdict.liveness_score - 0.8).abs() < f32::EPSILON);
}

#[tokio::test]
async fn id_documents_need_two_complete_drafts_and_a_primary() {
    let mut flow = ready_flow(StubGateway::default());
    flow.id_document_mut(DocumentSlot::Second).back_file = None;
    walk_to(&mut flow, StepId::IdDocs).await;

    flow.advance().await;
    assert_eq!(
        flow.error(StepId::IdDocs),
        Some("Upload front and back images for both documents and select document types.")
    );

    flow.set_id_document(DocumentSlot::First, document("Hospital Card"));
    flow.set_id_document(DocumentSlot::Second, document("Birth Certificate"));
    let outcome = flow.advance().await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Blocked {
            step: StepId::IdDocs,
            message: "At least one uploaded document must be a passport, driver’s license, or identification card."
                .to_string(),
        }
    );
    assert!(!flow.gateway().calls().contains(&StepId::IdDocs));

    flow.set_id_document(DocumentSlot::Second, document("Driver's License"));
    walk_to(&mut flow, StepId::Address).await;
}

#[tokio::test]
async fn empty_uploads_count_as_missing() {
    let mut flow = ready_flow(StubGateway::default());
    flow.set_id_document(
        DocumentSlot::First,
        IdDocumentDraft::new(
            "Passport",
            image("front.jpg"),
            UploadFile::new("back.jpg", Some("image/jpeg"), Vec::new()),
        ),
    );
    walk_to(&mut flow, StepId::IdDocs).await;
    assert!(!flow.can_advance());
}

#[tokio::test]
async fn address_requires_a_confirmed_complete_form() {
    let mut flow = ready_flow(StubGateway::default());
    flow.address_meta_mut().issuer = "  ".to_string();
    walk_to(&mut flow, StepId::Address).await;

    assert_eq!(flow.confirm_address().await, AdvanceOutcome::Ignored);
    let outcome = flow.advance().await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Blocked {
            step: StepId::Address,
            message: "Upload a document and complete the form.".to_string(),
        }
    );
    assert!(!flow.confirmation_open());

    flow.address_meta_mut().issuer = "PG&E".to_string();
    flow.address_meta_mut().country = String::new();
    assert!(flow.can_advance(), "country is optional");
    assert_eq!(flow.advance().await, AdvanceOutcome::AwaitingConfirmation);
    flow.cancel_confirmation();
    assert_eq!(flow.confirm_address().await, AdvanceOutcome::Ignored);
    assert_eq!(flow.current_step(), StepId::Address);
    assert!(!flow.gateway().calls().contains(&StepId::Address));
}

#[tokio::test]
async fn backend_message_is_shown_and_retry_succeeds() {
    let gateway = StubGateway::failing(
        StepId::Selfie,
        Fault::Reject("Provide a selfie or upload both sides of the ID/passport.".to_string()),
    );
    let mut flow = ready_flow(gateway);
    walk_to(&mut flow, StepId::Selfie).await;

    let outcome = flow.advance().await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Failed {
            step: StepId::Selfie,
            message: "Provide a selfie or upload both sides of the ID/passport.".to_string(),
        }
    );
    assert_eq!(flow.current_step(), StepId::Selfie);
    assert!(!flow.is_pending());

    walk_to(&mut flow, StepId::IdDocs).await;
    assert!(flow.error(StepId::Selfie).is_none());
}

#[tokio::test]
async fn rejected_id_documents_stay_on_the_step_until_retried() {
    let gateway = StubGateway::failing(
        StepId::IdDocs,
        Fault::Reject("Document type is required for document 2.".to_string()),
    );
    let mut flow = ready_flow(gateway);
    walk_to(&mut flow, StepId::IdDocs).await;

    let outcome = flow.advance().await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Failed {
            step: StepId::IdDocs,
            message: "Document type is required for document 2.".to_string(),
        }
    );
    assert_eq!(flow.current_step(), StepId::IdDocs);
    assert_eq!(
        flow.error(StepId::IdDocs),
        Some("Document type is required for document 2.")
    );

    walk_to(&mut flow, StepId::Address).await;
    assert!(flow.error(StepId::IdDocs).is_none());
    assert_eq!(
        flow.gateway().calls(),
        vec![StepId::Identity, StepId::Selfie, StepId::IdDocs, StepId::IdDocs]
    );
}

#[tokio::test]
async fn transport_failures_use_the_step_fallback() {
    let gateway = StubGateway::failing(StepId::Identity, Fault::Transport);
    let mut flow = ready_flow(gateway);

    flow.advance().await;
    assert_eq!(flow.error(StepId::Identity), Some("Unable to register applicant."));
    assert!(flow.applicant_id().is_none());

    flow.gateway().fail_next(StepId::Address, Fault::Transport);
    walk_to(&mut flow, StepId::Address).await;
    flow.advance().await;
    let outcome = flow.confirm_address().await;
    assert_eq!(
        outcome,
        AdvanceOutcome::Failed {
            step: StepId::Address,
            message: "Proof-of-address upload failed.".to_string(),
        }
    );
    assert!(!flow.confirmation_open());
    assert!(flow.verification().is_none());
}

#[tokio::test]
async fn back_keeps_drafts_and_the_first_applicant_id() {
    let mut flow = ready_flow(StubGateway::default());
    walk_to(&mut flow, StepId::IdDocs).await;

    assert!(flow.back());
    assert!(flow.back());
    assert_eq!(flow.current_step(), StepId::Identity);
    assert!(!flow.back(), "identity has no previous step");
    assert_eq!(flow.identity().first_name, "Ada");
    assert!(flow.selfie().has_selfie());

    walk_to(&mut flow, StepId::Selfie).await;
    assert_eq!(flow.applicant_id(), Some("app_stub1"));
}

#[tokio::test]
async fn success_is_left_only_through_restart() {
    let mut flow = ready_flow(StubGateway::default());
    walk_to(&mut flow, StepId::Address).await;
    flow.advance().await;
    flow.confirm_address().await;
    assert_eq!(flow.current_step(), StepId::Success);

    assert!(!flow.back());
    assert_eq!(flow.advance().await, AdvanceOutcome::Ignored);
    assert!(!flow.can_advance());

    flow.restart();
    assert_eq!(flow.current_step(), StepId::Identity);
    assert!(flow.applicant_id().is_none());
    assert!(flow.verification().is_none());
    assert!(flow.address_document().is_none());
    assert!(!flow.selfie().has_evidence());
    assert!(flow.identity().first_name.is_empty());
}

#[tokio::test]
async fn indicator_shows_the_loading_message_while_a_submission_is_in_flight() {
    let gateway = StubGateway::failing(StepId::Identity, Fault::Hang);
    let mut flow = ready_flow(gateway);
    let mut indicator = flow.pending_indicator();
    assert_eq!(*indicator.borrow(), None);

    {
        let mut in_flight = Box::pin(flow.advance());
        tokio::select! {
            outcome = &mut in_flight => panic!("hung submission finished: {outcome:?}"),
            changed = indicator.changed() => changed.expect("flow still alive"),
        }
        assert_eq!(*indicator.borrow(), Some("Registering applicant..."));
    }

    assert_eq!(*indicator.borrow_and_update(), None);
    assert!(!flow.is_pending());
    assert!(flow.loading_message().is_none());
    assert_eq!(flow.current_step(), StepId::Identity);

    walk_to(&mut flow, StepId::Selfie).await;
    assert_eq!(*indicator.borrow(), None);
}

#[tokio::test]
async fn dropping_an_in_flight_submission_clears_pending() {
    let gateway = StubGateway::failing(StepId::Identity, Fault::Hang);
    let mut flow = ready_flow(gateway);

    let timed_out = tokio::time::timeout(Duration::from_millis(20), flow.advance()).await;
    assert!(timed_out.is_err());
    assert!(!flow.is_pending());
    assert!(flow.loading_message().is_none());
    assert!(flow.can_advance());
    assert_eq!(flow.current_step(), StepId::Identity);

    walk_to(&mut flow, StepId::Selfie).await;
}

#[tokio::test]
async fn capture_requires_a_detected_face() {
    let mut flow = ready_flow(StubGateway::default());
    flow.set_selfie(None);

    let mut camera = CameraSession::start(FixedFaces(vec![0]));
    assert_eq!(camera.changed().await, Some(0));
    let err = flow
        .capture_selfie(&camera, image("frame.jpg"))
        .expect_err("no face yet");
    assert!(matches!(err, CameraError::NoFaceDetected));
    assert_eq!(
        flow.error(StepId::Selfie),
        Some("No face detected yet. Center your face and try again.")
    );
    camera.stop().await;

    let mut camera = CameraSession::start(FixedFaces(vec![1]));
    assert_eq!(camera.changed().await, Some(1));
    flow.capture_selfie(&camera, image("frame.jpg"))
        .expect("face present");
    assert!(flow.selfie().has_selfie());
    assert!(flow.error(StepId::Selfie).is_none());
    camera.stop().await;
}
