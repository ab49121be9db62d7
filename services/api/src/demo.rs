use crate::infra::InProcessGateway;
use chrono::{Local, NaiveDate};
use clap::Args;
use kyc_onboarding::config::IntakeConfig;
use kyc_onboarding::error::AppError;
use kyc_onboarding::intake::{FsUploadStore, IntakeService, UploadStore};
use kyc_onboarding::onboarding::{
    format_full_name, format_physical_address, AddressMeta, AdvanceOutcome, DocumentSlot,
    IdDocumentDraft, IdentityForm, KycFlow, UploadFile,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Directory that receives the uploads and audit log (defaults to a temp directory)
    #[arg(long)]
    pub(crate) uploads_dir: Option<PathBuf>,
    /// Reference date for date-of-birth checks (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let root = args
        .uploads_dir
        .unwrap_or_else(|| std::env::temp_dir().join("kyc-onboarding-demo"));
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let intake = IntakeConfig::rooted_at(&root);
    let store = Arc::new(FsUploadStore::from_config(&intake));
    let service = Arc::new(IntakeService::new(store.clone(), &intake));
    let mut flow = KycFlow::new(InProcessGateway::new(service)).with_today(today);

    println!("KYC onboarding demo");
    println!("  Output directory: {}", root.display());
    println!("  Reference date: {today}");

    let identity = demo_identity();
    println!("\nApplicant (sensitive fields redacted)");
    println!("  Name: {}", format_full_name(&identity));
    println!("  Address: {}", format_physical_address(&identity));
    flow.set_identity(identity);
    step(&mut flow).await;
    if let Some(applicant_id) = flow.applicant_id() {
        println!("  Applicant id: {applicant_id}");
    }

    flow.set_selfie(Some(sample_image("selfie.jpg")));
    step(&mut flow).await;
    if let Some(verdict) = flow.selfie_verdict() {
        println!(
            "  Liveness score: {:.2} (match: {})",
            verdict.liveness_score, verdict.matched
        );
    }

    flow.set_id_document(DocumentSlot::First, sample_document("Birth Certificate"));
    flow.set_id_document(DocumentSlot::Second, sample_document("Hospital Card"));
    println!("\nAttempting ID upload without a primary document");
    step(&mut flow).await;
    flow.set_id_document(DocumentSlot::Second, sample_document("Driver’s License"));
    step(&mut flow).await;

    flow.set_address_document(Some(UploadFile::new(
        "utility-bill.pdf",
        Some("application/pdf"),
        b"%PDF-1.7\n% demo statement\n".to_vec(),
    )));
    flow.set_address_meta(AddressMeta {
        issuer: "Pacific Gas & Electric".to_string(),
        doc_type: "Utility Bill".to_string(),
        country: "US".to_string(),
        issue_date: "2025-09-30".to_string(),
    });
    step(&mut flow).await;
    if flow.confirmation_open() {
        println!("  Confirmed submission details");
        report(flow.confirm_address().await);
    }

    match flow.verification() {
        Some(verification) => {
            let parsed = &verification.parsed_address;
            println!("\nVerification status: {}", verification.status);
            println!("  Issuer: {}", verification.issuer);
            println!(
                "  Parsed address: {}, {}, {} {}, {}",
                parsed.line1, parsed.city, parsed.region, parsed.postal_code, parsed.country
            );
        }
        None => println!("\nOnboarding did not complete"),
    }

    let stored = count_files(store.uploads_dir()).await.unwrap_or(0);
    println!("  Files stored: {stored}");
    println!("  Audit log: {}", store.audit_log().display());
    Ok(())
}

async fn step<S>(flow: &mut KycFlow<InProcessGateway<S>>)
where
    S: UploadStore + 'static,
{
    let current = flow.current_step();
    match flow.step_number() {
        Some((number, total)) => println!("\nStep {number} of {total}: {}", current.title()),
        None => println!("\n{}", current.title()),
    }
    report(flow.advance().await);
}

fn report(outcome: AdvanceOutcome) {
    match outcome {
        AdvanceOutcome::Advanced { from, to } => println!("  {from} -> {to}"),
        AdvanceOutcome::AwaitingConfirmation => println!("  Awaiting confirmation"),
        AdvanceOutcome::Blocked { step, message } => println!("  Blocked at {step}: {message}"),
        AdvanceOutcome::Failed { step, message } => println!("  Failed at {step}: {message}"),
        AdvanceOutcome::Ignored => println!("  Nothing to do"),
    }
}

async fn count_files(dir: &Path) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

fn demo_identity() -> IdentityForm {
    IdentityForm {
        first_name: "Dorothy".to_string(),
        middle_name: "Johnson".to_string(),
        last_name: "Vaughan".to_string(),
        email: "dorothy.vaughan@example.com".to_string(),
        phone: "+1 415 555 0142".to_string(),
        dob: "1988-09-20".to_string(),
        gender: "female".to_string(),
        address_street: "500 Howard St".to_string(),
        address_city: "San Francisco".to_string(),
        address_region: "CA".to_string(),
        address_postal_code: "94105".to_string(),
        address_country: "US".to_string(),
    }
}

fn sample_image(name: &str) -> UploadFile {
    UploadFile::new(name, Some("image/jpeg"), vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

fn sample_document(doc_type: &str) -> IdDocumentDraft {
    IdDocumentDraft::new(
        doc_type,
        sample_image("document-front.jpg"),
        sample_image("document-back.jpg"),
    )
}
