use chrono::{Local, NaiveDate};
use clap::Args;
use kyc_onboarding::error::AppError;
use kyc_onboarding::onboarding::{
    format_full_name, format_physical_address, is_primary_identity_doc_type, validate_identity_on,
    IdentityFieldErrors, IdentityForm, ID_DOC_TYPES,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Identity JSON document (camelCase field names, as sent to /kyc/register)
    #[arg(long)]
    pub(crate) identity: PathBuf,
    /// Reference date for date-of-birth checks (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.identity)?;
    let identity: IdentityForm = serde_json::from_str(&raw)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let errors = validate_identity_on(&identity, today);
    print!("{}", render_validation(&identity, &errors));
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidIdentity(errors.len()))
    }
}

fn render_validation(identity: &IdentityForm, errors: &IdentityFieldErrors) -> String {
    if errors.is_empty() {
        return format!(
            "Identity is valid\n  Name: {}\n  Address: {}\n",
            format_full_name(identity),
            format_physical_address(identity)
        );
    }
    let mut out = format!("Identity has {} problem(s)\n", errors.len());
    for (field, message) in errors {
        out.push_str(&format!("  {field}: {message}\n"));
    }
    out
}

pub(crate) fn run_doc_types() {
    print!("{}", render_doc_types());
}

fn render_doc_types() -> String {
    let mut out = String::from("Identity document types (* = primary)\n");
    for label in ID_DOC_TYPES {
        let marker = if is_primary_identity_doc_type(label) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!("  {marker} {label}\n"));
    }
    out
}
