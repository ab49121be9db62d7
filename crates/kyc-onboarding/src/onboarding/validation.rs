use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{Local, Months, NaiveDate};
use regex::Regex;
use serde::Serialize;

use super::domain::IdentityForm;

const MAX_NAME_CHARS: usize = 80;
const MAX_STREET_CHARS: usize = 120;
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;
const POSTAL_CODE_CHARS: std::ops::RangeInclusive<usize> = 3..=20;
const MAX_AGE_YEARS: u32 = 130;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));
static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("iso date regex is valid")
});

/// Fields of [`IdentityForm`] that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityField {
    FirstName,
    MiddleName,
    LastName,
    Email,
    Phone,
    Dob,
    Gender,
    AddressStreet,
    AddressCity,
    AddressRegion,
    AddressPostalCode,
    AddressCountry,
}

impl IdentityField {
    pub const fn key(self) -> &'static str {
        match self {
            IdentityField::FirstName => "firstName",
            IdentityField::MiddleName => "middleName",
            IdentityField::LastName => "lastName",
            IdentityField::Email => "email",
            IdentityField::Phone => "phone",
            IdentityField::Dob => "dob",
            IdentityField::Gender => "gender",
            IdentityField::AddressStreet => "addressStreet",
            IdentityField::AddressCity => "addressCity",
            IdentityField::AddressRegion => "addressRegion",
            IdentityField::AddressPostalCode => "addressPostalCode",
            IdentityField::AddressCountry => "addressCountry",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Field → message mapping. Empty iff the form is valid.
pub type IdentityFieldErrors = BTreeMap<IdentityField, String>;

/// Validate against today's local date.
pub fn validate_identity(identity: &IdentityForm) -> IdentityFieldErrors {
    validate_identity_on(identity, Local::now().date_naive())
}

/// Validate with an explicit "today" so date-of-birth bounds are reproducible.
pub fn validate_identity_on(identity: &IdentityForm, today: NaiveDate) -> IdentityFieldErrors {
    let mut errors = IdentityFieldErrors::new();
    let mut flag = |field: IdentityField, message: Option<&str>| {
        if let Some(message) = message {
            errors.insert(field, message.to_string());
        }
    };

    flag(
        IdentityField::FirstName,
        required_max(
            &identity.first_name,
            MAX_NAME_CHARS,
            "First name is required.",
            "First name is too long.",
        ),
    );
    if has_value(&identity.middle_name) && char_len(&identity.middle_name) > MAX_NAME_CHARS {
        flag(IdentityField::MiddleName, Some("Middle name is too long."));
    }
    flag(
        IdentityField::LastName,
        required_max(
            &identity.last_name,
            MAX_NAME_CHARS,
            "Last name is required.",
            "Last name is too long.",
        ),
    );
    flag(IdentityField::Email, check_email(&identity.email));
    flag(IdentityField::Phone, check_phone(&identity.phone));
    flag(IdentityField::Dob, check_dob(&identity.dob, today));
    if !has_value(&identity.gender) {
        flag(IdentityField::Gender, Some("Gender is required."));
    }
    flag(
        IdentityField::AddressStreet,
        required_max(
            &identity.address_street,
            MAX_STREET_CHARS,
            "Street address is required.",
            "Street address is too long.",
        ),
    );
    if !has_value(&identity.address_city) {
        flag(IdentityField::AddressCity, Some("City is required."));
    }
    if !has_value(&identity.address_region) {
        flag(IdentityField::AddressRegion, Some("State/Province is required."));
    }
    flag(
        IdentityField::AddressPostalCode,
        check_postal_code(&identity.address_postal_code),
    );
    if !has_value(&identity.address_country) {
        flag(IdentityField::AddressCountry, Some("Country is required."));
    }

    errors
}

fn has_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

fn required_max(
    value: &str,
    max: usize,
    required: &'static str,
    too_long: &'static str,
) -> Option<&'static str> {
    if !has_value(value) {
        Some(required)
    } else if char_len(value) > max {
        Some(too_long)
    } else {
        None
    }
}

fn check_email(value: &str) -> Option<&'static str> {
    if !has_value(value) {
        Some("Email is required.")
    } else if !EMAIL_RE.is_match(value.trim()) {
        Some("Enter a valid email address.")
    } else {
        None
    }
}

fn check_phone(value: &str) -> Option<&'static str> {
    if !has_value(value) {
        return Some("Phone is required.");
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if PHONE_DIGITS.contains(&digits) {
        None
    } else {
        Some("Enter a valid phone number.")
    }
}

fn check_dob(value: &str, today: NaiveDate) -> Option<&'static str> {
    const INVALID: &str = "Enter a valid date of birth.";

    if !has_value(value) {
        return Some("Date of birth is required.");
    }
    let Some(date) = parse_iso_date(value.trim()) else {
        return Some(INVALID);
    };
    if date > today {
        return Some("Date of birth cannot be in the future.");
    }
    // The day exactly MAX_AGE_YEARS back is already out of range.
    let oldest = today
        .checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
        .unwrap_or(NaiveDate::MIN);
    if date <= oldest {
        return Some(INVALID);
    }
    None
}

/// Strict `YYYY-MM-DD`; rejects impossible day/month combinations.
pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let captures = ISO_DATE_RE.captures(value)?;
    let year = captures.get(1)?.as_str().parse::<i32>().ok()?;
    let month = captures.get(2)?.as_str().parse::<u32>().ok()?;
    let day = captures.get(3)?.as_str().parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn check_postal_code(value: &str) -> Option<&'static str> {
    if !has_value(value) {
        Some("Postal code is required.")
    } else if POSTAL_CODE_CHARS.contains(&char_len(value)) {
        None
    } else {
        Some("Enter a valid postal code.")
    }
}
