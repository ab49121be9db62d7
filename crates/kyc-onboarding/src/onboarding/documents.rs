//! Identity document catalogue and the primary-document predicate.

/// Every document label the id-docs step offers.
pub const ID_DOC_TYPES: [&str; 30] = [
    "Passport",
    "Driver’s License",
    "Foreign Driver’s License",
    "Foreign Passport",
    "BC Driver’s License and Services Card",
    "Photo BC Services Card",
    "Permanent Resident (PR) Card",
    "Citizenship Card",
    "Secure Certificated of Indian Status Card",
    "National Institute of The Blind(CNIB) Identification Card",
    "Federal, Provincial or Municipal Identification Card",
    "Military Family Card",
    "Firearms Acquisition Certificate (FAC) or PAL",
    "Provincial or Territorial Health Cards",
    "Government Employment Card",
    "International Student Card",
    "Age of Majority Card",
    "Birth Certificate",
    "Baptismal Certificate",
    "Non-Photo BC Services Card",
    "Hunting License",
    "Fishing License",
    "Boating License",
    "LCBO/Age of Majority Card",
    "Outdoors Card",
    "Hospital Card",
    "Blood Donor Card",
    "Immigration Papers",
    "Student ID",
    "City/Municipal Library Card",
];

/// Photo-bearing, government-grade documents. At least one must be supplied.
pub const PRIMARY_ID_DOC_TYPES: [&str; 19] = [
    "Passport",
    "Driver’s License",
    "Foreign Driver’s License",
    "Foreign Passport",
    "BC Driver’s License and Services Card",
    "Photo BC Services Card",
    "Permanent Resident (PR) Card",
    "Citizenship Card",
    "Secure Certificated of Indian Status Card",
    "National Institute of The Blind(CNIB) Identification Card",
    "Federal, Provincial or Municipal Identification Card",
    "Military Family Card",
    "Firearms Acquisition Certificate (FAC) or PAL",
    "Provincial or Territorial Health Cards",
    "Government Employment Card",
    "International Student Card",
    "Age of Majority Card",
    "LCBO/Age of Majority Card",
    "Student ID",
];

const PRIMARY_KEYWORDS: [&str; 3] = ["passport", "driver", "identification card"];

/// True for allow-listed labels, or any label mentioning a passport, driver's
/// licence, or identification card.
pub fn is_primary_identity_doc_type(doc_type: &str) -> bool {
    let normalized = doc_type.trim();
    if normalized.is_empty() {
        return false;
    }
    if PRIMARY_ID_DOC_TYPES.contains(&normalized) {
        return true;
    }
    let lowered = normalized.to_lowercase();
    PRIMARY_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}
