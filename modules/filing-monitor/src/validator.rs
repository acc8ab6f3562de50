//! Cross-checks an extracted record against the identity listed on the
//! disclosure search page.

use tracing::{debug, info, warn};

use filing_common::{ExtractedRecord, ValidationOutcome};

pub const NO_TRANSACTIONS: &str = "no transactions";
pub const DATA_MISMATCH: &str = "data mismatch between reference and filing";

/// Titles dropped wherever they appear, as long as they carry a period.
const DOTTED_HONORIFICS: &[&str] = &["hon", "dr", "mr", "mrs"];

/// Roman numeral suffixes. Single letters are left alone; they are far more
/// often middle initials than "the fifth".
const ROMAN_SUFFIXES: &[&str] = &["ii", "iii", "iv", "vi", "vii", "viii", "ix"];

/// Reduce a person's name to a canonical, order-insensitive form.
///
/// Lower-cases, drops dotted honorifics (`Hon.`, `Dr.`, `Mr.`, `Mrs.`),
/// removes periods and commas, drops generational suffixes (`Jr`, `Sr`,
/// roman numerals, ordinals such as `3rd`), then sorts the remaining tokens.
/// The output never contains a period, so applying it twice is a no-op.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut tokens: Vec<String> = lowered
        .split_whitespace()
        .filter(|token| !is_dotted_honorific(token))
        .map(|token| token.replace(['.', ','], ""))
        .filter(|token| !token.is_empty() && !is_generational_suffix(token))
        .collect();
    tokens.sort();
    tokens.join(" ")
}

fn is_dotted_honorific(token: &str) -> bool {
    let bare = token.trim_end_matches([',', '.']);
    token[bare.len()..].contains('.') && DOTTED_HONORIFICS.contains(&bare)
}

fn is_generational_suffix(token: &str) -> bool {
    if token == "jr" || token == "sr" || ROMAN_SUFFIXES.contains(&token) {
        return true;
    }
    is_ordinal(token)
}

fn is_ordinal(token: &str) -> bool {
    ["st", "nd", "rd", "th"].iter().any(|suffix| {
        token
            .strip_suffix(suffix)
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Decide whether `record` belongs to the filer named on the search page.
///
/// A record without transactions is always rejected. When either reference
/// field is missing only that check applies.
pub fn validate(
    record: &ExtractedRecord,
    reference_name: Option<&str>,
    reference_office: Option<&str>,
) -> ValidationOutcome {
    let identity = match (non_blank(reference_name), non_blank(reference_office)) {
        (Some(name), Some(office)) => compare_identity(record, name, office),
        _ => {
            debug!("Reference identity incomplete, checking transactions only");
            ValidationOutcome::Accepted
        }
    };

    if !record.has_transactions() {
        warn!(
            name = %record.filing_information.name,
            "Extracted record has no transactions"
        );
        return ValidationOutcome::Rejected(NO_TRANSACTIONS.to_string());
    }

    identity
}

fn compare_identity(
    record: &ExtractedRecord,
    reference_name: &str,
    reference_office: &str,
) -> ValidationOutcome {
    let expected = normalize_name(reference_name);
    let extracted = normalize_name(&record.filing_information.name);

    let office_matches = record
        .filing_information
        .state_district
        .to_lowercase()
        .contains(&reference_office.to_lowercase());

    if !office_matches {
        warn!(
            reference_office,
            extracted_office = %record.filing_information.state_district,
            "Office on filing does not match search listing"
        );
        return ValidationOutcome::Rejected(DATA_MISMATCH.to_string());
    }

    if expected == extracted {
        return ValidationOutcome::Accepted;
    }

    let similar = !expected.is_empty()
        && !extracted.is_empty()
        && (expected.contains(&extracted) || extracted.contains(&expected));

    if similar {
        info!(
            reference = %expected,
            extracted = %extracted,
            "Names differ but are similar enough"
        );
        return ValidationOutcome::AcceptedWithWarning(format!(
            "names are similar enough: '{expected}' vs '{extracted}'"
        ));
    }

    warn!(
        reference = %expected,
        extracted = %extracted,
        "Name on filing does not match search listing"
    );
    ValidationOutcome::Rejected(DATA_MISMATCH.to_string())
}
