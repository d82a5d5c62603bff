//! Text normalisation for scraped cell values.
//!
//! Portal pages render the same document slightly differently between
//! visits: stray whitespace, changed capitalisation, or a `-` where a value
//! failed to load. Grouping and scoring compare values through these
//! functions so that such noise does not split one document into several.

use chrono::NaiveDate;

use crate::schema::PLACEHOLDER;

/// Values that count as "nothing was scraped", compared after lower-casing.
const EMPTY_MARKERS: &[&str] = &["", PLACEHOLDER, "none"];

/// Normalise a grouping key value.
///
/// Trims, collapses internal whitespace runs to one space and lower-cases.
/// Returns `None` for nulls and for empty or placeholder values, which
/// marks the key as missing.
///
/// ```
/// use lawharvest_core::normalize_key;
/// assert_eq!(normalize_key(Some("  01/2020/QH14 \t ")), Some("01/2020/qh14".into()));
/// assert_eq!(normalize_key(Some(" None ")), None);
/// ```
pub fn normalize_key(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();
    if EMPTY_MARKERS.contains(&lowered.as_str()) {
        None
    } else {
        Some(lowered)
    }
}

/// Whether a cell holds real scraped content.
pub fn is_filled(raw: Option<&str>) -> bool {
    match raw {
        Some(s) => !EMPTY_MARKERS.contains(&s.trim().to_lowercase().as_str()),
        None => false,
    }
}

/// Convert a portal date (`dd/mm/YYYY` or `dd-mm-YYYY`) to ISO `YYYY-MM-DD`.
///
/// Text that is not a date in either form is returned trimmed but otherwise
/// unchanged, so a partially rendered value is never lost.
pub fn normalize_date(raw: &str) -> String {
    let s = raw.trim();
    ["%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| s.to_string())
}

/// Code used to link a relation row back to its source document.
///
/// Spaces become underscores; an empty code becomes the placeholder.
pub fn relation_code(code: Option<&str>) -> String {
    match code.map(str::trim) {
        Some(c) if !c.is_empty() => c.replace(' ', "_"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Strip a `Label: value` prefix as rendered in the document status box.
pub fn validity_from_label(raw: &str) -> String {
    raw.split_once(": ")
        .map_or(raw, |(_, value)| value)
        .trim()
        .to_string()
}
