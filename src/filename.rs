use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Leading label every input document carries
pub const DOCUMENT_PREFIX: &str = "Lecturas ";
/// Extension of the input documents
pub const DOCUMENT_EXTENSION: &str = ".docx";

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid date regex"));

/// Cleanup rules applied in order after the prefix and extension are gone.
/// The date must go first so the suffix rules only ever see the tail text.
static DESCRIPTION_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{4}-\d{2}-\d{2}\s*",
        r"(?i)\s*Ciclo\s*[ABC].*$",
        r"_4o$",
        r"(?i)\s+bis$",
        r"(?i)\s+GRANDE$",
        r"(?i)\s+Pedro$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid description regex"))
    .collect()
});

/// Whether a file name looks like `Lecturas *.docx`
pub fn is_lecturas_document(name: &str) -> bool {
    name.len() >= DOCUMENT_PREFIX.len() + DOCUMENT_EXTENSION.len()
        && name.starts_with(DOCUMENT_PREFIX)
        && name.ends_with(DOCUMENT_EXTENSION)
}

/// First `YYYY-MM-DD` substring of the file name. No calendar check is made here.
pub fn extract_date(filename: &str) -> Option<&str> {
    DATE_PATTERN.find(filename).map(|m| m.as_str())
}

/// Human readable description of the day, e.g.
/// `Lecturas 2023-10-08 Domingo D XVII TO Ciclo A.docx` -> `Domingo D XVII TO`
pub fn extract_description(filename: &str) -> String {
    let mut name = filename
        .replace(DOCUMENT_EXTENSION, "")
        .replace(DOCUMENT_PREFIX, "");

    for rule in DESCRIPTION_RULES.iter() {
        name = rule.replace_all(&name, "").into_owned();
    }

    name.trim().to_string()
}

/// Convert `YYYY-MM-DD` to `DD/MM/YYYY`, or `None` when it is not a real calendar date
pub fn format_display_date(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%d/%m/%Y").to_string())
}
