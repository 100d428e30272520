//! Name derivation module
//!
//! Pure string transforms used for labels and file names. Nothing in here
//! touches the filesystem, so every rule can be tested in isolation.

use chrono::NaiveDateTime;

/// Characters that are rejected by at least one common filesystem
const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fallback stem when a title sanitizes to nothing
const FALLBACK_OUTPUT_STEM: &str = "dossier";

/// Derive the TOC/bookmark label of a document from its file name
///
/// The naming convention is `DocumentType-Suffix.pdf`:
/// - `"Contract_Work-2024.pdf"` → `"Contract Work"`
/// - `"CNI.pdf"` → `"CNI"`
/// - `"Avis_d_imposition.pdf"` → `"Avis d imposition"`
///
/// Underscores become spaces in both cases. A name that starts with `-`
/// falls back to the whole stem.
pub fn display_name_from_filename(file_name: &str) -> String {
    let stem = file_stem(file_name);

    let label = match stem.split_once('-') {
        Some((before, _)) if !before.trim().is_empty() => before,
        _ => stem,
    };

    label.replace('_', " ").trim().to_string()
}

/// Strip the last extension from a file name (`"a.b.pdf"` → `"a.b"`)
fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(pos) => &file_name[..pos],
    }
}

/// Build the output file name for a dossier title
///
/// Whitespace runs become a single underscore and filesystem-unsafe
/// characters are dropped:
/// - `"Dossier de Location"` → `"Dossier_de_Location.pdf"`
/// - `"Bail: 2024/2025"` → `"Bail_20242025.pdf"`
pub fn output_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !UNSAFE_FILENAME_CHARS.contains(c) && !c.is_control() || c.is_whitespace())
        .collect();

    let stem = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        format!("{}.pdf", FALLBACK_OUTPUT_STEM)
    } else {
        format!("{}.pdf", stem)
    }
}

/// Separator page heading for a person
pub fn separator_heading(alias: &str) -> String {
    format!("{} - Documents", alias)
}

/// Format the generation timestamp shown on the title page
/// Example: "18/10/2026 14:05"
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_display_name_with_dash() {
        assert_eq!(display_name_from_filename("Contract_Work-2024.pdf"), "Contract Work");
        assert_eq!(display_name_from_filename("Bulletin_de_salaire-Mars-2024.pdf"), "Bulletin de salaire");
    }

    #[test]
    fn test_display_name_without_dash() {
        assert_eq!(display_name_from_filename("CNI.pdf"), "CNI");
        assert_eq!(display_name_from_filename("Avis_d_imposition.PDF"), "Avis d imposition");
    }

    #[test]
    fn test_display_name_edge_cases() {
        // Leading dash: nothing before it, use the whole stem
        assert_eq!(display_name_from_filename("-scan.pdf"), "-scan");
        // Only the last extension is stripped
        assert_eq!(display_name_from_filename("v1.2-notes.pdf"), "v1.2");
        // Hidden-style name keeps its text
        assert_eq!(display_name_from_filename(".pdf"), ".pdf");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("Dossier de Location"), "Dossier_de_Location.pdf");
        assert_eq!(output_file_name("Bail: 2024/2025"), "Bail_20242025.pdf");
        assert_eq!(output_file_name("  spaced   out  "), "spaced_out.pdf");
        assert_eq!(output_file_name("Tab\tand\nnewline"), "Tab_and_newline.pdf");
    }

    #[test]
    fn test_output_file_name_fallback() {
        assert_eq!(output_file_name(""), "dossier.pdf");
        assert_eq!(output_file_name("???"), "dossier.pdf");
        assert_eq!(output_file_name(".."), "dossier.pdf");
    }

    #[test]
    fn test_separator_heading() {
        assert_eq!(separator_heading("Marie Dupont"), "Marie Dupont - Documents");
    }

    #[test]
    fn test_format_timestamp() {
        let at = NaiveDate::from_ymd_opt(2026, 1, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(format_timestamp(&at), "07/01/2026 09:05");
    }
}
