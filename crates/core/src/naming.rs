//! Case identifier and generated file naming conventions.
//!
//! Generates deterministic identifiers and filenames for every case of a
//! run. The identifier width is fixed by the total case count so that
//! identifiers sort lexicographically in creation order.

use std::path::Path;

/// Prefix shared by every case identifier.
pub const CASE_PREFIX: &str = "Case";

/// Suffix the simulation tool appends to the backup copy of a case file.
pub const BACKUP_SUFFIX: &str = "~";

/// Number of decimal digits needed to print `case_count`.
///
/// A count of zero still yields a width of one.
pub fn digit_width(case_count: usize) -> usize {
    let mut width = 1;
    let mut rest = case_count / 10;
    while rest > 0 {
        width += 1;
        rest /= 10;
    }
    width
}

/// Generate the identifier of the case at 0-based `index`.
///
/// Convention: `Case{index + 1}` zero-padded to the digit width of
/// `case_count`.
///
/// # Examples
///
/// ```
/// use simbatch_core::naming::case_identifier;
///
/// assert_eq!(case_identifier(0, 2), "Case1");
/// assert_eq!(case_identifier(0, 12), "Case01");
/// assert_eq!(case_identifier(99, 100), "Case100");
/// ```
pub fn case_identifier(index: usize, case_count: usize) -> String {
    let width = digit_width(case_count);
    format!("{CASE_PREFIX}{:0width$}", index + 1)
}

/// Split a template display name into its base name and extension.
///
/// The extension is returned without the leading dot and is empty when the
/// name has none.
pub fn split_display_name(display_name: &str) -> (&str, &str) {
    let path = Path::new(display_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(display_name);
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    (stem, ext)
}

/// Filename of a generated case file: `{case_id}.{ext}`.
pub fn case_file_name(case_id: &str, ext: &str) -> String {
    with_extension(case_id.to_string(), ext)
}

/// Filename of a generated macro or auxiliary file: `{base}_{case_id}.{ext}`.
///
/// # Examples
///
/// ```
/// use simbatch_core::naming::derived_file_name;
///
/// assert_eq!(derived_file_name("Macro.java", "Case1"), "Macro_Case1.java");
/// assert_eq!(derived_file_name("Report.txt", "Case01"), "Report_Case01.txt");
/// ```
pub fn derived_file_name(display_name: &str, case_id: &str) -> String {
    let (stem, ext) = split_display_name(display_name);
    with_extension(format!("{stem}_{case_id}"), ext)
}

/// Filename of the backup artifact the simulation tool leaves next to a
/// case file after saving it.
pub fn backup_file_name(case_file_name: &str) -> String {
    format!("{case_file_name}{BACKUP_SUFFIX}")
}

/// Render a path with forward slashes only.
///
/// Macro files embed paths as string literals, where a lone backslash would
/// be read as an escape.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn with_extension(mut name: String, ext: &str) -> String {
    if !ext.is_empty() {
        name.push('.');
        name.push_str(ext);
    }
    name
}
