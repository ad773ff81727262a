//! Pipeline constants and default option factories.

use crate::spec::SpecResultOptions;

/// Raw input sheet exported by the board portal.
pub const C_SHEET_INPUT: &str = "Table";
/// Per-subject maximum marks configuration sheet.
pub const C_SHEET_MAX_MARKS: &str = "MM";
/// Output sheet holding the normalized table.
pub const C_SHEET_PROCESSED: &str = "processed";
/// Output sheet holding the section summary.
pub const C_SHEET_PERFORMANCE: &str = "performance";

/// Legacy-font encoded student name column.
pub const C_COL_NAME: &str = "nm";
/// Composite result string column.
pub const C_COL_RESULT: &str = "detailres";
/// Aggregation grouping column.
pub const C_COL_SECTION: &str = "Section";
/// Subject key column of the max-marks sheet.
pub const C_COL_MAX_SUBJECT: &str = "Subject";
/// Max-marks value column of the max-marks sheet.
pub const C_COL_MAX_MARKS: &str = "MM";

/// School-metadata columns dropped from the normalized table.
pub const TUP_COLS_DROPPED: [&str; 3] = ["schlNMP", "SCHLNCODE", "SCHLSET"];

/// Suffix of per-subject marks columns.
pub const C_SUFFIX_MARKS: &str = "_marks";
/// Suffix of per-subject grade fields (intermediate only).
pub const C_SUFFIX_GRADE: &str = "_grade";
/// Suffix of per-subject total columns.
pub const C_SUFFIX_TOTAL: &str = "_total";

/// Maximum marks used when a subject has no max-marks entry.
pub const N_MAX_MARKS_DEFAULT: f64 = 100.0;
/// Lower percentage threshold (strict).
pub const N_PCT_THRESHOLD_LOW: f64 = 60.0;
/// Upper percentage threshold (strict).
pub const N_PCT_THRESHOLD_HIGH: f64 = 75.0;

/// Summary table header, in output order.
pub const TUP_SUMMARY_COLUMNS: [&str; 7] = [
    "S.No.",
    "Section",
    "Subject",
    "Max Marks",
    "Valid Scores",
    "Students > 60%",
    "Students > 75%",
];

/// Build default pipeline options.
pub fn derive_default_result_options() -> SpecResultOptions {
    SpecResultOptions::default()
}
