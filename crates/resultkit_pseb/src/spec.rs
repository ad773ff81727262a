//! Result pipeline models, options, and the crate error type.

use std::fmt;

use polars::prelude::PolarsError;
use serde::Deserialize;

use crate::conf::{
    C_COL_MAX_MARKS, C_COL_MAX_SUBJECT, C_COL_NAME, C_COL_RESULT, C_COL_SECTION,
    C_SHEET_INPUT, C_SHEET_MAX_MARKS, C_SHEET_PERFORMANCE, C_SHEET_PROCESSED,
    N_MAX_MARKS_DEFAULT, TUP_COLS_DROPPED,
};

////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Sheet/column naming and aggregation defaults for one pipeline run.
///
/// Every field has a default, so a TOML file may override any subset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecResultOptions {
    /// Raw input sheet name.
    pub sheet_input: String,
    /// Max-marks configuration sheet name.
    pub sheet_max_marks: String,
    /// Normalized output sheet name.
    pub sheet_processed: String,
    /// Summary output sheet name.
    pub sheet_performance: String,
    /// Legacy-font name column.
    pub col_name: String,
    /// Composite result string column.
    pub col_result: String,
    /// Grouping column for the summary.
    pub col_section: String,
    /// Subject key column in the max-marks sheet.
    pub col_max_subject: String,
    /// Max-marks value column in the max-marks sheet.
    pub col_max_marks: String,
    /// Maximum marks for subjects missing from the max-marks sheet.
    pub default_max_marks: f64,
    /// Passthrough columns removed from the normalized table when present.
    pub cols_dropped: Vec<String>,
}

impl Default for SpecResultOptions {
    fn default() -> Self {
        Self {
            sheet_input: C_SHEET_INPUT.to_string(),
            sheet_max_marks: C_SHEET_MAX_MARKS.to_string(),
            sheet_processed: C_SHEET_PROCESSED.to_string(),
            sheet_performance: C_SHEET_PERFORMANCE.to_string(),
            col_name: C_COL_NAME.to_string(),
            col_result: C_COL_RESULT.to_string(),
            col_section: C_COL_SECTION.to_string(),
            col_max_subject: C_COL_MAX_SUBJECT.to_string(),
            col_max_marks: C_COL_MAX_MARKS.to_string(),
            default_max_marks: N_MAX_MARKS_DEFAULT,
            cols_dropped: TUP_COLS_DROPPED.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SpecResultOptions {
    /// Parse options from TOML text; absent keys keep their defaults.
    pub fn from_toml_str(txt: &str) -> Result<Self, ResultKitError> {
        let options: SpecResultOptions =
            toml::from_str(txt).map_err(|err| ResultKitError::InvalidConfig(err.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject option combinations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ResultKitError> {
        if !self.default_max_marks.is_finite() || self.default_max_marks <= 0.0 {
            return Err(ResultKitError::InvalidConfig(format!(
                "default_max_marks must be a positive number, got {}",
                self.default_max_marks
            )));
        }
        for (c_key, c_value) in [
            ("sheet_input", &self.sheet_input),
            ("sheet_max_marks", &self.sheet_max_marks),
            ("sheet_processed", &self.sheet_processed),
            ("sheet_performance", &self.sheet_performance),
            ("col_section", &self.col_section),
        ] {
            if c_value.trim().is_empty() {
                return Err(ResultKitError::InvalidConfig(format!(
                    "{c_key} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ResultModels

/// One parsed subject block of a composite result string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSubjectResult {
    /// 2-5 uppercase letters.
    pub subject_code: String,
    /// Trimmed marks text, possibly `"<parts> = <total>"`.
    pub marks_raw: String,
    /// Grade code; empty when the block carried none.
    pub grade: String,
}

/// One row of the section summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSectionSummaryEntry {
    /// 1-based running number within the section.
    pub serial_no: u32,
    /// Section group value.
    pub section: String,
    /// Subject code.
    pub subject: String,
    /// Resolved maximum marks.
    pub max_marks: f64,
    /// Count of numeric scores.
    pub valid_score_count: u32,
    /// Count of scores strictly above 60%.
    pub count_above_60pct: u32,
    /// Count of scores strictly above 75%.
    pub count_above_75pct: u32,
}

/// Why a `(section, subject)` pair produced no summary row.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumSkipReason {
    /// Max marks missing, non-numeric, zero, or negative.
    InvalidMaxMarks,
    /// No score in the section coerced to a number.
    NoValidScores,
}

impl fmt::Display for EnumSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMaxMarks => write!(f, "no max marks found or invalid"),
            Self::NoValidScores => write!(f, "no valid numeric marks"),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Structural failures of the result pipeline.
///
/// Malformed individual fields never surface here; they degrade to empty values.
#[derive(Debug, thiserror::Error)]
pub enum ResultKitError {
    /// A required column is absent.
    #[error("'{column}' column not found in {table}.")]
    MissingColumn {
        /// Missing column name.
        column: String,
        /// Table being inspected.
        table: String,
    },

    /// The normalized table has no `<SUBJECT>_total` column.
    #[error("No '_total' columns found in the student sheet.")]
    NoSubjectTotals,

    /// Aggregation produced no summary rows.
    #[error("No valid data found to generate summary.")]
    NoValidData,

    /// Option file could not be parsed or holds invalid values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// DataFrame construction/access error.
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

/// Result alias for pipeline operations.
pub type ResultKitResult<T> = Result<T, ResultKitError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_toml_overrides_subset() {
        let options = SpecResultOptions::from_toml_str(
            r#"
            sheet_input = "Raw"
            default_max_marks = 80
            cols_dropped = []
            "#,
        )
        .expect("options");
        assert_eq!(options.sheet_input, "Raw");
        assert_eq!(options.default_max_marks, 80.0);
        assert!(options.cols_dropped.is_empty());
        assert_eq!(options.sheet_max_marks, "MM");
        assert_eq!(options.col_name, "nm");
    }

    #[test]
    fn test_options_reject_unknown_keys_and_bad_default() {
        assert!(matches!(
            SpecResultOptions::from_toml_str("sheet_inptu = \"x\""),
            Err(ResultKitError::InvalidConfig(_))
        ));
        assert!(matches!(
            SpecResultOptions::from_toml_str("default_max_marks = 0"),
            Err(ResultKitError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_column_message() {
        let err = ResultKitError::MissingColumn {
            column: "Section".to_string(),
            table: "student sheet".to_string(),
        };
        assert_eq!(err.to_string(), "'Section' column not found in student sheet.");
    }
}
