//! `resultkit_pseb` v1:
//! PSEB exam result processing core.
//!
//! - `conf`      : constants and default presets
//! - `spec`      : options, result models and the crate error
//! - `glyph`     : PNB legacy font -> Gurmukhi Unicode
//! - `parse`     : composite result string parser
//! - `normalize` : raw result table -> per-subject marks/total layout
//! - `summary`   : section-wise performance aggregation
//! - `report`    : aggregation observers and summary report
pub mod conf;
pub mod glyph;
pub mod normalize;
pub mod parse;
pub mod report;
pub mod spec;
pub mod summary;

pub use conf::{TUP_SUMMARY_COLUMNS, derive_default_result_options};
pub use glyph::transliterate;
pub use normalize::normalize_result_table;
pub use parse::{parse_result_string, parse_subject_blocks, split_marks_total};
pub use report::{
    LogSummaryObserver, NoopSummaryObserver, ReportSummary, ReportSummaryBuilder,
    SummaryObserver,
};
pub use spec::{
    EnumSkipReason, ResultKitError, ResultKitResult, SpecResultOptions, SpecSectionSummaryEntry,
    SpecSubjectResult,
};
pub use summary::{aggregate_section_summary, build_max_marks_lookup, derive_summary_dataframe};
