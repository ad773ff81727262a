//! `resultkit_io_xlsx` v1:
//! Workbook collaborator for the result pipeline.
//!
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options and the crate error
//! - `util`   : pure helper functions (value coercion, sheet naming)
//! - `reader` : named-sheet reader (calamine -> DataFrame)
//! - `writer` : pure-Rust writer kernel (DataFrame -> xlsx)
//! - `editor` : append-or-replace workbook rewrite
pub mod conf;
pub mod editor;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_xlsx_formats, derive_default_xlsx_write_options,
};
pub use editor::WorkbookEditor;
pub use reader::{read_all_sheets, read_sheet, read_sheet_names};
pub use spec::{
    EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSlice, SpecXlsxReport,
    SpecXlsxValuePolicy, SpecXlsxWriteOptions, XlsxIoError, XlsxResult,
};
pub use util::{
    derive_f64_from_any_value, derive_text_from_any_value, format_number_text,
    sanitize_sheet_name,
};
pub use writer::XlsxWriter;
