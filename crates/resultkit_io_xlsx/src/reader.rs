//! Named-sheet reader that loads workbook ranges into dataframes.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::{Column, DataFrame, DataType, TimeUnit};

use crate::spec::{XlsxIoError, XlsxResult};
use crate::util::{derive_unique_headers, format_naive_datetime, format_number_text};

static DATA_EMPTY: Data = Data::Empty;

/// Floats at or beyond 2^63 in magnitude do not fit `i64`.
const N_F64_I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Column dtype inferred from the non-empty cells of one sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumColumnKind {
    Integer,
    Decimal,
    DateTime,
    Text,
}

/// List sheet names in workbook order.
pub fn read_sheet_names<P: AsRef<Path>>(path: P) -> XlsxResult<Vec<String>> {
    let workbook = open_workbook_auto(path.as_ref()).map_err(|err| XlsxIoError::Open {
        path: path.as_ref().to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(workbook.sheet_names())
}

/// Read sheet `sheet_name` of the workbook at `path` into a dataframe.
///
/// The first row is the header; remaining rows are data.
pub fn read_sheet<P: AsRef<Path>>(path: P, sheet_name: &str) -> XlsxResult<DataFrame> {
    let mut workbook = open_workbook_auto(path.as_ref()).map_err(|err| XlsxIoError::Open {
        path: path.as_ref().to_path_buf(),
        message: err.to_string(),
    })?;

    let l_sheet_names = workbook.sheet_names();
    if !l_sheet_names.iter().any(|c_name| c_name == sheet_name) {
        return Err(XlsxIoError::SheetNotFound {
            sheet: sheet_name.to_string(),
            available: l_sheet_names,
        });
    }

    let range = workbook.worksheet_range(sheet_name)?;
    log::debug!(
        "[XLSX] read sheet '{sheet_name}' ({} x {})",
        range.height(),
        range.width()
    );
    derive_dataframe_from_range(&range)
}

/// Read every sheet of the workbook, preserving sheet order.
pub fn read_all_sheets<P: AsRef<Path>>(path: P) -> XlsxResult<Vec<(String, DataFrame)>> {
    let mut workbook = open_workbook_auto(path.as_ref()).map_err(|err| XlsxIoError::Open {
        path: path.as_ref().to_path_buf(),
        message: err.to_string(),
    })?;

    let mut l_sheets = Vec::new();
    for c_sheet_name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&c_sheet_name)?;
        l_sheets.push((c_sheet_name, derive_dataframe_from_range(&range)?));
    }
    Ok(l_sheets)
}

/// Convert a cell range (header row + data rows) into a dataframe.
pub fn derive_dataframe_from_range(range: &Range<Data>) -> XlsxResult<DataFrame> {
    let mut iter_rows = range.rows();
    let Some(l_header_cells) = iter_rows.next() else {
        return Ok(DataFrame::empty());
    };

    let l_header_raw: Vec<Option<String>> =
        l_header_cells.iter().map(derive_text_from_cell).collect();
    let l_headers = derive_unique_headers(&l_header_raw);
    let l_body: Vec<&[Data]> = iter_rows.collect();

    let mut l_columns = Vec::with_capacity(l_headers.len());
    for (n_idx_col, c_name) in l_headers.iter().enumerate() {
        let l_cells: Vec<&Data> = l_body
            .iter()
            .map(|row| row.get(n_idx_col).unwrap_or(&DATA_EMPTY))
            .collect();

        let column = match derive_column_kind(&l_cells) {
            EnumColumnKind::Integer => {
                let l_values: Vec<Option<i64>> =
                    l_cells.iter().map(|cell| derive_i64_from_cell(cell)).collect();
                Column::new(c_name.as_str().into(), l_values)
            }
            EnumColumnKind::Decimal => {
                let l_values: Vec<Option<f64>> =
                    l_cells.iter().map(|cell| derive_f64_from_cell(cell)).collect();
                Column::new(c_name.as_str().into(), l_values)
            }
            EnumColumnKind::DateTime => {
                let l_values: Vec<Option<i64>> = l_cells
                    .iter()
                    .map(|cell| {
                        derive_datetime_from_cell(cell).map(|ndt| ndt.and_utc().timestamp_millis())
                    })
                    .collect();
                Column::new(c_name.as_str().into(), l_values)
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            }
            EnumColumnKind::Text => {
                let l_values: Vec<Option<String>> =
                    l_cells.iter().map(|cell| derive_text_from_cell(cell)).collect();
                Column::new(c_name.as_str().into(), l_values)
            }
        };
        l_columns.push(column);
    }

    Ok(DataFrame::new(l_columns)?)
}

fn derive_column_kind(l_cells: &[&Data]) -> EnumColumnKind {
    let mut enum_kind: Option<EnumColumnKind> = None;
    for cell in l_cells {
        let enum_kind_cell = match cell {
            Data::Empty => continue,
            Data::Int(_) => EnumColumnKind::Integer,
            Data::Float(val) => derive_number_kind(*val),
            Data::DateTime(dt) if dt.is_duration() => derive_number_kind(dt.as_f64()),
            _ if derive_datetime_from_cell(cell).is_some() => EnumColumnKind::DateTime,
            _ => return EnumColumnKind::Text,
        };
        enum_kind = Some(match (enum_kind, enum_kind_cell) {
            (None, kind) => kind,
            (Some(kind_prev), kind) if kind_prev == kind => kind,
            (
                Some(EnumColumnKind::Integer | EnumColumnKind::Decimal),
                EnumColumnKind::Integer | EnumColumnKind::Decimal,
            ) => EnumColumnKind::Decimal,
            _ => return EnumColumnKind::Text,
        });
    }
    enum_kind.unwrap_or(EnumColumnKind::Text)
}

fn derive_number_kind(val: f64) -> EnumColumnKind {
    if val.is_finite() && val.fract() == 0.0 && val.abs() < N_F64_I64_BOUND {
        EnumColumnKind::Integer
    } else {
        EnumColumnKind::Decimal
    }
}

fn derive_i64_from_cell(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(val) => Some(*val),
        _ => derive_f64_from_cell(cell).map(|n| n as i64),
    }
}

fn derive_f64_from_cell(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(val) => Some(*val as f64),
        Data::Float(val) => Some(*val),
        Data::DateTime(dt) if dt.is_duration() => Some(dt.as_f64()),
        _ => None,
    }
}

/// Calendar value of a date cell; durations and unparsable ISO text give `None`.
fn derive_datetime_from_cell(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) if dt.is_datetime() => dt.as_datetime(),
        Data::DateTimeIso(val) => {
            let raw = val.trim_end_matches('Z');
            raw.parse::<NaiveDateTime>().ok().or_else(|| {
                raw.parse::<NaiveDate>()
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
        }
        _ => None,
    }
}

fn derive_text_from_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(val) => Some(val.clone()),
        Data::Int(val) => Some(val.to_string()),
        Data::Float(val) => Some(format_number_text(*val)),
        Data::Bool(val) => Some(if *val { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => Some(match derive_datetime_from_cell(cell) {
            Some(ndt) => format_naive_datetime(ndt),
            None => format_number_text(dt.as_f64()),
        }),
        Data::DateTimeIso(val) | Data::DurationIso(val) => Some(val.clone()),
        Data::Error(err) => Some(err.to_string()),
    }
}
