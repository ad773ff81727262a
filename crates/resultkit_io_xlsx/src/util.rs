//! Stateless helper utilities shared by the reader, writer, and downstream crates.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use polars::prelude::{AnyValue, TimeUnit};

use crate::conf::{
    C_HEADER_UNNAMED_PREFIX, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{
    EnumCellValue, SpecSheetSlice, SpecXlsxReport, SpecXlsxValuePolicy, XlsxIoError, XlsxResult,
};

////////////////////////////////////////////////////////////////////////////////
// #region AnyValueConversion

/// Coerce one dataframe value to `f64`.
///
/// Numeric dtypes convert directly; strings are trimmed and parsed. Everything
/// else (null, booleans, unparsable text, NaN) yields `None`.
pub fn derive_f64_from_any_value(value: &AnyValue<'_>) -> Option<f64> {
    let n_value = match value {
        AnyValue::UInt8(val) => *val as f64,
        AnyValue::UInt16(val) => *val as f64,
        AnyValue::UInt32(val) => *val as f64,
        AnyValue::UInt64(val) => *val as f64,
        AnyValue::Int8(val) => *val as f64,
        AnyValue::Int16(val) => *val as f64,
        AnyValue::Int32(val) => *val as f64,
        AnyValue::Int64(val) => *val as f64,
        AnyValue::Float32(val) => *val as f64,
        AnyValue::Float64(val) => *val,
        AnyValue::String(val) => val.trim().parse::<f64>().ok()?,
        AnyValue::StringOwned(val) => val.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n_value.is_nan() {
        return None;
    }
    Some(n_value)
}

/// Render one dataframe value as text; `None` for null.
///
/// Integral floats drop their fractional part (`72.0` -> `"72"`).
pub fn derive_text_from_any_value(value: &AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(val) => Some(val.to_string()),
        AnyValue::StringOwned(val) => Some(val.to_string()),
        AnyValue::Boolean(val) => Some(if *val { "True" } else { "False" }.to_string()),
        AnyValue::Float32(val) => Some(format_number_text(*val as f64)),
        AnyValue::Float64(val) => Some(format_number_text(*val)),
        AnyValue::Datetime(val, time_unit, _) | AnyValue::DatetimeOwned(val, time_unit, _) => {
            derive_naive_datetime(*val, *time_unit)
                .map(format_naive_datetime)
                .or_else(|| Some(value.to_string()))
        }
        _ => Some(value.to_string()),
    }
}

/// Convert an epoch offset counted in `time_unit` into a naive UTC date-time.
pub fn derive_naive_datetime(n_value: i64, time_unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt_utc = match time_unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(n_value)?,
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(n_value)?,
        TimeUnit::Nanoseconds => DateTime::from_timestamp_nanos(n_value),
    };
    Some(dt_utc.naive_utc())
}

/// Render a date-time as `YYYY-MM-DD`, adding `HH:MM:SS` only when off midnight.
pub fn format_naive_datetime(ndt: NaiveDateTime) -> String {
    if ndt.time() == NaiveTime::MIN {
        ndt.format("%Y-%m-%d").to_string()
    } else {
        ndt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Convert a dataframe value into the writer cell model.
pub fn derive_cell_value_from_any_value(value: &AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if *val { "True" } else { "False" }.to_string())
        }
        AnyValue::Datetime(val, time_unit, _) | AnyValue::DatetimeOwned(val, time_unit, _) => {
            match derive_naive_datetime(*val, *time_unit) {
                Some(ndt) => EnumCellValue::DateTime(ndt),
                None => EnumCellValue::String(value.to_string()),
            }
        }
        _ => match derive_f64_from_any_value(value) {
            Some(n_value) => EnumCellValue::Number(n_value),
            None => match value {
                AnyValue::Float32(_) | AnyValue::Float64(_) => EnumCellValue::Number(f64::NAN),
                _ => EnumCellValue::String(value.to_string()),
            },
        },
    }
}

/// Format a number without a trailing `.0` when it is integral.
pub fn format_number_text(n_value: f64) -> String {
    if n_value.is_finite() && n_value.fract() == 0.0 && n_value.abs() < 1e15 {
        format!("{}", n_value as i64)
    } else {
        n_value.to_string()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; return error for finite values.
pub fn convert_nan_inf_to_str(
    x: f64,
    value_policy: &SpecXlsxValuePolicy,
) -> Result<String, String> {
    if x.is_nan() {
        return Ok(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Ok(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    Err("Input is neither NaN nor Inf.".to_string())
}

/// Normalize cell value according to the numeric flag and value policy.
///
/// Text columns keep text verbatim; numeric columns map non-finite values to
/// blank (or to the policy text when `if_keep_missing_values`).
pub fn convert_cell_value(
    value: &EnumCellValue,
    if_is_numeric_col: bool,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::None => {
            if if_keep_missing_values {
                EnumCellValue::String(value_policy.missing_value_str.clone())
            } else {
                EnumCellValue::None
            }
        }
        EnumCellValue::String(s) => EnumCellValue::String(s.clone()),
        EnumCellValue::DateTime(ndt) => EnumCellValue::DateTime(*ndt),
        EnumCellValue::Number(n) if n.is_finite() => {
            if if_is_numeric_col {
                EnumCellValue::Number(*n)
            } else {
                EnumCellValue::String(format_number_text(*n))
            }
        }
        EnumCellValue::Number(n) => {
            if if_keep_missing_values {
                EnumCellValue::String(
                    convert_nan_inf_to_str(*n, value_policy)
                        .unwrap_or_else(|_| value_policy.nan_str.clone()),
                )
            } else {
                EnumCellValue::None
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> XlsxResult<()> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(XlsxIoError::InvalidOptions(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

/// Turn raw header cells into unique column names.
///
/// Blank cells become `Unnamed: <idx>`; repeats get `.1`, `.2`, ... suffixes.
pub fn derive_unique_headers(l_header_raw: &[Option<String>]) -> Vec<String> {
    let mut set_seen: BTreeSet<String> = BTreeSet::new();
    let mut l_headers = Vec::with_capacity(l_header_raw.len());

    for (n_idx, c_raw) in l_header_raw.iter().enumerate() {
        let c_base = match c_raw.as_deref().map(str::trim) {
            Some(val) if !val.is_empty() => val.to_string(),
            _ => format!("{C_HEADER_UNNAMED_PREFIX}{n_idx}"),
        };

        let mut c_name = c_base.clone();
        let mut n_dup = 1usize;
        while set_seen.contains(&c_name) {
            c_name = format!("{c_base}.{n_dup}");
            n_dup += 1;
        }
        set_seen.insert(c_name.clone());
        l_headers.push(c_name);
    }

    l_headers
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Split logical dataframe range into Excel-compliant sheet slices.
///
/// One header row is reserved on every slice.
pub fn plan_sheet_slices(
    height_df: usize,
    width_df: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Vec<SpecSheetSlice> {
    let n_rows_data_max = N_NROWS_EXCEL_MAX - 1;

    let mut l_col_slices = Vec::new();
    let mut n_col_start = 0;
    while n_col_start < width_df {
        let n_col_end = usize::min(width_df, n_col_start + N_NCOLS_EXCEL_MAX);
        l_col_slices.push((n_col_start, n_col_end));
        n_col_start = n_col_end;
    }
    if l_col_slices.is_empty() {
        l_col_slices.push((0, 0));
    }

    let mut l_row_slices = Vec::new();
    let mut n_row_start = 0;
    while n_row_start < height_df {
        let n_row_end = usize::min(height_df, n_row_start + n_rows_data_max);
        l_row_slices.push((n_row_start, n_row_end));
        n_row_start = n_row_end;
    }
    if l_row_slices.is_empty() {
        l_row_slices.push((0, 0));
    }

    let n_parts_total = l_col_slices.len() * l_row_slices.len();

    let mut l_sheet_parts = Vec::new();
    let mut n_idx_part = 1;
    for (col_start, col_end) in &l_col_slices {
        for (row_start, row_end) in &l_row_slices {
            let c_part_sheet_name = if n_parts_total == 1 {
                sheet_name.to_string()
            } else {
                create_sheet_identifier(sheet_name, n_idx_part)
            };

            l_sheet_parts.push(SpecSheetSlice {
                sheet_name: c_part_sheet_name,
                row_start_inclusive: *row_start,
                row_end_exclusive: *row_end,
                col_start_inclusive: *col_start,
                col_end_exclusive: *col_end,
            });
            n_idx_part += 1;
        }
    }

    if n_parts_total > 1 {
        report.warn(format!(
            "Excel limit overflow: split into {} sheets (columns-first, then rows).",
            l_sheet_parts.len()
        ));
    }

    l_sheet_parts
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_f64_from_any_value_coerces_text_and_rejects_junk() {
        assert_eq!(derive_f64_from_any_value(&AnyValue::Int64(72)), Some(72.0));
        assert_eq!(derive_f64_from_any_value(&AnyValue::String(" 55 ")), Some(55.0));
        assert_eq!(derive_f64_from_any_value(&AnyValue::String("AB")), None);
        assert_eq!(derive_f64_from_any_value(&AnyValue::String("")), None);
        assert_eq!(derive_f64_from_any_value(&AnyValue::Float64(f64::NAN)), None);
        assert_eq!(derive_f64_from_any_value(&AnyValue::Null), None);
    }

    #[test]
    fn test_derive_text_from_any_value_trims_integral_floats() {
        assert_eq!(
            derive_text_from_any_value(&AnyValue::Float64(72.0)).as_deref(),
            Some("72")
        );
        assert_eq!(
            derive_text_from_any_value(&AnyValue::Float64(72.5)).as_deref(),
            Some("72.5")
        );
        assert_eq!(
            derive_text_from_any_value(&AnyValue::Int64(9)).as_deref(),
            Some("9")
        );
        assert_eq!(derive_text_from_any_value(&AnyValue::Null), None);
    }

    #[test]
    fn test_datetime_values_keep_calendar_semantics() {
        let n_ms = 1_205_452_800_000i64;
        let ndt = derive_naive_datetime(n_ms, TimeUnit::Milliseconds).expect("datetime");
        assert_eq!(format_naive_datetime(ndt), "2008-03-14");
        assert_eq!(
            derive_naive_datetime(n_ms * 1_000_000, TimeUnit::Nanoseconds),
            Some(ndt)
        );

        let value = AnyValue::Datetime(n_ms, TimeUnit::Milliseconds, None);
        assert_eq!(
            derive_cell_value_from_any_value(&value),
            EnumCellValue::DateTime(ndt)
        );
        assert_eq!(derive_text_from_any_value(&value).as_deref(), Some("2008-03-14"));
        assert_eq!(derive_f64_from_any_value(&value), None);

        let value_policy = SpecXlsxValuePolicy::default();
        assert_eq!(
            convert_cell_value(&EnumCellValue::DateTime(ndt), false, false, &value_policy),
            EnumCellValue::DateTime(ndt)
        );

        let ndt_noon = derive_naive_datetime(n_ms + 45_296_000, TimeUnit::Milliseconds)
            .expect("datetime");
        assert_eq!(format_naive_datetime(ndt_noon), "2008-03-14 12:34:56");
    }

    #[test]
    fn test_derive_unique_headers_fills_blanks_and_suffixes_repeats() {
        let l_raw = vec![
            Some("roll".to_string()),
            None,
            Some("nm".to_string()),
            Some(" nm ".to_string()),
            Some("nm".to_string()),
        ];
        assert_eq!(
            derive_unique_headers(&l_raw),
            vec!["roll", "Unnamed: 1", "nm", "nm.1", "nm.2"]
        );
    }

    #[test]
    fn test_convert_cell_value_blanks_non_finite_numbers() {
        let value_policy = SpecXlsxValuePolicy::default();
        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(f64::NAN), true, false, &value_policy),
            EnumCellValue::None
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(f64::NAN), true, true, &value_policy),
            EnumCellValue::String("NaN".to_string())
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(3.0), false, false, &value_policy),
            EnumCellValue::String("3".to_string())
        );
    }

    #[test]
    fn test_sanitize_sheet_name_and_slices() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");

        let mut report = SpecXlsxReport::default();
        let l_parts = plan_sheet_slices(10, 3, "processed", &mut report);
        assert_eq!(l_parts.len(), 1);
        assert_eq!(l_parts[0].sheet_name, "processed");
        assert_eq!(l_parts[0].row_end_exclusive, 10);
        assert!(report.warnings.is_empty());

        let l_parts_wide = plan_sheet_slices(2, N_NCOLS_EXCEL_MAX + 1, "wide", &mut report);
        assert_eq!(l_parts_wide.len(), 2);
        assert_eq!(l_parts_wide[1].sheet_name, "wide_2");
        assert_eq!(report.warnings.len(), 1);
    }
}
