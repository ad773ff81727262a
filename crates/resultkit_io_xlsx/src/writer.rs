//! XLSX writer kernel that renders in-memory dataframes as workbook sheets.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use polars::prelude::DataFrame;
use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, derive_default_xlsx_formats, derive_default_xlsx_write_options,
};
use crate::spec::{
    EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSlice, SpecXlsxReport,
    SpecXlsxValuePolicy, SpecXlsxWriteOptions, XlsxIoError, XlsxResult,
};
use crate::util::{
    convert_cell_value, derive_cell_value_from_any_value, plan_sheet_slices,
    sanitize_sheet_name, validate_unique_columns,
};

/// Stateful workbook writer.
///
/// Sheets are buffered in memory and flushed by [`Self::close`].
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    fmt_text: SpecCellFormat,
    fmt_integer: SpecCellFormat,
    fmt_decimal: SpecCellFormat,
    fmt_date: SpecCellFormat,
    fmt_datetime: SpecCellFormat,
    fmt_header: SpecCellFormat,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and explicit format presets.
    ///
    /// `fmt_date` applies to date-time cells at midnight, `fmt_datetime` to the rest.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path_file_out: PathBuf,
        fmt_text: SpecCellFormat,
        fmt_integer: SpecCellFormat,
        fmt_decimal: SpecCellFormat,
        fmt_date: SpecCellFormat,
        fmt_datetime: SpecCellFormat,
        fmt_header: SpecCellFormat,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            fmt_text,
            fmt_integer,
            fmt_decimal,
            fmt_date,
            fmt_datetime,
            fmt_header,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Create writer with the presets from [`derive_default_xlsx_formats`].
    pub fn with_defaults(path_file_out: PathBuf) -> Self {
        let dict_fmt = derive_default_xlsx_formats();
        let derive_fmt = |key: &str| dict_fmt.get(key).cloned().unwrap_or_default();
        Self::new(
            path_file_out,
            derive_fmt("text"),
            derive_fmt("integer"),
            derive_fmt("decimal"),
            derive_fmt("date"),
            derive_fmt("datetime"),
            derive_fmt("header"),
            derive_default_xlsx_write_options(),
        )
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> XlsxResult<()> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        Ok(())
    }

    /// Write one sheet from an in-memory dataframe.
    ///
    /// The first row holds column names; data rows follow without an index column.
    pub fn write_sheet(&mut self, df_data: &DataFrame, sheet_name: &str) -> XlsxResult<()> {
        if self.if_closed {
            return Err(XlsxIoError::InvalidOptions(
                "Cannot write after close().".to_string(),
            ));
        }
        validate_policy_autofit(&self.write_options.policy_autofit)?;

        let if_keep_missing_values = self.write_options.keep_missing_values;
        let value_policy = self.write_options.value_policy.clone();
        let policy_autofit = self.write_options.policy_autofit.clone();

        let l_colnames_df: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;

        let (l_cols_idx_numeric, l_cols_idx_integer) = if self.write_options.infer_numeric_cols {
            derive_numeric_column_indices(df_data)
        } else {
            (vec![], vec![])
        };
        let set_cols_idx_numeric: BTreeSet<usize> = l_cols_idx_numeric.into_iter().collect();
        let set_cols_idx_integer: BTreeSet<usize> = l_cols_idx_integer.into_iter().collect();

        let mut report = SpecXlsxReport::default();
        let l_sheet_parts = plan_sheet_slices(
            df_data.height(),
            df_data.width(),
            &sanitize_sheet_name(sheet_name, "_"),
            &mut report,
        );

        let fmt_header = derive_rust_xlsx_format(&self.fmt_header);
        let fmt_text = derive_rust_xlsx_format(&self.fmt_text);
        let fmt_integer = derive_rust_xlsx_format(&self.fmt_integer);
        let fmt_decimal = derive_rust_xlsx_format(&self.fmt_decimal);
        let fmt_date = derive_rust_xlsx_format(&self.fmt_date);
        let fmt_datetime = derive_rust_xlsx_format(&self.fmt_datetime);

        for sheet_slice in l_sheet_parts {
            let sheet_name_unique = self.derive_unique_sheet_name(&sheet_slice.sheet_name);
            let worksheet = self.workbook.add_worksheet();
            worksheet.set_name(&sheet_name_unique)?;

            let n_width_slice = sheet_slice.col_end_exclusive - sheet_slice.col_start_inclusive;
            let mut l_width_by_col = vec![0usize; n_width_slice];

            for (n_idx_col, c_name) in l_colnames_df
                [sheet_slice.col_start_inclusive..sheet_slice.col_end_exclusive]
                .iter()
                .enumerate()
            {
                worksheet.write_string_with_format(
                    0,
                    cast_col_num(n_idx_col)?,
                    c_name,
                    &fmt_header,
                )?;
                l_width_by_col[n_idx_col] = estimate_unicode_string_width(c_name);
            }
            worksheet.set_freeze_panes(1, 0)?;

            let n_rows_data_this_sheet =
                sheet_slice.row_end_exclusive - sheet_slice.row_start_inclusive;
            for n_idx_col in 0..n_width_slice {
                let n_idx_col_abs = sheet_slice.col_start_inclusive + n_idx_col;
                let col = df_data.get_columns()[n_idx_col_abs].slice(
                    sheet_slice.row_start_inclusive as i64,
                    n_rows_data_this_sheet,
                );
                let if_is_numeric_col = set_cols_idx_numeric.contains(&n_idx_col_abs);
                let fmt_cell = if set_cols_idx_integer.contains(&n_idx_col_abs) {
                    &fmt_integer
                } else if if_is_numeric_col {
                    &fmt_decimal
                } else {
                    &fmt_text
                };

                for n_row_local in 0..n_rows_data_this_sheet {
                    let value_raw = derive_cell_value_from_any_value(&col.get(n_row_local)?);
                    let value = convert_cell_value(
                        &value_raw,
                        if_is_numeric_col,
                        if_keep_missing_values,
                        &value_policy,
                    );

                    if policy_autofit.if_enabled
                        && n_row_local < policy_autofit.height_body_inferred_max
                    {
                        l_width_by_col[n_idx_col] = usize::max(
                            l_width_by_col[n_idx_col],
                            estimate_width_len(&value, if_keep_missing_values, &value_policy),
                        );
                    }

                    let fmt_value = match &value {
                        EnumCellValue::DateTime(ndt) if ndt.time() == NaiveTime::MIN => &fmt_date,
                        EnumCellValue::DateTime(_) => &fmt_datetime,
                        _ => fmt_cell,
                    };
                    write_cell_with_format(
                        worksheet,
                        1 + n_row_local,
                        n_idx_col,
                        &value,
                        fmt_value,
                    )?;
                }
            }

            if policy_autofit.if_enabled {
                apply_column_widths(worksheet, &l_width_by_col, &policy_autofit)?;
            }

            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                ..sheet_slice
            });
        }

        for c_warning in &report.warnings {
            log::warn!("[XLSX] {sheet_name}: {c_warning}");
        }
        self.l_reports.push(report);
        Ok(())
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(
    value: &EnumCellValue,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> usize {
    match value {
        EnumCellValue::None => {
            if if_keep_missing_values {
                value_policy.missing_value_str.len()
            } else {
                0
            }
        }
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::DateTime(ndt) => {
            if ndt.time() == NaiveTime::MIN {
                10
            } else {
                19
            }
        }
        EnumCellValue::Number(n) => {
            if n.fract() == 0.0 {
                (*n as i64).to_string().len()
            } else {
                format!("{n:.2}").len()
            }
        }
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn apply_column_widths(
    worksheet: &mut Worksheet,
    l_width_by_col: &[usize],
    policy_autofit: &SpecAutofitCellsPolicy,
) -> XlsxResult<()> {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    for (n_idx_col, n_width_recorded) in l_width_by_col.iter().enumerate() {
        let n_width_final = usize::min(
            n_max,
            usize::max(n_min, n_width_recorded + policy_autofit.width_cell_padding),
        );
        worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
    }
    Ok(())
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> XlsxResult<()> {
    if policy_autofit.width_cell_min == 0 {
        return Err(XlsxIoError::InvalidOptions(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(XlsxIoError::InvalidOptions(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

/// Return `(numeric, integer)` column indices inferred from dtypes.
fn derive_numeric_column_indices(df: &DataFrame) -> (Vec<usize>, Vec<usize>) {
    let mut l_cols_idx_numeric = Vec::new();
    let mut l_cols_idx_integer = Vec::new();
    for (n_idx, c_col) in df.get_columns().iter().enumerate() {
        if c_col.dtype().is_numeric() {
            l_cols_idx_numeric.push(n_idx);
            if c_col.dtype().is_integer() {
                l_cols_idx_integer.push(n_idx);
            }
        }
    }
    (l_cols_idx_numeric, l_cols_idx_integer)
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> XlsxResult<()> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::DateTime(ndt) => match derive_excel_datetime(ndt) {
            Some(excel_dt) => {
                worksheet.write_datetime_with_format(n_row, n_col, &excel_dt, format)?;
            }
            None => {
                log::warn!("[XLSX] date {ndt} is outside the Excel range; written as text");
                worksheet.write_string_with_format(n_row, n_col, ndt.to_string(), format)?;
            }
        },
    }
    Ok(())
}

/// Excel serial dates cover years 1900 through 9999.
fn derive_excel_datetime(ndt: &NaiveDateTime) -> Option<ExcelDateTime> {
    let n_year = u16::try_from(ndt.year()).ok()?;
    let n_sec = f64::from(ndt.second()) + f64::from(ndt.nanosecond()) / 1e9;
    ExcelDateTime::from_ymd(n_year, ndt.month() as u8, ndt.day() as u8)
        .and_then(|excel_dt| excel_dt.and_hms(ndt.hour() as u16, ndt.minute() as u8, n_sec))
        .ok()
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> XlsxResult<u32> {
    u32::try_from(value)
        .map_err(|_| XlsxIoError::InvalidOptions(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> XlsxResult<u16> {
    u16::try_from(value)
        .map_err(|_| XlsxIoError::InvalidOptions(format!("column index overflow: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_width_len_widens_non_ascii_text() {
        let value_policy = SpecXlsxValuePolicy::default();
        assert_eq!(
            estimate_width_len(&EnumCellValue::String("abc".to_string()), false, &value_policy),
            3
        );
        assert_eq!(
            estimate_width_len(&EnumCellValue::String("ਕਤ".to_string()), false, &value_policy),
            3
        );
        assert_eq!(
            estimate_width_len(&EnumCellValue::Number(100.0), false, &value_policy),
            3
        );
        assert_eq!(estimate_width_len(&EnumCellValue::None, true, &value_policy), 2);

        let ndt = chrono::NaiveDate::from_ymd_opt(2008, 3, 14)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("date");
        assert_eq!(
            estimate_width_len(&EnumCellValue::DateTime(ndt), false, &value_policy),
            10
        );
    }

    #[test]
    fn test_excel_datetime_covers_years_1900_to_9999() {
        let ndt = chrono::NaiveDate::from_ymd_opt(2008, 3, 14)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("date");
        let excel_dt = derive_excel_datetime(&ndt).expect("in range");
        assert_eq!(excel_dt.to_excel(), 39521.5);

        let ndt_early = chrono::NaiveDate::from_ymd_opt(1850, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("date");
        assert!(derive_excel_datetime(&ndt_early).is_none());
    }

    #[test]
    fn test_write_after_close_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut writer = XlsxWriter::with_defaults(dir.path().join("out.xlsx"));
        writer.close().expect("close");
        writer.close().expect("close is idempotent");

        let df = DataFrame::empty();
        assert!(matches!(
            writer.write_sheet(&df, "x"),
            Err(XlsxIoError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_duplicate_sheet_names_are_suffixed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut writer = XlsxWriter::with_defaults(dir.path().join("out.xlsx"));
        assert_eq!(writer.derive_unique_sheet_name("MM"), "MM");
        assert_eq!(writer.derive_unique_sheet_name("MM"), "MM__2");
        assert_eq!(writer.derive_unique_sheet_name("MM"), "MM__3");
    }
}
