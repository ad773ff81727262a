//! Append-or-replace workbook editing on top of the reader and writer kernels.

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use crate::reader::read_all_sheets;
use crate::spec::{XlsxIoError, XlsxResult};
use crate::writer::XlsxWriter;

/// In-memory copy of a workbook that is rewritten as a whole on save.
///
/// Only cell values survive a round trip: date cells stay dates, formulas keep
/// their cached result, and styles of untouched sheets are reset to the writer
/// presets.
pub struct WorkbookEditor {
    path_file: PathBuf,
    l_sheets: Vec<(String, DataFrame)>,
}

impl WorkbookEditor {
    /// Load every sheet of the workbook at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let path_file = path.as_ref().to_path_buf();
        let l_sheets = read_all_sheets(&path_file)?;
        log::debug!(
            "[XLSX] opened {} with {} sheet(s)",
            path_file.display(),
            l_sheets.len()
        );
        Ok(Self {
            path_file,
            l_sheets,
        })
    }

    /// Workbook path bound to this editor.
    pub fn path(&self) -> &Path {
        &self.path_file
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.l_sheets.iter().map(|(c_name, _)| c_name.as_str()).collect()
    }

    /// Borrow the dataframe of sheet `sheet_name`.
    pub fn sheet(&self, sheet_name: &str) -> XlsxResult<&DataFrame> {
        self.l_sheets
            .iter()
            .find(|(c_name, _)| c_name == sheet_name)
            .map(|(_, df)| df)
            .ok_or_else(|| XlsxIoError::SheetNotFound {
                sheet: sheet_name.to_string(),
                available: self.l_sheets.iter().map(|(c_name, _)| c_name.clone()).collect(),
            })
    }

    /// Replace sheet `sheet_name` in place, or append it when absent.
    pub fn upsert_sheet(&mut self, sheet_name: &str, df: DataFrame) {
        match self
            .l_sheets
            .iter_mut()
            .find(|(c_name, _)| c_name == sheet_name)
        {
            Some((_, df_existing)) => {
                log::debug!("[XLSX] replacing sheet '{sheet_name}'");
                *df_existing = df;
            }
            None => {
                log::debug!("[XLSX] appending sheet '{sheet_name}'");
                self.l_sheets.push((sheet_name.to_string(), df));
            }
        }
    }

    /// Rewrite the workbook through a sibling temporary file and rename it into place.
    pub fn save(&self) -> XlsxResult<()> {
        let path_file_tmp = derive_temporary_path(&self.path_file);
        let mut writer = XlsxWriter::with_defaults(path_file_tmp.clone());
        for (c_name, df) in &self.l_sheets {
            writer.write_sheet(df, c_name)?;
        }

        if let Err(err) = writer.close() {
            let _ = fs::remove_file(&path_file_tmp);
            return Err(err);
        }
        log::debug!(
            "[XLSX] wrote {} sheet(s) to {}",
            writer
                .report()
                .iter()
                .map(|report| report.sheets.len())
                .sum::<usize>(),
            writer.file_out()
        );
        fs::rename(&path_file_tmp, &self.path_file)?;
        Ok(())
    }
}

fn derive_temporary_path(path_file: &Path) -> PathBuf {
    let c_name = path_file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook.xlsx".to_string());
    path_file.with_file_name(format!(".{c_name}.tmp.xlsx"))
}

#[cfg(test)]
mod tests {
    use polars::prelude::Column;

    use super::*;
    use crate::reader::{read_sheet, read_sheet_names};

    fn build_df(c_name: &str, l_values: &[&str]) -> DataFrame {
        DataFrame::new(vec![Column::new(c_name.into(), l_values)]).expect("dataframe")
    }

    #[test]
    fn test_upsert_sheet_replaces_in_place_and_appends_new() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path_file = dir.path().join("book.xlsx");

        let mut writer = XlsxWriter::with_defaults(path_file.clone());
        writer
            .write_sheet(&build_df("a", &["1"]), "Table")
            .expect("write Table");
        writer
            .write_sheet(&build_df("b", &["old"]), "processed")
            .expect("write processed");
        writer
            .write_sheet(&build_df("c", &["keep"]), "MM")
            .expect("write MM");
        writer.close().expect("close");

        let mut editor = WorkbookEditor::open(&path_file).expect("open");
        assert_eq!(editor.sheet_names(), vec!["Table", "processed", "MM"]);

        editor.upsert_sheet("processed", build_df("b", &["new"]));
        editor.upsert_sheet("performance", build_df("d", &["x"]));
        editor.save().expect("save");

        assert_eq!(
            read_sheet_names(&path_file).expect("names"),
            vec!["Table", "processed", "MM", "performance"]
        );
        let df_processed = read_sheet(&path_file, "processed").expect("processed");
        let col = df_processed.column("b").expect("column b");
        assert_eq!(col.str().expect("str").get(0), Some("new"));
        assert!(!derive_temporary_path(&path_file).exists());
    }

    #[test]
    fn test_save_keeps_date_cells_of_untouched_sheets() {
        use calamine::{Data, Reader, open_workbook_auto};
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let dir = tempfile::tempdir().expect("tempdir");
        let path_file = dir.path().join("book.xlsx");

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Table").expect("name");
        worksheet.write_string(0, 0, "roll").expect("header");
        worksheet.write_string(0, 1, "dob").expect("header");
        worksheet.write_number(1, 0, 101).expect("roll");
        let fmt_date = Format::new().set_num_format("yyyy-mm-dd");
        let excel_dt = ExcelDateTime::from_ymd(2008, 3, 14).expect("date");
        worksheet
            .write_datetime_with_format(1, 1, &excel_dt, &fmt_date)
            .expect("dob");
        workbook.save(&path_file).expect("save");

        let mut editor = WorkbookEditor::open(&path_file).expect("open");
        editor.upsert_sheet("processed", build_df("b", &["x"]));
        editor.save().expect("save");

        let mut workbook_saved = open_workbook_auto(&path_file).expect("reopen");
        let range = workbook_saved.worksheet_range("Table").expect("Table");
        match range.get_value((1, 1)) {
            Some(Data::DateTime(dt)) => {
                assert!(dt.is_datetime());
                assert_eq!(dt.as_f64(), 39521.0);
            }
            other => panic!("unexpected cell: {other:?}"),
        }
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(101.0)));
    }

    #[test]
    fn test_missing_sheet_is_reported_with_available_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path_file = dir.path().join("book.xlsx");
        let mut writer = XlsxWriter::with_defaults(path_file.clone());
        writer
            .write_sheet(&build_df("a", &["1"]), "Table")
            .expect("write Table");
        writer.close().expect("close");

        let editor = WorkbookEditor::open(&path_file).expect("open");
        match editor.sheet("MM") {
            Err(XlsxIoError::SheetNotFound { sheet, available }) => {
                assert_eq!(sheet, "MM");
                assert_eq!(available, vec!["Table".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other.map(|df| df.shape())),
        }
        assert!(matches!(
            read_sheet(&path_file, "MM"),
            Err(XlsxIoError::SheetNotFound { .. })
        ));
    }
}
