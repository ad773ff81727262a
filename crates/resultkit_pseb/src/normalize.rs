//! Raw result table normalization.
//!
//! Rows are parsed in two passes: the first fixes the subject schema (union of
//! all subjects, in order of first appearance), the second fills one
//! `<SUBJECT>_marks` / `<SUBJECT>_total` pair per subject for every row.

use indexmap::{IndexMap, IndexSet};
use polars::prelude::{Column, DataFrame};
use resultkit_io_xlsx::derive_text_from_any_value;

use crate::conf::{C_SUFFIX_MARKS, C_SUFFIX_TOTAL};
use crate::glyph::transliterate;
use crate::parse::{parse_subject_blocks, split_marks_total};
use crate::spec::{ResultKitResult, SpecResultOptions};

/// Per-row parsed marks keyed by subject code.
type DictRowMarks = IndexMap<String, String>;

/// Normalize the raw result table.
///
/// - the result column is parsed and removed,
/// - configured metadata columns are dropped,
/// - the name column is transliterated in place,
/// - subject `(marks, total)` pairs are appended after every passthrough column.
///
/// A missing result or name column skips that step with a warning.
pub fn normalize_result_table(
    df_raw: &DataFrame,
    options: &SpecResultOptions,
) -> ResultKitResult<DataFrame> {
    let n_height = df_raw.height();
    let l_col_names: Vec<&str> = df_raw.get_column_names_str();

    // Pass 1: parse every row and fix the subject schema.
    let (l_rows_marks, set_subjects) = if l_col_names.contains(&options.col_result.as_str()) {
        collect_row_marks(df_raw.column(&options.col_result)?, n_height)?
    } else {
        log::warn!(
            "'{}' column not found; no subject columns will be produced",
            options.col_result
        );
        (vec![DictRowMarks::new(); n_height], IndexSet::new())
    };
    log::info!(
        "parsed {} row(s), found {} subject(s)",
        n_height,
        set_subjects.len()
    );

    let set_subject_cols: IndexSet<String> = set_subjects
        .iter()
        .flat_map(|c_subject| {
            [
                format!("{c_subject}{C_SUFFIX_MARKS}"),
                format!("{c_subject}{C_SUFFIX_TOTAL}"),
            ]
        })
        .collect();

    let mut l_columns: Vec<Column> = Vec::with_capacity(l_col_names.len() + set_subject_cols.len());
    let mut if_name_seen = false;
    for column in df_raw.get_columns() {
        let c_name = column.name().as_str();
        if c_name == options.col_result || options.cols_dropped.iter().any(|c| c == c_name) {
            continue;
        }
        if set_subject_cols.contains(c_name) {
            log::warn!("input column '{c_name}' is replaced by the parsed subject column");
            continue;
        }
        if c_name == options.col_name {
            if_name_seen = true;
            l_columns.push(transliterate_column(column, n_height)?);
            continue;
        }
        l_columns.push(column.clone());
    }
    if !if_name_seen {
        log::warn!(
            "'{}' column not found; names are left untransliterated",
            options.col_name
        );
    }

    // Pass 2: fixed-width subject columns.
    for c_subject in &set_subjects {
        let mut l_marks: Vec<String> = Vec::with_capacity(n_height);
        let mut l_totals: Vec<Option<i64>> = Vec::with_capacity(n_height);
        for dict_row in &l_rows_marks {
            match dict_row.get(c_subject) {
                Some(c_marks) => {
                    let (c_marks_left, n_total) = split_marks_total(c_marks);
                    l_marks.push(c_marks_left);
                    l_totals.push(n_total);
                }
                None => {
                    l_marks.push(String::new());
                    l_totals.push(None);
                }
            }
        }
        l_columns.push(Column::new(
            format!("{c_subject}{C_SUFFIX_MARKS}").into(),
            l_marks,
        ));
        l_columns.push(Column::new(
            format!("{c_subject}{C_SUFFIX_TOTAL}").into(),
            l_totals,
        ));
    }

    Ok(DataFrame::new(l_columns)?)
}

fn collect_row_marks(
    column: &Column,
    n_height: usize,
) -> ResultKitResult<(Vec<DictRowMarks>, IndexSet<String>)> {
    let mut l_rows_marks = Vec::with_capacity(n_height);
    let mut set_subjects: IndexSet<String> = IndexSet::new();
    for n_idx in 0..n_height {
        let text = derive_text_from_any_value(&column.get(n_idx)?);
        let mut dict_row = DictRowMarks::new();
        for result in parse_subject_blocks(text.as_deref()) {
            set_subjects.insert(result.subject_code.clone());
            dict_row.insert(result.subject_code, result.marks_raw);
        }
        l_rows_marks.push(dict_row);
    }
    Ok((l_rows_marks, set_subjects))
}

fn transliterate_column(column: &Column, n_height: usize) -> ResultKitResult<Column> {
    let mut l_values: Vec<Option<String>> = Vec::with_capacity(n_height);
    for n_idx in 0..n_height {
        l_values.push(derive_text_from_any_value(&column.get(n_idx)?).map(|c| transliterate(&c)));
    }
    Ok(Column::new(column.name().clone(), l_values))
}
