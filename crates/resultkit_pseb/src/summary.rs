//! Section-wise performance aggregation over `<SUBJECT>_total` columns.

use std::cmp::Ordering;

use indexmap::IndexMap;
use polars::prelude::{Column, DataFrame};
use resultkit_io_xlsx::{derive_f64_from_any_value, derive_text_from_any_value};

use crate::conf::{C_SUFFIX_TOTAL, N_PCT_THRESHOLD_HIGH, N_PCT_THRESHOLD_LOW, TUP_SUMMARY_COLUMNS};
use crate::report::SummaryObserver;
use crate::spec::{
    EnumSkipReason, ResultKitError, ResultKitResult, SpecResultOptions, SpecSectionSummaryEntry,
};

const C_TABLE_STUDENTS: &str = "student sheet";
const C_TABLE_MAX_MARKS: &str = "max marks sheet";

/// Max marks resolved for one subject before any section is visited.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EnumMaxMarks {
    Valid(f64),
    Invalid,
}

/// Build the subject -> max-marks lookup.
///
/// Column names and subject keys are trimmed; keys are upper-cased. Values that
/// do not coerce to a number are kept as `None`. A repeated subject keeps the
/// last value.
pub fn build_max_marks_lookup(
    df_max: &DataFrame,
    options: &SpecResultOptions,
) -> ResultKitResult<IndexMap<String, Option<f64>>> {
    let col_subject = find_column_trimmed(df_max, &options.col_max_subject)?;
    let col_max = find_column_trimmed(df_max, &options.col_max_marks)?;

    let mut dict_lookup = IndexMap::new();
    for n_idx in 0..df_max.height() {
        let Some(c_subject) = derive_text_from_any_value(&col_subject.get(n_idx)?) else {
            continue;
        };
        let c_key = c_subject.trim().to_uppercase();
        if c_key.is_empty() {
            continue;
        }
        dict_lookup.insert(c_key, derive_f64_from_any_value(&col_max.get(n_idx)?));
    }
    Ok(dict_lookup)
}

/// Compute per-section, per-subject score counts.
///
/// Sections are visited in ascending order (numeric keys numerically, before
/// text keys); rows with an empty section are ignored. Subjects follow the
/// column order of `df_students`. Skips are reported to `observer`.
pub fn aggregate_section_summary(
    df_students: &DataFrame,
    df_max: &DataFrame,
    options: &SpecResultOptions,
    observer: &mut dyn SummaryObserver,
) -> ResultKitResult<Vec<SpecSectionSummaryEntry>> {
    let l_col_names = df_students.get_column_names_str();
    if !l_col_names.contains(&options.col_section.as_str()) {
        return Err(ResultKitError::MissingColumn {
            column: options.col_section.clone(),
            table: C_TABLE_STUDENTS.to_string(),
        });
    }

    let l_total_cols: Vec<(&str, &Column)> = df_students
        .get_columns()
        .iter()
        .filter_map(|column| {
            let c_name = column.name().as_str();
            c_name
                .strip_suffix(C_SUFFIX_TOTAL)
                .filter(|c_subject| !c_subject.is_empty())
                .map(|c_subject| (c_subject, column))
        })
        .collect();
    if l_total_cols.is_empty() {
        return Err(ResultKitError::NoSubjectTotals);
    }

    let dict_lookup = build_max_marks_lookup(df_max, options)?;
    let mut l_max_marks: Vec<EnumMaxMarks> = Vec::with_capacity(l_total_cols.len());
    for (c_subject, _) in &l_total_cols {
        l_max_marks.push(resolve_max_marks(
            c_subject,
            &dict_lookup,
            options.default_max_marks,
            observer,
        ));
    }

    let dict_sections = group_rows_by_section(df_students.column(&options.col_section)?)?;

    let mut l_entries = Vec::new();
    for (c_section, l_row_idx) in &dict_sections {
        observer.on_section_start(c_section);
        let mut n_serial_no: u32 = 1;
        for ((c_subject, column), enum_max) in l_total_cols.iter().zip(&l_max_marks) {
            let EnumMaxMarks::Valid(n_max_marks) = *enum_max else {
                observer.on_subject_skipped(c_section, c_subject, &EnumSkipReason::InvalidMaxMarks);
                continue;
            };

            let mut l_scores: Vec<f64> = Vec::with_capacity(l_row_idx.len());
            for n_idx in l_row_idx {
                if let Some(n_score) = derive_f64_from_any_value(&column.get(*n_idx)?) {
                    l_scores.push(n_score);
                }
            }
            if l_scores.is_empty() {
                observer.on_subject_skipped(c_section, c_subject, &EnumSkipReason::NoValidScores);
                continue;
            }

            let (n_above_low, n_above_high) = count_above_thresholds(&l_scores, n_max_marks);
            let entry = SpecSectionSummaryEntry {
                serial_no: n_serial_no,
                section: c_section.clone(),
                subject: (*c_subject).to_string(),
                max_marks: n_max_marks,
                valid_score_count: l_scores.len() as u32,
                count_above_60pct: n_above_low,
                count_above_75pct: n_above_high,
            };
            observer.on_subject_counted(&entry);
            l_entries.push(entry);
            n_serial_no += 1;
        }
    }

    if l_entries.is_empty() {
        return Err(ResultKitError::NoValidData);
    }
    Ok(l_entries)
}

/// Lay summary entries out as the `performance` table.
///
/// `Max Marks` is written as integers when every value is integral.
pub fn derive_summary_dataframe(l_entries: &[SpecSectionSummaryEntry]) -> ResultKitResult<DataFrame> {
    let if_integral_max = l_entries
        .iter()
        .all(|entry| entry.max_marks.fract() == 0.0);
    let col_max_marks = if if_integral_max {
        Column::new(
            TUP_SUMMARY_COLUMNS[3].into(),
            l_entries
                .iter()
                .map(|entry| entry.max_marks as i64)
                .collect::<Vec<i64>>(),
        )
    } else {
        Column::new(
            TUP_SUMMARY_COLUMNS[3].into(),
            l_entries.iter().map(|entry| entry.max_marks).collect::<Vec<f64>>(),
        )
    };

    let l_columns = vec![
        Column::new(
            TUP_SUMMARY_COLUMNS[0].into(),
            l_entries
                .iter()
                .map(|entry| i64::from(entry.serial_no))
                .collect::<Vec<i64>>(),
        ),
        Column::new(
            TUP_SUMMARY_COLUMNS[1].into(),
            l_entries
                .iter()
                .map(|entry| entry.section.clone())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            TUP_SUMMARY_COLUMNS[2].into(),
            l_entries
                .iter()
                .map(|entry| entry.subject.clone())
                .collect::<Vec<String>>(),
        ),
        col_max_marks,
        Column::new(
            TUP_SUMMARY_COLUMNS[4].into(),
            l_entries
                .iter()
                .map(|entry| i64::from(entry.valid_score_count))
                .collect::<Vec<i64>>(),
        ),
        Column::new(
            TUP_SUMMARY_COLUMNS[5].into(),
            l_entries
                .iter()
                .map(|entry| i64::from(entry.count_above_60pct))
                .collect::<Vec<i64>>(),
        ),
        Column::new(
            TUP_SUMMARY_COLUMNS[6].into(),
            l_entries
                .iter()
                .map(|entry| i64::from(entry.count_above_75pct))
                .collect::<Vec<i64>>(),
        ),
    ];
    Ok(DataFrame::new(l_columns)?)
}

fn find_column_trimmed<'a>(df: &'a DataFrame, c_name: &str) -> ResultKitResult<&'a Column> {
    df.get_columns()
        .iter()
        .find(|column| column.name().as_str().trim() == c_name.trim())
        .ok_or_else(|| ResultKitError::MissingColumn {
            column: c_name.to_string(),
            table: C_TABLE_MAX_MARKS.to_string(),
        })
}

fn resolve_max_marks(
    c_subject: &str,
    dict_lookup: &IndexMap<String, Option<f64>>,
    n_default: f64,
    observer: &mut dyn SummaryObserver,
) -> EnumMaxMarks {
    let n_value = match dict_lookup.get(&c_subject.trim().to_uppercase()) {
        Some(n_value) => *n_value,
        None => {
            observer.on_max_marks_defaulted(c_subject, n_default);
            Some(n_default)
        }
    };
    match n_value {
        Some(n_max) if n_max.is_finite() && n_max > 0.0 => EnumMaxMarks::Valid(n_max),
        _ => EnumMaxMarks::Invalid,
    }
}

fn group_rows_by_section(column: &Column) -> ResultKitResult<Vec<(String, Vec<usize>)>> {
    let mut dict_groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for n_idx in 0..column.len() {
        let Some(c_section) = derive_text_from_any_value(&column.get(n_idx)?) else {
            continue;
        };
        if c_section.trim().is_empty() {
            continue;
        }
        dict_groups.entry(c_section).or_default().push(n_idx);
    }
    let mut l_groups: Vec<(String, Vec<usize>)> = dict_groups.into_iter().collect();
    l_groups.sort_by(|(c_a, _), (c_b, _)| compare_section_keys(c_a, c_b));
    Ok(l_groups)
}

fn compare_section_keys(c_a: &str, c_b: &str) -> Ordering {
    match (c_a.trim().parse::<f64>(), c_b.trim().parse::<f64>()) {
        (Ok(n_a), Ok(n_b)) => n_a.total_cmp(&n_b).then_with(|| c_a.cmp(c_b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => c_a.cmp(c_b),
    }
}

/// Count scores strictly above the low and high percentage thresholds.
fn count_above_thresholds(l_scores: &[f64], n_max_marks: f64) -> (u32, u32) {
    let mut n_above_low = 0;
    let mut n_above_high = 0;
    for n_score in l_scores {
        let n_pct = n_score / n_max_marks * 100.0;
        if n_pct > N_PCT_THRESHOLD_LOW {
            n_above_low += 1;
        }
        if n_pct > N_PCT_THRESHOLD_HIGH {
            n_above_high += 1;
        }
    }
    (n_above_low, n_above_high)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{AnyValue, DataType};

    use super::*;
    use crate::report::{NoopSummaryObserver, ReportSummaryBuilder};

    fn build_max_df(l_subjects: &[&str], l_max: &[f64]) -> DataFrame {
        DataFrame::new(vec![
            Column::new("Subject".into(), l_subjects),
            Column::new("MM".into(), l_max),
        ])
        .expect("dataframe")
    }

    fn summarize(df_students: &DataFrame, df_max: &DataFrame) -> ResultKitResult<Vec<SpecSectionSummaryEntry>> {
        aggregate_section_summary(
            df_students,
            df_max,
            &SpecResultOptions::default(),
            &mut NoopSummaryObserver,
        )
    }

    #[test]
    fn test_aggregate_counts_per_section() {
        let df_students = DataFrame::new(vec![
            Column::new("Section".into(), ["A", "A", "B"]),
            Column::new("PHY_total".into(), [72i64, 50, 80]),
        ])
        .expect("dataframe");
        let l_entries = summarize(&df_students, &build_max_df(&["PHY"], &[100.0]))
            .expect("summary");

        assert_eq!(l_entries.len(), 2);
        assert_eq!(l_entries[0].section, "A");
        assert_eq!(l_entries[0].serial_no, 1);
        assert_eq!(l_entries[0].valid_score_count, 2);
        assert_eq!(l_entries[0].count_above_60pct, 1);
        assert_eq!(l_entries[0].count_above_75pct, 0);
        assert_eq!(l_entries[1].section, "B");
        assert_eq!(l_entries[1].valid_score_count, 1);
        assert_eq!(l_entries[1].count_above_60pct, 1);
        assert_eq!(l_entries[1].count_above_75pct, 1);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let df_students = DataFrame::new(vec![
            Column::new("Section".into(), ["A", "A"]),
            Column::new("PHY_total".into(), [30i64, 37]),
        ])
        .expect("dataframe");
        let l_entries = summarize(&df_students, &build_max_df(&["PHY"], &[50.0]))
            .expect("summary");
        // 60% and 74% of 50
        assert_eq!(l_entries[0].count_above_60pct, 1);
        assert_eq!(l_entries[0].count_above_75pct, 0);
    }

    #[test]
    fn test_non_numeric_totals_are_skipped() {
        let df_students = DataFrame::new(vec![
            Column::new("Section".into(), ["A", "A", "A"]),
            Column::new("PHY_total".into(), ["ABS", "", "x"]),
            Column::new("MAT_total".into(), [Some(90i64), None, Some(40)]),
        ])
        .expect("dataframe");
        let mut observer = ReportSummaryBuilder::default();
        let l_entries = aggregate_section_summary(
            &df_students,
            &build_max_df(&["PHY", "MAT"], &[100.0, 100.0]),
            &SpecResultOptions::default(),
            &mut observer,
        )
        .expect("summary");

        assert_eq!(l_entries.len(), 1);
        assert_eq!(l_entries[0].subject, "MAT");
        assert_eq!(l_entries[0].serial_no, 1);
        assert_eq!(l_entries[0].valid_score_count, 2);
        let report = observer.build();
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(report.cnt_entries, 1);
    }

    #[test]
    fn test_only_non_numeric_totals_reports_no_valid_data() {
        let df_students = DataFrame::new(vec![
            Column::new("Section".into(), ["A", "B"]),
            Column::new("PHY_total".into(), ["ABS", "RL"]),
        ])
        .expect("dataframe");
        assert!(matches!(
            summarize(&df_students, &build_max_df(&["PHY"], &[100.0])),
            Err(ResultKitError::NoValidData)
        ));
    }

    #[test]
    fn test_missing_section_and_missing_totals_are_structural() {
        let df_no_section = DataFrame::new(vec![Column::new("PHY_total".into(), [1i64])])
            .expect("dataframe");
        assert!(matches!(
            summarize(&df_no_section, &build_max_df(&["PHY"], &[100.0])),
            Err(ResultKitError::MissingColumn { ref column, .. }) if column == "Section"
        ));

        let df_no_totals = DataFrame::new(vec![
            Column::new("Section".into(), ["A"]),
            Column::new("PHY_marks".into(), ["45"]),
        ])
        .expect("dataframe");
        assert!(matches!(
            summarize(&df_no_totals, &build_max_df(&["PHY"], &[100.0])),
            Err(ResultKitError::NoSubjectTotals)
        ));
    }

    #[test]
    fn test_max_marks_default_and_invalid_values() {
        let df_students = DataFrame::new(vec![
            Column::new("Section".into(), ["A"]),
            Column::new("ENG_total".into(), [70i64]),
            Column::new("HIN_total".into(), [70i64]),
            Column::new("PHY_total".into(), [70i64]),
        ])
        .expect("dataframe");
        let df_max = DataFrame::new(vec![
            Column::new(" Subject ".into(), [" hin ", "PHY"]),
            Column::new("MM".into(), ["0", "80"]),
        ])
        .expect("dataframe");

        let mut observer = ReportSummaryBuilder::default();
        let l_entries = aggregate_section_summary(
            &df_students,
            &df_max,
            &SpecResultOptions::default(),
            &mut observer,
        )
        .expect("summary");

        let l_subjects: Vec<&str> = l_entries.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(l_subjects, vec!["ENG", "PHY"]);
        assert_eq!(l_entries[0].max_marks, 100.0);
        assert_eq!(l_entries[1].max_marks, 80.0);
        assert_eq!(l_entries[1].serial_no, 2);
        assert_eq!(l_entries[1].count_above_75pct, 1);

        let report = observer.build();
        assert_eq!(report.cnt_defaulted, 1);
        assert_eq!(report.cnt_skipped, 1);
    }

    #[test]
    fn test_sections_sorted_and_empty_sections_ignored() {
        let df_students = DataFrame::new(vec![
            Column::new(
                "Section".into(),
                [Some("B"), Some("10"), None, Some("9"), Some(""), Some("A")],
            ),
            Column::new("PHY_total".into(), [1i64, 2, 3, 4, 5, 6]),
        ])
        .expect("dataframe");
        let l_entries = summarize(&df_students, &build_max_df(&["PHY"], &[100.0]))
            .expect("summary");
        let l_sections: Vec<&str> = l_entries.iter().map(|e| e.section.as_str()).collect();
        assert_eq!(l_sections, vec!["9", "10", "A", "B"]);
    }

    #[test]
    fn test_derive_summary_dataframe_layout() {
        let l_entries = vec![SpecSectionSummaryEntry {
            serial_no: 1,
            section: "A".to_string(),
            subject: "PHY".to_string(),
            max_marks: 100.0,
            valid_score_count: 2,
            count_above_60pct: 1,
            count_above_75pct: 0,
        }];
        let df = derive_summary_dataframe(&l_entries).expect("dataframe");
        assert_eq!(df.get_column_names_str(), TUP_SUMMARY_COLUMNS.to_vec());
        let col_max = df.column("Max Marks").expect("Max Marks");
        assert_eq!(col_max.dtype(), &DataType::Int64);
        assert_eq!(col_max.get(0).expect("value"), AnyValue::Int64(100));
    }
}
