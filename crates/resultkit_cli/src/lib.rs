//! `resultkit_cli` v1:
//! Workbook pipeline behind the `pseb-analyse` binary.
//!
//! 1. read the raw result sheet, normalize it, save it as the processed sheet;
//! 2. read the max-marks sheet, aggregate, save the performance sheet.
//!
//! The processed sheet is saved before aggregation starts, so it survives an
//! aggregation failure.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use resultkit_io_xlsx::WorkbookEditor;
use resultkit_pseb::{
    LogSummaryObserver, ReportSummary, ReportSummaryBuilder, SpecResultOptions,
    SpecSectionSummaryEntry, aggregate_section_summary, derive_default_result_options,
    derive_summary_dataframe, normalize_result_table,
};

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct SpecPipelineOutcome {
    /// Workbook that was updated.
    pub path_file: PathBuf,
    /// Rows in the processed sheet.
    pub n_rows_processed: usize,
    /// Columns in the processed sheet.
    pub n_cols_processed: usize,
    /// Rows written to the performance sheet.
    pub l_entries: Vec<SpecSectionSummaryEntry>,
    /// Aggregation counters and notices.
    pub report: ReportSummary,
}

/// Load options from an optional TOML file; defaults apply without one.
pub fn load_options(path_config: Option<&Path>) -> Result<SpecResultOptions> {
    let Some(path_config) = path_config else {
        return Ok(derive_default_result_options());
    };
    let txt = fs::read_to_string(path_config)
        .with_context(|| format!("failed to read config file {}", path_config.display()))?;
    let options = SpecResultOptions::from_toml_str(&txt)
        .with_context(|| format!("failed to load config file {}", path_config.display()))?;
    log::debug!("loaded options from {}", path_config.display());
    Ok(options)
}

/// Run normalization then aggregation against the workbook at `path_file`.
pub fn run_pipeline(path_file: &Path, options: &SpecResultOptions) -> Result<SpecPipelineOutcome> {
    let mut editor = WorkbookEditor::open(path_file)
        .with_context(|| format!("failed to open workbook {}", path_file.display()))?;

    // Step 1: normalize the raw sheet.
    let df_raw = editor
        .sheet(&options.sheet_input)
        .context("sheet loading error")?;
    let df_processed = normalize_result_table(df_raw, options)
        .with_context(|| format!("failed to normalize sheet '{}'", options.sheet_input))?;
    let (n_rows_processed, n_cols_processed) = df_processed.shape();

    editor.upsert_sheet(&options.sheet_processed, df_processed);
    editor
        .save()
        .with_context(|| format!("failed to save workbook {}", path_file.display()))?;
    log::info!(
        "processed result saved to '{}' sheet of {}",
        options.sheet_processed,
        editor.path().display()
    );

    // Step 2: section-wise performance.
    let df_max = editor
        .sheet(&options.sheet_max_marks)
        .context("sheet loading error")?;
    let df_students = editor
        .sheet(&options.sheet_processed)
        .context("sheet loading error")?;

    let mut observer = (LogSummaryObserver, ReportSummaryBuilder::default());
    let l_entries = aggregate_section_summary(df_students, df_max, options, &mut observer)?;
    let df_summary = derive_summary_dataframe(&l_entries)?;

    editor.upsert_sheet(&options.sheet_performance, df_summary);
    editor
        .save()
        .with_context(|| format!("failed to save workbook {}", path_file.display()))?;
    log::info!(
        "section-wise report saved to '{}' sheet of {}",
        options.sheet_performance,
        editor.path().display()
    );

    Ok(SpecPipelineOutcome {
        path_file: path_file.to_path_buf(),
        n_rows_processed,
        n_cols_processed,
        l_entries,
        report: observer.1.build(),
    })
}
