//! Aggregation observers and the summary report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{EnumSkipReason, SpecSectionSummaryEntry};

/// Progress hooks called by the section aggregation.
///
/// Every hook has an empty default, so observers implement only what they need.
pub trait SummaryObserver {
    /// A section group is about to be processed.
    fn on_section_start(&mut self, _section: &str) {}

    /// A subject has no max-marks entry and uses the default.
    fn on_max_marks_defaulted(&mut self, _subject: &str, _n_default: f64) {}

    /// A summary row was produced.
    fn on_subject_counted(&mut self, _entry: &SpecSectionSummaryEntry) {}

    /// A subject produced no row for `section`.
    fn on_subject_skipped(&mut self, _section: &str, _subject: &str, _reason: &EnumSkipReason) {}
}

impl<A: SummaryObserver, B: SummaryObserver> SummaryObserver for (A, B) {
    fn on_section_start(&mut self, section: &str) {
        self.0.on_section_start(section);
        self.1.on_section_start(section);
    }

    fn on_max_marks_defaulted(&mut self, subject: &str, n_default: f64) {
        self.0.on_max_marks_defaulted(subject, n_default);
        self.1.on_max_marks_defaulted(subject, n_default);
    }

    fn on_subject_counted(&mut self, entry: &SpecSectionSummaryEntry) {
        self.0.on_subject_counted(entry);
        self.1.on_subject_counted(entry);
    }

    fn on_subject_skipped(&mut self, section: &str, subject: &str, reason: &EnumSkipReason) {
        self.0.on_subject_skipped(section, subject, reason);
        self.1.on_subject_skipped(section, subject, reason);
    }
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSummaryObserver;

impl SummaryObserver for NoopSummaryObserver {}

/// Observer that forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSummaryObserver;

impl SummaryObserver for LogSummaryObserver {
    fn on_section_start(&mut self, section: &str) {
        log::info!("processing section: {section}");
    }

    fn on_max_marks_defaulted(&mut self, subject: &str, n_default: f64) {
        log::warn!("'{subject}' has no max marks entry; using default {n_default}");
    }

    fn on_subject_counted(&mut self, entry: &SpecSectionSummaryEntry) {
        log::info!(
            "{}: found {} valid scores in section {} (max = {})",
            entry.subject,
            entry.valid_score_count,
            entry.section,
            entry.max_marks
        );
    }

    fn on_subject_skipped(&mut self, section: &str, subject: &str, reason: &EnumSkipReason) {
        log::warn!("skipping '{subject}' in section {section}: {reason}");
    }
}

/// Aggregate counters and diagnostics for one aggregation run.
#[derive(Debug, Default, Clone)]
pub struct ReportSummary {
    /// Section groups processed.
    pub cnt_sections: u64,
    /// Summary rows produced.
    pub cnt_entries: u64,
    /// `(section, subject)` pairs skipped.
    pub cnt_skipped: u64,
    /// Subjects that fell back to the default max marks.
    pub cnt_defaulted: u64,
    /// Non-fatal notices, in event order.
    pub warnings: Vec<String>,
}

impl ReportSummary {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_sections".to_string(), self.cnt_sections);
        dict_counts.insert("cnt_entries".to_string(), self.cnt_entries);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_defaulted".to_string(), self.cnt_defaulted);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} sections={} entries={} skipped={} defaulted={} warnings={}",
            dict_counts["cnt_sections"],
            dict_counts["cnt_entries"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_defaulted"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SUMMARY]"))
    }
}

/// Observer that accumulates a [`ReportSummary`].
#[derive(Debug, Default, Clone)]
pub struct ReportSummaryBuilder {
    /// See [`ReportSummary::cnt_sections`].
    pub cnt_sections: u64,
    /// See [`ReportSummary::cnt_entries`].
    pub cnt_entries: u64,
    /// See [`ReportSummary::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportSummary::cnt_defaulted`].
    pub cnt_defaulted: u64,
    /// See [`ReportSummary::warnings`].
    pub warnings: Vec<String>,
}

impl ReportSummaryBuilder {
    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportSummary {
        ReportSummary {
            cnt_sections: self.cnt_sections,
            cnt_entries: self.cnt_entries,
            cnt_skipped: self.cnt_skipped,
            cnt_defaulted: self.cnt_defaulted,
            warnings: self.warnings,
        }
    }
}

impl SummaryObserver for ReportSummaryBuilder {
    fn on_section_start(&mut self, _section: &str) {
        self.cnt_sections += 1;
    }

    fn on_max_marks_defaulted(&mut self, subject: &str, n_default: f64) {
        self.cnt_defaulted += 1;
        self.add_warning(format!("'{subject}' uses default max marks {n_default}"));
    }

    fn on_subject_counted(&mut self, _entry: &SpecSectionSummaryEntry) {
        self.cnt_entries += 1;
    }

    fn on_subject_skipped(&mut self, section: &str, subject: &str, reason: &EnumSkipReason) {
        self.cnt_skipped += 1;
        self.add_warning(format!("skipped '{subject}' in section {section}: {reason}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summary_to_dict_and_format() {
        let report = ReportSummary {
            cnt_sections: 2,
            cnt_entries: 3,
            cnt_skipped: 1,
            cnt_defaulted: 0,
            warnings: vec!["w".to_string()],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_sections"], 2);
        assert_eq!(dict_counts["cnt_entries"], 3);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[SUMMARY]");
        assert_eq!(
            txt,
            "[SUMMARY] sections=2 entries=3 skipped=1 defaulted=0 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn test_builder_collects_events_through_pair_observer() {
        let mut observer = (LogSummaryObserver, ReportSummaryBuilder::default());
        observer.on_section_start("A");
        observer.on_max_marks_defaulted("PHY", 100.0);
        observer.on_subject_skipped("A", "MAT", &EnumSkipReason::NoValidScores);

        let report = observer.1.build();
        assert_eq!(report.cnt_sections, 1);
        assert_eq!(report.cnt_defaulted, 1);
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(
            report.warnings,
            vec![
                "'PHY' uses default max marks 100".to_string(),
                "skipped 'MAT' in section A: no valid numeric marks".to_string(),
            ]
        );
    }
}
