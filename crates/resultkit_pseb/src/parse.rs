//! Composite result string parsing.
//!
//! A result string is a `|`-delimited list of subject blocks such as
//! `"PHY- 45+10 = 55 (A+) | MAT- 88"`.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::conf::{C_SUFFIX_GRADE, C_SUFFIX_MARKS};
use crate::spec::SpecSubjectResult;

const C_BLOCK_DELIMITER: char = '|';
const C_TOTAL_SEPARATOR: char = '=';

static RE_BLOCK_FULL: OnceLock<Option<Regex>> = OnceLock::new();
static RE_BLOCK_FALLBACK: OnceLock<Option<Regex>> = OnceLock::new();

fn derive_re_block_full() -> Option<&'static Regex> {
    RE_BLOCK_FULL
        .get_or_init(|| {
            Regex::new(
                r"^(?P<subject>[A-Z]{2,5})- (?P<marks>[\d+ =]+)\s+\((?P<grade>[A-Z+]+)\)",
            )
            .ok()
        })
        .as_ref()
}

fn derive_re_block_fallback() -> Option<&'static Regex> {
    RE_BLOCK_FALLBACK
        .get_or_init(|| Regex::new(r"^(?P<subject>[A-Z]{2,5})- (?P<marks>.+)").ok())
        .as_ref()
}

/// Parse one trimmed subject block; `None` when it matches neither form.
pub fn parse_subject_block(block: &str) -> Option<SpecSubjectResult> {
    if let Some(re) = derive_re_block_full()
        && let Some(caps) = re.captures(block)
    {
        return Some(SpecSubjectResult {
            subject_code: caps["subject"].to_string(),
            marks_raw: caps["marks"].trim().to_string(),
            grade: caps["grade"].trim().to_string(),
        });
    }

    let re = derive_re_block_fallback()?;
    let caps = re.captures(block)?;
    Some(SpecSubjectResult {
        subject_code: caps["subject"].to_string(),
        marks_raw: caps["marks"].trim().to_string(),
        grade: String::new(),
    })
}

/// Parse every block of a result string, in input order.
///
/// Blocks matching neither form are dropped; a repeated subject keeps both
/// entries here and is resolved by the caller.
pub fn parse_subject_blocks(text: Option<&str>) -> Vec<SpecSubjectResult> {
    let Some(text) = text else {
        return Vec::new();
    };
    text.split(C_BLOCK_DELIMITER)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .filter_map(parse_subject_block)
        .collect()
}

/// Parse a result string into `<SUBJECT>_marks` / `<SUBJECT>_grade` fields.
///
/// Missing input yields an empty map. A subject appearing twice keeps its
/// first key position and the last values.
pub fn parse_result_string(text: Option<&str>) -> IndexMap<String, String> {
    let mut dict_fields = IndexMap::new();
    for result in parse_subject_blocks(text) {
        dict_fields.insert(
            format!("{}{C_SUFFIX_MARKS}", result.subject_code),
            result.marks_raw,
        );
        dict_fields.insert(format!("{}{C_SUFFIX_GRADE}", result.subject_code), result.grade);
    }
    dict_fields
}

/// Split marks text once on the first `=` into `(marks, total)`.
///
/// Without `=` the text is returned unchanged with no total; a right-hand side
/// that is not an integer also yields no total.
pub fn split_marks_total(marks: &str) -> (String, Option<i64>) {
    match marks.split_once(C_TOTAL_SEPARATOR) {
        Some((c_left, c_right)) => (c_left.trim().to_string(), c_right.trim().parse().ok()),
        None => (marks.to_string(), None),
    }
}
