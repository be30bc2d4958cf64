//! Best-effort grammar for the free-text physical exam and lab blocks.
//!
//! Both blocks are "Label: value" text, either one entry per line or several
//! entries separated by commas. Rules:
//!
//! - The first colon in a segment splits label from value.
//! - A segment without a colon continues the previous entry, or opens an
//!   entry titled `GENERAL_SECTION` if there is none yet.
//! - An empty value after a label is kept as an empty string.
//! - Lookups for a test the text never mentions yield `RESULT_NOT_AVAILABLE`.

use serde::Serialize;

use pharmsim_contracts::catalog::{INVESTIGATIONS, NOT_PERFORMED, RESULT_NOT_AVAILABLE};

/// Title given to text that appears before any label.
pub const GENERAL_SECTION: &str = "General";

/// One titled block of the physical exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamSection {
    pub title: String,
    pub findings: String,
}

/// One line of the lab results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabEntry {
    pub name: String,
    pub value: String,
}

/// Split `raw` into (label, value) pairs.
fn labelled_segments(raw: &str, split_commas: bool) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for line in raw.lines() {
        let pieces: Vec<&str> = if split_commas {
            line.split(',').collect()
        } else {
            vec![line]
        };

        for piece in pieces {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }

            match piece.split_once(':') {
                Some((label, value)) if !label.trim().is_empty() => {
                    entries.push((label.trim().to_string(), value.trim().to_string()));
                }
                Some((_, value)) => continue_or_open(&mut entries, value.trim()),
                None => continue_or_open(&mut entries, piece),
            }
        }
    }

    entries
}

fn continue_or_open(entries: &mut Vec<(String, String)>, text: &str) {
    if text.is_empty() {
        return;
    }
    match entries.last_mut() {
        Some((_, value)) if value.is_empty() => value.push_str(text),
        Some((_, value)) => {
            value.push_str(", ");
            value.push_str(text);
        }
        None => entries.push((GENERAL_SECTION.to_string(), text.to_string())),
    }
}

/// Parse the physical exam block into display sections.
pub fn parse_exam_sections(raw: &str) -> Vec<ExamSection> {
    labelled_segments(raw, true)
        .into_iter()
        .map(|(title, findings)| ExamSection { title, findings })
        .collect()
}

/// Parse the lab block into entries.
///
/// Multi-line text is read one test per line, so commas inside a value are
/// kept. A single line is read as comma-separated entries.
pub fn parse_lab_results(raw: &str) -> Vec<LabEntry> {
    let single_line = raw.trim().lines().count() <= 1;
    labelled_segments(raw, single_line)
        .into_iter()
        .map(|(name, value)| LabEntry { name, value })
        .collect()
}

/// Abbreviations models use for catalog tests, lowercase.
const LAB_ALIASES: &[(&str, &str)] = &[
    ("cbc", "complete blood count"),
    ("fbc", "complete blood count"),
    ("bmp", "basic metabolic panel"),
    ("lft", "liver function tests"),
    ("lfts", "liver function tests"),
    ("rft", "renal function tests"),
    ("rfts", "renal function tests"),
    ("tft", "thyroid function tests"),
    ("tfts", "thyroid function tests"),
    ("fbg", "fasting blood glucose"),
    ("fbs", "fasting blood glucose"),
    ("a1c", "hba1c"),
    ("ua", "urinalysis"),
    ("ekg", "ecg"),
    ("lipid panel", "lipid profile"),
    ("electrolytes", "serum electrolytes"),
];

/// Lowercased label with any "(qualifier)" dropped and abbreviations expanded.
fn canonical_label(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    let head = match lower.find(" (") {
        Some(at) => lower[..at].trim_end(),
        None => lower.as_str(),
    };
    LAB_ALIASES
        .iter()
        .find(|(alias, _)| *alias == head)
        .map(|(_, full)| (*full).to_string())
        .unwrap_or_else(|| head.to_string())
}

fn label_matches(label: &str, test_name: &str) -> bool {
    let wanted = test_name.trim();
    if wanted.is_empty() {
        return false;
    }
    canonical_label(label) == canonical_label(wanted)
}

/// The result text for one test. Total: never fails, never panics.
pub fn parse_complex_lab_result(raw: &str, test_name: &str) -> String {
    parse_lab_results(raw)
        .into_iter()
        .find(|entry| label_matches(&entry.name, test_name))
        .map(|entry| entry.value)
        .unwrap_or_else(|| RESULT_NOT_AVAILABLE.to_string())
}

/// Catalog investigations the lab block does not mention.
pub fn missing_investigations(raw: &str) -> Vec<&'static str> {
    let entries = parse_lab_results(raw);
    INVESTIGATIONS
        .iter()
        .copied()
        .filter(|name| !entries.iter().any(|e| label_matches(&e.name, name)))
        .collect()
}

/// Append a "<name>: Not available" line for every missing catalog test.
pub fn ensure_lab_coverage(raw: &str) -> String {
    let missing = missing_investigations(raw);
    if missing.is_empty() {
        return raw.to_string();
    }

    let mut out = raw.trim_end().to_string();
    for name in missing {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(NOT_PERFORMED);
    }
    out
}
