use super::engine::{Recognition, TextRecognizer};
use super::parse::{format_for_display, parse_all};
use super::preprocess::Variant;

/// Best reading for one HUD line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Raw recognizer output of the winning variant
    pub raw: String,
    /// Formatted first record of the winner, or empty when nothing parsed
    pub display: String,
}

/// Ranking key for a variant's reading. Compared field by field: any parsed
/// record beats raw text length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score {
    pub records: usize,
    pub text_len: usize,
}

impl Score {
    pub fn of(text: &str, records: usize) -> Self {
        Self {
            records,
            text_len: text.chars().count(),
        }
    }
}

/// Runs the recognizer over each variant in order and keeps the best reading.
///
/// A later variant replaces the current best only with a strictly greater
/// score, so ties go to the earlier variant. Each variant is dropped once
/// scored. Recognizer failures are logged and count as empty text.
pub fn select_best<R: TextRecognizer + ?Sized>(recognizer: &R, variants: Vec<Variant>) -> Candidate {
    let mut best: Option<(Score, Candidate)> = None;

    for variant in variants {
        let text = match recognizer.recognize(&variant.image) {
            Recognition::Failed(e) => {
                crate::log(&format!("OCR failed on {}: {}", variant.tag.as_str(), e));
                String::new()
            }
            other => other.into_text(),
        };
        drop(variant);

        let records = parse_all(&text);
        let score = Score::of(&text, records.len());
        if best.as_ref().is_none_or(|(b, _)| score > *b) {
            let display = records.first().map(format_for_display).unwrap_or_default();
            best = Some((score, Candidate { raw: text, display }));
        }
    }

    best.map(|(_, c)| c).unwrap_or_default()
}
