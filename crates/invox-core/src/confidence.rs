//! Overall confidence scoring.

use std::collections::BTreeMap;

use crate::models::{FieldKey, FieldState};

/// Arithmetic mean of per-field confidences across populated fields,
/// rounded to the nearest integer. Unset fields do not penalize the
/// score; an empty result scores 0. Manually edited fields contribute
/// their pre-edit confidence.
pub fn score(fields: &BTreeMap<FieldKey, FieldState>) -> u8 {
    let confidences: Vec<u8> = fields
        .values()
        .filter_map(|state| state.scoring_confidence())
        .collect();

    if confidences.is_empty() {
        return 0;
    }

    let sum: u32 = confidences.iter().map(|&c| c as u32).sum();
    let mean = (sum as f64 / confidences.len() as f64).round() as u8;
    mean.min(100)
}
