//! Scoring of decoded sheets against per-version answer keys.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::SheetResult;

/// Correct letters for one exam version
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKey {
    pub version: String,
    pub answers: BTreeMap<u32, char>,
}

/// Load a JSON list of answer keys
pub fn load_answer_keys(path: impl AsRef<Path>) -> anyhow::Result<Vec<AnswerKey>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answer keys {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse answer keys {}", path.display()))
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GradingError {
    #[error("no answer key for exam version {0}")]
    UnknownVersion(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub student_id: String,
    pub exam_version: String,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub score: f64,
}

/// Grade a sheet with the key matching its exam version.
///
/// Every question is worth `exam_value / total_questions`, where the total
/// is the length of the first key in `keys`, so all versions of an exam are
/// scored on one scale. A row with no selection never matches.
pub fn grade(sheet: &SheetResult, keys: &[AnswerKey], exam_value: f64) -> Result<GradeReport, GradingError> {
    let key = keys
        .iter()
        .find(|k| k.version == sheet.exam_version)
        .ok_or_else(|| GradingError::UnknownVersion(sheet.exam_version.clone()))?;

    let total_questions = keys.first().map_or(0, |k| k.answers.len() as u32).max(1);
    let correct_answers = sheet
        .entries()
        .filter(|entry| {
            key.answers
                .get(&entry.question)
                .is_some_and(|expected| entry.answer.letter() == Some(expected.to_ascii_uppercase()))
        })
        .count() as u32;

    Ok(GradeReport {
        student_id: sheet.student_id.clone(),
        exam_version: sheet.exam_version.clone(),
        correct_answers,
        total_questions,
        score: correct_answers as f64 * exam_value / total_questions as f64,
    })
}
