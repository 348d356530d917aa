use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::cleanup::extract_json_object;

/// Lowest score on the rubric
pub const MIN_SCORE: f64 = 1.0;
/// Highest score on the rubric
pub const MAX_SCORE: f64 = 5.0;

/// One axis of the quality rubric.
///
/// Variant order is the declared criterion order and breaks ties when
/// ranking weak criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Aesthetics,
    Modernity,
    FitToSubject,
    Usability,
    Consistency,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Aesthetics,
        Criterion::Modernity,
        Criterion::FitToSubject,
        Criterion::Usability,
        Criterion::Consistency,
    ];

    /// Key used in judge replies
    pub fn key(&self) -> &'static str {
        match self {
            Criterion::Aesthetics => "aesthetics",
            Criterion::Modernity => "modernity",
            Criterion::FitToSubject => "fit_to_subject",
            Criterion::Usability => "usability",
            Criterion::Consistency => "consistency",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Aesthetics => "Aesthetics",
            Criterion::Modernity => "Modernity",
            Criterion::FitToSubject => "Fit to subject",
            Criterion::Usability => "Usability",
            Criterion::Consistency => "Consistency",
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The judge's assessment of a single criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionAssessment {
    pub score: f64,
    pub reasoning: String,
}

/// The judge's verdict on one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score: f64,
    pub criteria: BTreeMap<Criterion, CriterionAssessment>,
    pub reasoning: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Error, Debug)]
pub enum EvaluationParseError {
    #[error("No JSON object found in judge response")]
    NoJsonFound,

    #[error("Failed to parse judge JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Judge response is not a JSON object")]
    NotAnObject,

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Field {0} is not a number")]
    NotANumber(String),

    #[error("Score for {field} is {value}, outside [1, 5]")]
    ScoreOutOfRange { field: String, value: f64 },

    #[error("Missing criterion: {0}")]
    MissingCriterion(Criterion),

    #[error("Missing or empty reasoning for {0}")]
    MissingReasoning(String),

    #[error("Suggestions must be an array")]
    SuggestionsNotArray,

    #[error("Suggestion {0} is not a string")]
    SuggestionNotString(usize),
}

impl Evaluation {
    /// Parse and validate a judge reply.
    ///
    /// The reply may be wrapped in code fences or surrounded by prose; the
    /// first `{` through the last `}` is taken as the JSON payload. Every
    /// score must lie in [1, 5] and is rejected, not clamped, otherwise.
    pub fn parse(judge_output: &str) -> Result<Self, EvaluationParseError> {
        debug!(output_len = judge_output.len(), "Parsing judge evaluation");

        let json = extract_json_object(judge_output).ok_or(EvaluationParseError::NoJsonFound)?;
        let value: Value = serde_json::from_str(json)?;
        let obj = value.as_object().ok_or(EvaluationParseError::NotAnObject)?;

        // Some models answer in camelCase
        let overall_key = if !obj.contains_key("overall_score") && obj.contains_key("overallScore")
        {
            "overallScore"
        } else {
            "overall_score"
        };
        let overall_score = read_score(obj, overall_key)?;

        let criteria_obj = obj
            .get("criteria")
            .and_then(Value::as_object)
            .ok_or_else(|| EvaluationParseError::MissingField("criteria".to_string()))?;

        let mut criteria = BTreeMap::new();
        for criterion in Criterion::ALL {
            let entry = criteria_obj
                .get(criterion.key())
                .and_then(Value::as_object)
                .ok_or(EvaluationParseError::MissingCriterion(criterion))?;
            let field = format!("criteria.{}", criterion.key());
            let score = read_score(entry, "score").map_err(|e| match e {
                EvaluationParseError::MissingField(_) => {
                    EvaluationParseError::MissingField(format!("{}.score", field))
                }
                EvaluationParseError::NotANumber(_) => {
                    EvaluationParseError::NotANumber(format!("{}.score", field))
                }
                EvaluationParseError::ScoreOutOfRange { value, .. } => {
                    EvaluationParseError::ScoreOutOfRange {
                        field: field.clone(),
                        value,
                    }
                }
                other => other,
            })?;
            let reasoning = read_reasoning(entry).ok_or(EvaluationParseError::MissingReasoning(field))?;
            criteria.insert(criterion, CriterionAssessment { score, reasoning });
        }

        let reasoning = read_reasoning(obj)
            .ok_or_else(|| EvaluationParseError::MissingReasoning("overall".to_string()))?;

        let suggestions = match obj.get("suggestions") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or(EvaluationParseError::SuggestionNotString(i))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(EvaluationParseError::SuggestionsNotArray),
        };

        Ok(Self {
            overall_score,
            criteria,
            reasoning,
            suggestions,
        })
    }

    /// Score of a single criterion
    pub fn criterion_score(&self, criterion: Criterion) -> Option<f64> {
        self.criteria.get(&criterion).map(|c| c.score)
    }

    /// The `n` lowest-scoring criteria, ascending by score.
    ///
    /// Equal scores keep declared criterion order, so the selection is
    /// stable for identical inputs.
    pub fn weakest_criteria(&self, n: usize) -> Vec<Criterion> {
        let mut ranked: Vec<(Criterion, f64)> = Criterion::ALL
            .iter()
            .filter_map(|c| self.criterion_score(*c).map(|s| (*c, s)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.into_iter().take(n).map(|(c, _)| c).collect()
    }

    /// Get a short description of the evaluation for logging
    pub fn short_description(&self) -> String {
        let weakest = self
            .weakest_criteria(1)
            .first()
            .map(|c| {
                format!(
                    ", weakest: {} {:.1}",
                    c,
                    self.criterion_score(*c).unwrap_or_default()
                )
            })
            .unwrap_or_default();
        format!("{:.2}/5{}", self.overall_score, weakest)
    }
}

fn read_score(obj: &Map<String, Value>, field: &str) -> Result<f64, EvaluationParseError> {
    let value = obj
        .get(field)
        .ok_or_else(|| EvaluationParseError::MissingField(field.to_string()))?;
    let score = value
        .as_f64()
        .ok_or_else(|| EvaluationParseError::NotANumber(field.to_string()))?;
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(EvaluationParseError::ScoreOutOfRange {
            field: field.to_string(),
            value: score,
        });
    }
    Ok(score)
}

fn read_reasoning(obj: &Map<String, Value>) -> Option<String> {
    obj.get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
