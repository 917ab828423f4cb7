// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The structured interview summary and its validation rules.
//!
//! The model is asked for JSON matching [`StructuredSummary::json_schema`],
//! but its output is never trusted: [`StructuredSummary::parse`] rejects
//! unknown fields and checks every bound, reporting all violations at once.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use parley_core::ParleyError;

/// Overall rating, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Rating {
    Outstanding,
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Fair,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    #[serde(rename = "Poor Performance")]
    PoorPerformance,
}

impl Rating {
    /// Every rating, ordered best to worst.
    pub const ALL: [Rating; 7] = [
        Rating::Outstanding,
        Rating::Excellent,
        Rating::VeryGood,
        Rating::Good,
        Rating::Fair,
        Rating::NeedsImprovement,
        Rating::PoorPerformance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Outstanding => "Outstanding",
            Rating::Excellent => "Excellent",
            Rating::VeryGood => "Very Good",
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::NeedsImprovement => "Needs Improvement",
            Rating::PoorPerformance => "Poor Performance",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-area scores, each 0 to 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SectionScores {
    pub behavioral: f64,
    pub technical: f64,
    pub communication: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListeningAdaptability {
    /// Whether answers addressed exactly what was asked (10-300 chars).
    pub answered_exactly: String,
    /// How the candidate adapted to follow-ups (10-300 chars).
    pub adaptability: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DomainSpecificInsight {
    /// Depth of domain knowledge (10-300 chars).
    pub depth: String,
    /// Awareness of industry context (10-300 chars).
    pub industry_awareness: String,
}

/// Structured evaluation of a whole interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StructuredSummary {
    /// Balanced high-level evaluation.
    pub overall_performance: String,
    /// Role and type of the interview.
    pub title: String,
    /// Overall score from 0 to 10.
    pub score: f64,
    pub rating: Rating,
    pub section_scores: SectionScores,
    /// 2-5 unique items, each 3-100 chars.
    pub strengths: Vec<String>,
    /// 2-4 unique items, each 3-150 chars.
    pub areas_of_improvement: Vec<String>,
    pub listening_adaptability: ListeningAdaptability,
    pub domain_specific_insight: DomainSpecificInsight,
    /// 10-400 chars.
    pub communication_skills: String,
    /// 1-5 unique items, each 5-200 chars.
    pub recommended_practice: Vec<String>,
}

impl StructuredSummary {
    /// JSON Schema handed to the model as the response format.
    pub fn json_schema() -> Result<serde_json::Value, ParleyError> {
        let schema = schemars::schema_for!(StructuredSummary);
        let mut value = serde_json::to_value(&schema)
            .map_err(|e| ParleyError::Internal(format!("failed to serialize summary schema: {e}")))?;
        if let Some(object) = value.as_object_mut() {
            object.remove("$schema");
        }
        Ok(value)
    }

    /// Decodes model output and validates it.
    ///
    /// A Markdown code fence around the JSON is tolerated.
    pub fn parse(content: &str) -> Result<Self, ParleyError> {
        let json = strip_code_fence(content);
        let summary: StructuredSummary = serde_json::from_str(json).map_err(|e| {
            ParleyError::validation(format!("summary does not match the schema: {e}"))
        })?;
        summary.validate()?;
        Ok(summary)
    }

    /// Checks every field bound, collecting all violations.
    pub fn validate(&self) -> Result<(), ParleyError> {
        let mut violations = Vec::new();

        check_text(&mut violations, "overallPerformance", &self.overall_performance, 1, None);
        check_text(&mut violations, "title", &self.title, 1, None);
        check_score(&mut violations, "score", self.score);
        check_score(&mut violations, "sectionScores.behavioral", self.section_scores.behavioral);
        check_score(&mut violations, "sectionScores.technical", self.section_scores.technical);
        check_score(
            &mut violations,
            "sectionScores.communication",
            self.section_scores.communication,
        );
        check_list(&mut violations, "strengths", &self.strengths, (2, 5), (3, 100));
        check_list(
            &mut violations,
            "areasOfImprovement",
            &self.areas_of_improvement,
            (2, 4),
            (3, 150),
        );
        check_text(
            &mut violations,
            "listeningAdaptability.answeredExactly",
            &self.listening_adaptability.answered_exactly,
            10,
            Some(300),
        );
        check_text(
            &mut violations,
            "listeningAdaptability.adaptability",
            &self.listening_adaptability.adaptability,
            10,
            Some(300),
        );
        check_text(
            &mut violations,
            "domainSpecificInsight.depth",
            &self.domain_specific_insight.depth,
            10,
            Some(300),
        );
        check_text(
            &mut violations,
            "domainSpecificInsight.industryAwareness",
            &self.domain_specific_insight.industry_awareness,
            10,
            Some(300),
        );
        check_text(
            &mut violations,
            "communicationSkills",
            &self.communication_skills,
            10,
            Some(400),
        );
        check_list(
            &mut violations,
            "recommendedPractice",
            &self.recommended_practice,
            (1, 5),
            (5, 200),
        );

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ParleyError::validation(format!(
                "structured summary rejected: {}",
                violations.join("; ")
            )))
        }
    }

    /// Summary for a session in which no interview took place.
    pub fn no_interview() -> Self {
        Self {
            overall_performance: "No interview conversation took place, so there is no evidence of the candidate's skills to assess.".into(),
            title: "Interview Not Conducted".into(),
            score: 0.0,
            rating: Rating::PoorPerformance,
            section_scores: SectionScores {
                behavioral: 0.0,
                technical: 0.0,
                communication: 0.0,
            },
            strengths: vec![
                "Started an interview session".into(),
                "Requested structured feedback".into(),
            ],
            areas_of_improvement: vec![
                "Take part in the interview before requesting a summary".into(),
                "Answer the interviewer's questions in full".into(),
            ],
            listening_adaptability: ListeningAdaptability {
                answered_exactly: "No questions were answered during the session.".into(),
                adaptability: "Adaptability could not be observed without any conversation.".into(),
            },
            domain_specific_insight: DomainSpecificInsight {
                depth: "No technical or domain answers were given to evaluate.".into(),
                industry_awareness: "Industry awareness could not be assessed from an empty session."
                    .into(),
            },
            communication_skills:
                "Communication could not be evaluated because no responses were recorded.".into(),
            recommended_practice: vec![
                "Complete a full mock interview before requesting feedback".into(),
            ],
        }
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn check_score(violations: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() {
        violations.push(format!("{field} must be a finite number"));
    } else if !(0.0..=10.0).contains(&value) {
        violations.push(format!("{field} must be between 0 and 10, got {value}"));
    }
}

/// Lengths count the raw text, surrounding whitespace included, so they agree
/// with the exact-match duplicate check in [`check_list`].
fn check_text(violations: &mut Vec<String>, field: &str, value: &str, min: usize, max: Option<usize>) {
    let len = value.chars().count();
    if len < min {
        violations.push(format!("{field} must be at least {min} characters"));
    }
    if let Some(max) = max
        && len > max
    {
        violations.push(format!("{field} must be at most {max} characters, got {len}"));
    }
}

fn check_list(
    violations: &mut Vec<String>,
    field: &str,
    items: &[String],
    (min_items, max_items): (usize, usize),
    (min_len, max_len): (usize, usize),
) {
    if items.len() < min_items || items.len() > max_items {
        violations.push(format!(
            "{field} must contain {min_items} to {max_items} items, got {}",
            items.len()
        ));
    }
    for (i, item) in items.iter().enumerate() {
        check_text(violations, &format!("{field}[{i}]"), item, min_len, Some(max_len));
    }
    let mut seen = HashSet::new();
    if items.iter().any(|item| !seen.insert(item.as_str())) {
        violations.push(format!("{field} must not contain duplicates"));
    }
}
