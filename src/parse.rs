//! Typed projection of model output.
//!
//! Model text is expected to be JSON, optionally wrapped in a Markdown code
//! fence. Every field is validated before a value is accepted; anything off
//! is reported as [`AdvisorError::MalformedResponse`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AdvisorError;
use crate::models::{
    GroupPurpose, GroupSuggestion, InsightType, LearningInsight, ParentCommunication, RiskLevel,
    Student, Tone, Urgency,
};

/// Returns the JSON body inside a ```` ```json ```` fence, or the trimmed
/// text when there is no fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, AdvisorError> {
    serde_json::from_str(strip_code_fence(text)).map_err(AdvisorError::malformed)
}

fn unit_interval(field: &str, value: f64) -> Result<f64, AdvisorError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(AdvisorError::malformed(format!("{field} out of range: {value}")))
    }
}

fn non_empty_text(field: &str, value: String) -> Result<String, AdvisorError> {
    if value.trim().is_empty() {
        Err(AdvisorError::malformed(format!("{field} is empty")))
    } else {
        Ok(value)
    }
}

fn non_empty_list(field: &str, values: Vec<String>) -> Result<Vec<String>, AdvisorError> {
    let values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        Err(AdvisorError::malformed(format!("{field} has no entries")))
    } else {
        Ok(values)
    }
}

fn label<T>(value: &str) -> Result<T, AdvisorError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(AdvisorError::malformed)
}

/// Model-side grade prediction; confidence is computed locally.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionFields {
    pub predicted_grade: i32,
    pub risk_level: RiskLevel,
    pub interventions: Vec<String>,
    pub reasoning: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrediction {
    predicted_grade: f64,
    risk_level: String,
    interventions: Vec<String>,
    reasoning: String,
}

pub fn prediction(text: &str) -> Result<PredictionFields, AdvisorError> {
    let raw: RawPrediction = decode(text)?;

    if !raw.predicted_grade.is_finite() || !(0.0..=100.0).contains(&raw.predicted_grade) {
        return Err(AdvisorError::malformed(format!(
            "predictedGrade out of range: {}",
            raw.predicted_grade
        )));
    }

    Ok(PredictionFields {
        predicted_grade: raw.predicted_grade.round() as i32,
        risk_level: label(&raw.risk_level)?,
        interventions: non_empty_list("interventions", raw.interventions)?,
        reasoning: non_empty_text("reasoning", raw.reasoning)?,
    })
}

#[derive(Deserialize)]
struct RawGroup {
    students: Vec<Value>,
    reasoning: String,
    effectiveness: f64,
    #[serde(default)]
    benefits: Option<Value>,
}

/// Maps the model's id lists back onto roster students. Ids with no roster
/// match are dropped; a group left empty is dropped with them. A reply where
/// no group matches anyone is malformed.
pub fn group_suggestions(
    text: &str,
    roster: &[Student],
    purpose: GroupPurpose,
) -> Result<Vec<GroupSuggestion>, AdvisorError> {
    let raw: Vec<RawGroup> = decode(text)?;
    if raw.is_empty() {
        return Err(AdvisorError::malformed("no groups returned"));
    }

    let mut suggestions = Vec::with_capacity(raw.len());
    for (index, group) in raw.into_iter().enumerate() {
        let effectiveness = unit_interval("effectiveness", group.effectiveness)?;
        let ids: Vec<String> = group
            .students
            .iter()
            .filter_map(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();

        let students: Vec<Student> = roster
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect();
        if students.is_empty() {
            tracing::debug!(group = index + 1, "model group matched no roster students");
            continue;
        }

        let mut reasoning = non_empty_text("reasoning", group.reasoning)?;
        if let Some(benefits) = group.benefits.as_ref().and_then(benefit_text) {
            reasoning.push_str(" Benefits: ");
            reasoning.push_str(&benefits);
        }

        suggestions.push(GroupSuggestion {
            group_id: format!("ai-group-{}", index + 1),
            students,
            reasoning,
            effectiveness,
            purpose,
        });
    }

    if suggestions.is_empty() {
        return Err(AdvisorError::malformed("no group matched the roster"));
    }

    Ok(suggestions)
}

fn benefit_text(benefits: &Value) -> Option<String> {
    let text = match benefits {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInsight {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    description: String,
    action_items: Vec<String>,
    confidence: f64,
}

pub fn learning_insights(text: &str) -> Result<Vec<LearningInsight>, AdvisorError> {
    let raw: Vec<RawInsight> = decode(text)?;

    raw.into_iter()
        .map(|insight| -> Result<LearningInsight, AdvisorError> {
            Ok(LearningInsight {
                kind: label::<InsightType>(&insight.kind)?,
                title: non_empty_text("title", insight.title)?,
                description: non_empty_text("description", insight.description)?,
                action_items: non_empty_list("actionItems", insight.action_items)?,
                confidence: unit_interval("confidence", insight.confidence)?,
            })
        })
        .collect()
}

pub fn interventions(text: &str) -> Result<Vec<String>, AdvisorError> {
    let raw: Vec<String> = decode(text)?;
    non_empty_list("interventions", raw)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommunication {
    subject: String,
    content: String,
    tone: String,
    urgency: String,
    talking_points: Vec<String>,
}

pub fn parent_communication(text: &str) -> Result<ParentCommunication, AdvisorError> {
    let raw: RawCommunication = decode(text)?;

    Ok(ParentCommunication {
        subject: non_empty_text("subject", raw.subject)?,
        content: non_empty_text("content", raw.content)?,
        tone: label::<Tone>(&raw.tone)?,
        urgency: label::<Urgency>(&raw.urgency)?,
        talking_points: non_empty_list("talkingPoints", raw.talking_points)?,
    })
}
