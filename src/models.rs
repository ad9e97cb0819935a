use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// 0-100, `None` when ungraded.
    #[serde(default)]
    pub grade: Option<i32>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: String::new(),
            grade: None,
            notes: String::new(),
            tags: Vec::new(),
            group_id: None,
            position: None,
        }
    }

    pub fn with_grade(mut self, grade: i32) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = dedup_tags(tags.into_iter().map(Into::into));
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        self.tags.iter().any(|t| tags.contains(&t.as_str()))
    }
}

/// Drops repeated tags, keeping the first occurrence of each.
pub fn dedup_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Group {
    /// Membership is derived from the roster, never stored on the group.
    pub fn members<'a>(&self, roster: &'a [Student]) -> Vec<&'a Student> {
        roster
            .iter()
            .filter(|s| s.group_id.as_deref() == Some(self.id.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPurpose {
    #[default]
    Collaborative,
    PeerTutoring,
    Balanced,
    Challenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Trajectory,
    Engagement,
    Behavior,
    Social,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Concern,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! label_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($label => Ok($ty::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }
    };
}

label_enum!(RiskLevel, "risk level", { Low => "low", Medium => "medium", High => "high" });
label_enum!(GroupPurpose, "group purpose", {
    Collaborative => "collaborative",
    PeerTutoring => "peer_tutoring",
    Balanced => "balanced",
    Challenge => "challenge",
});
label_enum!(InsightType, "insight type", {
    Trajectory => "trajectory",
    Engagement => "engagement",
    Behavior => "behavior",
    Social => "social",
});
label_enum!(Tone, "tone", { Positive => "positive", Concern => "concern", Neutral => "neutral" });
label_enum!(Urgency, "urgency", { Low => "low", Medium => "medium", High => "high" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePrediction {
    pub student_id: String,
    pub predicted_grade: i32,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub interventions: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSuggestion {
    pub group_id: String,
    pub students: Vec<Student>,
    pub reasoning: String,
    pub effectiveness: f64,
    pub purpose: GroupPurpose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningInsight {
    #[serde(rename = "type")]
    pub kind: InsightType,
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentCommunication {
    pub subject: String,
    pub content: String,
    pub tone: Tone,
    pub urgency: Urgency,
    pub talking_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorStatus {
    pub available: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_deduplicated_in_order() {
        let student = Student::new("s1", "Avery Lee").with_tags(["quiet", "leader", "quiet", " "]);
        assert_eq!(student.tags, vec!["quiet".to_string(), "leader".to_string()]);
    }

    #[test]
    fn group_members_are_derived_from_roster() {
        let mut a = Student::new("a", "Avery");
        a.group_id = Some("g1".to_string());
        let b = Student::new("b", "Jules");
        let roster = vec![a, b];
        let group = Group {
            id: "g1".to_string(),
            name: "Blue".to_string(),
            color: "#3366ff".to_string(),
        };

        let members = group.members(&roster);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "a");
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!("High".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert_eq!("peer-tutoring".parse::<GroupPurpose>(), Ok(GroupPurpose::PeerTutoring));
        assert!("urgent".parse::<Urgency>().is_err());
    }

    #[test]
    fn prediction_serializes_camel_case() {
        let prediction = GradePrediction {
            student_id: "s1".to_string(),
            predicted_grade: 80,
            confidence: 0.5,
            risk_level: RiskLevel::Medium,
            interventions: vec![],
            reasoning: String::new(),
        };
        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["studentId"], "s1");
        assert_eq!(json["riskLevel"], "medium");
    }
}
