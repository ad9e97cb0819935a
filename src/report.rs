use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::advisor::ClassroomOverview;
use crate::models::{GradePrediction, Group, RiskLevel, Student};

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSummary {
    pub risk_level: RiskLevel,
    pub count: usize,
    pub avg_predicted: f64,
}

pub fn summarize_by_risk(predictions: &[GradePrediction]) -> Vec<RiskSummary> {
    let mut map: HashMap<RiskLevel, (usize, i32)> = HashMap::new();

    for prediction in predictions {
        let entry = map.entry(prediction.risk_level).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += prediction.predicted_grade;
    }

    let mut summaries: Vec<RiskSummary> = map
        .into_iter()
        .map(|(risk_level, (count, total))| RiskSummary {
            risk_level,
            count,
            avg_predicted: if count == 0 {
                0.0
            } else {
                total as f64 / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.risk_level.cmp(&a.risk_level));
    summaries
}

pub fn build_report(
    title: Option<&str>,
    generated_at: DateTime<Utc>,
    students: &[Student],
    current_groups: &[Group],
    overview: &ClassroomOverview,
) -> String {
    let names: HashMap<&str, &str> = students
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();
    let name_of = |id: &str| names.get(id).copied().unwrap_or("Unknown student").to_string();

    let mut output = String::new();
    let class_label = title.unwrap_or("all students");

    let _ = writeln!(output, "# Classroom Advisory Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        class_label,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "> {}", overview.status.message);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    let summaries = summarize_by_risk(&overview.predictions);
    if summaries.is_empty() {
        let _ = writeln!(output, "No students on this roster.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students (avg predicted {:.1})",
                summary.risk_level, summary.count, summary.avg_predicted
            );
        }
    }

    let mut predictions = overview.predictions.clone();
    predictions.sort_by(|a, b| {
        b.risk_level
            .cmp(&a.risk_level)
            .then(a.predicted_grade.cmp(&b.predicted_grade))
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Predictions");

    if predictions.is_empty() {
        let _ = writeln!(output, "No predictions generated.");
    } else {
        let _ = writeln!(output, "| Student | Predicted | Risk | Confidence | First step |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for prediction in predictions.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.0}% | {} |",
                name_of(&prediction.student_id),
                prediction.predicted_grade,
                prediction.risk_level,
                prediction.confidence * 100.0,
                prediction
                    .interventions
                    .first()
                    .map(String::as_str)
                    .unwrap_or("-")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Current Groups");

    if current_groups.is_empty() {
        let _ = writeln!(output, "No groups assigned yet.");
    } else {
        for group in current_groups.iter() {
            let members: Vec<&str> = group
                .members(students)
                .into_iter()
                .map(|s| s.name.as_str())
                .collect();
            let _ = writeln!(
                output,
                "- {}: {}",
                group.name,
                if members.is_empty() {
                    "no students".to_string()
                } else {
                    members.join(", ")
                }
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Suggested Groups");

    if overview.groups.is_empty() {
        let _ = writeln!(output, "No group suggestions generated.");
    } else {
        for group in overview.groups.iter() {
            let members: Vec<&str> = group.students.iter().map(|s| s.name.as_str()).collect();
            let _ = writeln!(
                output,
                "- {} ({}, effectiveness {:.2}): {}",
                group.group_id,
                group.purpose,
                group.effectiveness,
                members.join(", ")
            );
            let _ = writeln!(output, "  {}", group.reasoning);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Learning Insights");

    if overview.insights.is_empty() {
        let _ = writeln!(output, "No insights generated.");
    } else {
        for insight in overview.insights.iter() {
            let _ = writeln!(
                output,
                "- [{}] {}: {} (confidence {:.2})",
                insight.kind, insight.title, insight.description, insight.confidence
            );
            for item in insight.action_items.iter() {
                let _ = writeln!(output, "  - {}", item);
            }
        }
    }

    output
}
