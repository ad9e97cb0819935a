//! Rule-based generators producing the same shapes as the model path.
//!
//! Everything here is pure and deterministic over the student fields the
//! roster already carries: grade, tags and notes.

use crate::confidence;
use crate::models::{
    GradePrediction, GroupPurpose, GroupSuggestion, InsightType, LearningInsight,
    ParentCommunication, RiskLevel, Student, Tone, Urgency,
};

pub const RISK_TAGS: [&str; 3] = ["needs-support", "absent", "makeup-needed"];
pub const POSITIVE_TAGS: [&str; 4] = ["honor-roll", "active", "leader", "improving"];

pub const UNGRADED_BASELINE: i32 = 75;
pub const GROUP_COUNT: usize = 4;
pub const MAX_INTERVENTIONS: usize = 7;

pub const IMMEDIATE_INTERVENTION: &str = "Immediate academic intervention needed";
pub const LOW_GRADE_REASON: &str = " Low current grade indicates need for immediate support.";
pub const HIGH_GRADE_REASON: &str = " High performance suggests strong academic foundation.";

const RISK_REASON: &str = "Student shows risk factors in their profile that may impact performance. Early intervention recommended to prevent grade decline.";
const POSITIVE_REASON: &str = "Student demonstrates strong positive indicators and engagement. Consider enrichment opportunities to maintain growth trajectory.";
const STABLE_REASON: &str = "Student performance appears stable based on current data. Continue current support strategies with regular monitoring.";

pub fn predict_grade(student: &Student) -> GradePrediction {
    let baseline = student.grade.unwrap_or(UNGRADED_BASELINE);

    let (predicted_grade, risk_level, mut interventions, mut reasoning) =
        if student.has_any_tag(&RISK_TAGS) {
            (
                baseline.saturating_sub(10).max(50),
                RiskLevel::High,
                strings(&[
                    "Provide additional one-on-one support",
                    "Check in daily for understanding",
                    "Break assignments into smaller chunks",
                    "Connect with family for home support",
                ]),
                RISK_REASON.to_string(),
            )
        } else if student.has_any_tag(&POSITIVE_TAGS) {
            (
                baseline.saturating_add(5).min(100),
                RiskLevel::Low,
                strings(&[
                    "Consider advanced challenges",
                    "Peer tutoring opportunities",
                    "Leadership roles in group work",
                ]),
                POSITIVE_REASON.to_string(),
            )
        } else {
            (
                baseline,
                RiskLevel::Medium,
                strings(&[
                    "Monitor progress regularly",
                    "Provide consistent feedback",
                    "Encourage active participation",
                ]),
                STABLE_REASON.to_string(),
            )
        };

    if baseline < 70 {
        interventions.insert(0, IMMEDIATE_INTERVENTION.to_string());
        reasoning.push_str(LOW_GRADE_REASON);
    } else if baseline > 90 {
        reasoning.push_str(HIGH_GRADE_REASON);
    }

    GradePrediction {
        student_id: student.id.clone(),
        predicted_grade,
        confidence: confidence::score(student, true),
        risk_level,
        interventions,
        reasoning,
    }
}

/// Mixed-ability groups over the roster sorted by grade, at most
/// [`GROUP_COUNT`] of them, each of `ceil(n / 4)` students. No student is
/// placed twice.
pub fn suggest_groups(students: &[Student], purpose: GroupPurpose) -> Vec<GroupSuggestion> {
    let n = students.len();
    if n == 0 {
        return Vec::new();
    }

    let mut sorted: Vec<&Student> = students.iter().collect();
    sorted.sort_by(|a, b| b.grade.unwrap_or(0).cmp(&a.grade.unwrap_or(0)));

    let group_size = n.div_ceil(GROUP_COUNT);
    let mut groups = Vec::new();

    for i in 0..GROUP_COUNT {
        let start = i * group_size;
        if start >= n {
            break;
        }

        let members: Vec<Student> = (0..group_size)
            .take_while(|j| start + j < n)
            .map(|j| sorted[(start + j) % n].clone())
            .collect();

        if members.is_empty() {
            continue;
        }

        let avg_grade = members
            .iter()
            .map(|s| f64::from(s.grade.unwrap_or(UNGRADED_BASELINE)))
            .sum::<f64>()
            / members.len() as f64;
        let has_leader = members.iter().any(|s| s.has_tag("leader"));
        let has_support = members.iter().any(|s| s.has_tag("needs-support"));

        let mut effectiveness = 0.75;
        if has_leader && has_support {
            effectiveness = 0.85;
        }
        // Overrides the mix bonus when both hold.
        if avg_grade > 85.0 {
            effectiveness = 0.8;
        }

        let mut reasoning = format!(
            "Balanced group created with mixed academic performance levels (avg: {}%). ",
            avg_grade.round()
        );
        if has_leader {
            reasoning.push_str("Includes natural leader for peer support. ");
        }
        if has_support {
            reasoning.push_str("Includes students who may benefit from collaborative learning.");
        } else {
            reasoning.push_str("Students demonstrate strong independent work capabilities.");
        }

        groups.push(GroupSuggestion {
            group_id: format!("rule-group-{}", i + 1),
            students: members,
            reasoning,
            effectiveness,
            purpose,
        });
    }

    groups
}

pub fn learning_insights(student: &Student) -> Vec<LearningInsight> {
    let mut insights = Vec::new();

    if let Some(grade) = student.grade {
        let assessment = match grade {
            g if g >= 90 => "Excellent performance with consistent high achievement.",
            g if g >= 80 => "Good performance with room for growth.",
            g if g >= 70 => "Satisfactory performance, may benefit from additional support.",
            _ => "Performance indicates need for immediate intervention and support.",
        };
        let action_items = if grade >= 80 {
            strings(&["Continue current strategies", "Consider enrichment opportunities"])
        } else {
            strings(&[
                "Provide additional support",
                "Monitor progress closely",
                "Consider tutoring",
            ])
        };

        insights.push(LearningInsight {
            kind: InsightType::Trajectory,
            title: "Academic Performance Analysis".to_string(),
            description: format!(
                "{} currently has a {}% average. {}",
                student.name, grade, assessment
            ),
            action_items,
            confidence: 0.8,
        });
    }

    if student.has_tag("active") {
        insights.push(LearningInsight {
            kind: InsightType::Engagement,
            title: "High Engagement Level".to_string(),
            description: format!(
                "{} shows strong classroom engagement and participation.",
                student.name
            ),
            action_items: strings(&[
                "Leverage engagement for peer leadership",
                "Provide challenging tasks",
            ]),
            confidence: 0.9,
        });
    } else if student.has_tag("quiet") {
        insights.push(LearningInsight {
            kind: InsightType::Engagement,
            title: "Quiet Participation Style".to_string(),
            description: format!(
                "{} may benefit from alternative ways to demonstrate engagement.",
                student.name
            ),
            action_items: strings(&[
                "Offer written reflection opportunities",
                "Use small group discussions",
            ]),
            confidence: 0.7,
        });
    }

    if student.has_tag("improving") {
        insights.push(LearningInsight {
            kind: InsightType::Behavior,
            title: "Positive Growth Trajectory".to_string(),
            description: format!(
                "{} is showing improvement in their academic performance and behavior.",
                student.name
            ),
            action_items: strings(&[
                "Celebrate progress",
                "Maintain current support strategies",
                "Set new goals",
            ]),
            confidence: 0.85,
        });
    }

    insights
}

/// Template list; the caller's risk factors only shape the model prompt.
pub fn intervention_strategies(student: &Student, _risk_factors: &[String]) -> Vec<String> {
    let mut interventions = strings(&[
        "Provide additional one-on-one support during class",
        "Break down complex tasks into smaller, manageable steps",
        "Use visual aids and hands-on activities to support learning",
        "Implement regular check-ins to monitor understanding",
        "Connect with family to coordinate home support strategies",
    ]);

    if student.has_tag("needs-support") {
        interventions.push("Consider peer tutoring or study buddy system".to_string());
    }
    if student.has_tag("absent") {
        interventions.push("Develop attendance improvement plan with family".to_string());
    }
    if student.has_tag("quiet") {
        interventions.push("Provide alternative ways to demonstrate understanding".to_string());
    }

    interventions.truncate(MAX_INTERVENTIONS);
    interventions
}

pub fn parent_communication(student: &Student, _context: &str) -> ParentCommunication {
    let has_concerns = student.has_any_tag(&RISK_TAGS);
    let has_positive = student.has_any_tag(&POSITIVE_TAGS);

    let (tone, urgency) = if has_concerns {
        (Tone::Concern, Urgency::Medium)
    } else if has_positive {
        (Tone::Positive, Urgency::Low)
    } else {
        (Tone::Neutral, Urgency::Low)
    };

    let name = &student.name;
    let opening = match tone {
        Tone::Positive => format!(
            "{name} has been doing excellent work and showing great engagement in class."
        ),
        Tone::Concern => format!(
            "I've noticed some areas where {name} could benefit from additional support."
        ),
        Tone::Neutral => format!("{name} is making steady progress in their learning."),
    };
    let notes = if student.notes.is_empty() {
        String::new()
    } else {
        format!("Additional notes: {}", student.notes)
    };

    let content = format!(
        "Dear Parent/Guardian,

I wanted to reach out regarding {name}'s recent progress in class. {opening}

{notes}

I'd be happy to discuss {name}'s progress in more detail. Please feel free to reach out if you have any questions or would like to schedule a conference.

Best regards,
[Your Name]"
    );

    ParentCommunication {
        subject: format!("Update on {name}'s Progress"),
        content,
        tone,
        urgency,
        talking_points: strings(&[
            "Discuss recent academic progress",
            "Review classroom behavior and engagement",
            "Plan strategies for continued success",
            "Address any concerns or questions",
        ]),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(grade: Option<i32>, tags: &[&str]) -> Student {
        let mut s = Student::new("s1", "Avery Lee").with_tags(tags.iter().copied());
        s.grade = grade;
        s
    }

    #[test]
    fn risk_tag_with_low_grade_gets_both_reasons() {
        let prediction = predict_grade(&student(Some(55), &["needs-support"]));
        assert_eq!(prediction.risk_level, RiskLevel::High);
        assert_eq!(prediction.predicted_grade, 50);
        assert_eq!(prediction.interventions[0], IMMEDIATE_INTERVENTION);
        assert_eq!(prediction.interventions.len(), 5);
        assert!(prediction.reasoning.contains("risk factors"));
        assert!(prediction.reasoning.contains("Low current grade"));
    }

    #[test]
    fn honor_roll_high_grade_is_capped_at_100() {
        let prediction = predict_grade(&student(Some(95), &["honor-roll"]));
        assert_eq!(prediction.predicted_grade, 100);
        assert_eq!(prediction.risk_level, RiskLevel::Low);
        assert_eq!(prediction.interventions.len(), 3);
        assert!(prediction.reasoning.contains("strong academic foundation"));
    }

    #[test]
    fn risk_tags_take_precedence_over_positive_tags() {
        let prediction = predict_grade(&student(Some(80), &["leader", "absent"]));
        assert_eq!(prediction.risk_level, RiskLevel::High);
        assert_eq!(prediction.predicted_grade, 70);
        assert_eq!(prediction.interventions.len(), 4);
    }

    #[test]
    fn untagged_student_keeps_grade() {
        for grade in [40, 65, 80, 97] {
            let prediction = predict_grade(&student(Some(grade), &["quiet"]));
            assert_eq!(prediction.predicted_grade, grade);
            assert_eq!(prediction.risk_level, RiskLevel::Medium);
        }
    }

    #[test]
    fn positive_tag_adds_five_for_any_grade() {
        for grade in [30, 69, 88, 99] {
            let prediction = predict_grade(&student(Some(grade), &["improving"]));
            assert_eq!(prediction.predicted_grade, (grade + 5).min(100));
            assert_eq!(prediction.risk_level, RiskLevel::Low);
        }
    }

    #[test]
    fn risk_tagged_low_grades_never_predict_above_floor_rule() {
        for grade in 0..70 {
            for tag in RISK_TAGS {
                let prediction = predict_grade(&student(Some(grade), &[tag]));
                assert!(prediction.predicted_grade <= (grade - 10).max(50));
                assert_eq!(prediction.risk_level, RiskLevel::High);
                assert_eq!(prediction.interventions[0], IMMEDIATE_INTERVENTION);
            }
        }
    }

    #[test]
    fn extreme_grades_stay_clamped() {
        let low = predict_grade(&student(Some(i32::MIN), &["absent"]));
        assert_eq!(low.predicted_grade, 50);
        assert_eq!(low.interventions[0], IMMEDIATE_INTERVENTION);

        let high = predict_grade(&student(Some(i32::MAX), &["honor-roll"]));
        assert_eq!(high.predicted_grade, 100);
        assert!(high.reasoning.ends_with(HIGH_GRADE_REASON));
    }

    #[test]
    fn ungraded_students_use_baseline() {
        let prediction = predict_grade(&student(None, &[]));
        assert_eq!(prediction.predicted_grade, UNGRADED_BASELINE);
        assert!((prediction.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn uniform_roster_of_eight_makes_four_pairs() {
        let roster: Vec<Student> = (0..8)
            .map(|i| Student::new(format!("s{i}"), format!("Student {i}")).with_grade(80))
            .collect();
        let groups = suggest_groups(&roster, GroupPurpose::Collaborative);

        assert_eq!(groups.len(), 4);
        for group in &groups {
            assert_eq!(group.students.len(), 2);
            assert!((group.effectiveness - 0.75).abs() < 1e-9);
            assert_eq!(group.purpose, GroupPurpose::Collaborative);
        }
        assert_eq!(groups[0].group_id, "rule-group-1");
    }

    #[test]
    fn small_rosters_make_fewer_groups() {
        let roster: Vec<Student> = (0..3)
            .map(|i| Student::new(format!("s{i}"), format!("Student {i}")))
            .collect();
        assert_eq!(suggest_groups(&roster, GroupPurpose::Balanced).len(), 3);
        assert!(suggest_groups(&[], GroupPurpose::Balanced).is_empty());
    }

    #[test]
    fn groups_only_contain_roster_students_once() {
        let roster: Vec<Student> = (0..11)
            .map(|i| Student::new(format!("s{i}"), format!("Student {i}")).with_grade(50 + i * 4))
            .collect();
        let groups = suggest_groups(&roster, GroupPurpose::Challenge);

        let assigned: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.students.iter().map(|s| s.id.as_str()))
            .collect();
        assert!(assigned.len() <= roster.len().div_ceil(4) * 4);
        let mut unique = assigned.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), assigned.len());
        for id in assigned {
            assert!(roster.iter().any(|s| s.id == id));
        }
    }

    #[test]
    fn groups_are_filled_from_highest_grade() {
        let roster = vec![
            Student::new("low", "Low").with_grade(40),
            Student::new("ungraded", "Ungraded"),
            Student::new("high", "High").with_grade(99),
            Student::new("mid", "Mid").with_grade(70),
        ];
        let groups = suggest_groups(&roster, GroupPurpose::Collaborative);
        let order: Vec<&str> = groups.iter().map(|g| g.students[0].id.as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low", "ungraded"]);
    }

    #[test]
    fn leader_support_mix_raises_effectiveness() {
        let roster = vec![
            Student::new("a", "A").with_grade(70).with_tags(["leader"]),
            Student::new("b", "B").with_grade(60).with_tags(["needs-support"]),
        ];
        let groups = suggest_groups(&roster, GroupPurpose::PeerTutoring);
        // Two students make one group each; no mix inside either.
        assert!(groups.iter().all(|g| (g.effectiveness - 0.75).abs() < 1e-9));

        let roster: Vec<Student> = vec![
            Student::new("a", "A").with_grade(80).with_tags(["leader"]),
            Student::new("b", "B").with_grade(78).with_tags(["needs-support"]),
            Student::new("c", "C").with_grade(60),
            Student::new("d", "D").with_grade(55),
            Student::new("e", "E").with_grade(50),
        ];
        let groups = suggest_groups(&roster, GroupPurpose::PeerTutoring);
        assert!((groups[0].effectiveness - 0.85).abs() < 1e-9);
        assert!(groups[0].reasoning.contains("natural leader"));
    }

    #[test]
    fn high_average_overrides_mix_bonus() {
        let roster = vec![
            Student::new("a", "A").with_grade(95).with_tags(["leader"]),
            Student::new("b", "B").with_grade(90).with_tags(["needs-support"]),
            Student::new("c", "C").with_grade(40),
            Student::new("d", "D").with_grade(30),
            Student::new("e", "E").with_grade(20),
        ];
        let groups = suggest_groups(&roster, GroupPurpose::Collaborative);
        assert!((groups[0].effectiveness - 0.8).abs() < 1e-9);
    }

    #[test]
    fn insights_follow_tags_and_grade_bands() {
        assert!(learning_insights(&student(None, &[])).is_empty());

        let insights = learning_insights(&student(Some(92), &["active", "quiet", "improving"]));
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].kind, InsightType::Trajectory);
        assert!(insights[0].description.contains("Excellent performance"));
        assert_eq!(insights[1].title, "High Engagement Level");
        assert!((insights[1].confidence - 0.9).abs() < 1e-9);
        assert_eq!(insights[2].kind, InsightType::Behavior);

        let insights = learning_insights(&student(Some(85), &[]));
        assert_eq!(insights.len(), 1);
        assert!(insights[0].description.contains("Good performance with room for growth"));
        assert_eq!(
            insights[0].action_items,
            vec!["Continue current strategies", "Consider enrichment opportunities"]
        );

        let insights = learning_insights(&student(Some(75), &[]));
        assert_eq!(insights.len(), 1);
        assert!(insights[0]
            .description
            .contains("Satisfactory performance, may benefit from additional support"));
        assert_eq!(
            insights[0].action_items,
            vec!["Provide additional support", "Monitor progress closely", "Consider tutoring"]
        );

        let insights = learning_insights(&student(Some(65), &["quiet"]));
        assert_eq!(insights.len(), 2);
        assert!(insights[0].description.contains("immediate intervention"));
        assert_eq!(insights[0].action_items.len(), 3);
        assert!((insights[1].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn intervention_list_stays_between_five_and_seven() {
        assert_eq!(intervention_strategies(&student(None, &[]), &[]).len(), 5);

        let all = intervention_strategies(&student(None, &["needs-support", "absent", "quiet"]), &[]);
        assert_eq!(all.len(), MAX_INTERVENTIONS);
        assert_eq!(all[5], "Consider peer tutoring or study buddy system");
        assert_eq!(all[6], "Develop attendance improvement plan with family");
    }

    #[test]
    fn communication_tone_prefers_concern() {
        let message = parent_communication(&student(Some(70), &["leader", "absent"]), "progress");
        assert_eq!(message.tone, Tone::Concern);
        assert_eq!(message.urgency, Urgency::Medium);
        assert_eq!(message.talking_points.len(), 4);

        let message = parent_communication(&student(Some(70), &["leader"]), "progress");
        assert_eq!(message.tone, Tone::Positive);
        assert_eq!(message.urgency, Urgency::Low);
        assert!(message.content.contains("excellent work"));

        let message = parent_communication(&student(None, &[]).with_notes("Loves robotics"), "");
        assert_eq!(message.tone, Tone::Neutral);
        assert_eq!(message.subject, "Update on Avery Lee's Progress");
        assert!(message.content.contains("Additional notes: Loves robotics"));
    }
}
