use serde_json::{json, Value};

use crate::models::{GroupPurpose, Student};

pub const PREDICTION_SYSTEM: &str = "You are an expert educational AI that analyzes student data to provide accurate predictions and helpful interventions. Always be constructive and focus on student success.";
pub const GROUPS_SYSTEM: &str = "You are an expert in educational psychology and group dynamics. Create balanced, effective student groups that promote learning and positive social interaction.";
pub const COMMUNICATION_SYSTEM: &str = "You are an experienced teacher who writes thoughtful, professional communications to parents. Be positive, specific, and actionable in your messaging.";
pub const INSIGHTS_SYSTEM: &str = "You are an educational data analyst who provides actionable insights about student learning patterns and development.";
pub const INTERVENTIONS_SYSTEM: &str = "You are an expert in educational interventions and student support strategies. Focus on positive, research-based approaches.";

fn grade_label(student: &Student) -> String {
    student
        .grade
        .map(|g| g.to_string())
        .unwrap_or_else(|| "No grade yet".to_string())
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn grade_prediction(student: &Student, context: Option<&str>) -> String {
    format!(
        "Analyze this student's academic profile and predict their performance on the next assignment:

Student: {name}
Current Grade: {grade}
Notes: {notes}
Tags: {tags}
Assignment Context: {context}

Based on this information, provide:
1. Predicted grade (0-100)
2. Risk level (low/medium/high)
3. Specific intervention strategies
4. Reasoning for the prediction

Format as JSON with keys: predictedGrade, riskLevel, interventions (array), reasoning",
        name = student.name,
        grade = grade_label(student),
        notes = student.notes,
        tags = student.tags.join(", "),
        context = context.unwrap_or("General assignment"),
    )
}

pub fn group_suggestions(students: &[Student], purpose: GroupPurpose) -> String {
    let profiles: Vec<Value> = students
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "grade": s.grade,
                "tags": s.tags,
                "notes": s.notes,
            })
        })
        .collect();

    format!(
        "Create optimal student groups for {purpose} work:

Students: {profiles}

Consider:
- Academic performance balance
- Learning styles and personalities (inferred from tags/notes)
- Social dynamics
- Peer tutoring opportunities

Create 3-4 groups of 3-5 students each. For each group, provide:
1. Student IDs
2. Reasoning for the composition
3. Effectiveness score (0-1)
4. Specific benefits of this grouping

Format as JSON array with keys: students (array of IDs), reasoning, effectiveness, benefits",
        purpose = purpose.as_str().replace('_', " "),
        profiles = pretty(&Value::Array(profiles)),
    )
}

pub fn parent_communication(student: &Student, context: &str) -> String {
    format!(
        "Generate a personalized communication for {name}'s parent/guardian:

Student Profile:
- Name: {name}
- Current Grade: {grade}
- Notes: {notes}
- Tags: {tags}

Context: {context}

Create a professional, warm communication that includes:
1. Appropriate subject line
2. Email content (2-3 paragraphs)
3. Tone assessment (positive/concern/neutral)
4. Urgency level (low/medium/high)
5. Key talking points for follow-up

Format as JSON with keys: subject, content, tone, urgency, talkingPoints (array)",
        name = student.name,
        grade = grade_label(student),
        notes = student.notes,
        tags = student.tags.join(", "),
    )
}

pub fn learning_trajectory(student: &Student, history: &[Value]) -> String {
    format!(
        "Analyze the learning trajectory for {name}:

Current Status:
- Grade: {grade}
- Notes: {notes}
- Tags: {tags}

Historical Data: {history}

Provide insights about:
1. Learning velocity and patterns
2. Engagement trends
3. Behavioral observations
4. Social development

For each insight, include:
- type (trajectory/engagement/behavior/social)
- title (brief summary)
- description (detailed analysis)
- actionItems (specific recommendations)
- confidence (0-1)

Format as JSON array with these keys.",
        name = student.name,
        grade = grade_label(student),
        notes = student.notes,
        tags = student.tags.join(", "),
        history = pretty(&Value::Array(history.to_vec())),
    )
}

pub fn intervention_strategies(student: &Student, risk_factors: &[String]) -> String {
    format!(
        "Create specific intervention strategies for {name}:

Student Profile:
- Grade: {grade}
- Notes: {notes}
- Tags: {tags}

Risk Factors: {risks}

Provide 5-7 specific, actionable intervention strategies that are:
- Personalized to this student
- Practical for classroom implementation
- Evidence-based
- Positive and supportive

Return as a JSON array of strings.",
        name = student.name,
        grade = grade_label(student),
        notes = student.notes,
        tags = student.tags.join(", "),
        risks = risk_factors.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ungraded_students_are_labelled() {
        let student = Student::new("s1", "Kiara Patel");
        let prompt = grade_prediction(&student, None);
        assert!(prompt.contains("Current Grade: No grade yet"));
        assert!(prompt.contains("Assignment Context: General assignment"));
    }

    #[test]
    fn group_prompt_lists_roster_ids() {
        let roster = vec![
            Student::new("a-1", "Avery").with_grade(90),
            Student::new("b-2", "Jules").with_tags(["quiet"]),
        ];
        let prompt = group_suggestions(&roster, GroupPurpose::PeerTutoring);
        assert!(prompt.contains("for peer tutoring work"));
        assert!(prompt.contains("\"a-1\""));
        assert!(prompt.contains("\"b-2\""));
    }

    #[test]
    fn trajectory_prompt_embeds_history() {
        let student = Student::new("s1", "Avery").with_grade(82);
        let history = vec![json!({ "title": "Quiz 1", "grade": 78 })];
        let prompt = learning_trajectory(&student, &history);
        assert!(prompt.contains("Quiz 1"));
    }
}
