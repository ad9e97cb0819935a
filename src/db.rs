use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::models::{dedup_tags, Group, Position, Student};

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn fetch_students(pool: &PgPool) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, email, grade::int4 AS grade, notes, tags, group_id,
               position_x::float8 AS position_x, position_y::float8 AS position_y
        FROM students
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to load students")?;

    let mut students = Vec::with_capacity(rows.len());
    for row in rows {
        students.push(student_from_row(&row)?);
    }

    Ok(students)
}

fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    let id: Uuid = row.try_get("id")?;
    let group_id: Option<Uuid> = row.try_get("group_id")?;
    let position_x: Option<f64> = row.try_get("position_x")?;
    let position_y: Option<f64> = row.try_get("position_y")?;
    let tags: Option<Vec<String>> = row.try_get("tags")?;
    let notes: Option<String> = row.try_get("notes")?;

    Ok(Student {
        id: id.to_string(),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        grade: valid_grade(row.try_get("grade")?),
        notes: notes.unwrap_or_default(),
        tags: dedup_tags(tags.unwrap_or_default()),
        group_id: group_id.map(|g| g.to_string()),
        position: match (position_x, position_y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            _ => None,
        },
    })
}

/// Grades outside 0-100 are treated as ungraded.
fn valid_grade(grade: Option<i32>) -> Option<i32> {
    grade.filter(|g| (0..=100).contains(g))
}

pub async fn fetch_groups(pool: &PgPool) -> anyhow::Result<Vec<Group>> {
    let rows = sqlx::query("SELECT id, name, color FROM groups ORDER BY name")
        .fetch_all(pool)
        .await
        .context("failed to load groups")?;

    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.try_get("id")?;
        groups.push(Group {
            id: id.to_string(),
            name: row.try_get("name")?,
            color: row.try_get("color")?,
        });
    }

    Ok(groups)
}

/// Graded submissions for one student, oldest first, shaped as the
/// historical data handed to trajectory analysis.
pub async fn fetch_submission_history(
    pool: &PgPool,
    student_id: &str,
) -> anyhow::Result<Vec<Value>> {
    let student_id = Uuid::parse_str(student_id)
        .with_context(|| format!("student id {student_id} is not a UUID"))?;

    let rows = sqlx::query(
        r#"
        SELECT a.title, a.subject, s.grade::float8 AS grade, s.submitted_at, s.feedback
        FROM assignment_submissions s
        JOIN assignments a ON a.id = s.assignment_id
        WHERE s.student_id = $1 AND s.grade IS NOT NULL
        ORDER BY s.submitted_at NULLS LAST
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .context("failed to load submission history")?;

    let mut history = Vec::with_capacity(rows.len());
    for row in rows {
        let title: String = row.try_get("title")?;
        let subject: Option<String> = row.try_get("subject")?;
        let grade: Option<f64> = row.try_get("grade")?;
        let submitted_at: Option<DateTime<Utc>> = row.try_get("submitted_at")?;
        let feedback: Option<String> = row.try_get("feedback")?;

        history.push(json!({
            "assignment": title,
            "subject": subject,
            "grade": grade,
            "submittedAt": submitted_at.map(|t| t.to_rfc3339()),
            "feedback": feedback,
        }));
    }

    Ok(history)
}

#[derive(serde::Deserialize)]
struct CsvStudent {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    grade: Option<i32>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    group_id: Option<String>,
}

/// Reads a roster export with columns `id,name,email,grade,notes,tags,group_id`.
/// Tags are `;`-separated; rows without an id get a fresh one.
pub fn load_csv_roster(csv_path: &std::path::Path) -> anyhow::Result<Vec<Student>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open roster {}", csv_path.display()))?;
    let mut students = Vec::new();

    for (index, result) in reader.deserialize::<CsvStudent>().enumerate() {
        let row = result.with_context(|| format!("invalid roster row {}", index + 1))?;

        let id = row
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        students.push(Student {
            id,
            name: row.name,
            email: row.email,
            grade: valid_grade(row.grade),
            notes: row.notes,
            tags: dedup_tags(row.tags.split(';').map(str::to_string)),
            group_id: row
                .group_id
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty()),
            position: None,
        });
    }

    Ok(students)
}

/// CSV exports carry only group ids, so each distinct id becomes a group
/// named after itself, in first-seen order.
pub fn groups_from_roster(students: &[Student]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for group_id in students.iter().filter_map(|s| s.group_id.as_deref()) {
        if !groups.iter().any(|g| g.id == group_id) {
            groups.push(Group {
                id: group_id.to_string(),
                name: group_id.to_string(),
                color: String::new(),
            });
        }
    }
    groups
}
