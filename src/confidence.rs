use crate::models::Student;

pub const BASE: f64 = 0.5;
pub const CEILING: f64 = 0.9;
pub const DEGRADED_FACTOR: f64 = 0.8;

/// How much the advisor knows about a student, in `[0, 0.9]`.
///
/// Shared by every generator so scores compare across operations. Advisory
/// output is never reported as certain, hence the ceiling.
pub fn score(student: &Student, degraded: bool) -> f64 {
    let mut confidence = BASE;

    if student.grade.is_some() {
        confidence += 0.2;
    }
    if student.notes.chars().count() > 10 {
        confidence += 0.1;
    }
    if !student.tags.is_empty() {
        confidence += 0.1;
    }

    if degraded {
        confidence *= DEGRADED_FACTOR;
    }

    confidence.clamp(0.0, CEILING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> Student {
        Student::new("s1", "Avery Lee")
            .with_grade(88)
            .with_notes("Strong in algebra, quiet in groups")
            .with_tags(["quiet"])
    }

    #[test]
    fn bare_student_gets_base_score() {
        let student = Student::new("s1", "Avery Lee");
        assert!((score(&student, false) - 0.5).abs() < 1e-9);
        assert!((score(&student, true) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn full_profile_is_capped() {
        assert!((score(&full_profile(), false) - 0.9).abs() < 1e-9);
        assert!((score(&full_profile(), true) - 0.72).abs() < 1e-9);
    }

    #[test]
    fn short_notes_do_not_count() {
        let student = Student::new("s1", "Avery Lee").with_notes("ok student");
        assert!((score(&student, false) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn degraded_never_exceeds_model_mode() {
        let profiles = vec![
            Student::new("a", "A"),
            Student::new("b", "B").with_grade(40),
            Student::new("c", "C").with_tags(["absent"]),
            full_profile(),
        ];
        for student in &profiles {
            let model = score(student, false);
            let degraded = score(student, true);
            assert!(degraded < model);
            assert!((0.0..=CEILING).contains(&model));
        }
    }
}
