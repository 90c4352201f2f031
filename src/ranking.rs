use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::error::RankingError;
use crate::models::{
    DimensionScore, StudentAggregate, StudentRankingResult, StudentTaskTriple, UnscoredStudent,
};
use crate::registry::CalculatorRegistry;

/// Scored and unscored halves of one trail's computation. Students whose
/// records fail an integrity check land in `unscored` instead of hiding
/// the rest of the leaderboard.
#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub rankings: Vec<StudentRankingResult>,
    pub unscored: Vec<UnscoredStudent>,
}

/// Scores every aggregate, sorts, and assigns 1-based places.
///
/// Pure function of its inputs; calling it twice on the same data yields
/// the same order and places.
pub fn compute(
    registry: &CalculatorRegistry,
    aggregates: &[StudentAggregate],
) -> Result<RankingOutcome, RankingError> {
    let mut rankings = Vec::with_capacity(aggregates.len());
    let mut unscored = Vec::new();

    for aggregate in aggregates {
        match score_student(registry, aggregate) {
            Ok(result) => rankings.push(result),
            Err(err) if err.is_data_integrity() => unscored.push(UnscoredStudent {
                student_id: aggregate.student.id,
                student_name: aggregate.student.full_name.clone(),
                reason: err.to_string(),
            }),
            Err(err) => return Err(err),
        }
    }

    rankings.sort_by(rank_order);
    for (index, result) in rankings.iter_mut().enumerate() {
        result.place = index as u32 + 1;
    }

    Ok(RankingOutcome { rankings, unscored })
}

fn score_student(
    registry: &CalculatorRegistry,
    aggregate: &StudentAggregate,
) -> Result<StudentRankingResult, RankingError> {
    let reviewed: Vec<&StudentTaskTriple> = aggregate
        .triples
        .iter()
        .filter(|triple| triple.is_reviewed())
        .collect();

    let mut breakdown = Vec::new();
    let mut composite_score = 0.0;
    for (dimension, calculator) in registry.entries() {
        let points = calculator.calculate(&reviewed)?;
        composite_score += points;
        breakdown.push(DimensionScore { dimension, points });
    }

    let task_count = aggregate.triples.len();
    let submitted_count = aggregate
        .triples
        .iter()
        .filter(|triple| triple.submission.is_some())
        .count();
    let completion_percent = if task_count == 0 {
        0.0
    } else {
        submitted_count as f64 * 100.0 / task_count as f64
    };
    let average_grade = if reviewed.is_empty() {
        0.0
    } else {
        reviewed
            .iter()
            .filter_map(|triple| triple.feedback.as_ref())
            .map(|feedback| feedback.grade)
            .sum::<f64>()
            / reviewed.len() as f64
    };
    let last_submission = aggregate
        .triples
        .iter()
        .filter_map(|triple| triple.submission.as_ref())
        .map(|submission| submission.submitted_at)
        .max();

    Ok(StudentRankingResult {
        student_id: aggregate.student.id,
        student_name: aggregate.student.full_name.clone(),
        student_email: aggregate.student.email.clone(),
        place: 0,
        composite_score,
        breakdown,
        submitted_count,
        reviewed_count: reviewed.len(),
        task_count,
        completion_percent,
        average_grade,
        last_submission,
    })
}

/// Composite desc, completion desc, earlier last submission, student id.
/// Total over all inputs, so place assignment is deterministic.
fn rank_order(a: &StudentRankingResult, b: &StudentRankingResult) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| b.completion_percent.total_cmp(&a.completion_percent))
        .then_with(|| cmp_last_submission(a.last_submission, b.last_submission))
        .then_with(|| a.student_id.cmp(&b.student_id))
}

fn cmp_last_submission(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedbackRecord, Student, SubmissionRecord, TaskRecord};
    use crate::registry::ScoreDimension;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn student(n: u128, name: &str) -> Student {
        Student {
            id: Uuid::from_u128(n),
            full_name: name.to_string(),
            email: format!("{}@stream.school", name.to_lowercase().replace(' ', ".")),
        }
    }

    fn task(n: u128, window_hours: i64) -> TaskRecord {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        TaskRecord {
            id: Uuid::from_u128(0x1000 + n),
            trail_id: Uuid::from_u128(0xAA),
            title: format!("Task {n}"),
            created_at,
            due_at: created_at + Duration::hours(window_hours),
        }
    }

    fn unsubmitted(task: TaskRecord) -> StudentTaskTriple {
        StudentTaskTriple {
            task,
            submission: None,
            feedback: None,
        }
    }

    fn submitted(task: TaskRecord, who: &Student, consumed_hours: i64) -> StudentTaskTriple {
        let submission = SubmissionRecord {
            id: Uuid::new_v4(),
            task_id: task.id,
            student_id: who.id,
            submitted_at: task.created_at + Duration::hours(consumed_hours),
            content_ref: None,
        };
        StudentTaskTriple {
            task,
            submission: Some(submission),
            feedback: None,
        }
    }

    fn reviewed(
        task: TaskRecord,
        who: &Student,
        consumed_hours: i64,
        grade: f64,
    ) -> StudentTaskTriple {
        let mut triple = submitted(task, who, consumed_hours);
        let submission_id = triple.submission.as_ref().map(|s| s.id).unwrap();
        triple.feedback = Some(FeedbackRecord {
            id: Uuid::new_v4(),
            submission_id,
            grade,
            evaluator: "Prof. Duarte".to_string(),
            comment: None,
        });
        triple
    }

    fn registry() -> CalculatorRegistry {
        CalculatorRegistry::with_defaults().unwrap()
    }

    #[test]
    fn zero_reviewed_students_score_zero_in_every_dimension() {
        let ana = student(1, "Ana Beatriz");
        let aggregates = vec![StudentAggregate {
            student: ana,
            triples: vec![unsubmitted(task(1, 100)), unsubmitted(task(2, 100))],
        }];

        let outcome = compute(&registry(), &aggregates).unwrap();
        let result = &outcome.rankings[0];
        assert_eq!(result.composite_score, 0.0);
        assert!(result.breakdown.iter().all(|d| d.points == 0.0));
        assert_eq!(result.completion_percent, 0.0);
        assert_eq!(result.average_grade, 0.0);
        assert!(result.last_submission.is_none());
    }

    #[test]
    fn composite_sums_grade_and_time_dimensions() {
        let ana = student(1, "Ana Beatriz");
        let aggregates = vec![StudentAggregate {
            triples: vec![
                reviewed(task(1, 100), &ana, 20, 8.0),
                reviewed(task(2, 100), &ana, 10, 10.0),
            ],
            student: ana,
        }];

        let outcome = compute(&registry(), &aggregates).unwrap();
        let result = &outcome.rankings[0];
        assert!((result.composite_score - 92.5).abs() < 0.001);

        let grade = result
            .breakdown
            .iter()
            .find(|d| d.dimension == ScoreDimension::Grade)
            .unwrap();
        let time = result
            .breakdown
            .iter()
            .find(|d| d.dimension == ScoreDimension::Time)
            .unwrap();
        assert!((grade.points - 67.5).abs() < 0.001);
        assert_eq!(time.points, 25.0);
        assert!((result.average_grade - 9.0).abs() < 0.001);
        assert_eq!(result.completion_percent, 100.0);
    }

    #[test]
    fn scored_students_rank_above_empty_ones() {
        let ana = student(1, "Ana Beatriz");
        let rui = student(2, "Rui Costa");
        let aggregates = vec![
            StudentAggregate {
                triples: vec![unsubmitted(task(1, 100))],
                student: rui,
            },
            StudentAggregate {
                triples: vec![reviewed(task(1, 100), &ana, 20, 6.0)],
                student: ana,
            },
        ];

        let outcome = compute(&registry(), &aggregates).unwrap();
        assert_eq!(outcome.rankings[0].student_name, "Ana Beatriz");
        assert_eq!(outcome.rankings[0].place, 1);
        assert_eq!(outcome.rankings[1].student_name, "Rui Costa");
        assert_eq!(outcome.rankings[1].place, 2);
    }

    #[test]
    fn completion_breaks_composite_ties() {
        // Both unreviewed, composite 0; X submitted one of two tasks.
        let x = student(1, "Xavier Lima");
        let y = student(2, "Yara Nunes");
        let aggregates = vec![
            StudentAggregate {
                triples: vec![unsubmitted(task(1, 100)), unsubmitted(task(2, 100))],
                student: y.clone(),
            },
            StudentAggregate {
                triples: vec![submitted(task(1, 100), &x, 20), unsubmitted(task(2, 100))],
                student: x.clone(),
            },
        ];

        let outcome = compute(&registry(), &aggregates).unwrap();
        assert_eq!(outcome.rankings[0].student_id, x.id);
        assert_eq!(outcome.rankings[1].student_id, y.id);
    }

    #[test]
    fn earlier_last_submission_breaks_completion_ties() {
        let x = student(1, "Xavier Lima");
        let y = student(2, "Yara Nunes");
        let aggregates = vec![
            StudentAggregate {
                triples: vec![submitted(task(1, 100), &y, 50)],
                student: y.clone(),
            },
            StudentAggregate {
                triples: vec![submitted(task(1, 100), &x, 20)],
                student: x.clone(),
            },
        ];

        let outcome = compute(&registry(), &aggregates).unwrap();
        assert_eq!(outcome.rankings[0].student_id, x.id);
        assert_eq!(outcome.rankings[1].student_id, y.id);
    }

    #[test]
    fn student_id_is_the_final_tiebreak_and_places_stay_distinct() {
        let x = student(1, "Xavier Lima");
        let y = student(2, "Yara Nunes");
        let aggregates = vec![
            StudentAggregate {
                triples: vec![unsubmitted(task(1, 100))],
                student: y.clone(),
            },
            StudentAggregate {
                triples: vec![unsubmitted(task(1, 100))],
                student: x.clone(),
            },
        ];

        let outcome = compute(&registry(), &aggregates).unwrap();
        assert_eq!(outcome.rankings[0].student_id, x.id);
        assert_eq!(outcome.rankings[0].place, 1);
        assert_eq!(outcome.rankings[1].student_id, y.id);
        assert_eq!(outcome.rankings[1].place, 2);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let ana = student(1, "Ana Beatriz");
        let rui = student(2, "Rui Costa");
        let aggregates = vec![
            StudentAggregate {
                triples: vec![reviewed(task(1, 100), &ana, 20, 8.0)],
                student: ana,
            },
            StudentAggregate {
                triples: vec![reviewed(task(1, 100), &rui, 90, 5.0)],
                student: rui,
            },
        ];

        let first = compute(&registry(), &aggregates).unwrap();
        let second = compute(&registry(), &aggregates).unwrap();
        let order = |outcome: &RankingOutcome| {
            outcome
                .rankings
                .iter()
                .map(|r| (r.student_id, r.place, r.composite_score))
                .collect::<Vec<_>>()
        };
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn corrupt_records_unscore_one_student_not_the_leaderboard() {
        let ana = student(1, "Ana Beatriz");
        let rui = student(2, "Rui Costa");
        let aggregates = vec![
            StudentAggregate {
                triples: vec![reviewed(task(1, 100), &ana, 20, 8.0)],
                student: ana.clone(),
            },
            StudentAggregate {
                triples: vec![reviewed(task(1, 100), &rui, 20, 14.0)],
                student: rui.clone(),
            },
        ];

        let outcome = compute(&registry(), &aggregates).unwrap();
        assert_eq!(outcome.rankings.len(), 1);
        assert_eq!(outcome.rankings[0].student_id, ana.id);
        assert_eq!(outcome.unscored.len(), 1);
        assert_eq!(outcome.unscored[0].student_id, rui.id);
        assert!(outcome.unscored[0].reason.contains("0-10"));
    }
}
