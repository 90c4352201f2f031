use crate::error::RankingError;
use crate::models::StudentTaskTriple;

/// Maximum points the grade dimension can contribute.
pub const GRADE_WEIGHT: f64 = 75.0;

/// Descending thresholds on the average percent of the task window
/// consumed before submitting. The first threshold strictly exceeded
/// decides the points; boundary values fall through to the next row.
pub const TIME_BUCKETS: [(f64, f64); 5] = [
    (98.0, 0.0),
    (90.0, 5.0),
    (75.0, 10.0),
    (50.0, 15.0),
    (25.0, 20.0),
];

/// Points for an average at or below the lowest threshold.
pub const TIME_FLOOR_POINTS: f64 = 25.0;

/// One scoring dimension. Receives only the reviewed triples (feedback
/// present); unreviewed work is penalized by its absence, not here.
pub trait ScoreCalculator: Send + Sync + std::fmt::Debug {
    fn calculate(&self, reviewed: &[&StudentTaskTriple]) -> Result<f64, RankingError>;
}

/// Average grade on the 0-10 scale, normalized and weighted.
#[derive(Debug)]
pub struct GradeScoreCalculator;

impl ScoreCalculator for GradeScoreCalculator {
    fn calculate(&self, reviewed: &[&StudentTaskTriple]) -> Result<f64, RankingError> {
        let mut total = 0.0;
        let mut count = 0usize;
        for triple in reviewed {
            let Some(feedback) = triple.feedback.as_ref() else {
                continue;
            };
            if !(0.0..=10.0).contains(&feedback.grade) {
                return Err(RankingError::GradeOutOfRange {
                    task_title: triple.task.title.clone(),
                    grade: feedback.grade,
                });
            }
            total += feedback.grade;
            count += 1;
        }

        if count == 0 {
            return Ok(0.0);
        }
        let average = total / count as f64;
        Ok(average / 10.0 * GRADE_WEIGHT)
    }
}

/// How early in the task window the student submitted, averaged across
/// reviewed tasks and bucketed. Faster submission earns more points.
#[derive(Debug)]
pub struct TimeConsumedScoreCalculator;

impl TimeConsumedScoreCalculator {
    fn percent_consumed(triple: &StudentTaskTriple) -> Result<f64, RankingError> {
        let submission = triple.submission.as_ref().ok_or_else(|| {
            RankingError::FeedbackWithoutSubmission {
                task_title: triple.task.title.clone(),
            }
        })?;

        let window = (triple.task.due_at - triple.task.created_at).num_seconds();
        if window <= 0 {
            return Err(RankingError::InvalidTaskWindow {
                task_title: triple.task.title.clone(),
            });
        }

        let elapsed = (submission.submitted_at - triple.task.created_at).num_seconds();
        Ok(elapsed as f64 * 100.0 / window as f64)
    }

    fn bucket(average_percent: f64) -> f64 {
        for (threshold, points) in TIME_BUCKETS {
            if average_percent > threshold {
                return points;
            }
        }
        TIME_FLOOR_POINTS
    }
}

impl ScoreCalculator for TimeConsumedScoreCalculator {
    fn calculate(&self, reviewed: &[&StudentTaskTriple]) -> Result<f64, RankingError> {
        let mut total = 0.0;
        let mut count = 0usize;
        for triple in reviewed {
            if !triple.is_reviewed() {
                continue;
            }
            total += Self::percent_consumed(triple)?;
            count += 1;
        }

        if count == 0 {
            return Ok(0.0);
        }
        Ok(Self::bucket(total / count as f64))
    }
}
