use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::registry::ScoreDimension;

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct KnowledgeTrail {
    pub id: Uuid,
    pub class_id: Uuid,
    pub name: String,
    pub ranked: bool,
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: Uuid,
    pub trail_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub task_id: Uuid,
    pub student_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub content_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub grade: f64,
    pub evaluator: String,
    pub comment: Option<String>,
}

/// One task of a trail as seen by one student. Feedback is only ever
/// present together with a submission.
#[derive(Debug, Clone)]
pub struct StudentTaskTriple {
    pub task: TaskRecord,
    pub submission: Option<SubmissionRecord>,
    pub feedback: Option<FeedbackRecord>,
}

impl StudentTaskTriple {
    pub fn is_reviewed(&self) -> bool {
        self.feedback.is_some()
    }
}

/// A student's full history on one trail, triples in trail task order.
#[derive(Debug, Clone)]
pub struct StudentAggregate {
    pub student: Student,
    pub triples: Vec<StudentTaskTriple>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionScore {
    pub dimension: ScoreDimension,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentRankingResult {
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub place: u32,
    pub composite_score: f64,
    pub breakdown: Vec<DimensionScore>,
    pub submitted_count: usize,
    pub reviewed_count: usize,
    pub task_count: usize,
    pub completion_percent: f64,
    pub average_grade: f64,
    pub last_submission: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnscoredStudent {
    pub student_id: Uuid,
    pub student_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrailLeaderboard {
    pub trail_id: Uuid,
    pub trail_name: String,
    pub rankings: Vec<StudentRankingResult>,
    pub unscored: Vec<UnscoredStudent>,
}
