use thiserror::Error;
use uuid::Uuid;

use crate::registry::ScoreDimension;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("class {class_id} has no ranked knowledge trails")]
    NoRankedTrails { class_id: Uuid },

    #[error("class {class_id} has no enrolled students")]
    NoEnrolledStudents { class_id: Uuid },

    #[error("knowledge trail {trail_id} has no tasks")]
    NoTasks { trail_id: Uuid },

    #[error("grade {grade} on task \"{task_title}\" is outside the 0-10 scale")]
    GradeOutOfRange { task_title: String, grade: f64 },

    #[error("task \"{task_title}\" is due on or before its creation date")]
    InvalidTaskWindow { task_title: String },

    #[error("feedback recorded on task \"{task_title}\" without a submission")]
    FeedbackWithoutSubmission { task_title: String },

    #[error("no score calculator registered for dimension {0}")]
    CalculatorMissing(ScoreDimension),

    #[error("ranking worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("database error: {0}")]
    Store(sqlx::Error),
}

impl RankingError {
    /// Empty-result conditions the caller surfaces as an absent leaderboard
    /// rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RankingError::NoRankedTrails { .. }
                | RankingError::NoEnrolledStudents { .. }
                | RankingError::NoTasks { .. }
                | RankingError::Store(sqlx::Error::RowNotFound)
        )
    }

    /// Corrupt-record conditions that unscore one student instead of
    /// failing the whole leaderboard.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            RankingError::GradeOutOfRange { .. }
                | RankingError::InvalidTaskWindow { .. }
                | RankingError::FeedbackWithoutSubmission { .. }
        )
    }
}

impl From<sqlx::Error> for RankingError {
    fn from(err: sqlx::Error) -> Self {
        RankingError::Store(err)
    }
}
