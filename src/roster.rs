use std::collections::HashMap;

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::RankingError;
use crate::models::{
    FeedbackRecord, Student, StudentAggregate, StudentTaskTriple, SubmissionRecord, TaskRecord,
};
use crate::store;

/// One aggregate per enrolled student: the trail's tasks in trail order,
/// each with its at-most-one submission and at-most-one feedback.
///
/// One fetch pass against the store, then a pure assembly step.
pub async fn build(
    pool: &PgPool,
    class_id: Uuid,
    trail_id: Uuid,
) -> Result<Vec<StudentAggregate>, RankingError> {
    let students = store::students_enrolled_in_class(pool, class_id).await?;
    let tasks = store::tasks_for_trail(pool, trail_id).await?;
    let submissions = store::submissions_for_trail(pool, trail_id).await?;
    debug!(
        %class_id,
        %trail_id,
        students = students.len(),
        tasks = tasks.len(),
        submissions = submissions.len(),
        "assembling roster"
    );
    assemble(class_id, trail_id, students, tasks, submissions)
}

/// Joins the fetched rows into per-student aggregates. Students with no
/// submissions still get a triple per task, all empty.
pub fn assemble(
    class_id: Uuid,
    trail_id: Uuid,
    students: Vec<Student>,
    tasks: Vec<TaskRecord>,
    submissions: Vec<(SubmissionRecord, Option<FeedbackRecord>)>,
) -> Result<Vec<StudentAggregate>, RankingError> {
    if students.is_empty() {
        return Err(RankingError::NoEnrolledStudents { class_id });
    }
    if tasks.is_empty() {
        return Err(RankingError::NoTasks { trail_id });
    }

    let mut by_key: HashMap<(Uuid, Uuid), (SubmissionRecord, Option<FeedbackRecord>)> =
        submissions
            .into_iter()
            .map(|(submission, feedback)| {
                ((submission.student_id, submission.task_id), (submission, feedback))
            })
            .collect();

    let aggregates = students
        .into_iter()
        .map(|student| {
            let triples = tasks
                .iter()
                .map(|task| match by_key.remove(&(student.id, task.id)) {
                    Some((submission, feedback)) => StudentTaskTriple {
                        task: task.clone(),
                        submission: Some(submission),
                        feedback,
                    },
                    None => StudentTaskTriple {
                        task: task.clone(),
                        submission: None,
                        feedback: None,
                    },
                })
                .collect();
            StudentAggregate { student, triples }
        })
        .collect();

    Ok(aggregates)
}
