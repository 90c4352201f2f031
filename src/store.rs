use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{FeedbackRecord, KnowledgeTrail, Student, SubmissionRecord, TaskRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let class_id = Uuid::parse_str("7c1f4b7e-4d6a-4f2b-9a57-0d4f2f8c1a11")?;
    sqlx::query(
        r#"
        INSERT INTO trail_rankings.classes (id, name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(class_id)
    .bind("Year 8 Mathematics")
    .execute(pool)
    .await?;

    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Ana Beatriz Sousa",
            "ana.sousa@stream.school",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Rui Costa",
            "rui.costa@stream.school",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Mendes",
            "kiara.mendes@stream.school",
        ),
    ];

    for (id, name, email) in &students {
        sqlx::query(
            r#"
            INSERT INTO trail_rankings.students (id, class_id, full_name, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, class_id = EXCLUDED.class_id
            "#,
        )
        .bind(id)
        .bind(class_id)
        .bind(name)
        .bind(email)
        .execute(pool)
        .await?;
    }

    let trails = vec![
        (
            Uuid::parse_str("9b2d6c33-5f1a-4a8e-b4d9-6a0c1f2e3d44")?,
            "Fractions and Decimals",
            true,
            1,
        ),
        (
            Uuid::parse_str("4e8a1b52-7c3d-4f6e-9a2b-8d5c6e7f0a13")?,
            "Geometry Warmups",
            false,
            2,
        ),
    ];

    for (id, name, ranked, position) in &trails {
        sqlx::query(
            r#"
            INSERT INTO trail_rankings.knowledge_trails (id, class_id, name, ranked, position)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, ranked = EXCLUDED.ranked, position = EXCLUDED.position
            "#,
        )
        .bind(id)
        .bind(class_id)
        .bind(name)
        .bind(ranked)
        .bind(position)
        .execute(pool)
        .await?;
    }

    let ranked_trail = trails[0].0;
    let opened = |day: u32| -> anyhow::Result<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2026, 3, day, 8, 0, 0)
            .single()
            .context("invalid seed timestamp")
    };

    let tasks = vec![
        (
            Uuid::parse_str("1a2b3c4d-0001-4a00-8000-000000000001")?,
            "Simplifying fractions",
            opened(2)?,
            opened(9)?,
            1,
        ),
        (
            Uuid::parse_str("1a2b3c4d-0002-4a00-8000-000000000002")?,
            "Decimal notation",
            opened(9)?,
            opened(16)?,
            2,
        ),
        (
            Uuid::parse_str("1a2b3c4d-0003-4a00-8000-000000000003")?,
            "Percentages in context",
            opened(16)?,
            opened(23)?,
            3,
        ),
    ];

    for (id, title, created_at, due_at, position) in &tasks {
        sqlx::query(
            r#"
            INSERT INTO trail_rankings.trail_tasks (id, trail_id, title, created_at, due_at, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(ranked_trail)
        .bind(title)
        .bind(created_at)
        .bind(due_at)
        .bind(position)
        .execute(pool)
        .await?;
    }

    // (task idx, student idx, hours into the window, grade)
    let submissions: Vec<(usize, usize, i64, Option<f64>)> = vec![
        (0, 0, 20, Some(9.0)),
        (1, 0, 12, Some(8.5)),
        (2, 0, 30, Some(10.0)),
        (0, 1, 150, Some(6.0)),
        (1, 1, 160, None),
    ];

    for (task_idx, student_idx, hours, grade) in submissions {
        let (task_id, _, created_at, _, _) = tasks[task_idx];
        let (student_id, _, _) = students[student_idx];
        let submission_id = Uuid::new_v4();
        let inserted = sqlx::query(
            r#"
            INSERT INTO trail_rankings.submissions
            (id, task_id, student_id, submitted_at, content_ref, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (task_id, student_id) DO NOTHING
            "#,
        )
        .bind(submission_id)
        .bind(task_id)
        .bind(student_id)
        .bind(created_at + chrono::Duration::hours(hours))
        .bind("uploads/answer.pdf")
        .bind(format!("seed-{task_idx}-{student_idx}"))
        .execute(pool)
        .await?;

        if inserted.rows_affected() == 0 {
            continue;
        }

        if let Some(grade) = grade {
            sqlx::query(
                r#"
                INSERT INTO trail_rankings.feedback (id, submission_id, grade, evaluator, comment)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (submission_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(submission_id)
            .bind(grade)
            .bind("Prof. Duarte")
            .bind("Seeded feedback")
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

pub async fn students_enrolled_in_class(
    pool: &PgPool,
    class_id: Uuid,
) -> Result<Vec<Student>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, full_name, email FROM trail_rankings.students \
         WHERE class_id = $1 ORDER BY full_name",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Student {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
        })
        .collect())
}

pub async fn ranked_trails_for_class(
    pool: &PgPool,
    class_id: Uuid,
    trail_filter: Option<&[Uuid]>,
) -> Result<Vec<KnowledgeTrail>, sqlx::Error> {
    let mut query = String::from(
        "SELECT id, class_id, name, ranked FROM trail_rankings.knowledge_trails \
         WHERE class_id = $1 AND ranked",
    );
    if trail_filter.is_some() {
        query.push_str(" AND id = ANY($2)");
    }
    query.push_str(" ORDER BY position");

    let mut rows = sqlx::query(&query).bind(class_id);
    if let Some(ids) = trail_filter {
        rows = rows.bind(ids.to_vec());
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records
        .into_iter()
        .map(|row| KnowledgeTrail {
            id: row.get("id"),
            class_id: row.get("class_id"),
            name: row.get("name"),
            ranked: row.get("ranked"),
        })
        .collect())
}

pub async fn tasks_for_trail(
    pool: &PgPool,
    trail_id: Uuid,
) -> Result<Vec<TaskRecord>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, trail_id, title, created_at, due_at FROM trail_rankings.trail_tasks \
         WHERE trail_id = $1 ORDER BY position, created_at",
    )
    .bind(trail_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TaskRecord {
            id: row.get("id"),
            trail_id: row.get("trail_id"),
            title: row.get("title"),
            created_at: row.get("created_at"),
            due_at: row.get("due_at"),
        })
        .collect())
}

/// Every submission on the trail with its feedback, one joined pass.
pub async fn submissions_for_trail(
    pool: &PgPool,
    trail_id: Uuid,
) -> Result<Vec<(SubmissionRecord, Option<FeedbackRecord>)>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT s.id AS submission_id, s.task_id, s.student_id, s.submitted_at, s.content_ref, \
         f.id AS feedback_id, f.grade, f.evaluator, f.comment \
         FROM trail_rankings.submissions s \
         JOIN trail_rankings.trail_tasks t ON t.id = s.task_id \
         LEFT JOIN trail_rankings.feedback f ON f.submission_id = s.id \
         WHERE t.trail_id = $1",
    )
    .bind(trail_id)
    .fetch_all(pool)
    .await?;

    let mut pairs = Vec::with_capacity(rows.len());
    for row in rows {
        let submission = SubmissionRecord {
            id: row.get("submission_id"),
            task_id: row.get("task_id"),
            student_id: row.get("student_id"),
            submitted_at: row.get("submitted_at"),
            content_ref: row.get("content_ref"),
        };
        let feedback = row
            .get::<Option<Uuid>, _>("feedback_id")
            .map(|feedback_id| FeedbackRecord {
                id: feedback_id,
                submission_id: submission.id,
                grade: row.get("grade"),
                evaluator: row.get("evaluator"),
                comment: row.get("comment"),
            });
        pairs.push((submission, feedback));
    }

    Ok(pairs)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_name: String,
        student_email: String,
        trail_name: String,
        task_title: String,
        submitted_at: DateTime<Utc>,
        content_ref: Option<String>,
        grade: Option<f64>,
        evaluator: Option<String>,
        comment: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;

        let trail = sqlx::query(
            "SELECT id, class_id FROM trail_rankings.knowledge_trails WHERE name = $1",
        )
        .bind(&row.trail_name)
        .fetch_one(pool)
        .await
        .with_context(|| format!("unknown knowledge trail \"{}\"", row.trail_name))?;
        let trail_id: Uuid = trail.get("id");
        let class_id: Uuid = trail.get("class_id");

        let task_id: Uuid = sqlx::query(
            "SELECT id FROM trail_rankings.trail_tasks WHERE trail_id = $1 AND title = $2",
        )
        .bind(trail_id)
        .bind(&row.task_title)
        .fetch_one(pool)
        .await
        .with_context(|| format!("unknown task \"{}\" on \"{}\"", row.task_title, row.trail_name))?
        .get("id");

        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO trail_rankings.students (id, class_id, full_name, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, class_id = EXCLUDED.class_id
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(class_id)
        .bind(&row.student_name)
        .bind(&row.student_email)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let submission_id = Uuid::new_v4();

        let result = sqlx::query(
            r#"
            INSERT INTO trail_rankings.submissions
            (id, task_id, student_id, submitted_at, content_ref, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (task_id, student_id) DO NOTHING
            "#,
        )
        .bind(submission_id)
        .bind(task_id)
        .bind(student_id)
        .bind(row.submitted_at)
        .bind(&row.content_ref)
        .bind(&source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            continue;
        }
        inserted += 1;

        if let Some(grade) = row.grade {
            sqlx::query(
                r#"
                INSERT INTO trail_rankings.feedback (id, submission_id, grade, evaluator, comment)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (submission_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(submission_id)
            .bind(grade)
            .bind(row.evaluator.as_deref().unwrap_or("import"))
            .bind(&row.comment)
            .execute(pool)
            .await?;
        }
    }

    Ok(inserted)
}
