use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::RankingError;
use crate::models::{KnowledgeTrail, TrailLeaderboard};
use crate::ranking;
use crate::registry::CalculatorRegistry;
use crate::roster;

/// One leaderboard per ranked trail of the class, in trail order.
///
/// Trails are independent, so each leaderboard is computed on its own
/// worker; the first failing trail cancels the rest of the batch.
pub async fn rankings_for_class(
    pool: &PgPool,
    registry: &CalculatorRegistry,
    class_id: Uuid,
    trail_filter: Option<&[Uuid]>,
) -> Result<Vec<TrailLeaderboard>, RankingError> {
    let trails = resolve_ranked_trails(pool, class_id, trail_filter).await?;
    info!(%class_id, trails = trails.len(), "computing trail leaderboards");

    let mut workers = JoinSet::new();
    for (index, trail) in trails.into_iter().enumerate() {
        let pool = pool.clone();
        let registry = registry.clone();
        workers.spawn(async move {
            let leaderboard = leaderboard_for_trail(&pool, &registry, trail).await;
            (index, leaderboard)
        });
    }

    let mut slots: Vec<Option<TrailLeaderboard>> = (0..workers.len()).map(|_| None).collect();
    while let Some(joined) = workers.join_next().await {
        let (index, leaderboard) = joined?;
        slots[index] = Some(leaderboard?);
    }

    Ok(slots.into_iter().flatten().collect())
}

async fn resolve_ranked_trails(
    pool: &PgPool,
    class_id: Uuid,
    trail_filter: Option<&[Uuid]>,
) -> Result<Vec<KnowledgeTrail>, RankingError> {
    let mut trails = crate::store::ranked_trails_for_class(pool, class_id, trail_filter).await?;
    trails.retain(|trail| trail.ranked);
    if trails.is_empty() {
        return Err(RankingError::NoRankedTrails { class_id });
    }
    Ok(trails)
}

async fn leaderboard_for_trail(
    pool: &PgPool,
    registry: &CalculatorRegistry,
    trail: KnowledgeTrail,
) -> Result<TrailLeaderboard, RankingError> {
    let aggregates = roster::build(pool, trail.class_id, trail.id).await?;
    let outcome = ranking::compute(registry, &aggregates)?;
    for skipped in &outcome.unscored {
        warn!(
            trail = %trail.name,
            student = %skipped.student_name,
            reason = %skipped.reason,
            "student left unscored"
        );
    }
    Ok(TrailLeaderboard {
        trail_id: trail.id,
        trail_name: trail.name,
        rankings: outcome.rankings,
        unscored: outcome.unscored,
    })
}
