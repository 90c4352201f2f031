use std::fmt::Write;

use uuid::Uuid;

use crate::models::TrailLeaderboard;

pub fn build_report(class_id: Uuid, leaderboards: &[TrailLeaderboard]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Trail Rankings Report");
    let _ = writeln!(output, "Generated for class {class_id}");

    for leaderboard in leaderboards {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", leaderboard.trail_name);

        if leaderboard.rankings.is_empty() {
            let _ = writeln!(output, "No students could be scored on this trail.");
        }

        for result in leaderboard.rankings.iter() {
            let sub_scores = result
                .breakdown
                .iter()
                .map(|d| format!("{} {:.1}", d.dimension, d.points))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                output,
                "{}. {} ({}) scored {:.1} points ({}); {}/{} submitted, {} reviewed, avg grade {:.1}",
                result.place,
                result.student_name,
                result.student_email,
                result.composite_score,
                sub_scores,
                result.submitted_count,
                result.task_count,
                result.reviewed_count,
                result.average_grade
            );
        }

        if !leaderboard.unscored.is_empty() {
            let _ = writeln!(output);
            let _ = writeln!(output, "### Not scored");
            for skipped in leaderboard.unscored.iter() {
                let _ = writeln!(output, "- {}: {}", skipped.student_name, skipped.reason);
            }
        }
    }

    output
}
