use std::io::IsTerminal;

use owo_colors::OwoColorize;

use crate::fixtures::{FixtureStatus, FixtureView, PredictionReview};
use crate::scoring::{FocusCategory, RuleOverlap};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format points without a trailing ".0" (8, 7.5, 12.25)
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{:.0}", points)
    } else {
        let s = format!("{:.2}", points);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn format_percentage(percentage: Option<f64>, use_colors: bool) -> String {
    let Some(p) = percentage else {
        return format!("{:>6}", "-");
    };
    let text = format!("{:>5.1}%", p);
    if !use_colors {
        return text;
    }
    if p < 40.0 {
        text.red().to_string()
    } else if p < 70.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

/// Format category scores as a table: name, score / possible, percentage.
pub fn format_category_scores(categories: &[FocusCategory], use_colors: bool) -> String {
    if categories.is_empty() {
        return "No category scores.".to_string();
    }

    let name_width = categories
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);

    categories
        .iter()
        .map(|c| {
            let name = format!("{:<width$}", c.name, width = name_width);
            let name = if use_colors {
                name.bold().to_string()
            } else {
                name
            };
            format!(
                "{}  {:>7} / {:<7} {}",
                name,
                format_points(c.score),
                format_points(c.possible),
                format_percentage(c.percentage, use_colors)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_status(status: FixtureStatus, use_colors: bool) -> String {
    let text = format!("{:<11}", status.label());
    if !use_colors {
        return text;
    }
    match status {
        FixtureStatus::NotStarted => text.green().to_string(),
        FixtureStatus::InProgress => text.yellow().to_string(),
        FixtureStatus::Finished => text.dimmed().to_string(),
    }
}

/// Format fixtures one per line: id, kick-off, status, teams and result.
pub fn format_fixtures(views: &[FixtureView], use_colors: bool) -> String {
    if views.is_empty() {
        return "No fixtures found.".to_string();
    }

    views
        .iter()
        .map(|v| {
            let result = match (v.fixture.home_team_score, v.fixture.away_team_score) {
                (Some(h), Some(a)) => format!("{}-{}", h, a),
                _ => "vs".to_string(),
            };
            let round = v
                .fixture
                .round
                .map(|r| format!("R{}", r))
                .unwrap_or_default();
            let teams = format!("{} {} {}", v.home, result, v.away);
            let teams = if use_colors {
                teams.cyan().to_string()
            } else {
                teams
            };
            format!(
                "{:>4}. {}  {:<4} {}  {}",
                v.fixture.id,
                v.fixture.kick_off_time.format("%Y-%m-%d %H:%M"),
                round,
                format_status(v.status, use_colors),
                teams
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the outcome of a prediction submission.
pub fn format_prediction_review(review: &PredictionReview, use_colors: bool) -> String {
    let mut lines = Vec::new();
    for row in &review.accepted {
        let line = format!(
            "  fixture {}: {}-{} saved",
            row.fixture_id, row.home_score, row.away_score
        );
        lines.push(if use_colors { line.green().to_string() } else { line });
    }
    for (input, reason) in &review.rejected {
        let line = format!("  fixture {}: skipped ({})", input.fixture_id, reason);
        lines.push(if use_colors { line.red().to_string() } else { line });
    }
    if lines.is_empty() {
        return "No predictions submitted.".to_string();
    }
    lines.join("\n")
}

/// Format overlapping rule pairs for `rules check`.
pub fn format_overlaps(overlaps: &[RuleOverlap], use_colors: bool) -> String {
    if overlaps.is_empty() {
        return "No overlapping rules.".to_string();
    }
    overlaps
        .iter()
        .map(|o| {
            let line = format!(
                "  question {}: rules {} and {} can match the same response",
                o.question_id, o.first, o.second
            );
            if use_colors {
                line.yellow().to_string()
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{PredictionInput, Rejection};
    use crate::store::types::{Fixture, PredictionRow};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(8.0), "8");
        assert_eq!(format_points(7.5), "7.5");
        assert_eq!(format_points(12.25), "12.25");
        assert_eq!(format_points(0.0), "0");
    }

    #[test]
    fn test_format_points_rounding_to_whole() {
        assert_eq!(format_points(2.999), "3");
        assert_eq!(format_points(100.001), "100");
        assert_eq!(format_points(0.004), "0");
        assert_eq!(format_points(-1.5), "-1.5");
    }

    #[test]
    fn test_category_table_plain() {
        let categories = vec![
            FocusCategory {
                category_id: 1,
                name: "strength".to_string(),
                score: 2.0,
                possible: 10.0,
                percentage: Some(20.0),
            },
            FocusCategory {
                category_id: 2,
                name: "sleep".to_string(),
                score: 0.0,
                possible: 0.0,
                percentage: None,
            },
        ];
        let output = format_category_scores(&categories, false);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("strength"));
        assert!(lines[0].contains("20.0%"));
        assert!(lines[1].starts_with("sleep   "));
        assert!(lines[1].ends_with('-'));
    }

    #[test]
    fn test_empty_outputs() {
        assert_eq!(format_category_scores(&[], false), "No category scores.");
        assert_eq!(format_fixtures(&[], false), "No fixtures found.");
        assert_eq!(format_overlaps(&[], false), "No overlapping rules.");
        assert_eq!(
            format_prediction_review(&PredictionReview::default(), false),
            "No predictions submitted."
        );
    }

    #[test]
    fn test_fixture_line() {
        let view = FixtureView {
            fixture: Fixture {
                id: 7,
                home_team_id: 1,
                away_team_id: 2,
                kick_off_time: Utc.with_ymd_and_hms(2024, 8, 17, 15, 0, 0).unwrap(),
                round: Some(3),
                home_team_score: Some(2),
                away_team_score: Some(1),
            },
            home: "Rovers".to_string(),
            away: "United".to_string(),
            status: FixtureStatus::Finished,
        };
        let output = format_fixtures(&[view], false);
        assert!(output.contains("2024-08-17 15:00"));
        assert!(output.contains("R3"));
        assert!(output.contains("finished"));
        assert!(output.ends_with("Rovers 2-1 United"));
    }

    #[test]
    fn test_prediction_review_lines() {
        let review = PredictionReview {
            accepted: vec![PredictionRow {
                user_id: 1,
                fixture_id: 4,
                home_score: 1,
                away_score: 0,
                tournament_id: None,
            }],
            rejected: vec![(
                PredictionInput { fixture_id: 5, home_score: 0, away_score: 0 },
                Rejection::UnknownFixture,
            )],
        };
        let output = format_prediction_review(&review, false);
        assert_eq!(
            output,
            "  fixture 4: 1-0 saved\n  fixture 5: skipped (no such fixture)"
        );
    }
}
