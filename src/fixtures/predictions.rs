use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::FixtureStatus;
use crate::context::RequestContext;
use crate::store::types::{Fixture, PredictionRow};
use crate::store::DataStore;

/// A predicted scoreline for one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionInput {
    pub fixture_id: i64,
    pub home_score: u32,
    pub away_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnknownFixture,
    Locked(FixtureStatus),
    Duplicate,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownFixture => write!(f, "no such fixture"),
            Rejection::Locked(status) => write!(f, "fixture is {}", status),
            Rejection::Duplicate => write!(f, "fixture predicted more than once"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionReview {
    pub accepted: Vec<PredictionRow>,
    pub rejected: Vec<(PredictionInput, Rejection)>,
}

/// Load predictions from a YAML or JSON file (by extension).
pub fn load_predictions(path: &Path) -> Result<Vec<PredictionInput>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read predictions file at {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse predictions: invalid JSON in {}", path.display()))
    } else {
        serde_saphyr::from_str(&content)
            .with_context(|| format!("Failed to parse predictions: invalid YAML in {}", path.display()))
    }
}

/// Split predictions into those that can be stored and those that cannot.
///
/// Only fixtures that have not started take predictions. The first entry for
/// a fixture wins; later ones are rejected as duplicates.
pub fn review_predictions(
    user_id: i64,
    tournament_id: Option<i64>,
    inputs: &[PredictionInput],
    fixtures: &[Fixture],
    now: DateTime<Utc>,
) -> PredictionReview {
    let kickoffs: HashMap<i64, DateTime<Utc>> = fixtures.iter().map(|f| (f.id, f.kick_off_time)).collect();
    let mut seen = HashSet::new();
    let mut review = PredictionReview::default();

    for input in inputs {
        let rejection = match kickoffs.get(&input.fixture_id) {
            None => Some(Rejection::UnknownFixture),
            Some(&kickoff) => {
                let status = FixtureStatus::at(kickoff, now);
                if !status.accepts_predictions() {
                    Some(Rejection::Locked(status))
                } else if !seen.insert(input.fixture_id) {
                    Some(Rejection::Duplicate)
                } else {
                    None
                }
            }
        };

        match rejection {
            Some(reason) => review.rejected.push((input.clone(), reason)),
            None => review.accepted.push(PredictionRow {
                user_id,
                fixture_id: input.fixture_id,
                home_score: input.home_score,
                away_score: input.away_score,
                tournament_id,
            }),
        }
    }

    review
}

/// Review the acting user's predictions against current fixtures and store
/// the accepted ones.
///
/// Storing replaces any earlier prediction the user made for the same
/// fixture, so running this twice leaves one row per fixture.
pub async fn submit_predictions(
    store: &dyn DataStore,
    ctx: &mut RequestContext,
    tournament_id: Option<i64>,
    inputs: &[PredictionInput],
    now: DateTime<Utc>,
) -> Result<PredictionReview> {
    let Some(user_id) = ctx.user().map(|u| u.id) else {
        ctx.error("No user to record predictions for");
        bail!("Predictions need an acting user");
    };

    let fixtures = match store.fixtures().await {
        Ok(f) => f,
        Err(e) => {
            ctx.error("Failed to load fixtures");
            return Err(e).context("Failed to fetch fixtures");
        }
    };

    let review = review_predictions(user_id, tournament_id, inputs, &fixtures, now);
    for (input, reason) in &review.rejected {
        tracing::warn!(fixture_id = input.fixture_id, %reason, "prediction rejected");
    }

    if let Err(e) = store.upsert_predictions(&review.accepted).await {
        ctx.error("Failed to save predictions");
        return Err(e).context("Failed to store predictions");
    }

    if !review.accepted.is_empty() {
        ctx.success(format!("Saved {} prediction(s)", review.accepted.len()));
    }
    if !review.rejected.is_empty() {
        ctx.error(format!("{} prediction(s) were not accepted", review.rejected.len()));
    }

    Ok(review)
}
