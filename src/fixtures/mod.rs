pub mod points;
pub mod predictions;
pub mod results;
pub mod status;

pub use points::{run_every, run_once, PointsSummary};
pub use predictions::{
    load_predictions, review_predictions, submit_predictions, PredictionInput, PredictionReview,
    Rejection,
};
pub use results::record_result;
pub use status::FixtureStatus;

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::store::types::{Fixture, Team};
use crate::store::DataStore;

/// A fixture with team names and its status at the time it was loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureView {
    pub fixture: Fixture,
    pub home: String,
    pub away: String,
    pub status: FixtureStatus,
}

/// Attach team names and compute each fixture's status at `now`.
pub fn build_views(fixtures: Vec<Fixture>, teams: &[Team], now: DateTime<Utc>) -> Vec<FixtureView> {
    let names: HashMap<i64, &str> = teams.iter().map(|t| (t.id, t.name.as_str())).collect();
    let name_of = |id: i64| {
        names
            .get(&id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("team {}", id))
    };

    fixtures
        .into_iter()
        .map(|fixture| FixtureView {
            home: name_of(fixture.home_team_id),
            away: name_of(fixture.away_team_id),
            status: FixtureStatus::at(fixture.kick_off_time, now),
            fixture,
        })
        .collect()
}

/// Load all fixtures ordered by kick-off, with statuses as of `now`.
pub async fn list_fixtures(store: &dyn DataStore, now: DateTime<Utc>) -> Result<Vec<FixtureView>> {
    let (fixtures, teams) = tokio::try_join!(store.fixtures(), store.teams())
        .context("Failed to fetch fixtures and teams")?;
    Ok(build_views(fixtures, &teams, now))
}
