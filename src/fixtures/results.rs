use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::status::FixtureStatus;
use crate::context::RequestContext;
use crate::store::DataStore;

/// Record the final score of a fixture so the points job can settle predictions.
///
/// A result may be entered or corrected at any time. Entering one before
/// kick-off is allowed but logged, since predictions are still open then.
pub async fn record_result(
    store: &dyn DataStore,
    ctx: &mut RequestContext,
    fixture_id: i64,
    home: u32,
    away: u32,
    now: DateTime<Utc>,
) -> Result<()> {
    let home = i32::try_from(home).context("Home score is too large")?;
    let away = i32::try_from(away).context("Away score is too large")?;

    match store.fixtures().await {
        Ok(fixtures) => {
            if let Some(f) = fixtures.iter().find(|f| f.id == fixture_id) {
                let status = FixtureStatus::at(f.kick_off_time, now);
                if status != FixtureStatus::Finished {
                    tracing::warn!(fixture_id, %status, "recording a result for a fixture that has not finished");
                }
            }
        }
        Err(e) => tracing::debug!("could not check fixture status: {}", e),
    }

    if let Err(e) = store.update_fixture_result(fixture_id, home, away).await {
        ctx.error(format!("Failed to record result for fixture {}", fixture_id));
        return Err(e).with_context(|| format!("Failed to update fixture {}", fixture_id));
    }

    tracing::info!(fixture_id, home, away, "fixture result recorded");
    ctx.success(format!("Fixture {} result recorded: {}-{}", fixture_id, home, away));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Flash;
    use crate::error::StoreError;
    use crate::store::types::Fixture;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn fixture(id: i64, kickoff: DateTime<Utc>) -> Fixture {
        Fixture {
            id,
            home_team_id: 1,
            away_team_id: 2,
            kick_off_time: kickoff,
            round: None,
            home_team_score: None,
            away_team_score: None,
        }
    }

    #[tokio::test]
    async fn test_record_result_updates_fixture() {
        let now = Utc::now();
        let store = MemoryStore::new().with_fixtures(vec![
            fixture(1, now - Duration::hours(3)),
            fixture(2, now - Duration::hours(2)),
        ]);
        let mut ctx = RequestContext::new();

        record_result(&store, &mut ctx, 2, 3, 1, now).await.unwrap();

        let fixtures = store.fixtures().await.unwrap();
        assert_eq!(fixtures[0].home_team_score, None);
        assert_eq!(fixtures[1].home_team_score, Some(3));
        assert_eq!(fixtures[1].away_team_score, Some(1));
        assert_eq!(
            ctx.take_flashes(),
            vec![Flash::Success("Fixture 2 result recorded: 3-1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_result_can_be_corrected() {
        let now = Utc::now();
        let store = MemoryStore::new().with_fixtures(vec![fixture(1, now - Duration::hours(3))]);
        let mut ctx = RequestContext::new();

        record_result(&store, &mut ctx, 1, 0, 0, now).await.unwrap();
        record_result(&store, &mut ctx, 1, 2, 2, now).await.unwrap();

        let fixtures = store.fixtures().await.unwrap();
        assert_eq!((fixtures[0].home_team_score, fixtures[0].away_team_score), (Some(2), Some(2)));
    }

    #[tokio::test]
    async fn test_unknown_fixture_is_an_error() {
        let store = MemoryStore::new();
        let mut ctx = RequestContext::new();

        let err = record_result(&store, &mut ctx, 9, 1, 0, Utc::now()).await.unwrap_err();
        assert!(err
            .chain()
            .any(|e| matches!(e.downcast_ref::<StoreError>(), Some(StoreError::NotFound { .. }))));
        assert!(ctx.has_errors());
    }

    #[tokio::test]
    async fn test_oversized_score_rejected() {
        let store = MemoryStore::new().with_fixtures(vec![fixture(1, Utc::now())]);
        let mut ctx = RequestContext::new();
        assert!(record_result(&store, &mut ctx, 1, u32::MAX, 0, Utc::now()).await.is_err());
        assert_eq!(store.fixtures().await.unwrap()[0].home_team_score, None);
    }
}
