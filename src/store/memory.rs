use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::types::{
    Category, CategoryScoreRow, Fixture, PredictionRow, Question, ResponseRow, ResponseSetId, Team,
    UserProfile,
};
use super::DataStore;
use crate::error::StoreError;
use crate::scoring::ScoringRule;

/// In-process [`DataStore`] holding rows in vectors.
///
/// Writes append in order, so the last score row stands in for the newest
/// `created_at`. Tables named with [`MemoryStore::reject_writes_to`] refuse inserts.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

#[derive(Default)]
struct MemoryData {
    users: Vec<UserProfile>,
    questions: Vec<Question>,
    categories: Vec<Category>,
    rules: Vec<ScoringRule>,
    responses: Vec<ResponseRow>,
    scores: Vec<CategoryScoreRow>,
    fixtures: Vec<Fixture>,
    teams: Vec<Team>,
    predictions: Vec<PredictionRow>,
    procedure_calls: Vec<String>,
    procedure_delay: Option<Duration>,
    rejected: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryData> {
        // A panic while holding the lock leaves plain row vectors, still usable
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_user(self, user: UserProfile) -> Self {
        self.lock().users.push(user);
        self
    }

    pub fn with_questions(self, questions: Vec<Question>) -> Self {
        self.lock().questions.extend(questions);
        self
    }

    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        self.lock().categories.extend(categories);
        self
    }

    pub fn with_rules(self, rules: Vec<ScoringRule>) -> Self {
        self.lock().rules.extend(rules);
        self
    }

    pub fn with_fixtures(self, fixtures: Vec<Fixture>) -> Self {
        self.lock().fixtures.extend(fixtures);
        self
    }

    pub fn with_teams(self, teams: Vec<Team>) -> Self {
        self.lock().teams.extend(teams);
        self
    }

    /// Make every procedure call take `delay` before it completes.
    pub fn with_procedure_delay(self, delay: Duration) -> Self {
        self.lock().procedure_delay = Some(delay);
        self
    }

    /// Make inserts into `table` fail with [`StoreError::Rejected`].
    pub fn reject_writes_to(self, table: &str) -> Self {
        self.lock().rejected.insert(table.to_string());
        self
    }

    pub fn responses(&self) -> Vec<ResponseRow> {
        self.lock().responses.clone()
    }

    pub fn scores(&self) -> Vec<CategoryScoreRow> {
        self.lock().scores.clone()
    }

    pub fn predictions(&self) -> Vec<PredictionRow> {
        self.lock().predictions.clone()
    }

    pub fn procedure_calls(&self) -> Vec<String> {
        self.lock().procedure_calls.clone()
    }
}

impl MemoryData {
    fn check_write(&self, table: &str) -> Result<(), StoreError> {
        if self.rejected.contains(table) {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                reason: "writes disabled".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn user_profile(&self, user_id: i64) -> Result<UserProfile, StoreError> {
        self.lock()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                table: "users".to_string(),
                key: format!("id={}", user_id),
            })
    }

    async fn insert_responses(&self, rows: &[ResponseRow]) -> Result<(), StoreError> {
        let mut data = self.lock();
        data.check_write("user_responses")?;
        data.responses.extend_from_slice(rows);
        Ok(())
    }

    async fn responses_for_set(
        &self,
        user_id: i64,
        assessment_id: i64,
        set: ResponseSetId,
    ) -> Result<Vec<ResponseRow>, StoreError> {
        Ok(self
            .lock()
            .responses
            .iter()
            .filter(|r| r.user_id == user_id && r.assessment_id == assessment_id && r.response_set_id == set)
            .cloned()
            .collect())
    }

    async fn scoring_rules(&self, question_ids: &[i64]) -> Result<Vec<ScoringRule>, StoreError> {
        let mut rules: Vec<ScoringRule> = self
            .lock()
            .rules
            .iter()
            .filter(|r| question_ids.contains(&r.question_id))
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.id);
        Ok(rules)
    }

    async fn all_scoring_rules(&self) -> Result<Vec<ScoringRule>, StoreError> {
        let mut rules = self.lock().rules.clone();
        rules.sort_by_key(|r| (r.question_id, r.id));
        Ok(rules)
    }

    async fn questions(&self, ids: &[i64]) -> Result<Vec<Question>, StoreError> {
        Ok(self
            .lock()
            .questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn insert_category_scores(&self, rows: &[CategoryScoreRow]) -> Result<(), StoreError> {
        let mut data = self.lock();
        data.check_write("user_scores")?;
        data.scores.extend_from_slice(rows);
        Ok(())
    }

    async fn latest_response_set(&self, user_id: i64) -> Result<Option<ResponseSetId>, StoreError> {
        Ok(self
            .lock()
            .scores
            .iter()
            .rev()
            .find(|s| s.user_id == user_id)
            .map(|s| s.response_set_id))
    }

    async fn category_scores(&self, set: ResponseSetId) -> Result<Vec<CategoryScoreRow>, StoreError> {
        Ok(self
            .lock()
            .scores
            .iter()
            .filter(|s| s.response_set_id == set)
            .cloned()
            .collect())
    }

    async fn categories(&self, ids: &[i64]) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn fixtures(&self) -> Result<Vec<Fixture>, StoreError> {
        let mut fixtures = self.lock().fixtures.clone();
        fixtures.sort_by_key(|f| f.kick_off_time);
        Ok(fixtures)
    }

    async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        Ok(self.lock().teams.clone())
    }

    async fn upsert_predictions(&self, rows: &[PredictionRow]) -> Result<(), StoreError> {
        let mut data = self.lock();
        data.check_write("user_predictions")?;
        for row in rows {
            let existing = data
                .predictions
                .iter_mut()
                .find(|p| p.user_id == row.user_id && p.fixture_id == row.fixture_id);
            match existing {
                Some(p) => *p = row.clone(),
                None => data.predictions.push(row.clone()),
            }
        }
        Ok(())
    }

    async fn update_fixture_result(&self, fixture_id: i64, home: i32, away: i32) -> Result<(), StoreError> {
        let mut data = self.lock();
        data.check_write("fixtures")?;
        let fixture = data
            .fixtures
            .iter_mut()
            .find(|f| f.id == fixture_id)
            .ok_or_else(|| StoreError::NotFound {
                table: "fixtures".to_string(),
                key: format!("id={}", fixture_id),
            })?;
        fixture.home_team_score = Some(home);
        fixture.away_team_score = Some(away);
        Ok(())
    }

    async fn call_procedure(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        let delay = self.lock().procedure_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut data = self.lock();
        data.check_write(name)?;
        data.procedure_calls.push(name.to_string());
        Ok(serde_json::Value::Null)
    }
}
