pub mod memory;
pub mod rest;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::scoring::ScoringRule;
use types::{
    Category, CategoryScoreRow, Fixture, PredictionRow, Question, ResponseRow, ResponseSetId, Team,
    UserProfile,
};

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Row operations the application needs from the hosted relational store.
///
/// Every call is a separate round trip. Nothing spans calls, so a failure
/// between two writes leaves the first write in place.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn user_profile(&self, user_id: i64) -> Result<UserProfile, StoreError>;

    async fn insert_responses(&self, rows: &[ResponseRow]) -> Result<(), StoreError>;

    async fn responses_for_set(
        &self,
        user_id: i64,
        assessment_id: i64,
        set: ResponseSetId,
    ) -> Result<Vec<ResponseRow>, StoreError>;

    /// Rules for the given questions, ordered by rule id.
    async fn scoring_rules(&self, question_ids: &[i64]) -> Result<Vec<ScoringRule>, StoreError>;

    async fn all_scoring_rules(&self) -> Result<Vec<ScoringRule>, StoreError>;

    async fn questions(&self, ids: &[i64]) -> Result<Vec<Question>, StoreError>;

    async fn insert_category_scores(&self, rows: &[CategoryScoreRow]) -> Result<(), StoreError>;

    /// The response set of the user's most recently written score row.
    async fn latest_response_set(&self, user_id: i64) -> Result<Option<ResponseSetId>, StoreError>;

    async fn category_scores(&self, set: ResponseSetId) -> Result<Vec<CategoryScoreRow>, StoreError>;

    async fn categories(&self, ids: &[i64]) -> Result<Vec<Category>, StoreError>;

    /// All fixtures ordered by kick-off time.
    async fn fixtures(&self) -> Result<Vec<Fixture>, StoreError>;

    async fn teams(&self) -> Result<Vec<Team>, StoreError>;

    /// Insert predictions, replacing an existing row for the same (user, fixture).
    async fn upsert_predictions(&self, rows: &[PredictionRow]) -> Result<(), StoreError>;

    /// Set the final score of a fixture.
    async fn update_fixture_result(&self, fixture_id: i64, home: i32, away: i32) -> Result<(), StoreError>;

    /// Invoke a stored procedure by name and return its raw result.
    async fn call_procedure(&self, name: &str) -> Result<serde_json::Value, StoreError>;
}
