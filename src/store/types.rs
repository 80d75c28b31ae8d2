use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier grouping every response and score row of one assessment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseSetId(pub Uuid);

impl ResponseSetId {
    /// Mint a fresh random id. Never sequential.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResponseSetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResponseSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub gender: String,
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// One row of `user_responses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub user_id: i64,
    pub assessment_id: i64,
    pub question_id: i64,
    pub response_value: String,
    pub response_set_id: ResponseSetId,
}

/// One row of `user_scores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScoreRow {
    pub user_id: i64,
    pub assessment_id: i64,
    pub category_id: i64,
    pub score: f64,
    pub total_possible_score: f64,
    pub response_set_id: ResponseSetId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub kick_off_time: DateTime<Utc>,
    #[serde(default)]
    pub round: Option<i32>,
    #[serde(default)]
    pub home_team_score: Option<i32>,
    #[serde(default)]
    pub away_team_score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// One row of `user_predictions`, unique per (user, fixture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub user_id: i64,
    pub fixture_id: i64,
    #[serde(rename = "predicted_home_score")]
    pub home_score: u32,
    #[serde(rename = "predicted_away_score")]
    pub away_score: u32,
    /// League tables filter predictions by tournament.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<i64>,
}
