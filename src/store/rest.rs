use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::types::{
    Category, CategoryScoreRow, Fixture, PredictionRow, Question, ResponseRow, ResponseSetId, Team,
    UserProfile,
};
use super::DataStore;
use crate::error::StoreError;
use crate::scoring::ScoringRule;

/// Client for a PostgREST-style hosted data API (`{url}/rest/v1/{table}`).
#[derive(Clone)]
pub struct RestStore {
    http: Client,
    base: Url,
    key: String,
    schema: Option<String>,
}

#[derive(Deserialize)]
struct ResponseSetOnly {
    response_set_id: ResponseSetId,
}

impl RestStore {
    /// Create a store client. `key` is sent as both `apikey` and bearer token.
    pub fn new(url: &str, key: &str, schema: Option<String>) -> Result<Self> {
        let base = Url::parse(url).with_context(|| format!("Invalid store url '{}'", url))?;
        if base.cannot_be_a_base() {
            bail!("Store url '{}' cannot carry a path", url);
        }

        let http = Client::builder()
            .user_agent(concat!("scorekeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base,
            key: key.to_string(),
            schema,
        })
    }

    fn endpoint(&self, path: &[&str], params: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was ruled out in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("rest").push("v1").extend(path);
        }
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }

    fn authorize(&self, request: RequestBuilder, write: bool) -> RequestBuilder {
        let request = request
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key));
        match (&self.schema, write) {
            (Some(schema), true) => request.header("Content-Profile", schema),
            (Some(schema), false) => request.header("Accept-Profile", schema),
            (None, _) => request,
        }
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, params: &[(&str, String)]) -> Result<Vec<T>, StoreError> {
        let url = self.endpoint(&[table], params);
        tracing::debug!(%url, "select");
        let request = self.authorize(self.http.get(url), false);
        let body = send(table, request).await?;
        serde_json::from_str(&body).map_err(|source| StoreError::Decode {
            table: table.to_string(),
            source,
        })
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, rows: &[T]) -> Result<(), StoreError> {
        self.write_rows(table, rows, None).await
    }

    /// Insert rows, merging into existing ones that collide on `conflict` columns.
    async fn upsert<T: Serialize + Sync>(&self, table: &str, rows: &[T], conflict: &str) -> Result<(), StoreError> {
        self.write_rows(table, rows, Some(conflict)).await
    }

    async fn write_rows<T: Serialize + Sync>(
        &self,
        table: &str,
        rows: &[T],
        conflict: Option<&str>,
    ) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let (params, prefer) = write_options(conflict);
        let url = self.endpoint(&[table], &params);
        tracing::debug!(%url, rows = rows.len(), "insert");
        let request = self
            .authorize(self.http.post(url), true)
            .header("Prefer", prefer)
            .json(rows);
        send(table, request).await.map(|_| ())
    }
}

/// Send a request and return the body of a successful response.
async fn send(table: &str, request: RequestBuilder) -> Result<String, StoreError> {
    let response = request.send().await.map_err(|source| StoreError::Http {
        table: table.to_string(),
        source,
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|source| StoreError::Http {
        table: table.to_string(),
        source,
    })?;

    if !status.is_success() {
        return Err(StoreError::Status {
            table: table.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Query parameters and `Prefer` header for an insert, or an upsert when
/// `conflict` names the unique columns.
fn write_options(conflict: Option<&str>) -> (Vec<(&'static str, String)>, &'static str) {
    match conflict {
        Some(columns) => (
            vec![("on_conflict", columns.to_string())],
            "resolution=merge-duplicates,return=minimal",
        ),
        None => (Vec::new(), "return=minimal"),
    }
}

/// PostgREST `in` filter: `in.(1,2,3)`
fn in_list(ids: &[i64]) -> String {
    let joined = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
    format!("in.({})", joined)
}

fn eq<T: std::fmt::Display>(value: T) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl DataStore for RestStore {
    async fn user_profile(&self, user_id: i64) -> Result<UserProfile, StoreError> {
        let rows: Vec<UserProfile> = self
            .select(
                "users",
                &[("select", "id,gender,date_of_birth".to_string()), ("id", eq(user_id))],
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            table: "users".to_string(),
            key: format!("id={}", user_id),
        })
    }

    async fn insert_responses(&self, rows: &[ResponseRow]) -> Result<(), StoreError> {
        self.insert("user_responses", rows).await
    }

    async fn responses_for_set(
        &self,
        user_id: i64,
        assessment_id: i64,
        set: ResponseSetId,
    ) -> Result<Vec<ResponseRow>, StoreError> {
        self.select(
            "user_responses",
            &[
                (
                    "select",
                    "user_id,assessment_id,question_id,response_value,response_set_id".to_string(),
                ),
                ("user_id", eq(user_id)),
                ("assessment_id", eq(assessment_id)),
                ("response_set_id", eq(set)),
            ],
        )
        .await
    }

    async fn scoring_rules(&self, question_ids: &[i64]) -> Result<Vec<ScoringRule>, StoreError> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "scoring_rules",
            &[
                ("select", "*".to_string()),
                ("question_id", in_list(question_ids)),
                ("order", "id.asc".to_string()),
            ],
        )
        .await
    }

    async fn all_scoring_rules(&self) -> Result<Vec<ScoringRule>, StoreError> {
        self.select(
            "scoring_rules",
            &[("select", "*".to_string()), ("order", "question_id.asc,id.asc".to_string())],
        )
        .await
    }

    async fn questions(&self, ids: &[i64]) -> Result<Vec<Question>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "questions",
            &[("select", "id,category_id".to_string()), ("id", in_list(ids))],
        )
        .await
    }

    async fn insert_category_scores(&self, rows: &[CategoryScoreRow]) -> Result<(), StoreError> {
        self.insert("user_scores", rows).await
    }

    async fn latest_response_set(&self, user_id: i64) -> Result<Option<ResponseSetId>, StoreError> {
        let rows: Vec<ResponseSetOnly> = self
            .select(
                "user_scores",
                &[
                    ("select", "response_set_id".to_string()),
                    ("user_id", eq(user_id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.response_set_id))
    }

    async fn category_scores(&self, set: ResponseSetId) -> Result<Vec<CategoryScoreRow>, StoreError> {
        self.select(
            "user_scores",
            &[
                (
                    "select",
                    "user_id,assessment_id,category_id,score,total_possible_score,response_set_id".to_string(),
                ),
                ("response_set_id", eq(set)),
            ],
        )
        .await
    }

    async fn categories(&self, ids: &[i64]) -> Result<Vec<Category>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "categories",
            &[("select", "id,name".to_string()), ("id", in_list(ids))],
        )
        .await
    }

    async fn fixtures(&self) -> Result<Vec<Fixture>, StoreError> {
        self.select(
            "fixtures",
            &[
                (
                    "select",
                    "id,home_team_id,away_team_id,kick_off_time,round,home_team_score,away_team_score".to_string(),
                ),
                ("order", "kick_off_time.asc".to_string()),
            ],
        )
        .await
    }

    async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        self.select("teams", &[("select", "id,name".to_string())]).await
    }

    async fn upsert_predictions(&self, rows: &[PredictionRow]) -> Result<(), StoreError> {
        self.upsert("user_predictions", rows, "user_id,fixture_id").await
    }

    async fn update_fixture_result(&self, fixture_id: i64, home: i32, away: i32) -> Result<(), StoreError> {
        let url = self.endpoint(&["fixtures"], &[("id", eq(fixture_id)), ("select", "id".to_string())]);
        tracing::debug!(%url, "update");
        let request = self
            .authorize(self.http.patch(url), true)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "home_team_score": home,
                "away_team_score": away,
            }));
        let body = send("fixtures", request).await?;
        let updated: Vec<serde_json::Value> = serde_json::from_str(&body).map_err(|source| StoreError::Decode {
            table: "fixtures".to_string(),
            source,
        })?;
        if updated.is_empty() {
            return Err(StoreError::NotFound {
                table: "fixtures".to_string(),
                key: format!("id={}", fixture_id),
            });
        }
        Ok(())
    }

    async fn call_procedure(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        let url = self.endpoint(&["rpc", name], &[]);
        tracing::debug!(%url, "rpc");
        let request = self
            .authorize(self.http.post(url), true)
            .json(&serde_json::json!({}));
        let body = send(name, request).await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|source| StoreError::Decode {
            table: name.to_string(),
            source,
        })
    }
}
