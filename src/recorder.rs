use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::scoring::{aggregate, Demographics, ScoreResult};
use crate::store::types::{CategoryScoreRow, ResponseRow, ResponseSetId};
use crate::store::DataStore;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerInput {
    pub question_id: i64,
    pub value: AnswerValue,
}

/// Answers arrive as numbers or text and are stored as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Integer(n) => write!(f, "{}", n),
            AnswerValue::Decimal(n) => write!(f, "{}", n),
            AnswerValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssessmentSubmission {
    pub user_id: i64,
    pub assessment_id: i64,
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub response_set_id: ResponseSetId,
    pub demographics: Demographics,
    pub scores: Vec<CategoryScoreRow>,
    pub result: ScoreResult,
}

/// Load a list of answers from a YAML or JSON file (by extension).
pub fn load_answers(path: &Path) -> Result<Vec<AnswerInput>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers file at {}", path.display()))?;

    let answers: Vec<AnswerInput> = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse answers: invalid JSON in {}", path.display()))?
    } else {
        serde_saphyr::from_str(&content)
            .with_context(|| format!("Failed to parse answers: invalid YAML in {}", path.display()))?
    };

    Ok(answers)
}

/// Reject empty submissions and questions answered twice.
pub fn validate_answers(answers: &[AnswerInput]) -> Result<()> {
    if answers.is_empty() {
        bail!("Submission contains no answers");
    }
    let mut seen = HashSet::new();
    for answer in answers {
        if !seen.insert(answer.question_id) {
            bail!("Question {} is answered more than once", answer.question_id);
        }
    }
    Ok(())
}

/// Record one assessment attempt under a fresh response set and score it.
///
/// Responses are written before scoring and are not removed if a later step
/// fails. Submitting the same answers again creates a new response set.
/// The outcome is also reported as a flash on `ctx`.
pub async fn submit_assessment(
    store: &dyn DataStore,
    ctx: &mut RequestContext,
    submission: &AssessmentSubmission,
    today: NaiveDate,
) -> Result<SubmissionOutcome> {
    match record_and_score(store, submission, today).await {
        Ok(outcome) => {
            ctx.success("Assessment submitted and scores calculated successfully");
            Ok(outcome)
        }
        Err(e) => {
            tracing::error!(
                user_id = submission.user_id,
                assessment_id = submission.assessment_id,
                "submitting assessment failed: {:#}",
                e
            );
            ctx.error("Failed to submit assessment and calculate scores");
            Err(e)
        }
    }
}

async fn record_and_score(
    store: &dyn DataStore,
    submission: &AssessmentSubmission,
    today: NaiveDate,
) -> Result<SubmissionOutcome> {
    validate_answers(&submission.answers)?;

    let response_set_id = ResponseSetId::new();
    let user_id = submission.user_id;
    let assessment_id = submission.assessment_id;
    tracing::info!(user_id, assessment_id, %response_set_id, "recording assessment");

    let profile = store
        .user_profile(user_id)
        .await
        .context("Failed to fetch user profile")?;
    let who = Demographics::from_birth_date(profile.gender, profile.date_of_birth, today);
    tracing::debug!(user_id, age = who.age, gender = %who.gender, "demographics");

    let rows: Vec<ResponseRow> = submission
        .answers
        .iter()
        .map(|answer| ResponseRow {
            user_id,
            assessment_id,
            question_id: answer.question_id,
            response_value: answer.value.to_string(),
            response_set_id,
        })
        .collect();
    store
        .insert_responses(&rows)
        .await
        .context("Failed to insert responses")?;

    let responses = store
        .responses_for_set(user_id, assessment_id, response_set_id)
        .await
        .context("Failed to re-read responses")?;

    let mut question_ids: Vec<i64> = responses.iter().map(|r| r.question_id).collect();
    question_ids.sort_unstable();
    question_ids.dedup();

    let (rules, questions) = tokio::try_join!(
        store.scoring_rules(&question_ids),
        store.questions(&question_ids)
    )
    .context("Failed to fetch scoring rules and questions")?;
    tracing::debug!(rules = rules.len(), questions = questions.len(), "loaded scoring inputs");

    let result = aggregate(&responses, &rules, &questions, &who);

    let scores: Vec<CategoryScoreRow> = result
        .categories
        .iter()
        .map(|(&category_id, total)| CategoryScoreRow {
            user_id,
            assessment_id,
            category_id,
            score: total.score,
            total_possible_score: total.possible,
            response_set_id,
        })
        .collect();

    if scores.is_empty() {
        tracing::warn!(%response_set_id, "no response matched a scoring rule, nothing to store");
    } else {
        store
            .insert_category_scores(&scores)
            .await
            .context("Failed to insert category scores")?;
    }

    tracing::info!(
        %response_set_id,
        categories = scores.len(),
        unmatched = result.unmatched().count(),
        "assessment scored"
    );

    Ok(SubmissionOutcome {
        response_set_id,
        demographics: who,
        scores,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Flash;
    use crate::scoring::{GenderFilter, ScoringRule};
    use crate::store::types::{Question, UserProfile};
    use crate::store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn rule(id: i64, question_id: i64, min_age: Option<u32>, max_age: Option<u32>, score: f64) -> ScoringRule {
        ScoringRule {
            id,
            question_id,
            min_age,
            max_age,
            gender: GenderFilter::All,
            min_value: Some(0.0),
            max_value: Some(10.0),
            score,
        }
    }

    fn seeded_store() -> MemoryStore {
        MemoryStore::new()
            .with_user(UserProfile {
                id: 1,
                gender: "Male".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1996, 3, 14).unwrap(),
            })
            .with_questions(vec![
                Question { id: 10, category_id: 100 },
                Question { id: 11, category_id: 100 },
                Question { id: 12, category_id: 200 },
            ])
            .with_rules(vec![
                rule(1, 10, Some(18), Some(35), 5.0),
                rule(2, 10, Some(36), Some(60), 10.0),
                rule(3, 11, None, None, 3.0),
                rule(4, 12, None, None, 4.0),
            ])
    }

    fn submission(answers: Vec<AnswerInput>) -> AssessmentSubmission {
        AssessmentSubmission {
            user_id: 1,
            assessment_id: 7,
            answers,
        }
    }

    fn answer(question_id: i64, value: i64) -> AnswerInput {
        AnswerInput {
            question_id,
            value: AnswerValue::Integer(value),
        }
    }

    #[tokio::test]
    async fn test_submit_scores_and_persists() {
        let store = seeded_store();
        let mut ctx = RequestContext::for_user(1);
        let outcome = submit_assessment(
            &store,
            &mut ctx,
            &submission(vec![answer(10, 7), answer(11, 2), answer(12, 50)]),
            today(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.demographics.age, 28);
        // q10 matched 5 of max 10, q11 matched 3, q12 value out of range
        assert_eq!(outcome.scores.len(), 1);
        let row = &outcome.scores[0];
        assert_eq!(row.category_id, 100);
        assert_eq!(row.score, 8.0);
        assert_eq!(row.total_possible_score, 13.0);

        assert_eq!(store.responses().len(), 3);
        assert_eq!(store.scores(), outcome.scores);
        assert!(store
            .responses()
            .iter()
            .all(|r| r.response_set_id == outcome.response_set_id));
        assert_eq!(ctx.take_flashes(), vec![Flash::Success(
            "Assessment submitted and scores calculated successfully".to_string()
        )]);
    }

    #[tokio::test]
    async fn test_resubmission_creates_new_set() {
        let store = seeded_store();
        let mut ctx = RequestContext::for_user(1);
        let answers = vec![answer(10, 7), answer(12, 1)];

        let first = submit_assessment(&store, &mut ctx, &submission(answers.clone()), today())
            .await
            .unwrap();
        let second = submit_assessment(&store, &mut ctx, &submission(answers), today())
            .await
            .unwrap();

        assert_ne!(first.response_set_id, second.response_set_id);
        assert_eq!(store.responses().len(), 4);
        assert_eq!(store.scores().len(), 4);
        assert_eq!(store.latest_response_set(1).await.unwrap(), Some(second.response_set_id));
    }

    #[tokio::test]
    async fn test_failed_score_insert_keeps_responses() {
        let store = seeded_store().reject_writes_to("user_scores");
        let mut ctx = RequestContext::for_user(1);

        let result = submit_assessment(&store, &mut ctx, &submission(vec![answer(10, 7)]), today()).await;

        assert!(result.is_err());
        assert_eq!(store.responses().len(), 1);
        assert!(store.scores().is_empty());
        assert!(ctx.has_errors());
    }

    #[tokio::test]
    async fn test_unknown_user_fails_before_writing() {
        let store = seeded_store();
        let mut ctx = RequestContext::new();
        let mut sub = submission(vec![answer(10, 7)]);
        sub.user_id = 99;

        assert!(submit_assessment(&store, &mut ctx, &sub, today()).await.is_err());
        assert!(store.responses().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_matched_stores_no_scores() {
        let store = seeded_store();
        let mut ctx = RequestContext::for_user(1);
        let outcome = submit_assessment(&store, &mut ctx, &submission(vec![answer(12, 99)]), today())
            .await
            .unwrap();
        assert!(outcome.scores.is_empty());
        assert_eq!(outcome.result.unmatched().count(), 1);
        assert!(store.scores().is_empty());
    }

    #[test]
    fn test_validate_answers() {
        assert!(validate_answers(&[]).is_err());
        assert!(validate_answers(&[answer(1, 1), answer(1, 2)]).is_err());
        assert!(validate_answers(&[answer(1, 1), answer(2, 2)]).is_ok());
    }

    #[test]
    fn test_answer_value_text() {
        assert_eq!(AnswerValue::Integer(7).to_string(), "7");
        assert_eq!(AnswerValue::Decimal(7.5).to_string(), "7.5");
        assert_eq!(AnswerValue::Text("Normal".to_string()).to_string(), "Normal");
    }

    #[test]
    fn test_load_answers_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.yaml");
        std::fs::write(
            &path,
            "- question_id: 10\n  value: 7\n- question_id: 11\n  value: Normal\n",
        )
        .unwrap();

        let answers = load_answers(&path).unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].value, AnswerValue::Integer(7));
        assert_eq!(answers[1].value, AnswerValue::Text("Normal".to_string()));
    }

    #[test]
    fn test_load_answers_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(&path, r#"[{"question_id": 10, "value": 6.5}]"#).unwrap();

        let answers = load_answers(&path).unwrap();
        assert_eq!(answers[0].value, AnswerValue::Decimal(6.5));
    }
}
