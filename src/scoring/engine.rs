use std::collections::{BTreeMap, HashMap};

use super::rules::{Demographics, ResponseValue, ScoringRule};
use crate::store::types::{Question, ResponseRow};

/// Summed matched score and summed possible score for one category.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryTotal {
    pub score: f64,
    pub possible: f64,
}

impl CategoryTotal {
    /// Score as a fraction of possible. `None` when nothing was possible.
    pub fn ratio(&self) -> Option<f64> {
        if self.possible > 0.0 {
            Some(self.score / self.possible)
        } else {
            None
        }
    }
}

/// Outcome for a single response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseScore {
    pub question_id: i64,
    pub value: String,
    pub category_id: Option<i64>,
    pub matched_rule: Option<i64>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreResult {
    pub categories: BTreeMap<i64, CategoryTotal>,
    pub responses: Vec<ResponseScore>,
}

impl ScoreResult {
    pub fn unmatched(&self) -> impl Iterator<Item = &ResponseScore> {
        self.responses.iter().filter(|r| r.score.is_none())
    }
}

/// Return the first rule, in iteration order, that accepts the response.
///
/// Rules for other questions must already be filtered out.
pub fn match_rule<'a, I>(rules: I, who: &Demographics, value: &ResponseValue) -> Option<&'a ScoringRule>
where
    I: IntoIterator<Item = &'a ScoringRule>,
{
    rules.into_iter().find(|rule| rule.accepts(who, value))
}

/// Score every response and fold the results into per-category totals.
///
/// The possible score grows by the highest score among all rules of the
/// response's question, whichever rule matched. Unmatched responses add nothing.
pub fn aggregate(
    responses: &[ResponseRow],
    rules: &[ScoringRule],
    questions: &[Question],
    who: &Demographics,
) -> ScoreResult {
    let mut by_question: HashMap<i64, Vec<&ScoringRule>> = HashMap::new();
    for rule in rules {
        by_question.entry(rule.question_id).or_default().push(rule);
    }
    let categories: HashMap<i64, i64> = questions.iter().map(|q| (q.id, q.category_id)).collect();

    let mut result = ScoreResult::default();

    for response in responses {
        let candidates = by_question
            .get(&response.question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let value = ResponseValue::parse(&response.response_value);
        let category_id = categories.get(&response.question_id).copied();
        let matched = match_rule(candidates.iter().copied(), who, &value);

        let entry = ResponseScore {
            question_id: response.question_id,
            value: response.response_value.clone(),
            category_id,
            matched_rule: matched.map(|r| r.id),
            score: None,
        };

        let (Some(rule), Some(category_id)) = (matched, category_id) else {
            if matched.is_none() {
                tracing::warn!(
                    question_id = response.question_id,
                    value = %response.response_value,
                    "no matching scoring rule found for response"
                );
            } else {
                tracing::warn!(
                    question_id = response.question_id,
                    "question has no category, skipping matched response"
                );
            }
            result.responses.push(entry);
            continue;
        };

        tracing::debug!(question_id = response.question_id, rule_id = rule.id, score = rule.score, "matched rule");

        let best = candidates
            .iter()
            .map(|r| r.score)
            .fold(f64::NEG_INFINITY, f64::max);
        let total = result.categories.entry(category_id).or_default();
        total.score += rule.score;
        total.possible += best;

        result.responses.push(ResponseScore {
            score: Some(rule.score),
            ..entry
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::rules::GenderFilter;
    use crate::store::types::ResponseSetId;

    fn rule(id: i64, question_id: i64, ages: (Option<u32>, Option<u32>), gender: &str, values: (Option<f64>, Option<f64>), score: f64) -> ScoringRule {
        ScoringRule {
            id,
            question_id,
            min_age: ages.0,
            max_age: ages.1,
            gender: GenderFilter::from(gender.to_string()),
            min_value: values.0,
            max_value: values.1,
            score,
        }
    }

    fn response(question_id: i64, value: &str) -> ResponseRow {
        ResponseRow {
            user_id: 1,
            assessment_id: 1,
            question_id,
            response_value: value.to_string(),
            response_set_id: ResponseSetId::new(),
        }
    }

    fn male(age: u32) -> Demographics {
        Demographics { age, gender: "Male".to_string() }
    }

    #[test]
    fn test_single_matching_rule_returns_its_score() {
        let rules = vec![rule(1, 1, (Some(18), Some(35)), "All", (Some(0.0), Some(10.0)), 5.0)];
        let matched = match_rule(&rules, &male(28), &ResponseValue::parse("7"));
        assert_eq!(matched.map(|r| r.score), Some(5.0));
    }

    #[test]
    fn test_no_rule_matches() {
        let rules = vec![rule(1, 1, (Some(18), Some(35)), "Female", (None, None), 5.0)];
        assert!(match_rule(&rules, &male(28), &ResponseValue::parse("7")).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            rule(1, 1, (None, None), "All", (Some(0.0), Some(10.0)), 2.0),
            rule(2, 1, (None, None), "All", (Some(5.0), Some(15.0)), 8.0),
        ];
        let matched = match_rule(&rules, &male(50), &ResponseValue::parse("7")).unwrap();
        assert_eq!(matched.id, 1);
    }

    #[test]
    fn test_possible_score_uses_question_max() {
        // Matched rule scores 5, the other age band scores 10
        let rules = vec![
            rule(1, 1, (Some(18), Some(35)), "All", (None, None), 5.0),
            rule(2, 1, (Some(36), Some(60)), "All", (None, None), 10.0),
        ];
        let questions = vec![Question { id: 1, category_id: 7 }];
        let result = aggregate(&[response(1, "3")], &rules, &questions, &male(28));

        let total = result.categories[&7];
        assert_eq!(total.score, 5.0);
        assert_eq!(total.possible, 10.0);
    }

    #[test]
    fn test_unmatched_response_contributes_nothing() {
        let rules = vec![
            rule(1, 1, (None, None), "All", (Some(0.0), Some(10.0)), 4.0),
            rule(2, 2, (None, None), "All", (Some(0.0), Some(10.0)), 6.0),
        ];
        let questions = vec![
            Question { id: 1, category_id: 7 },
            Question { id: 2, category_id: 7 },
        ];
        let responses = vec![response(1, "5"), response(2, "99")];
        let result = aggregate(&responses, &rules, &questions, &male(30));

        let total = result.categories[&7];
        assert_eq!(total.score, 4.0);
        assert_eq!(total.possible, 4.0);
        assert_eq!(result.unmatched().count(), 1);
    }

    #[test]
    fn test_category_absent_when_nothing_matched() {
        let rules = vec![rule(1, 1, (None, None), "Female", (None, None), 4.0)];
        let questions = vec![Question { id: 1, category_id: 3 }];
        let result = aggregate(&[response(1, "5")], &rules, &questions, &male(30));
        assert!(result.categories.is_empty());
        assert_eq!(result.responses.len(), 1);
    }

    #[test]
    fn test_question_without_rules_is_unmatched() {
        let questions = vec![Question { id: 1, category_id: 3 }];
        let result = aggregate(&[response(1, "5")], &[], &questions, &male(30));
        assert!(result.categories.is_empty());
        assert_eq!(result.unmatched().count(), 1);
    }

    #[test]
    fn test_unknown_question_is_skipped() {
        let rules = vec![rule(1, 9, (None, None), "All", (None, None), 4.0)];
        let result = aggregate(&[response(9, "5")], &rules, &[], &male(30));
        assert!(result.categories.is_empty());
        assert_eq!(result.responses[0].matched_rule, Some(1));
        assert_eq!(result.responses[0].score, None);
    }

    #[test]
    fn test_aggregates_across_categories() {
        let rules = vec![
            rule(1, 1, (None, None), "All", (None, None), 3.0),
            rule(2, 2, (None, None), "All", (None, None), 2.0),
            rule(3, 3, (None, None), "All", (None, None), 1.0),
        ];
        let questions = vec![
            Question { id: 1, category_id: 10 },
            Question { id: 2, category_id: 10 },
            Question { id: 3, category_id: 20 },
        ];
        let responses = vec![response(1, "a"), response(2, "b"), response(3, "c")];
        let result = aggregate(&responses, &rules, &questions, &male(30));

        assert_eq!(result.categories.len(), 2);
        assert_eq!(result.categories[&10], CategoryTotal { score: 5.0, possible: 5.0 });
        assert_eq!(result.categories[&20], CategoryTotal { score: 1.0, possible: 1.0 });
    }

    #[test]
    fn test_ratio() {
        assert_eq!(CategoryTotal { score: 3.0, possible: 4.0 }.ratio(), Some(0.75));
        assert_eq!(CategoryTotal { score: 0.0, possible: 0.0 }.ratio(), None);
    }
}
