use std::collections::BTreeMap;

use super::rules::{GenderFilter, ScoringRule};

/// Two rules of the same question that can both accept one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOverlap {
    pub question_id: i64,
    pub first: i64,
    pub second: i64,
}

/// Validate a rule set. Returns all validation errors at once (not just the first).
pub fn validate_rules(rules: &[ScoringRule]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for rule in rules {
        let at = format!("scoring_rules[id={}]", rule.id);

        if rule.age_band().is_inverted() {
            errors.push(format!(
                "{}: min_age {} is above max_age {}",
                at,
                rule.min_age.unwrap_or_default(),
                rule.max_age.unwrap_or_default()
            ));
        }

        if rule.value_band().is_inverted() {
            errors.push(format!(
                "{}: min_value {} is above max_value {}",
                at,
                rule.min_value.unwrap_or_default(),
                rule.max_value.unwrap_or_default()
            ));
        }

        if !rule.score.is_finite() {
            errors.push(format!("{}: score must be a finite number", at));
        }

        match rule.gender {
            GenderFilter::Only(ref g) if g.trim().is_empty() => {
                errors.push(format!("{}: gender must be \"All\" or a non-empty value", at));
            }
            GenderFilter::Unset => {
                errors.push(format!("{}: gender is not set, the rule never matches", at));
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Find rule pairs that could match the same response.
///
/// Matching takes the first rule in order, so any pair listed here makes the
/// outcome depend on rule order.
pub fn find_overlaps(rules: &[ScoringRule]) -> Vec<RuleOverlap> {
    let mut by_question: BTreeMap<i64, Vec<&ScoringRule>> = BTreeMap::new();
    for rule in rules {
        by_question.entry(rule.question_id).or_default().push(rule);
    }

    let mut overlaps = Vec::new();
    for (question_id, group) in by_question {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if a.age_band().overlaps(&b.age_band())
                    && a.gender.overlaps(&b.gender)
                    && a.value_band().overlaps(&b.value_band())
                {
                    overlaps.push(RuleOverlap {
                        question_id,
                        first: a.id,
                        second: b.id,
                    });
                }
            }
        }
    }
    overlaps
}
