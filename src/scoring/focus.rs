use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{Context, Result};

use super::engine::CategoryTotal;
use crate::store::types::{Category, CategoryScoreRow};
use crate::store::DataStore;

/// A weak category worth focusing on, with its share of the possible score.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusCategory {
    pub category_id: i64,
    pub name: String,
    pub score: f64,
    pub possible: f64,
    pub percentage: Option<f64>,
}

/// Pick the `limit` categories with the lowest score-to-possible ratio.
///
/// Categories without a possible score sort last. Unknown category ids keep
/// their numeric id as the name.
pub fn lowest_categories(scores: &[CategoryScoreRow], categories: &[Category], limit: usize) -> Vec<FocusCategory> {
    let names: HashMap<i64, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut focus: Vec<FocusCategory> = scores
        .iter()
        .map(|row| FocusCategory {
            category_id: row.category_id,
            name: names
                .get(&row.category_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("category {}", row.category_id)),
            score: row.score,
            possible: row.total_possible_score,
            percentage: CategoryTotal {
                score: row.score,
                possible: row.total_possible_score,
            }
            .ratio()
            .map(|r| r * 100.0),
        })
        .collect();

    focus.sort_by(|a, b| match (a.percentage, b.percentage) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    focus.truncate(limit);
    focus
}

/// Rank the categories of the user's most recent response set.
///
/// Returns `None` when the user has no stored scores yet.
pub async fn focus_for_user(store: &dyn DataStore, user_id: i64, limit: usize) -> Result<Option<Vec<FocusCategory>>> {
    let Some(set) = store
        .latest_response_set(user_id)
        .await
        .context("Failed to find latest response set")?
    else {
        return Ok(None);
    };

    let scores = store
        .category_scores(set)
        .await
        .context("Failed to fetch category scores")?;
    let ids: Vec<i64> = scores.iter().map(|s| s.category_id).collect();
    let categories = store
        .categories(&ids)
        .await
        .context("Failed to fetch category names")?;

    tracing::debug!(user_id, %set, categories = scores.len(), "ranking focus categories");
    Ok(Some(lowest_categories(&scores, &categories, limit)))
}
