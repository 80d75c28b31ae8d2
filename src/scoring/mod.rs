pub mod engine;
pub mod focus;
pub mod rules;
pub mod validation;

pub use engine::{aggregate, match_rule, CategoryTotal, ResponseScore, ScoreResult};
pub use focus::{focus_for_user, lowest_categories, FocusCategory};
pub use rules::{Band, Demographics, GenderFilter, ResponseValue, ScoringRule};
pub use validation::{find_overlaps, validate_rules, RuleOverlap};
