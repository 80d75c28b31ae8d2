pub mod formatter;

pub use formatter::{
    format_category_scores, format_fixtures, format_overlaps, format_points,
    format_prediction_review, should_use_colors,
};
