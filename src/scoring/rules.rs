use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive band with optional bounds. An unset bound accepts everything on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Band<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Band<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: T) -> bool {
        let above_min = self.min.map_or(true, |min| value >= min);
        let below_max = self.max.map_or(true, |max| value <= max);
        above_min && below_max
    }

    /// True when min > max, a band nothing can fall into.
    pub fn is_inverted(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > max)
    }

    /// Whether some value lies in both bands.
    pub fn overlaps(&self, other: &Band<T>) -> bool {
        let lower_ok = match (self.min, other.max) {
            (Some(a), Some(b)) => a <= b,
            _ => true,
        };
        let upper_ok = match (other.min, self.max) {
            (Some(a), Some(b)) => a <= b,
            _ => true,
        };
        lower_ok && upper_ok
    }
}

/// Gender column of a scoring rule. The stored value "All" accepts any gender.
///
/// A NULL column decodes to `Unset`, which accepts nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum GenderFilter {
    All,
    Only(String),
    #[default]
    Unset,
}

impl GenderFilter {
    pub fn accepts(&self, gender: &str) -> bool {
        match self {
            GenderFilter::All => true,
            GenderFilter::Only(g) => g == gender,
            GenderFilter::Unset => false,
        }
    }

    pub fn overlaps(&self, other: &GenderFilter) -> bool {
        match (self, other) {
            (GenderFilter::Unset, _) | (_, GenderFilter::Unset) => false,
            (GenderFilter::Only(a), GenderFilter::Only(b)) => a == b,
            _ => true,
        }
    }
}

impl From<String> for GenderFilter {
    fn from(s: String) -> Self {
        if s == "All" {
            GenderFilter::All
        } else {
            GenderFilter::Only(s)
        }
    }
}

impl From<Option<String>> for GenderFilter {
    fn from(s: Option<String>) -> Self {
        s.map_or(GenderFilter::Unset, GenderFilter::from)
    }
}

impl From<GenderFilter> for Option<String> {
    fn from(g: GenderFilter) -> Self {
        match g {
            GenderFilter::All => Some("All".to_string()),
            GenderFilter::Only(s) => Some(s),
            GenderFilter::Unset => None,
        }
    }
}

/// A banded condition mapping a response to a point value for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub id: i64,
    pub question_id: i64,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub gender: GenderFilter,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    pub score: f64,
}

impl ScoringRule {
    pub fn age_band(&self) -> Band<u32> {
        Band::new(self.min_age, self.max_age)
    }

    pub fn value_band(&self) -> Band<f64> {
        Band::new(self.min_value, self.max_value)
    }

    /// All three conditions must hold for the rule to apply.
    pub fn accepts(&self, who: &Demographics, value: &ResponseValue) -> bool {
        self.age_band().contains(who.age)
            && self.gender.accepts(&who.gender)
            && value.within(&self.value_band())
    }
}

/// The respondent attributes rules are banded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Demographics {
    pub age: u32,
    pub gender: String,
}

impl Demographics {
    /// Age is the difference in calendar years between `today` and the birth date.
    pub fn from_birth_date(gender: impl Into<String>, date_of_birth: NaiveDate, today: NaiveDate) -> Self {
        let years = today.year() - date_of_birth.year();
        Self {
            age: years.max(0) as u32,
            gender: gender.into(),
        }
    }
}

/// Raw answer text with its numeric reading, if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseValue {
    pub raw: String,
    numeric: Option<f64>,
}

impl ResponseValue {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            numeric: raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Text answers only fall inside bands that set no bound.
    pub fn within(&self, band: &Band<f64>) -> bool {
        if band.is_unbounded() {
            return true;
        }
        match self.numeric {
            Some(v) => band.contains(v),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(min_age: Option<u32>, max_age: Option<u32>, gender: &str, min_value: Option<f64>, max_value: Option<f64>, score: f64) -> ScoringRule {
        ScoringRule {
            id: 1,
            question_id: 1,
            min_age,
            max_age,
            gender: GenderFilter::from(gender.to_string()),
            min_value,
            max_value,
            score,
        }
    }

    #[test]
    fn test_band_inclusive_bounds() {
        let band = Band::new(Some(18), Some(35));
        assert!(band.contains(18));
        assert!(band.contains(35));
        assert!(!band.contains(17));
        assert!(!band.contains(36));
    }

    #[test]
    fn test_band_open_sides() {
        assert!(Band::new(None, Some(10)).contains(0));
        assert!(Band::new(Some(10), None).contains(1000));
        assert!(Band::<u32>::default().contains(42));
    }

    #[test]
    fn test_band_inverted() {
        assert!(Band::new(Some(10), Some(5)).is_inverted());
        assert!(!Band::new(Some(5), Some(5)).is_inverted());
        assert!(!Band::new(None, Some(5)).is_inverted());
    }

    #[test]
    fn test_band_overlap() {
        let a = Band::new(Some(18), Some(35));
        assert!(a.overlaps(&Band::new(Some(35), Some(50))));
        assert!(!a.overlaps(&Band::new(Some(36), Some(50))));
        assert!(a.overlaps(&Band::new(None, None)));
        assert!(!a.overlaps(&Band::new(None, Some(17))));
    }

    #[test]
    fn test_gender_filter_from_string() {
        assert_eq!(GenderFilter::from("All".to_string()), GenderFilter::All);
        assert_eq!(
            GenderFilter::from("Female".to_string()),
            GenderFilter::Only("Female".to_string())
        );
    }

    #[test]
    fn test_gender_filter_is_exact() {
        let filter = GenderFilter::Only("Male".to_string());
        assert!(filter.accepts("Male"));
        assert!(!filter.accepts("male"));
        assert!(!filter.accepts("Female"));
        assert!(GenderFilter::All.accepts("anything"));
    }

    #[test]
    fn test_rule_accepts_example() {
        let r = rule(Some(18), Some(35), "All", Some(0.0), Some(10.0), 5.0);
        let who = Demographics { age: 28, gender: "Male".to_string() };
        assert!(r.accepts(&who, &ResponseValue::parse("7")));
        assert!(!r.accepts(&who, &ResponseValue::parse("11")));
    }

    #[test]
    fn test_text_value_needs_unbounded_rule() {
        let who = Demographics { age: 40, gender: "Female".to_string() };
        let text = ResponseValue::parse("Normal");
        assert!(rule(None, None, "All", None, None, 3.0).accepts(&who, &text));
        assert!(!rule(None, None, "All", Some(0.0), None, 3.0).accepts(&who, &text));
    }

    #[test]
    fn test_response_value_parses_decimal() {
        let value = ResponseValue::parse(" 7.5 ");
        assert_eq!(value.numeric, Some(7.5));
        assert_eq!(value.raw, " 7.5 ");
        assert_eq!(ResponseValue::parse("NaN").numeric, None);
    }

    #[test]
    fn test_age_from_birth_year() {
        let dob = NaiveDate::from_ymd_opt(1990, 12, 31).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let who = Demographics::from_birth_date("Male", dob, today);
        // Calendar-year difference, not exact age
        assert_eq!(who.age, 34);
    }

    #[test]
    fn test_rule_deserializes_null_bounds() {
        let json = r#"{"id":3,"question_id":9,"min_age":null,"max_age":40,"gender":"All","min_value":null,"max_value":null,"score":2}"#;
        let r: ScoringRule = serde_json::from_str(json).unwrap();
        assert_eq!(r.min_age, None);
        assert_eq!(r.max_age, Some(40));
        assert_eq!(r.gender, GenderFilter::All);
        assert_eq!(r.score, 2.0);
    }

    #[test]
    fn test_null_gender_decodes_and_never_matches() {
        let json = r#"[
            {"id":1,"question_id":9,"gender":"All","score":2},
            {"id":2,"question_id":9,"gender":null,"score":5}
        ]"#;
        let rules: Vec<ScoringRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].gender, GenderFilter::All);
        assert_eq!(rules[1].gender, GenderFilter::Unset);

        let who = Demographics { age: 30, gender: "Female".to_string() };
        let value = ResponseValue::parse("4");
        assert!(rules[0].accepts(&who, &value));
        assert!(!rules[1].accepts(&who, &value));
    }

    #[test]
    fn test_unset_gender_overlaps_nothing() {
        assert!(!GenderFilter::Unset.overlaps(&GenderFilter::All));
        assert!(!GenderFilter::All.overlaps(&GenderFilter::Unset));
        assert!(GenderFilter::All.overlaps(&GenderFilter::Only("Male".to_string())));
    }
}
