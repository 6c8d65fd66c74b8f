//! Conjunctive respondent filtering.
//!
//! Every supplied criterion must hold for a record to pass. Empty strings
//! are treated as "not supplied", matching how the agent sends blank
//! arguments. The engine never mutates its input.

use serde::{Deserialize, Serialize};

use crate::loader::RespondentRecord;
use crate::scoring::{attitude_score, behavioral_intention_score};
use crate::survey::leading_int;

/// Predicate bag; `None` fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub occupation: Option<String>,
    pub gender: Option<String>,
    /// `"18-25"`, `"50-"`, `"50"`, `"50+"` or `"50以上"`.
    pub age_range: Option<String>,
    pub min_attitude_score: Option<f64>,
    pub max_attitude_score: Option<f64>,
    pub min_behavioral_intention_score: Option<f64>,
    pub max_behavioral_intention_score: Option<f64>,
    pub awareness_of_route_adjustment: Option<String>,
    pub plan_to_use_adjusted_route: Option<String>,
    pub commute_change: Option<String>,
    pub residence_district: Option<String>,
    pub work_district: Option<String>,
    /// Short-circuits every other field and returns the full collection.
    pub reset_filter: Option<bool>,
}

impl FilterCriteria {
    pub fn reset() -> Self {
        Self {
            reset_filter: Some(true),
            ..Default::default()
        }
    }

    pub fn is_reset(&self) -> bool {
        self.reset_filter.unwrap_or(false)
    }
}

/// Inclusive age bounds; `max == None` is unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl AgeRange {
    /// Parses `"min-max"` or an open-ended `"min"`.
    ///
    /// A missing or zero upper bound means no upper bound. Returns `None`
    /// when the lower bound is not a number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (min_part, max_part) = match text.split_once('-') {
            Some((min, max)) => (min.trim(), Some(max.trim())),
            None => (text, None),
        };

        let min = if min_part.is_empty() {
            0
        } else {
            u32::try_from(leading_int(min_part)?).ok()?
        };
        let max = max_part
            .and_then(leading_int)
            .and_then(|m| u32::try_from(m).ok())
            .filter(|&m| m > 0);

        Some(AgeRange { min, max })
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && self.max.is_none_or(|max| age <= max)
    }
}

/// Inclusive score window; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScoreBounds {
    min: Option<f64>,
    max: Option<f64>,
}

impl ScoreBounds {
    fn new(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        (min.is_some() || max.is_some()).then_some(Self { min, max })
    }

    fn contains(&self, score: f64) -> bool {
        self.min.is_none_or(|min| score >= min) && self.max.is_none_or(|max| score <= max)
    }
}

/// [`FilterCriteria`] resolved once so matching a record is cheap.
#[derive(Debug, Clone)]
pub struct RespondentFilter<'c> {
    criteria: &'c FilterCriteria,
    age: Option<Option<AgeRange>>,
    attitude: Option<ScoreBounds>,
    intention: Option<ScoreBounds>,
}

impl<'c> RespondentFilter<'c> {
    pub fn new(criteria: &'c FilterCriteria) -> Self {
        RespondentFilter {
            criteria,
            age: supplied(&criteria.age_range).map(AgeRange::parse),
            attitude: ScoreBounds::new(criteria.min_attitude_score, criteria.max_attitude_score),
            intention: ScoreBounds::new(
                criteria.min_behavioral_intention_score,
                criteria.max_behavioral_intention_score,
            ),
        }
    }

    pub fn matches(&self, record: &RespondentRecord) -> bool {
        let c = self.criteria;
        if c.is_reset() {
            return true;
        }

        let profile = &record.profile;
        let survey = &record.survey;

        if !equals(&c.occupation, &profile.occupation)
            || !equals(&c.gender, profile.gender.as_str())
            || !equals(&c.residence_district, &profile.residence_district)
            || !equals(&c.work_district, &profile.work_district)
            || !equals(
                &c.awareness_of_route_adjustment,
                &survey.scenario.awareness_of_route_adjustment,
            )
            || !equals(
                &c.plan_to_use_adjusted_route,
                &survey.scenario.plan_to_use_adjusted_route,
            )
            || !equals(&c.commute_change, &survey.actual_behavior.commute_change)
        {
            return false;
        }

        match self.age {
            // an unreadable range matches nobody
            Some(None) => return false,
            Some(Some(range)) if !range.contains(profile.age) => return false,
            _ => {}
        }

        if let Some(bounds) = self.attitude {
            if !bounds.contains(attitude_score(survey)) {
                return false;
            }
        }

        if let Some(bounds) = self.intention {
            if !bounds.contains(behavioral_intention_score(survey)) {
                return false;
            }
        }

        true
    }
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn equals(expected: &Option<String>, actual: &str) -> bool {
    supplied(expected).is_none_or(|e| e == actual)
}

/// Returns the records of `data` matching every supplied criterion, in
/// their original order.
pub fn filter_respondents<'a>(
    data: &'a [RespondentRecord],
    criteria: &FilterCriteria,
) -> Vec<&'a RespondentRecord> {
    let filter = RespondentFilter::new(criteria);
    data.iter().filter(|r| filter.matches(r)).collect()
}

/// Same as [`filter_respondents`] but yields positions into `data`.
pub fn filter_indices(data: &[RespondentRecord], criteria: &FilterCriteria) -> Vec<usize> {
    let filter = RespondentFilter::new(criteria);
    data.iter()
        .enumerate()
        .filter(|(_, r)| filter.matches(r))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{Gender, Location, Profile};
    use crate::survey::SurveyRecord;

    fn respondent(gender: Gender, age: u32, occupation: &str, attitude: u8) -> RespondentRecord {
        let mut survey = SurveyRecord::default();
        survey.behavior.attitude.better_experience = attitude;
        survey.behavior.behavioral_intention.plan_to_use_more = attitude;
        RespondentRecord {
            location: Location { lat: 31.2, lng: 121.5 },
            raw_fields: Vec::new(),
            profile: Profile {
                gender,
                age,
                occupation: occupation.to_string(),
                ..Default::default()
            },
            survey,
        }
    }

    fn sample() -> Vec<RespondentRecord> {
        vec![
            respondent(Gender::Female, 20, "学生", 5),
            respondent(Gender::Male, 22, "学生", 2),
            respondent(Gender::Female, 30, "上班族", 3),
            respondent(Gender::Female, 25, "上班族", 0),
            respondent(Gender::Male, 67, "退休人员", 4),
            respondent(Gender::Female, 18, "学生", 1),
        ]
    }

    #[test]
    fn test_reset_returns_everything_in_order() {
        let data = sample();
        let criteria = FilterCriteria {
            gender: Some("男".to_string()),
            occupation: Some("nobody".to_string()),
            reset_filter: Some(true),
            ..Default::default()
        };
        let result = filter_respondents(&data, &criteria);

        assert_eq!(result.len(), data.len());
        for (a, b) in result.iter().zip(&data) {
            assert!(std::ptr::eq(*a, b));
        }
    }

    #[test]
    fn test_no_criteria_keeps_everything() {
        let data = sample();
        assert_eq!(filter_respondents(&data, &FilterCriteria::default()).len(), data.len());
    }

    #[test]
    fn test_gender_and_age_are_conjunctive() {
        let data = sample();
        let criteria = FilterCriteria {
            gender: Some("女".to_string()),
            age_range: Some("18-25".to_string()),
            ..Default::default()
        };
        let result = filter_respondents(&data, &criteria);

        assert_eq!(result.len(), 3);
        for r in result {
            assert_eq!(r.profile.gender, Gender::Female);
            assert!((18..=25).contains(&r.profile.age));
        }
    }

    #[test]
    fn test_age_range_parsing() {
        assert_eq!(AgeRange::parse("18-25"), Some(AgeRange { min: 18, max: Some(25) }));
        assert_eq!(AgeRange::parse("50-"), Some(AgeRange { min: 50, max: None }));
        assert_eq!(AgeRange::parse("50"), Some(AgeRange { min: 50, max: None }));
        assert_eq!(AgeRange::parse("50+"), Some(AgeRange { min: 50, max: None }));
        assert_eq!(AgeRange::parse("50以上"), Some(AgeRange { min: 50, max: None }));
        assert_eq!(AgeRange::parse("-25"), Some(AgeRange { min: 0, max: Some(25) }));
        assert_eq!(AgeRange::parse("young"), None);
    }

    #[test]
    fn test_open_ended_age_range() {
        let data = sample();
        for range in ["50-", "50"] {
            let criteria = FilterCriteria {
                age_range: Some(range.to_string()),
                ..Default::default()
            };
            let result = filter_respondents(&data, &criteria);
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].profile.age, 67);
        }
    }

    #[test]
    fn test_age_bounds_are_inclusive() {
        let range = AgeRange::parse("18-25").unwrap();
        assert!(range.contains(18));
        assert!(range.contains(25));
        assert!(!range.contains(26));
        assert!(!range.contains(17));
    }

    #[test]
    fn test_unreadable_age_range_matches_nothing() {
        let data = sample();
        let criteria = FilterCriteria {
            age_range: Some("young".to_string()),
            ..Default::default()
        };
        assert!(filter_respondents(&data, &criteria).is_empty());
    }

    #[test]
    fn test_attitude_bounds() {
        let data = sample();
        let min_only = FilterCriteria {
            min_attitude_score: Some(3.0),
            ..Default::default()
        };
        assert_eq!(filter_respondents(&data, &min_only).len(), 3);

        let max_only = FilterCriteria {
            max_attitude_score: Some(2.0),
            ..Default::default()
        };
        // the unanswered respondent scores 0 and passes a max-only bound
        assert_eq!(filter_respondents(&data, &max_only).len(), 3);

        let window = FilterCriteria {
            min_attitude_score: Some(2.0),
            max_attitude_score: Some(4.0),
            ..Default::default()
        };
        assert_eq!(filter_respondents(&data, &window).len(), 3);
    }

    #[test]
    fn test_behavioral_intention_bounds() {
        let data = sample();
        let criteria = FilterCriteria {
            min_behavioral_intention_score: Some(4.0),
            ..Default::default()
        };
        let result = filter_respondents(&data, &criteria);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_empty_strings_are_ignored() {
        let data = sample();
        let criteria = FilterCriteria {
            occupation: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filter_respondents(&data, &criteria).len(), data.len());
    }

    #[test]
    fn test_survey_field_equality() {
        let mut data = sample();
        data[2].survey.actual_behavior.commute_change = "改乘地铁".to_string();
        data[3].survey.scenario.plan_to_use_adjusted_route = "是".to_string();

        let commute = FilterCriteria {
            commute_change: Some("改乘地铁".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_indices(&data, &commute), vec![2]);

        let plan = FilterCriteria {
            plan_to_use_adjusted_route: Some("是".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_indices(&data, &plan), vec![3]);
    }

    #[test]
    fn test_district_equality() {
        let mut data = sample();
        data[0].profile.residence_district = "徐汇区".to_string();
        data[1].profile.work_district = "徐汇区".to_string();

        let residence = FilterCriteria {
            residence_district: Some("徐汇区".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_indices(&data, &residence), vec![0]);

        let work = FilterCriteria {
            work_district: Some("徐汇区".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_indices(&data, &work), vec![1]);
    }

    #[test]
    fn test_criteria_from_camel_case_json() {
        let criteria: FilterCriteria = serde_json::from_str(
            r#"{"gender": "女", "ageRange": "18-25", "minAttitudeScore": 3, "resetFilter": false}"#,
        )
        .unwrap();

        assert_eq!(criteria.gender.as_deref(), Some("女"));
        assert_eq!(criteria.age_range.as_deref(), Some("18-25"));
        assert_eq!(criteria.min_attitude_score, Some(3.0));
        assert!(!criteria.is_reset());
    }
}
