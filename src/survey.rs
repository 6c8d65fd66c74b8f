//! Structured decode of the per-row questionnaire blob.
//!
//! The CSV `data` column holds a JSON-like object written with single quotes
//! and keyed by question number (`'1'` .. `'33'`). [`Question`] is the
//! mapping from those numbers to the fields of [`SurveyRecord`]; keys outside
//! the table are ignored.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Every question number the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    Gender,
    AgeGroup,
    Occupation,
    ResidenceAddress,
    CommonTransportModes,
    AwarenessOfRouteAdjustment,
    PlanToUseAdjustedRoute,
    ImpactOnTravelRoute,
    BetterExperience,
    MoreReasonable,
    WiseChoice,
    MoreComfortable,
    FamilyFriendsSuggestion,
    ColleaguesOpinion,
    OthersPerception,
    AdaptationTrend,
    UnderstandNewRoute,
    EasyToFindInfo,
    AbilityToReplan,
    AdaptationAbility,
    PlanToUseMore,
    WillingToChoose,
    AdjustedCommute,
    CommuteChange,
    TimeChange,
    EvaluationOfAdjustment,
    Inconveniences,
    OptimizationSuggestions,
}

impl Question {
    pub const ALL: [Question; 28] = [
        Question::Gender,
        Question::AgeGroup,
        Question::Occupation,
        Question::ResidenceAddress,
        Question::CommonTransportModes,
        Question::AwarenessOfRouteAdjustment,
        Question::PlanToUseAdjustedRoute,
        Question::ImpactOnTravelRoute,
        Question::BetterExperience,
        Question::MoreReasonable,
        Question::WiseChoice,
        Question::MoreComfortable,
        Question::FamilyFriendsSuggestion,
        Question::ColleaguesOpinion,
        Question::OthersPerception,
        Question::AdaptationTrend,
        Question::UnderstandNewRoute,
        Question::EasyToFindInfo,
        Question::AbilityToReplan,
        Question::AdaptationAbility,
        Question::PlanToUseMore,
        Question::WillingToChoose,
        Question::AdjustedCommute,
        Question::CommuteChange,
        Question::TimeChange,
        Question::EvaluationOfAdjustment,
        Question::Inconveniences,
        Question::OptimizationSuggestions,
    ];

    /// Question number as it appears in the questionnaire.
    pub fn number(self) -> u8 {
        match self {
            Question::Gender => 1,
            Question::AgeGroup => 2,
            Question::Occupation => 3,
            Question::ResidenceAddress => 4,
            Question::CommonTransportModes => 5,
            Question::AwarenessOfRouteAdjustment => 6,
            Question::PlanToUseAdjustedRoute => 7,
            Question::ImpactOnTravelRoute => 8,
            Question::BetterExperience => 9,
            Question::MoreReasonable => 10,
            Question::WiseChoice => 11,
            Question::MoreComfortable => 12,
            Question::FamilyFriendsSuggestion => 13,
            Question::ColleaguesOpinion => 14,
            Question::OthersPerception => 15,
            Question::AdaptationTrend => 16,
            Question::UnderstandNewRoute => 17,
            Question::EasyToFindInfo => 18,
            Question::AbilityToReplan => 19,
            Question::AdaptationAbility => 20,
            Question::PlanToUseMore => 21,
            Question::WillingToChoose => 22,
            Question::AdjustedCommute => 23,
            // 24-28 are free-form follow-ups the dashboard never reads
            Question::CommuteChange => 29,
            Question::TimeChange => 30,
            Question::EvaluationOfAdjustment => 31,
            Question::Inconveniences => 32,
            Question::OptimizationSuggestions => 33,
        }
    }

    /// Looks up a question by its decimal-string key.
    pub fn from_key(key: &str) -> Option<Question> {
        let number: u8 = key.trim().parse().ok()?;
        Question::ALL.into_iter().find(|q| q.number() == number)
    }
}

/// Answers keyed by [`Question`], built once from the decoded blob.
#[derive(Debug, Clone, Default)]
pub struct RawAnswers {
    answers: HashMap<Question, Value>,
}

impl RawAnswers {
    /// Normalizes the single-quoted blob to JSON and parses it.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the text is not valid after quote
    /// substitution. Callers are expected to fall back to
    /// [`RawAnswers::default`].
    pub fn parse_blob(blob: &str) -> Result<Self, serde_json::Error> {
        let normalized = blob.replace('\'', "\"");
        let value: Value = serde_json::from_str(&normalized)?;
        Ok(match value {
            Value::Object(map) => Self::from_map(map),
            _ => Self::default(),
        })
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        let answers = map
            .into_iter()
            .filter_map(|(key, value)| Question::from_key(&key).map(|q| (q, value)))
            .collect();
        Self { answers }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Free-text answer; strings as-is, numbers rendered, otherwise empty.
    fn text(&self, question: Question) -> String {
        match self.answers.get(&question) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Likert answer in 1..=5, or 0 when absent, unparseable or off-scale.
    fn likert(&self, question: Question) -> u8 {
        let parsed = match self.answers.get(&question) {
            Some(Value::String(s)) => leading_int(s),
            Some(Value::Number(n)) => leading_int(&n.to_string()),
            _ => None,
        };
        match parsed {
            Some(v @ 1..=5) => v as u8,
            _ => 0,
        }
    }

    /// A list answer; a lone string becomes a one-element list.
    fn list(&self, question: Question) -> Vec<String> {
        match self.answers.get(&question) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// Parses an optional sign and leading digits, ignoring trailing text
/// (`"4分"` is 4).
pub(crate) fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Longest decimal prefix as a float, ignoring trailing text (`"31.2abc"`
/// is 31.2). An exponent is only taken when digits follow it.
pub(crate) fn leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |n| start + n)
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if mantissa_digits > 0 || frac_end > end + 1 {
            mantissa_digits += frac_end - end - 1;
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }

    text[..end].parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    pub gender: String,
    pub age_group: String,
    pub occupation: String,
    pub residence_address: String,
    pub common_transport_modes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub awareness_of_route_adjustment: String,
    pub plan_to_use_adjusted_route: String,
    pub impact_on_travel_route: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attitude {
    pub better_experience: u8,
    pub more_reasonable: u8,
    pub wise_choice: u8,
    pub more_comfortable: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectiveNorm {
    pub family_friends_suggestion: u8,
    pub colleagues_opinion: u8,
    pub others_perception: u8,
    pub adaptation_trend: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerceivedBehavioralControl {
    pub understand_new_route: u8,
    pub easy_to_find_info: u8,
    pub ability_to_replan: u8,
    pub adaptation_ability: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralIntention {
    pub plan_to_use_more: u8,
    pub willing_to_choose: u8,
    pub adjusted_commute: u8,
}

/// Likert sections. Every item is 1..=5, with 0 meaning "no answer".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub attitude: Attitude,
    pub subjective_norm: SubjectiveNorm,
    pub perceived_behavioral_control: PerceivedBehavioralControl,
    pub behavioral_intention: BehavioralIntention,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualBehavior {
    pub commute_change: String,
    pub time_change: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenQuestions {
    pub evaluation_of_adjustment: String,
    pub inconveniences: String,
    pub optimization_suggestions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    pub background: Background,
    pub scenario: Scenario,
    pub behavior: Behavior,
    pub actual_behavior: ActualBehavior,
    pub open_questions: OpenQuestions,
}

impl SurveyRecord {
    /// Builds a fully populated record; missing answers take their defaults.
    pub fn decode(raw: &RawAnswers) -> Self {
        use Question as Q;

        SurveyRecord {
            background: Background {
                gender: raw.text(Q::Gender),
                age_group: raw.text(Q::AgeGroup),
                occupation: raw.text(Q::Occupation),
                residence_address: raw.text(Q::ResidenceAddress),
                common_transport_modes: raw.list(Q::CommonTransportModes),
            },
            scenario: Scenario {
                awareness_of_route_adjustment: raw.text(Q::AwarenessOfRouteAdjustment),
                plan_to_use_adjusted_route: raw.text(Q::PlanToUseAdjustedRoute),
                impact_on_travel_route: raw.text(Q::ImpactOnTravelRoute),
            },
            behavior: Behavior {
                attitude: Attitude {
                    better_experience: raw.likert(Q::BetterExperience),
                    more_reasonable: raw.likert(Q::MoreReasonable),
                    wise_choice: raw.likert(Q::WiseChoice),
                    more_comfortable: raw.likert(Q::MoreComfortable),
                },
                subjective_norm: SubjectiveNorm {
                    family_friends_suggestion: raw.likert(Q::FamilyFriendsSuggestion),
                    colleagues_opinion: raw.likert(Q::ColleaguesOpinion),
                    others_perception: raw.likert(Q::OthersPerception),
                    adaptation_trend: raw.likert(Q::AdaptationTrend),
                },
                perceived_behavioral_control: PerceivedBehavioralControl {
                    understand_new_route: raw.likert(Q::UnderstandNewRoute),
                    easy_to_find_info: raw.likert(Q::EasyToFindInfo),
                    ability_to_replan: raw.likert(Q::AbilityToReplan),
                    adaptation_ability: raw.likert(Q::AdaptationAbility),
                },
                behavioral_intention: BehavioralIntention {
                    plan_to_use_more: raw.likert(Q::PlanToUseMore),
                    willing_to_choose: raw.likert(Q::WillingToChoose),
                    adjusted_commute: raw.likert(Q::AdjustedCommute),
                },
            },
            actual_behavior: ActualBehavior {
                commute_change: raw.text(Q::CommuteChange),
                time_change: raw.text(Q::TimeChange),
            },
            open_questions: OpenQuestions {
                evaluation_of_adjustment: raw.text(Q::EvaluationOfAdjustment),
                inconveniences: raw.text(Q::Inconveniences),
                optimization_suggestions: raw.text(Q::OptimizationSuggestions),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_blob(blob: &str) -> SurveyRecord {
        SurveyRecord::decode(&RawAnswers::parse_blob(blob).unwrap())
    }

    #[test]
    fn test_question_numbers_are_unique() {
        let mut numbers: Vec<u8> = Question::ALL.iter().map(|q| q.number()).collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), Question::ALL.len());
    }

    #[test]
    fn test_from_key() {
        assert_eq!(Question::from_key("1"), Some(Question::Gender));
        assert_eq!(Question::from_key("29"), Some(Question::CommuteChange));
        assert_eq!(Question::from_key("25"), None);
        assert_eq!(Question::from_key("abc"), None);
    }

    #[test]
    fn test_decode_single_quoted_blob() {
        let survey = decode_blob(
            "{'1': '女', '2': '18-25岁', '5': ['公交', '地铁'], '6': '非常了解', \
             '9': '5', '10': '4', '21': 3, '29': '改乘地铁', '33': '增加班次'}",
        );

        assert_eq!(survey.background.gender, "女");
        assert_eq!(survey.background.age_group, "18-25岁");
        assert_eq!(survey.background.common_transport_modes, vec!["公交", "地铁"]);
        assert_eq!(survey.scenario.awareness_of_route_adjustment, "非常了解");
        assert_eq!(survey.behavior.attitude.better_experience, 5);
        assert_eq!(survey.behavior.attitude.more_reasonable, 4);
        assert_eq!(survey.behavior.attitude.wise_choice, 0);
        assert_eq!(survey.behavior.behavioral_intention.plan_to_use_more, 3);
        assert_eq!(survey.actual_behavior.commute_change, "改乘地铁");
        assert_eq!(survey.open_questions.optimization_suggestions, "增加班次");
    }

    #[test]
    fn test_scalar_transport_mode_becomes_list() {
        let survey = decode_blob("{'5': '公交'}");
        assert_eq!(survey.background.common_transport_modes, vec!["公交"]);
    }

    #[test]
    fn test_other_transport_shape_defaults_to_empty() {
        let survey = decode_blob("{'5': {'a': 1}}");
        assert!(survey.background.common_transport_modes.is_empty());
    }

    #[test]
    fn test_unparseable_likert_is_zero() {
        let survey = decode_blob("{'9': '很好', '10': '4分', '11': '9', '12': '-2'}");
        assert_eq!(survey.behavior.attitude.better_experience, 0);
        assert_eq!(survey.behavior.attitude.more_reasonable, 4);
        assert_eq!(survey.behavior.attitude.wise_choice, 0);
        assert_eq!(survey.behavior.attitude.more_comfortable, 0);
    }

    #[test]
    fn test_truncated_blob_is_an_error() {
        assert!(RawAnswers::parse_blob("{'1': '女', '2'").is_err());
    }

    #[test]
    fn test_non_object_blob_is_empty() {
        let raw = RawAnswers::parse_blob("[1, 2]").unwrap();
        assert!(raw.is_empty());
        assert_eq!(SurveyRecord::decode(&raw), SurveyRecord::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let raw = RawAnswers::parse_blob("{'1': '男', '26': 'x', 'note': 'y'}").unwrap();
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("  42abc"), Some(42));
        assert_eq!(leading_int("-7"), Some(-7));
        assert_eq!(leading_int("+3"), Some(3));
        assert_eq!(leading_int("4.9"), Some(4));
        assert_eq!(leading_int("abc"), None);
        assert_eq!(leading_int(""), None);
    }

    #[test]
    fn test_leading_float() {
        assert_eq!(leading_float("31.2abc"), Some(31.2));
        assert_eq!(leading_float(" -121.5"), Some(-121.5));
        assert_eq!(leading_float("5."), Some(5.0));
        assert_eq!(leading_float(".5x"), Some(0.5));
        assert_eq!(leading_float("1e2"), Some(100.0));
        assert_eq!(leading_float("2e"), Some(2.0));
        assert_eq!(leading_float("."), None);
        assert_eq!(leading_float("-"), None);
        assert_eq!(leading_float("abc"), None);
        assert_eq!(leading_float("NaN"), None);
    }
}
