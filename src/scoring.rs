//! Per-dimension Likert scores.

use serde::{Deserialize, Serialize};

use crate::survey::SurveyRecord;

/// The four behavior dimensions of the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Attitude,
    SubjectiveNorm,
    PerceivedBehavioralControl,
    BehavioralIntention,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Attitude,
        Dimension::SubjectiveNorm,
        Dimension::PerceivedBehavioralControl,
        Dimension::BehavioralIntention,
    ];
}

impl SurveyRecord {
    /// Raw items of one dimension, zeros included.
    pub fn items(&self, dimension: Dimension) -> Vec<u8> {
        let b = &self.behavior;
        match dimension {
            Dimension::Attitude => vec![
                b.attitude.better_experience,
                b.attitude.more_reasonable,
                b.attitude.wise_choice,
                b.attitude.more_comfortable,
            ],
            Dimension::SubjectiveNorm => vec![
                b.subjective_norm.family_friends_suggestion,
                b.subjective_norm.colleagues_opinion,
                b.subjective_norm.others_perception,
                b.subjective_norm.adaptation_trend,
            ],
            Dimension::PerceivedBehavioralControl => vec![
                b.perceived_behavioral_control.understand_new_route,
                b.perceived_behavioral_control.easy_to_find_info,
                b.perceived_behavioral_control.ability_to_replan,
                b.perceived_behavioral_control.adaptation_ability,
            ],
            Dimension::BehavioralIntention => vec![
                b.behavioral_intention.plan_to_use_more,
                b.behavioral_intention.willing_to_choose,
                b.behavioral_intention.adjusted_commute,
            ],
        }
    }
}

/// Mean of the non-zero items. Returns 0.0 when every item is 0.
pub fn average_score(items: &[u8]) -> f64 {
    let answered: Vec<f64> = items.iter().filter(|&&v| v > 0).map(|&v| v as f64).collect();
    if answered.is_empty() {
        return 0.0;
    }
    answered.iter().sum::<f64>() / answered.len() as f64
}

/// Mean score of one dimension for a respondent's survey.
pub fn score(survey: &SurveyRecord, dimension: Dimension) -> f64 {
    average_score(&survey.items(dimension))
}

/// Per-dimension mean across many surveys, skipping surveys with no
/// answer in that dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSummary {
    pub dimension: Dimension,
    /// Surveys with at least one answered item.
    pub answered: usize,
    pub mean: f64,
}

pub fn summarize<'a>(surveys: impl IntoIterator<Item = &'a SurveyRecord> + Clone) -> Vec<DimensionSummary> {
    Dimension::ALL
        .into_iter()
        .map(|dimension| {
            let scores: Vec<f64> = surveys
                .clone()
                .into_iter()
                .map(|s| score(s, dimension))
                .filter(|&v| v > 0.0)
                .collect();
            let mean = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            DimensionSummary {
                dimension,
                answered: scores.len(),
                mean,
            }
        })
        .collect()
}

pub fn attitude_score(survey: &SurveyRecord) -> f64 {
    score(survey, Dimension::Attitude)
}

pub fn subjective_norm_score(survey: &SurveyRecord) -> f64 {
    score(survey, Dimension::SubjectiveNorm)
}

pub fn perceived_behavioral_control_score(survey: &SurveyRecord) -> f64 {
    score(survey, Dimension::PerceivedBehavioralControl)
}

pub fn behavioral_intention_score(survey: &SurveyRecord) -> f64 {
    score(survey, Dimension::BehavioralIntention)
}

/// All four dimension means, used when a respondent is shown to the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub attitude: f64,
    pub subjective_norm: f64,
    pub perceived_behavioral_control: f64,
    pub behavioral_intention: f64,
}

impl ScoreCard {
    pub fn from_survey(survey: &SurveyRecord) -> Self {
        ScoreCard {
            attitude: attitude_score(survey),
            subjective_norm: subjective_norm_score(survey),
            perceived_behavioral_control: perceived_behavioral_control_score(survey),
            behavioral_intention: behavioral_intention_score(survey),
        }
    }
}
