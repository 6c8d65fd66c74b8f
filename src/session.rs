//! Per-session view state over an immutable respondent collection.
//!
//! The loaded collection is never modified. Filtering replaces the current
//! view (a list of positions into the collection) and applies the selection
//! policy: a single match is selected, anything else clears the selection.

use serde::Serialize;
use tracing::{error, info};

use crate::filter::{FilterCriteria, filter_indices};
use crate::loader::{Dataset, Header, LoadError, Location, Profile, RespondentRecord};
use crate::marker::{MarkerIcon, MarkerStyle};
use crate::scoring::ScoreCard;
use crate::spatial::{AreaCollection, TownStatsAggregator, TownStatsReport};
use crate::survey::SurveyRecord;

/// What the agent and the map see of one respondent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondentSummary<'a> {
    pub location: Location,
    pub profile: &'a Profile,
    pub survey: &'a SurveyRecord,
    pub scores: ScoreCard,
    pub marker: MarkerStyle,
    pub icon: MarkerIcon,
}

impl<'a> RespondentSummary<'a> {
    pub fn new(record: &'a RespondentRecord) -> Self {
        let marker = MarkerStyle::for_profile(&record.profile);
        RespondentSummary {
            location: record.location,
            profile: &record.profile,
            survey: &record.survey,
            scores: ScoreCard::from_survey(&record.survey),
            marker,
            icon: marker.icon(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurveySession {
    header: Header,
    original: Vec<RespondentRecord>,
    view: Vec<usize>,
    selected: Option<usize>,
    highlighted_line: Option<String>,
}

impl SurveySession {
    pub fn new(dataset: Dataset) -> Self {
        let view = (0..dataset.respondents.len()).collect();
        SurveySession {
            header: dataset.header,
            original: dataset.respondents,
            view,
            selected: None,
            highlighted_line: None,
        }
    }

    /// A failed load becomes an empty session; the map simply shows nothing.
    pub fn from_load(result: Result<Dataset, LoadError>) -> Self {
        match result {
            Ok(dataset) => Self::new(dataset),
            Err(e) => {
                error!(error = %e, "Survey load failed, starting with no respondents");
                Self::default()
            }
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn original(&self) -> &[RespondentRecord] {
        &self.original
    }

    pub fn view(&self) -> impl Iterator<Item = &RespondentRecord> {
        self.view.iter().map(|&i| &self.original[i])
    }

    pub fn view_len(&self) -> usize {
        self.view.len()
    }

    /// Replaces the current view with the matches of `criteria` over the
    /// full collection and returns the match count.
    pub fn apply_filter(&mut self, criteria: &FilterCriteria) -> usize {
        self.view = filter_indices(&self.original, criteria);
        self.selected = match self.view.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        info!(
            matched = self.view.len(),
            total = self.original.len(),
            reset = criteria.is_reset(),
            "Respondent filter applied"
        );
        self.view.len()
    }

    /// Selects the respondent at `position` in the current view (a marker click).
    pub fn select(&mut self, position: usize) -> Option<&RespondentRecord> {
        self.selected = self.view.get(position).copied();
        self.selected()
    }

    /// A click on empty map space.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&RespondentRecord> {
        self.selected.map(|i| &self.original[i])
    }

    pub fn selected_summary(&self) -> Option<RespondentSummary<'_>> {
        self.selected().map(RespondentSummary::new)
    }

    pub fn highlight_line(&mut self, layer: Option<String>) {
        self.highlighted_line = layer;
    }

    pub fn highlighted_line(&self) -> Option<&str> {
        self.highlighted_line.as_deref()
    }

    /// Area statistics over the current view.
    pub fn town_stats(&self, areas: &AreaCollection, attitude_threshold: f64) -> TownStatsReport {
        TownStatsAggregator::default()
            .with_threshold(attitude_threshold)
            .aggregate(areas, self.view())
    }
}
