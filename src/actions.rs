//! Named actions invoked by the conversational agent.
//!
//! Requests arrive as JSON (`{"action": "...", "arguments": {...}}`) and are
//! applied to a [`SurveySession`]. Filtering updates the session's view;
//! town statistics are computed over that view. A missing or `null`
//! argument bag means "no arguments".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::filter::FilterCriteria;
use crate::lines::{LineCatalog, LineInfo};
use crate::session::{RespondentSummary, SurveySession};
use crate::spatial::{AreaCollection, DEFAULT_ATTITUDE_THRESHOLD, TownStatsReport};

pub const FILTER_RESPONDENTS: &str = "filter_respondents";
pub const TOWN_STATS: &str = "town_stats";
pub const QUERY_LINE: &str = "query_line";

#[derive(thiserror::Error, Debug)]
pub enum ActionError {
    #[error("malformed action request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown action '{0}'")]
    Unknown(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TownStatsArgs {
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineQueryArgs {
    pub bus_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    FilterRespondents(FilterCriteria),
    TownStats(TownStatsArgs),
    QueryLine(LineQueryArgs),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::FilterRespondents(_) => FILTER_RESPONDENTS,
            Action::TownStats(_) => TOWN_STATS,
            Action::QueryLine(_) => QUERY_LINE,
        }
    }
}

/// Wire shape of a request before the arguments are decoded.
#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: String,
    #[serde(default)]
    arguments: Value,
}

/// What an action hands back to the agent runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome<'a> {
    Filtered {
        matched: usize,
        total: usize,
        selected: Option<RespondentSummary<'a>>,
    },
    TownStats(TownStatsReport),
    /// `line` is `None` when no route has that bus name.
    LineQueried { line: Option<LineInfo> },
}

/// Parses a JSON request.
pub fn parse_action(request: &str) -> Result<Action, ActionError> {
    let ActionRequest { action, arguments } = serde_json::from_str(request)?;
    match action.as_str() {
        FILTER_RESPONDENTS => Ok(Action::FilterRespondents(optional_arguments(arguments)?)),
        TOWN_STATS => Ok(Action::TownStats(optional_arguments(arguments)?)),
        QUERY_LINE => Ok(Action::QueryLine(serde_json::from_value(arguments)?)),
        other => Err(ActionError::Unknown(other.to_string())),
    }
}

fn optional_arguments<T: DeserializeOwned + Default>(arguments: Value) -> Result<T, ActionError> {
    if arguments.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(arguments)?)
}

/// Applies an action to the session.
#[instrument(skip_all, fields(action = action.name()))]
pub fn dispatch<'s>(
    session: &'s mut SurveySession,
    areas: &AreaCollection,
    lines: &LineCatalog,
    action: &Action,
) -> ActionOutcome<'s> {
    match action {
        Action::FilterRespondents(criteria) => {
            let matched = session.apply_filter(criteria);
            let session: &'s SurveySession = session;
            ActionOutcome::Filtered {
                matched,
                total: session.original().len(),
                selected: session.selected_summary(),
            }
        }
        Action::TownStats(args) => {
            let threshold = args.threshold.unwrap_or(DEFAULT_ATTITUDE_THRESHOLD);
            let report = session.town_stats(areas, threshold);
            info!(
                most_users = TownStatsReport::label(&report.most_users),
                most_low_attitude = TownStatsReport::label(&report.most_low_attitude),
                most_commute_change = TownStatsReport::label(&report.most_commute_change),
                "Town stats computed"
            );
            ActionOutcome::TownStats(report)
        }
        Action::QueryLine(args) => {
            // first direction in file order
            let line = lines.by_bus_name(&args.bus_name).next();
            match line {
                Some(line) => {
                    session.highlight_line(Some(line.info.layer.clone()));
                    info!(bus_name = %args.bus_name, layer = %line.info.layer, "Line highlighted");
                }
                None => warn!(bus_name = %args.bus_name, "No line with this bus name"),
            }
            ActionOutcome::LineQueried {
                line: line.map(|l| l.info.clone()),
            }
        }
    }
}
