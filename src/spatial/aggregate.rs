//! Per-area respondent counts.
//!
//! Each respondent is assigned to the first area, in collection order, whose
//! containment test passes. A point on a shared boundary therefore lands in
//! exactly one area and the per-area totals never exceed the input count.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::areas::AreaCollection;
use super::containment::{BoundaryInclusive, Containment};
use crate::loader::RespondentRecord;
use crate::scoring::attitude_score;

/// Attitude scores strictly below this count as low.
pub const DEFAULT_ATTITUDE_THRESHOLD: f64 = 3.0;

/// Commute answers that mean nothing changed.
pub const NO_CHANGE_ANSWERS: [&str; 2] = ["没有变化", "无变化"];

/// Shown in place of a leader when there were no areas to rank.
pub const NO_DATA: &str = "no data";

/// True when the commute answer reports an actual change.
pub fn has_commute_change(answer: &str) -> bool {
    !answer.is_empty() && !NO_CHANGE_ANSWERS.contains(&answer)
}

/// Counts for one area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownStat {
    pub name: String,
    pub user_count: usize,
    pub low_attitude_count: usize,
    pub commute_change_count: usize,
}

impl TownStat {
    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn low_attitude_pct(&self) -> f64 {
        Self::pct(self.low_attitude_count, self.user_count)
    }

    pub fn commute_change_pct(&self) -> f64 {
        Self::pct(self.commute_change_count, self.user_count)
    }
}

/// The area with the highest value of one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaLeader {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownStatsReport {
    pub generated_at: DateTime<Utc>,
    pub attitude_threshold: f64,
    /// Respondents considered.
    pub respondents: usize,
    /// Respondents that fell outside every area.
    pub unassigned: usize,
    /// `None` only when there were no areas.
    pub most_users: Option<AreaLeader>,
    pub most_low_attitude: Option<AreaLeader>,
    pub most_commute_change: Option<AreaLeader>,
    /// Every area, busiest first.
    pub areas: Vec<TownStat>,
}

impl TownStatsReport {
    /// Leader name for display, or [`NO_DATA`].
    pub fn label(leader: &Option<AreaLeader>) -> &str {
        leader.as_ref().map_or(NO_DATA, |l| l.name.as_str())
    }
}

/// Bins respondents into areas with an injected containment predicate.
#[derive(Debug, Clone)]
pub struct TownStatsAggregator<C> {
    containment: C,
    attitude_threshold: f64,
}

impl Default for TownStatsAggregator<BoundaryInclusive> {
    fn default() -> Self {
        Self::new(BoundaryInclusive)
    }
}

impl<C: Containment> TownStatsAggregator<C> {
    pub fn new(containment: C) -> Self {
        Self {
            containment,
            attitude_threshold: DEFAULT_ATTITUDE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, attitude_threshold: f64) -> Self {
        self.attitude_threshold = attitude_threshold;
        self
    }

    pub fn aggregate<'a, I>(&self, areas: &AreaCollection, respondents: I) -> TownStatsReport
    where
        I: IntoIterator<Item = &'a RespondentRecord>,
    {
        let mut stats: Vec<TownStat> = areas
            .areas()
            .iter()
            .map(|a| TownStat {
                name: a.name.clone(),
                ..Default::default()
            })
            .collect();

        let mut considered = 0;
        let mut unassigned = 0;

        for respondent in respondents {
            considered += 1;
            let point = respondent.location.to_point();

            let Some(index) = areas
                .areas()
                .iter()
                .position(|area| self.containment.contains(area, &point))
            else {
                unassigned += 1;
                continue;
            };

            let stat = &mut stats[index];
            stat.user_count += 1;
            if attitude_score(&respondent.survey) < self.attitude_threshold {
                stat.low_attitude_count += 1;
            }
            if has_commute_change(&respondent.survey.actual_behavior.commute_change) {
                stat.commute_change_count += 1;
            }
        }

        let most_users = leader(&stats, |s| s.user_count);
        let most_low_attitude = leader(&stats, |s| s.low_attitude_count);
        let most_commute_change = leader(&stats, |s| s.commute_change_count);

        // stable, so equal totals keep file order
        stats.sort_by(|a, b| b.user_count.cmp(&a.user_count));

        debug!(
            areas = stats.len(),
            respondents = considered,
            unassigned,
            "Town stats aggregated"
        );

        TownStatsReport {
            generated_at: Utc::now(),
            attitude_threshold: self.attitude_threshold,
            respondents: considered,
            unassigned,
            most_users,
            most_low_attitude,
            most_commute_change,
            areas: stats,
        }
    }
}

/// Highest `metric`; ties go to the earliest area.
fn leader(stats: &[TownStat], metric: impl Fn(&TownStat) -> usize) -> Option<AreaLeader> {
    let mut best: Option<&TownStat> = None;
    for stat in stats {
        if best.is_none_or(|b| metric(stat) > metric(b)) {
            best = Some(stat);
        }
    }
    best.map(|s| AreaLeader {
        name: s.name.clone(),
        count: metric(s),
    })
}

/// Aggregates with the default boundary-inclusive containment test.
pub fn town_stats(
    areas: &AreaCollection,
    respondents: &[RespondentRecord],
    attitude_threshold: f64,
) -> TownStatsReport {
    TownStatsAggregator::default()
        .with_threshold(attitude_threshold)
        .aggregate(areas, respondents)
}
