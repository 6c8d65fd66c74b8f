//! Administrative-area statistics.
//!
//! [`areas`] decodes the polygon GeoJSON, [`containment`] holds the
//! point-in-polygon predicate handed to the aggregator, and [`aggregate`]
//! bins respondents into areas and picks the busiest ones.

pub mod aggregate;
pub mod areas;
pub mod containment;

pub use aggregate::{
    AreaLeader, DEFAULT_ATTITUDE_THRESHOLD, TownStat, TownStatsAggregator, TownStatsReport,
    town_stats,
};
pub use areas::{Area, AreaCollection, AreaError};
pub use containment::{BoundaryInclusive, Containment};
