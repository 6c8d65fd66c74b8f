//! Survey respondent pipeline for the bus-route adjustment dashboard.
//!
//! Loads the survey CSV into typed records, filters and scores them, and
//! aggregates them into administrative areas for the map and the agent.

pub mod actions;
pub mod district;
pub mod fetch;
pub mod filter;
pub mod lines;
pub mod loader;
pub mod marker;
pub mod output;
pub mod parser;
pub mod scoring;
pub mod session;
pub mod spatial;
pub mod survey;
