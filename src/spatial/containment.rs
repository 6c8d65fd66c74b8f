//! Point-in-area predicates for the aggregator.

use geo::{Intersects, Point};

use super::areas::Area;

/// Decides whether a point lies in an area.
///
/// Implemented for any `Fn(&Area, &Point<f64>) -> bool`, so tests and
/// callers can pass a closure.
pub trait Containment {
    fn contains(&self, area: &Area, point: &Point<f64>) -> bool;
}

impl<F> Containment for F
where
    F: Fn(&Area, &Point<f64>) -> bool,
{
    fn contains(&self, area: &Area, point: &Point<f64>) -> bool {
        self(area, point)
    }
}

/// Interior or boundary of any member polygon, holes excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryInclusive;

impl Containment for BoundaryInclusive {
    fn contains(&self, area: &Area, point: &Point<f64>) -> bool {
        area.geometry.intersects(point)
    }
}
