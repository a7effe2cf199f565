//! Oracle seams for the route-recommendation pipeline.
//!
//! These are intentionally minimal. Production code uses the Google adapter
//! in `google`; tests supply in-process mocks.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::OracleError;
use crate::models::{LatLng, PlaceCandidate, RouteGeometry};

/// Searches points of interest around a center for one category.
pub trait PlaceSearch {
    /// Returns up to `max_results` places, tagged with `category` as their
    /// search category and their distance from `center`.
    fn find_nearby(
        &self,
        center: LatLng,
        radius_km: f64,
        category: &str,
        max_results: usize,
    ) -> Result<Vec<PlaceCandidate>, OracleError>;
}

/// Computes a loop geometry through an ordered set of waypoints.
pub trait Directions {
    /// Requests a walking route that starts and ends at `center` and passes
    /// through `waypoint_ids` in order.
    fn loop_route(
        &self,
        center: LatLng,
        waypoint_ids: &[String],
    ) -> Result<RouteGeometry, OracleError>;
}

impl<T: PlaceSearch + ?Sized> PlaceSearch for &T {
    fn find_nearby(
        &self,
        center: LatLng,
        radius_km: f64,
        category: &str,
        max_results: usize,
    ) -> Result<Vec<PlaceCandidate>, OracleError> {
        (**self).find_nearby(center, radius_km, category, max_results)
    }
}

impl<T: Directions + ?Sized> Directions for &T {
    fn loop_route(
        &self,
        center: LatLng,
        waypoint_ids: &[String],
    ) -> Result<RouteGeometry, OracleError> {
        (**self).loop_route(center, waypoint_ids)
    }
}

/// Caller-supplied budget of external oracle calls for one request.
///
/// Recall acquires a unit before every oracle call; exhaustion degrades the
/// candidate set instead of blocking or erroring the request.
#[derive(Debug)]
pub struct CallQuota {
    remaining: AtomicUsize,
}

impl CallQuota {
    pub fn new(limit: usize) -> Self {
        Self { remaining: AtomicUsize::new(limit) }
    }

    /// Consumes one call from the budget.
    pub fn acquire(&self) -> Result<(), OracleError> {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| OracleError::QuotaExhausted)
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}
