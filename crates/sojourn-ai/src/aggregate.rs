//! Spatial aggregation of stay points into locations.
//!
//! [`DensityAggregator`] is density clustering with a minimum cluster size of
//! one: two stay points share a location when they are connected through a
//! chain of neighbours, each within `epsilon_m` meters of the next.

use std::collections::{BTreeMap, HashMap};

use sojourn_core::geo::METERS_PER_DEGREE;
use sojourn_core::{AggregationParams, GeoPoint, Location, LocationId, StayPoint};
use tracing::info;

/// Groups stay points into discrete locations.
pub trait LocationAggregator {
    /// Assign a location id to every stay point and report each location's centroid.
    fn aggregate(
        &self,
        stays: Vec<StayPoint>,
        params: &AggregationParams,
    ) -> (Vec<StayPoint>, BTreeMap<LocationId, Location>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DensityAggregator;

impl LocationAggregator for DensityAggregator {
    fn aggregate(
        &self,
        mut stays: Vec<StayPoint>,
        params: &AggregationParams,
    ) -> (Vec<StayPoint>, BTreeMap<LocationId, Location>) {
        let n = stays.len();
        let mut sets = DisjointSet::new(n);

        // Sweep in latitude order; only neighbours within the latitude band
        // can be closer than epsilon.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| stays[a].point.lat.total_cmp(&stays[b].point.lat));
        let lat_band = params.epsilon_m / METERS_PER_DEGREE;

        for (pos, &i) in order.iter().enumerate() {
            for &j in &order[pos + 1..] {
                if stays[j].point.lat - stays[i].point.lat > lat_band {
                    break;
                }
                if stays[i].point.distance_m(&stays[j].point) <= params.epsilon_m {
                    sets.union(i, j);
                }
            }
        }

        // Number clusters in order of first appearance in the input.
        let mut ids: HashMap<usize, LocationId> = HashMap::new();
        let mut sums: BTreeMap<LocationId, (f64, f64, usize)> = BTreeMap::new();
        for (idx, stay) in stays.iter_mut().enumerate() {
            let root = sets.find(idx);
            let next_id = ids.len() as LocationId;
            let id = *ids.entry(root).or_insert(next_id);
            stay.location_id = Some(id);

            let entry = sums.entry(id).or_insert((0.0, 0.0, 0));
            entry.0 += stay.point.lon;
            entry.1 += stay.point.lat;
            entry.2 += 1;
        }

        let locations: BTreeMap<LocationId, Location> = sums
            .into_iter()
            .map(|(id, (lon, lat, count))| {
                let center = GeoPoint::new(lon / count as f64, lat / count as f64);
                (id, Location { id, center })
            })
            .collect();

        info!(
            stays = n,
            locations = locations.len(),
            epsilon_m = params.epsilon_m,
            "aggregated stay points into locations"
        );
        (stays, locations)
    }
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the smaller index as root so numbering is stable.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stay(id: u64, lon: f64, lat: f64) -> StayPoint {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        StayPoint::new(id, t, t + chrono::Duration::hours(1), GeoPoint::new(lon, lat))
    }

    fn params(epsilon_m: f64) -> AggregationParams {
        AggregationParams { epsilon_m }
    }

    #[test]
    fn nearby_points_share_location() {
        // ~30 m apart in latitude, then a point ~2 km away.
        let stays = vec![
            stay(1, 6.1460, 46.2010),
            stay(2, 6.1460, 46.2013),
            stay(3, 6.1700, 46.2100),
        ];
        let (out, locs) = DensityAggregator.aggregate(stays, &params(100.0));
        assert_eq!(locs.len(), 2);
        assert_eq!(out[0].location_id, Some(0));
        assert_eq!(out[1].location_id, Some(0));
        assert_eq!(out[2].location_id, Some(1));
    }

    #[test]
    fn chained_neighbours_merge() {
        // Each step ~80 m, ends ~160 m apart: one location via the middle point.
        let stays = vec![
            stay(1, 6.1460, 46.2000),
            stay(2, 6.1460, 46.20072),
            stay(3, 6.1460, 46.20144),
        ];
        let (out, locs) = DensityAggregator.aggregate(stays, &params(100.0));
        assert_eq!(locs.len(), 1);
        assert!(out.iter().all(|s| s.location_id == Some(0)));
    }

    #[test]
    fn centroid_is_mean() {
        let stays = vec![stay(1, 6.0, 46.0), stay(2, 6.0002, 46.0002)];
        let (_, locs) = DensityAggregator.aggregate(stays, &params(100.0));
        let center = locs[&0].center;
        assert!((center.lon - 6.0001).abs() < 1e-9);
        assert!((center.lat - 46.0001).abs() < 1e-9);
    }

    #[test]
    fn ids_follow_first_appearance() {
        let stays = vec![
            stay(1, 7.0, 47.0),
            stay(2, 6.0, 46.0),
            stay(3, 7.0, 47.0),
        ];
        let (out, _) = DensityAggregator.aggregate(stays, &params(50.0));
        assert_eq!(out[0].location_id, Some(0));
        assert_eq!(out[1].location_id, Some(1));
        assert_eq!(out[2].location_id, Some(0));
    }

    #[test]
    fn empty_input() {
        let (out, locs) = DensityAggregator.aggregate(vec![], &params(100.0));
        assert!(out.is_empty());
        assert!(locs.is_empty());
    }
}
