//! Spherical geometry over polylines.
//!
//! Distances are great-circle distances; projections onto a segment use the
//! cross-track / along-track formulas on the sphere rather than a planar
//! approximation.

use crate::{constants::EARTH_RADIUS_METERS, geopoint::GeoPoint};

/// Length of the polyline in meters.
pub fn compute_geometry_distance(geometry: &[GeoPoint]) -> f64 {
    geometry
        .windows(2)
        .map(|pair| pair[0].haversine_distance(&pair[1]))
        .sum()
}

/// Distance from the first point to every point of the polyline.
pub fn cumulative_distances(geometry: &[GeoPoint]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(geometry.len());
    let mut total = 0.0;

    for (i, point) in geometry.iter().enumerate() {
        if i > 0 {
            total += geometry[i - 1].haversine_distance(point);
        }
        cumulative.push(total);
    }

    cumulative
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SegmentProjection {
    /// Shortest distance from the point to the segment, in meters.
    pub distance: f64,
    /// Distance from the segment start to the projected point, in meters.
    pub along: f64,
}

/// Projects `point` onto the great-circle segment `start -> end`.
pub fn project_onto_segment(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> SegmentProjection {
    let distance_to_start = start.haversine_distance(point);
    let segment_length = start.haversine_distance(end);

    if segment_length == 0.0 || distance_to_start == 0.0 {
        return SegmentProjection {
            distance: distance_to_start,
            along: 0.0,
        };
    }

    let angular_distance = distance_to_start / EARTH_RADIUS_METERS;
    let delta_bearing = (start.bearing(point) - start.bearing(end)).to_radians();

    // The point lies behind the segment start
    if delta_bearing.cos() <= 0.0 {
        return SegmentProjection {
            distance: distance_to_start,
            along: 0.0,
        };
    }

    let cross_track =
        (angular_distance.sin() * delta_bearing.sin()).clamp(-1.0, 1.0).asin();
    let along_track = (angular_distance.cos() / cross_track.cos())
        .clamp(-1.0, 1.0)
        .acos()
        * EARTH_RADIUS_METERS;

    if along_track >= segment_length {
        return SegmentProjection {
            distance: end.haversine_distance(point),
            along: segment_length,
        };
    }

    SegmentProjection {
        distance: cross_track.abs() * EARTH_RADIUS_METERS,
        along: along_track,
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolylineProjection {
    /// Distance from the point to the closest part of the polyline, in meters.
    pub distance: f64,
    /// Normalized position of the projected point along the polyline, in [0, 1].
    pub position: f64,
}

/// Projects `point` onto the polyline. `cumulative` must come from
/// [`cumulative_distances`] over the same geometry.
pub fn project_onto_polyline(
    point: &GeoPoint,
    geometry: &[GeoPoint],
    cumulative: &[f64],
) -> Option<PolylineProjection> {
    match geometry {
        [] => None,
        [single] => Some(PolylineProjection {
            distance: single.haversine_distance(point),
            position: 0.0,
        }),
        _ => {
            let total = cumulative.last().copied().unwrap_or(0.0);
            let mut best: Option<(f64, f64)> = None;

            for (i, segment) in geometry.windows(2).enumerate() {
                let projection = project_onto_segment(point, &segment[0], &segment[1]);
                if best.is_none_or(|(distance, _)| projection.distance < distance) {
                    best = Some((projection.distance, cumulative[i] + projection.along));
                }
            }

            best.map(|(distance, along)| PolylineProjection {
                distance,
                position: if total > 0.0 {
                    (along / total).clamp(0.0, 1.0)
                } else {
                    0.0
                },
            })
        }
    }
}

/// Indices of at most roughly `max_samples` evenly spaced points.
pub fn sample_indices(len: usize, max_samples: usize) -> impl Iterator<Item = usize> {
    let step = (len / max_samples.max(1)).max(1);
    (0..len).step_by(step)
}
