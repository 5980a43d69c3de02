use cellway_core::{BoundingBox, GeoPoint};
use tracing::warn;

use crate::road_graph::{RoadGraph, RoadGraphBuilder};

pub const GRID_SIZE: usize = 10;
pub const GRID_SPEED_KMH: f64 = 50.0;

/// Uniform `rows` x `cols` lattice over `bbox` with two-way edges between
/// horizontal and vertical neighbours, marked degraded.
pub fn synthetic_grid(bbox: &BoundingBox, rows: usize, cols: usize) -> RoadGraph {
    let rows = rows.max(2);
    let cols = cols.max(2);
    let lat_step = bbox.lat_span() / (rows - 1) as f64;
    let lng_step = bbox.lng_span() / (cols - 1) as f64;

    let mut builder = RoadGraphBuilder::new();
    for row in 0..rows {
        for col in 0..cols {
            builder.add_node(GeoPoint::new(
                bbox.min_lat + row as f64 * lat_step,
                bbox.min_lng + col as f64 * lng_step,
            ));
        }
    }

    let id = |row: usize, col: usize| row * cols + col;
    for row in 0..rows {
        for col in 0..cols {
            if col + 1 < cols {
                builder.add_road(id(row, col), id(row, col + 1), GRID_SPEED_KMH, Vec::new(), false);
            }
            if row + 1 < rows {
                builder.add_road(id(row, col), id(row + 1, col), GRID_SPEED_KMH, Vec::new(), false);
            }
        }
    }

    warn!("RoadNetwork: using a synthetic {}x{} grid over {}", rows, cols, bbox);

    builder.build(*bbox).into_degraded()
}
