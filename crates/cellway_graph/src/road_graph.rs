use cellway_core::{BoundingBox, GeoPoint, geometry::compute_geometry_distance};
use rstar::{RTree, primitives::GeomWithData};

/// Candidates taken from the planar index before ranking them by great-circle distance.
const NEAREST_CANDIDATES: usize = 16;

type IndexedNode = GeomWithData<[f64; 2], usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub from: usize,
    pub to: usize,
    /// Meters
    pub length: f64,
    pub speed_kmh: f64,
    /// From `from` to `to`, both ends included.
    pub geometry: Vec<GeoPoint>,
}

impl GraphEdge {
    /// Seconds needed to drive the edge.
    pub fn travel_time(&self) -> f64 {
        if self.speed_kmh <= 0.0 {
            return 0.0;
        }
        self.length / (self.speed_kmh / 3.6)
    }
}

/// Directed road network of a bounding area. Node ids are dense indices.
#[derive(Debug)]
pub struct RoadGraph {
    nodes: Vec<GeoPoint>,
    edges: Vec<GraphEdge>,
    adjacency: Vec<Vec<usize>>,
    bbox: BoundingBox,
    degraded: bool,
    index: Option<RTree<IndexedNode>>,
}

impl RoadGraph {
    pub fn new(nodes: Vec<GeoPoint>, edges: Vec<GraphEdge>, bbox: BoundingBox) -> Self {
        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (edge_id, edge) in edges.iter().enumerate() {
            adjacency[edge.from].push(edge_id);
        }

        let index = (!nodes.is_empty()).then(|| {
            RTree::bulk_load(
                nodes
                    .iter()
                    .enumerate()
                    .map(|(id, node)| IndexedNode::new(node.into(), id))
                    .collect(),
            )
        });

        RoadGraph {
            nodes,
            edges,
            adjacency,
            bbox,
            degraded: false,
            index,
        }
    }

    /// Flags a synthetic network standing in for real road data.
    pub fn into_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Drops the spatial index, lookups fall back to a linear scan.
    pub fn without_index(mut self) -> Self {
        self.index = None;
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.edges.is_empty()
    }

    pub fn node(&self, node_id: usize) -> &GeoPoint {
        &self.nodes[node_id]
    }

    pub fn nodes(&self) -> &[GeoPoint] {
        &self.nodes
    }

    pub fn edge(&self, edge_id: usize) -> &GraphEdge {
        &self.edges[edge_id]
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn outgoing_edges(&self, node_id: usize) -> &[usize] {
        &self.adjacency[node_id]
    }

    /// Closest node to `point` by great-circle distance.
    pub fn nearest_node(&self, point: &GeoPoint) -> Option<usize> {
        match &self.index {
            Some(index) => index
                .nearest_neighbor_iter(&point.into())
                .take(NEAREST_CANDIDATES)
                .map(|candidate| candidate.data)
                .min_by(|&a, &b| {
                    self.nodes[a]
                        .haversine_distance(point)
                        .total_cmp(&self.nodes[b].haversine_distance(point))
                }),
            None => self.nearest_node_linear(point),
        }
    }

    fn nearest_node_linear(&self, point: &GeoPoint) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.haversine_distance(point)
                    .total_cmp(&b.haversine_distance(point))
            })
            .map(|(id, _)| id)
    }
}

#[derive(Default)]
pub struct RoadGraphBuilder {
    nodes: Vec<GeoPoint>,
    edges: Vec<GraphEdge>,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, point: GeoPoint) -> usize {
        self.nodes.push(point);
        self.nodes.len() - 1
    }

    pub fn node(&self, node_id: usize) -> &GeoPoint {
        &self.nodes[node_id]
    }

    /// Adds a directed edge. An empty geometry becomes the straight segment
    /// between both nodes.
    pub fn add_edge(&mut self, from: usize, to: usize, speed_kmh: f64, geometry: Vec<GeoPoint>) {
        let geometry = if geometry.len() < 2 {
            vec![self.nodes[from], self.nodes[to]]
        } else {
            geometry
        };

        self.edges.push(GraphEdge {
            from,
            to,
            length: compute_geometry_distance(&geometry),
            speed_kmh,
            geometry,
        });
    }

    /// Adds `from -> to` and, when not one-way, `to -> from`.
    pub fn add_road(
        &mut self,
        from: usize,
        to: usize,
        speed_kmh: f64,
        geometry: Vec<GeoPoint>,
        oneway: bool,
    ) {
        if !oneway {
            let reversed = geometry.iter().rev().copied().collect();
            self.add_edge(to, from, speed_kmh, reversed);
        }
        self.add_edge(from, to, speed_kmh, geometry);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn build(self, bbox: BoundingBox) -> RoadGraph {
        RoadGraph::new(self.nodes, self.edges, bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_graph() -> RoadGraph {
        let mut builder = RoadGraphBuilder::new();
        let a = builder.add_node(GeoPoint::new(42.30, -71.10));
        let b = builder.add_node(GeoPoint::new(42.30, -71.09));
        let c = builder.add_node(GeoPoint::new(42.31, -71.09));

        builder.add_road(a, b, 50.0, Vec::new(), false);
        builder.add_road(b, c, 30.0, Vec::new(), true);

        builder.build(BoundingBox::new(42.29, -71.11, 42.32, -71.08))
    }

    #[test]
    fn test_adjacency_respects_direction() {
        let graph = small_graph();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.outgoing_edges(0).len(), 1);
        assert_eq!(graph.outgoing_edges(1).len(), 2);
        assert!(graph.outgoing_edges(2).is_empty());
    }

    #[test]
    fn test_edge_length_and_travel_time() {
        let graph = small_graph();
        let edge = graph
            .edges()
            .iter()
            .find(|edge| edge.from == 0 && edge.to == 1)
            .unwrap();

        // 0.01 degrees of longitude at 42.3 degrees of latitude
        assert!((edge.length - 822.0).abs() < 2.0, "{}", edge.length);
        assert!((edge.travel_time() - edge.length / (50.0 / 3.6)).abs() < 1e-9);
        assert_eq!(edge.geometry.len(), 2);
    }

    #[test]
    fn test_reverse_edge_geometry() {
        let graph = small_graph();
        let reverse = graph
            .edges()
            .iter()
            .find(|edge| edge.from == 1 && edge.to == 0)
            .unwrap();

        assert_eq!(reverse.geometry[0], *graph.node(1));
        assert_eq!(reverse.geometry[1], *graph.node(0));
    }

    #[test]
    fn test_nearest_node() {
        let graph = small_graph();
        let point = GeoPoint::new(42.309, -71.0905);

        assert_eq!(graph.nearest_node(&point), Some(2));
        assert_eq!(graph.nearest_node(&GeoPoint::new(42.0, -72.0)), Some(0));
    }

    #[test]
    fn test_nearest_node_linear_scan() {
        let graph = small_graph().without_index();
        assert_eq!(graph.nearest_node(&GeoPoint::new(42.301, -71.0901)), Some(1));

        let empty = RoadGraph::new(Vec::new(), Vec::new(), BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(empty.nearest_node(&GeoPoint::new(0.5, 0.5)), None);
        assert!(empty.is_empty());
    }
}
