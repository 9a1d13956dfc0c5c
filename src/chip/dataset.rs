//! In-memory training data: a vertex arena plus clusters keyed by [`ClusterId`].
//!
//! Vertices are created once, indexed by their position in the arena, and then
//! mutated in place by the graph builder (adjacency) and the quality filter
//! (quality, cluster membership). Clusters hold vertex ids, never references, so
//! there are no vertex/cluster cycles to manage.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::filter::QualityStats;
use super::geometry::check_dims;
use crate::error::{Error, Result};

/// Vertex identifier: the vertex's index in its [`Dataset`].
pub type VertexId = usize;

/// Cluster (class) identifier, keyed either by integer or by name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterId {
    /// Integer-keyed cluster.
    Int(i64),
    /// Name-keyed cluster.
    Str(String),
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ClusterId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ClusterId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_owned())
    }
}

impl From<String> for ClusterId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

/// An undirected edge, canonicalized as `(lower id, higher id)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawEdge")]
pub struct Edge {
    lo: VertexId,
    hi: VertexId,
}

#[derive(Deserialize)]
struct RawEdge {
    lo: VertexId,
    hi: VertexId,
}

impl From<RawEdge> for Edge {
    fn from(raw: RawEdge) -> Self {
        Self::new(raw.lo, raw.hi)
    }
}

impl Edge {
    /// Create an edge; the endpoints are ordered so discovery order does not matter.
    pub fn new(a: VertexId, b: VertexId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// Lower-id endpoint.
    pub fn lo(&self) -> VertexId {
        self.lo
    }

    /// Higher-id endpoint.
    pub fn hi(&self) -> VertexId {
        self.hi
    }
}

/// One entry of a vertex's adjacency list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjacent {
    /// Neighbor vertex id.
    pub neighbor: VertexId,
    /// Whether the edge crosses a cluster boundary (a support edge).
    pub boundary: bool,
}

/// A labeled training point.
#[derive(Clone, Debug)]
pub struct Vertex {
    id: VertexId,
    coordinates: Vec<f32>,
    cluster: ClusterId,
    pub(crate) adjacency: Vec<Adjacent>,
    pub(crate) quality: f64,
}

impl Vertex {
    /// Vertex id (arena index).
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Coordinates of the point.
    pub fn coordinates(&self) -> &[f32] {
        &self.coordinates
    }

    /// Id of the cluster this vertex was labeled with.
    pub fn cluster(&self) -> &ClusterId {
        &self.cluster
    }

    /// Gabriel-graph neighbors, populated by [`build_gabriel_graph`](super::build_gabriel_graph).
    pub fn adjacency(&self) -> &[Adjacent] {
        &self.adjacency
    }

    /// Fraction of same-cluster neighbors, as of the last filtering pass.
    pub fn quality(&self) -> f64 {
        self.quality
    }
}

/// A cluster: its member vertex ids plus quality statistics from the last filter pass.
#[derive(Clone, Debug)]
pub struct Cluster {
    id: ClusterId,
    pub(crate) members: BTreeSet<VertexId>,
    pub(crate) stats: QualityStats,
    pub(crate) threshold: f64,
}

impl Cluster {
    fn new(id: ClusterId) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            stats: QualityStats::default(),
            threshold: 0.0,
        }
    }

    /// Cluster id.
    pub fn id(&self) -> &ClusterId {
        &self.id
    }

    /// Surviving member vertex ids, in ascending order.
    pub fn members(&self) -> &BTreeSet<VertexId> {
        &self.members
    }

    /// Number of surviving members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether every member has been removed (or none was ever added).
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `vertex` is a surviving member.
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.members.contains(&vertex)
    }

    /// Quality statistics accumulated during the last filter pass.
    pub fn stats(&self) -> &QualityStats {
        &self.stats
    }

    /// Removal threshold computed during the last filter pass.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Vertex arena plus cluster map.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    vertices: Vec<Vertex>,
    clusters: BTreeMap<ClusterId, Cluster>,
    dim: usize,
}

impl Dataset {
    /// Build a dataset from parallel slices of points and labels.
    ///
    /// All points must share one dimensionality. An empty input yields an empty dataset.
    pub fn new(data: &[Vec<f32>], labels: &[ClusterId]) -> Result<Self> {
        if data.len() != labels.len() {
            return Err(Error::LengthMismatch {
                data: data.len(),
                labels: labels.len(),
            });
        }
        Self::from_labeled(data.iter().cloned().zip(labels.iter().cloned()))
    }

    /// Build a dataset from `(coordinates, cluster id)` pairs.
    pub fn from_labeled<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Vec<f32>, ClusterId)>,
    {
        let mut dataset = Self::default();
        for (coordinates, cluster) in points {
            dataset.push(coordinates, cluster)?;
        }
        Ok(dataset)
    }

    fn push(&mut self, coordinates: Vec<f32>, cluster: ClusterId) -> Result<VertexId> {
        if self.vertices.is_empty() {
            if coordinates.is_empty() {
                return Err(Error::InvalidParameter {
                    name: "dimension",
                    message: "must be at least 1",
                });
            }
            self.dim = coordinates.len();
        } else {
            check_dims(self.dim, coordinates.len())?;
        }

        let id = self.vertices.len();
        self.clusters
            .entry(cluster.clone())
            .or_insert_with(|| Cluster::new(cluster.clone()))
            .members
            .insert(id);
        self.vertices.push(Vertex {
            id,
            coordinates,
            cluster,
            adjacency: Vec::new(),
            quality: 0.0,
        });
        Ok(id)
    }

    /// Number of vertices ever loaded (including filtered ones).
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the dataset has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Dimensionality shared by all vertices (0 when empty).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// All vertices, indexed by id.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Look up a vertex by id.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// All clusters, ordered by id.
    pub fn clusters(&self) -> &BTreeMap<ClusterId, Cluster> {
        &self.clusters
    }

    /// Look up a cluster by id.
    pub fn cluster(&self, id: &ClusterId) -> Option<&Cluster> {
        self.clusters.get(id)
    }

    /// Whether a vertex is still a member of its cluster.
    pub fn is_active(&self, id: VertexId) -> bool {
        self.vertices
            .get(id)
            .and_then(|v| self.clusters.get(&v.cluster))
            .is_some_and(|c| c.contains(id))
    }

    /// Vertices that survived filtering, in id order.
    pub fn active_vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.vertices.iter().filter(|v| self.is_active(v.id))
    }

    /// Every graph edge, canonicalized and sorted.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .vertices
            .iter()
            .flat_map(|v| {
                v.adjacency
                    .iter()
                    .filter(move |a| a.neighbor > v.id)
                    .map(move |a| Edge::new(v.id, a.neighbor))
            })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Boundary edges whose endpoints both survived filtering, sorted.
    pub fn boundary_edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .active_vertices()
            .flat_map(|v| {
                v.adjacency
                    .iter()
                    .filter(move |a| a.boundary && a.neighbor > v.id)
                    .map(move |a| Edge::new(v.id, a.neighbor))
            })
            .filter(|e| self.is_active(e.hi))
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Coordinates of both endpoints of an edge.
    pub(crate) fn endpoints(&self, edge: Edge) -> Option<(&Vertex, &Vertex)> {
        Some((self.vertices.get(edge.lo)?, self.vertices.get(edge.hi)?))
    }

    /// Record an undirected Gabriel edge on both endpoints.
    pub(crate) fn connect(&mut self, edge: Edge) {
        let boundary = self.vertices[edge.lo].cluster != self.vertices[edge.hi].cluster;
        self.vertices[edge.lo].adjacency.push(Adjacent {
            neighbor: edge.hi,
            boundary,
        });
        self.vertices[edge.hi].adjacency.push(Adjacent {
            neighbor: edge.lo,
            boundary,
        });
    }

    pub(crate) fn clear_adjacency(&mut self) {
        for v in &mut self.vertices {
            v.adjacency.clear();
        }
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [Vertex], &mut BTreeMap<ClusterId, Cluster>) {
        (&mut self.vertices, &mut self.clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_is_canonical() {
        assert_eq!(Edge::new(3, 1), Edge::new(1, 3));
        let e = Edge::new(7, 2);
        assert_eq!((e.lo(), e.hi()), (2, 7));

        let loaded: Edge = serde_json::from_str(r#"{"lo": 7, "hi": 2}"#).unwrap();
        assert_eq!(loaded, e);
    }

    #[test]
    fn test_cluster_id_ordering_and_display() {
        let mut ids = vec![
            ClusterId::from("b"),
            ClusterId::from(2),
            ClusterId::from("a"),
            ClusterId::from(-1),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ClusterId::Int(-1),
                ClusterId::Int(2),
                ClusterId::from("a"),
                ClusterId::from("b"),
            ]
        );
        assert_eq!(ClusterId::from("setosa").to_string(), "setosa");
        assert_eq!(ClusterId::from(4).to_string(), "4");
    }

    #[test]
    fn test_dataset_groups_vertices_by_cluster() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0]];
        let labels = vec![ClusterId::from("A"), ClusterId::from("B"), ClusterId::from("A")];
        let ds = Dataset::new(&data, &labels).unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.dim(), 2);
        assert_eq!(ds.clusters().len(), 2);

        let a = ds.cluster(&ClusterId::from("A")).unwrap();
        assert_eq!(a.members().iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(ds.is_active(1));
        assert!(!ds.is_active(9));
    }

    #[test]
    fn test_dataset_rejects_ragged_points() {
        let data = vec![vec![0.0, 0.0], vec![1.0]];
        let labels = vec![ClusterId::from(0), ClusterId::from(1)];
        assert!(matches!(
            Dataset::new(&data, &labels),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_dataset_rejects_label_count_mismatch() {
        let data = vec![vec![0.0]];
        assert!(matches!(
            Dataset::new(&data, &[]),
            Err(Error::LengthMismatch { data: 1, labels: 0 })
        ));
    }

    #[test]
    fn test_empty_dataset_is_allowed() {
        let ds = Dataset::new(&[], &[]).unwrap();
        assert!(ds.is_empty());
        assert!(ds.edges().is_empty());
        assert!(ds.boundary_edges().is_empty());
    }

    #[test]
    fn test_connect_tags_boundary_edges() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        let labels = vec![ClusterId::from(0), ClusterId::from(0), ClusterId::from(1)];
        let mut ds = Dataset::new(&data, &labels).unwrap();
        ds.connect(Edge::new(0, 1));
        ds.connect(Edge::new(2, 1));

        assert!(!ds.vertices()[0].adjacency()[0].boundary);
        assert!(ds.vertices()[2].adjacency()[0].boundary);
        assert_eq!(ds.edges(), vec![Edge::new(0, 1), Edge::new(1, 2)]);
        assert_eq!(ds.boundary_edges(), vec![Edge::new(1, 2)]);
    }
}
