//! The visibility graph that sweeps write into.
//!
//! Vertices are identified by their exact coordinates: adding an edge between
//! two points creates the vertices if needed, and adding the same edge twice
//! (in either direction) is a no-op.

use std::collections::HashMap;

use serde::ser::SerializeSeq;

use crate::geom::Point;

typed_vec!(
    /// Storage for graph vertices, indexed by [`VertexIdx`].
    VertexVec,
    /// A handle to a vertex of a [`VisibilityGraph`].
    VertexIdx,
    "v"
);

typed_vec!(
    /// Storage for graph edges, indexed by [`EdgeIdx`].
    EdgeVec,
    /// A handle to an edge of a [`VisibilityGraph`].
    ///
    /// Removing an edge doesn't invalidate the handles of other edges.
    EdgeIdx,
    "e"
);

/// A vertex of the visibility graph.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityVertex {
    /// The vertex position.
    pub point: Point,
    out_edges: Vec<EdgeIdx>,
    in_edges: Vec<EdgeIdx>,
}

impl VisibilityVertex {
    /// Edges that start at this vertex.
    pub fn out_edges(&self) -> &[EdgeIdx] {
        &self.out_edges
    }

    /// Edges that end at this vertex.
    pub fn in_edges(&self) -> &[EdgeIdx] {
        &self.in_edges
    }

    /// The number of edges touching this vertex.
    pub fn degree(&self) -> usize {
        self.out_edges.len() + self.in_edges.len()
    }
}

/// What sort of edge this is, which affects its length when routing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum EdgeKind {
    /// An ordinary edge, whose cost is its length.
    Regular,
    /// An edge whose length is scaled down when routing, typically one that
    /// connects a port to the rest of the graph.
    TollFree {
        /// The factor applied to the edge's length.
        length_multiplier: f64,
    },
}

/// An edge of the visibility graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityEdge {
    /// The vertex where the edge was added from.
    pub source: VertexIdx,
    /// The vertex where the edge was added to.
    pub target: VertexIdx,
    /// The kind of edge.
    pub kind: EdgeKind,
}

impl VisibilityEdge {
    /// The factor applied to this edge's length when routing.
    pub fn length_multiplier(&self) -> f64 {
        match self.kind {
            EdgeKind::Regular => 1.0,
            EdgeKind::TollFree { length_multiplier } => length_multiplier,
        }
    }
}

/// A graph of mutually visible points.
#[derive(Clone, Debug, Default)]
pub struct VisibilityGraph {
    vertices: VertexVec<VisibilityVertex>,
    edges: EdgeVec<Option<VisibilityEdge>>,
    by_point: HashMap<(u64, u64), VertexIdx>,
    edge_count: usize,
}

impl VisibilityGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vertex at `p`, creating it if necessary.
    pub fn add_vertex(&mut self, p: Point) -> VertexIdx {
        let key = p.bits();
        if let Some(idx) = self.by_point.get(&key) {
            return *idx;
        }
        let idx = self.vertices.push(VisibilityVertex {
            point: p,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        self.by_point.insert(key, idx);
        idx
    }

    /// Returns the vertex at exactly `p`, if there is one.
    pub fn find_vertex(&self, p: Point) -> Option<VertexIdx> {
        self.by_point.get(&p.bits()).copied()
    }

    /// Adds a regular edge between two points.
    ///
    /// See [`VisibilityGraph::add_edge_with`].
    pub fn add_edge(&mut self, a: Point, b: Point) -> Option<EdgeIdx> {
        self.add_edge_with(a, b, |_, _| EdgeKind::Regular)
    }

    /// Adds an edge between two points, creating their vertices if needed.
    ///
    /// If there is already an edge between the two points (in either
    /// direction), that edge is returned and `kind` is not called. Returns
    /// `None` if the two points are the same, because we never add loops.
    pub fn add_edge_with(
        &mut self,
        a: Point,
        b: Point,
        kind: impl FnOnce(Point, Point) -> EdgeKind,
    ) -> Option<EdgeIdx> {
        if a.bits() == b.bits() {
            return None;
        }
        if let Some(existing) = self.find_edge(a, b) {
            return Some(existing);
        }
        let source = self.add_vertex(a);
        let target = self.add_vertex(b);
        let idx = self.edges.push(Some(VisibilityEdge {
            source,
            target,
            kind: kind(a, b),
        }));
        self.vertices[source].out_edges.push(idx);
        self.vertices[target].in_edges.push(idx);
        self.edge_count += 1;
        Some(idx)
    }

    /// Finds the edge between two points, in whichever direction it was added.
    pub fn find_edge(&self, a: Point, b: Point) -> Option<EdgeIdx> {
        let a = self.find_vertex(a)?;
        let b = self.find_vertex(b)?;
        self.vertices[a]
            .out_edges
            .iter()
            .chain(&self.vertices[a].in_edges)
            .copied()
            .find(|e| {
                self.edges[*e]
                    .as_ref()
                    .is_some_and(|e| (e.source == a && e.target == b) || (e.source == b && e.target == a))
            })
    }

    /// Removes an edge, returning it if it was still present.
    pub fn remove_edge(&mut self, idx: EdgeIdx) -> Option<VisibilityEdge> {
        let edge = self.edges.get(idx).copied().flatten()?;
        self.edges[idx] = None;
        self.vertices[edge.source].out_edges.retain(|e| *e != idx);
        self.vertices[edge.target].in_edges.retain(|e| *e != idx);
        self.edge_count -= 1;
        Some(edge)
    }

    /// Iterates over all the edges that haven't been removed.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIdx, &VisibilityEdge)> + '_ {
        self.edges
            .iter()
            .filter_map(|(idx, e)| e.as_ref().map(|e| (idx, e)))
    }

    /// Returns an edge, if it hasn't been removed.
    pub fn edge(&self, idx: EdgeIdx) -> Option<&VisibilityEdge> {
        self.edges.get(idx).and_then(Option::as_ref)
    }

    /// The endpoints of an edge, as points.
    pub fn edge_points(&self, edge: &VisibilityEdge) -> (Point, Point) {
        (self.point(edge.source), self.point(edge.target))
    }

    /// Iterates over all the vertices.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexIdx, &VisibilityVertex)> + '_ {
        self.vertices.iter()
    }

    /// Returns a vertex.
    pub fn vertex(&self, idx: VertexIdx) -> &VisibilityVertex {
        &self.vertices[idx]
    }

    /// The position of a vertex.
    pub fn point(&self, idx: VertexIdx) -> Point {
        self.vertices[idx].point
    }

    /// Iterates over every edge touching `v`, outgoing edges first.
    pub fn edges_at(&self, v: VertexIdx) -> impl Iterator<Item = EdgeIdx> + '_ {
        let v = &self.vertices[v];
        v.out_edges.iter().chain(&v.in_edges).copied()
    }

    /// The number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The number of edges that haven't been removed.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

#[derive(serde::Serialize)]
struct EdgeRecord {
    source: Point,
    target: Point,
    kind: EdgeKind,
}

impl serde::Serialize for VisibilityGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.edge_count))?;
        for (_, e) in self.edges() {
            seq.serialize_element(&EdgeRecord {
                source: self.point(e.source),
                target: self.point(e.target),
                kind: e.kind,
            })?;
        }
        seq.end()
    }
}
