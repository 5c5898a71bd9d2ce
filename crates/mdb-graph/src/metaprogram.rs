use facet::Facet;
use mdb_types::{
    CppCode, EdgeId, EvaluationResult, EventKind, FileLocation, Frame, InvariantError,
    MetaprogramNode, Mode, VertexId,
};

use tracing::warn;

use crate::filter::EdgeFilter;

/// A point event attached to the activation that was open when it arrived.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct Annotation {
    pub kind: EventKind,
    pub node: MetaprogramNode,
    pub point_of_event: FileLocation,
    pub source_location: Option<FileLocation>,
    pub timestamp: f64,
}

/// Deduplicated graph node, identified by `(node, source_location)`.
#[derive(Facet, Debug, Clone)]
pub struct Vertex {
    pub node: MetaprogramNode,
    pub source_location: FileLocation,
    /// Outgoing activations, in creation order.
    pub out_edges: Vec<EdgeId>,
    pub in_edges: Vec<EdgeId>,
}

/// One activation of a vertex, caused by the activation of `source`.
#[derive(Facet, Debug, Clone)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub kind: EventKind,
    pub point_of_event: FileLocation,
    pub begin: f64,
    /// `None` until the matching end event arrives.
    pub end: Option<f64>,
    pub annotations: Vec<Annotation>,
}

impl Edge {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn time_taken(&self) -> Option<f64> {
        self.end.map(|end| end - self.begin)
    }

    /// Rescanned and expanded code attached to a macro expansion.
    pub fn payload(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(|annotation| {
            matches!(
                annotation.kind,
                EventKind::Rescanning | EventKind::ExpandedCode
            )
        })
    }

    /// The final expansion of a macro, if it was reported.
    pub fn expanded_code(&self) -> Option<&CppCode> {
        self.annotations
            .iter()
            .rev()
            .find(|annotation| annotation.kind == EventKind::ExpandedCode)
            .and_then(|annotation| match &annotation.node {
                MetaprogramNode::Code(code) => Some(code),
                _ => None,
            })
    }
}

/// The instantiation graph of one evaluated expression.
///
/// Vertices and edges live in arenas indexed by [`VertexId`] / [`EdgeId`].
/// The store only grows: the builder appends vertices, edges and
/// annotations and fills in end timestamps; nothing is ever removed.
#[derive(Debug, Clone)]
pub struct Metaprogram {
    mode: Mode,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    root_annotations: Vec<Annotation>,
    discovered: Vec<bool>,
    current_path: Vec<EdgeId>,
    result: Option<EvaluationResult>,
}

const ROOT: usize = 0;

impl Metaprogram {
    pub fn new(mode: Mode, root_name: CppCode, root_source_location: FileLocation) -> Self {
        Self::with_capacity(mode, root_name, root_source_location, 0)
    }

    pub fn with_capacity(
        mode: Mode,
        root_name: CppCode,
        root_source_location: FileLocation,
        capacity: usize,
    ) -> Self {
        let mut vertices = Vec::new();
        let mut edges = Vec::new();
        let mut discovered = Vec::new();
        // The capacity is only a hint: an oversized one must not abort.
        if vertices.try_reserve(capacity.max(1)).is_err()
            || edges.try_reserve(capacity).is_err()
            || discovered.try_reserve(capacity.max(1)).is_err()
        {
            warn!(capacity, "cannot reserve graph arenas up front");
        }
        vertices.push(Vertex {
            node: MetaprogramNode::Code(root_name),
            source_location: root_source_location,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        discovered.push(false);
        Self {
            mode,
            vertices,
            edges,
            root_annotations: Vec::new(),
            discovered,
            current_path: Vec::new(),
            result: None,
        }
    }

    // ── Reading ─────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn root_vertex(&self) -> VertexId {
        VertexId::FIRST
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Panics if `id` was not produced by this store.
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Panics if `id` was not produced by this store.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(index, vertex)| Some((VertexId::from_index(index).ok()?, vertex)))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| Some((EdgeId::from_index(index).ok()?, edge)))
    }

    pub fn target(&self, edge: EdgeId) -> VertexId {
        self.edge(edge).target
    }

    pub fn source(&self, edge: EdgeId) -> VertexId {
        self.edge(edge).source
    }

    /// Target of `edge`, or the root when there is no edge.
    pub fn vertex_of(&self, edge: Option<EdgeId>) -> VertexId {
        edge.map_or_else(|| self.root_vertex(), |edge| self.target(edge))
    }

    pub fn out_edges(&self, vertex: VertexId) -> &[EdgeId] {
        &self.vertex(vertex).out_edges
    }

    pub fn in_edges(&self, vertex: VertexId) -> &[EdgeId] {
        &self.vertex(vertex).in_edges
    }

    /// Out-edges of `vertex` that `filter` enables, in display order:
    /// creation order, or longest first in profile mode.
    pub fn filtered_out_edges<F>(&self, vertex: VertexId, filter: &F) -> Vec<EdgeId>
    where
        F: EdgeFilter + ?Sized,
    {
        let mut edges: Vec<EdgeId> = self
            .out_edges(vertex)
            .iter()
            .copied()
            .filter(|&edge| filter.is_enabled(self, edge))
            .collect();
        if self.mode == Mode::Profile {
            edges.sort_by(|&a, &b| {
                match (self.edge(a).time_taken(), self.edge(b).time_taken()) {
                    (Some(a), Some(b)) => b.total_cmp(&a),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
        }
        edges
    }

    pub fn enabled_out_degree<F>(&self, vertex: VertexId, filter: &F) -> usize
    where
        F: EdgeFilter + ?Sized,
    {
        self.out_edges(vertex)
            .iter()
            .filter(|&&edge| filter.is_enabled(self, edge))
            .count()
    }

    /// Discovery marks every traversal starts from, one per vertex.
    pub fn discovered(&self) -> &[bool] {
        &self.discovered
    }

    /// Where evaluation is paused; `None` means the root (or the final
    /// result, once evaluation has ended).
    pub fn current_edge(&self) -> Option<EdgeId> {
        self.current_path.last().copied()
    }

    /// Activations open at the pause point, outermost first.
    pub fn current_path(&self) -> &[EdgeId] {
        &self.current_path
    }

    pub fn result(&self) -> Option<&EvaluationResult> {
        self.result.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    /// Point events attached to `edge`, or to the root for `None`.
    pub fn annotations(&self, edge: Option<EdgeId>) -> &[Annotation] {
        match edge {
            Some(edge) => &self.edge(edge).annotations,
            None => &self.root_annotations,
        }
    }

    pub fn root_frame(&self) -> Frame {
        let root = &self.vertices[ROOT];
        Frame::root(root.node.clone(), root.source_location.clone())
    }

    pub fn to_frame(&self, edge: EdgeId) -> Frame {
        let edge = self.edge(edge);
        let target = self.vertex(edge.target);
        Frame {
            node: target.node.clone(),
            source_location: target.source_location.clone(),
            point_of_event: Some(edge.point_of_event.clone()),
            kind: Some(edge.kind),
            time_taken: edge.time_taken(),
        }
    }

    /// Frame of `edge`, or the root frame for `None`.
    pub fn frame_of(&self, edge: Option<EdgeId>) -> Frame {
        match edge {
            Some(edge) => self.to_frame(edge),
            None => self.root_frame(),
        }
    }

    // ── Growing (builder only) ──────────────────────────────

    pub(crate) fn add_vertex(
        &mut self,
        node: MetaprogramNode,
        source_location: FileLocation,
    ) -> Result<VertexId, InvariantError> {
        let id = VertexId::from_index(self.vertices.len())?;
        self.vertices.push(Vertex {
            node,
            source_location,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        self.discovered.push(false);
        Ok(id)
    }

    pub(crate) fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        kind: EventKind,
        point_of_event: FileLocation,
        begin: f64,
    ) -> Result<EdgeId, InvariantError> {
        let id = EdgeId::from_index(self.edges.len())?;
        self.edges.push(Edge {
            source,
            target,
            kind,
            point_of_event,
            begin,
            end: None,
            annotations: Vec::new(),
        });
        self.vertices[source.index()].out_edges.push(id);
        self.vertices[target.index()].in_edges.push(id);
        Ok(id)
    }

    pub(crate) fn close_edge(&mut self, edge: EdgeId, end: f64) {
        self.edges[edge.index()].end = Some(end);
    }

    pub(crate) fn annotate(&mut self, edge: Option<EdgeId>, annotation: Annotation) {
        match edge {
            Some(edge) => self.edges[edge.index()].annotations.push(annotation),
            None => self.root_annotations.push(annotation),
        }
    }

    pub(crate) fn set_current_path(&mut self, path: Vec<EdgeId>) {
        self.current_path = path;
    }

    pub(crate) fn set_result(&mut self, result: EvaluationResult) {
        self.result = Some(result);
    }
}
