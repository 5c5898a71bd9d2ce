use std::iter::FusedIterator;

use mdb_types::{CallGraphNode, EdgeId, Mode, VertexId};

use crate::filter::{AllEdges, EdgeFilter};
use crate::metaprogram::Metaprogram;

/// Pre-order walk of the instantiation graph from one activation.
///
/// Yields the start activation at depth 0, then every activation it
/// caused, siblings in display order. Outside full mode a vertex is
/// expanded only the first time it is reached; later occurrences are
/// yielded with no children. A vertex already open on the current path is
/// never re-expanded, in any mode.
///
/// Borrows the store immutably, so any number of iterators can walk the
/// same finished graph at once.
pub struct ForwardTraceIterator<'a, F: EdgeFilter + ?Sized = AllEdges> {
    mp: &'a Metaprogram,
    filter: &'a F,
    max_depth: Option<usize>,
    collapse: bool,
    to_visit: Vec<(Option<EdgeId>, usize)>,
    discovered: Vec<bool>,
    path: Vec<VertexId>,
    on_path: Vec<bool>,
}

impl<'a, F: EdgeFilter + ?Sized> ForwardTraceIterator<'a, F> {
    /// Walks from `start` (`None` is the root).
    pub fn new(
        mp: &'a Metaprogram,
        start: Option<EdgeId>,
        max_depth: Option<usize>,
        filter: &'a F,
    ) -> Self {
        Self::seeded(mp, start, max_depth, filter, mp.discovered().to_vec())
    }

    /// Walks from where evaluation is paused.
    pub fn from_current(mp: &'a Metaprogram, max_depth: Option<usize>, filter: &'a F) -> Self {
        Self::new(mp, mp.current_edge(), max_depth, filter)
    }

    /// Walks with discovery marks carried over from an earlier traversal.
    pub(crate) fn seeded(
        mp: &'a Metaprogram,
        start: Option<EdgeId>,
        max_depth: Option<usize>,
        filter: &'a F,
        mut discovered: Vec<bool>,
    ) -> Self {
        discovered.resize(mp.vertex_count(), false);
        Self {
            mp,
            filter,
            max_depth,
            collapse: mp.mode() != Mode::Full,
            to_visit: vec![(start, 0)],
            discovered,
            path: Vec::new(),
            on_path: vec![false; mp.vertex_count()],
        }
    }

    pub fn is_finished(&self) -> bool {
        self.to_visit.is_empty()
    }

    fn within_depth(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }

    fn unwind_to(&mut self, depth: usize) {
        while self.path.len() > depth {
            if let Some(vertex) = self.path.pop() {
                self.on_path[vertex.index()] = false;
            }
        }
    }
}

impl<F: EdgeFilter + ?Sized> Iterator for ForwardTraceIterator<'_, F> {
    type Item = CallGraphNode;

    fn next(&mut self) -> Option<CallGraphNode> {
        let (edge, depth) = self.to_visit.pop()?;
        self.unwind_to(depth);

        let vertex = self.mp.vertex_of(edge);
        let seen = self.discovered[vertex.index()] || self.on_path[vertex.index()];
        let within_depth = self.within_depth(depth);

        let children = if seen || !within_depth {
            0
        } else {
            self.mp.enabled_out_degree(vertex, self.filter)
        };

        if !seen {
            if self.collapse {
                self.discovered[vertex.index()] = true;
            }
            if within_depth {
                let edges = self.mp.filtered_out_edges(vertex, self.filter);
                self.to_visit
                    .extend(edges.into_iter().rev().map(|edge| (Some(edge), depth + 1)));
                self.path.push(vertex);
                self.on_path[vertex.index()] = true;
            }
        }

        Some(CallGraphNode::new(self.mp.frame_of(edge), depth, children))
    }
}

impl<F: EdgeFilter + ?Sized> FusedIterator for ForwardTraceIterator<'_, F> {}
