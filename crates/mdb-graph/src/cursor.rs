//! Debugger session position over a finished graph.
//!
//! A cursor walks the same pre-order as [`ForwardTraceIterator`], one
//! activation per step. Each move is recorded as a small undo entry (what
//! was popped, pushed and marked) so stepping back costs no more memory
//! than stepping forward did.

use mdb_types::{EdgeId, Frame, Mode, VertexId};
use tracing::debug;

use crate::filter::{AllEdges, EdgeFilter};
use crate::forward_trace::ForwardTraceIterator;
use crate::metaprogram::Metaprogram;

#[derive(Debug, Clone, PartialEq)]
struct Position {
    current: Option<EdgeId>,
    depth: usize,
    /// Activations from the root to `current`, outermost first.
    path: Vec<EdgeId>,
    to_visit: Vec<(EdgeId, usize)>,
    discovered: Vec<bool>,
    finished: bool,
}

/// How to reverse one call to `advance`.
#[derive(Debug)]
struct Undo {
    /// `None` when the move ran off the end of the trace.
    popped: Option<(EdgeId, usize)>,
    current: Option<EdgeId>,
    depth: usize,
    /// Path suffix dropped while moving.
    truncated: Vec<EdgeId>,
    pushed: usize,
    marked: Option<VertexId>,
}

pub struct TraceCursor<'a, F: EdgeFilter + ?Sized = AllEdges> {
    mp: &'a Metaprogram,
    filter: &'a F,
    position: Position,
    undo_log: Vec<Undo>,
    /// Length of `undo_log` before each `step`/`step_over`.
    history: Vec<usize>,
}

impl<'a, F: EdgeFilter + ?Sized> TraceCursor<'a, F> {
    /// A cursor standing on the root.
    pub fn new(mp: &'a Metaprogram, filter: &'a F) -> Self {
        let position = Self::start(mp, filter);
        Self {
            mp,
            filter,
            position,
            undo_log: Vec::new(),
            history: Vec::new(),
        }
    }

    fn start(mp: &Metaprogram, filter: &F) -> Position {
        let mut position = Position {
            current: None,
            depth: 0,
            path: Vec::new(),
            to_visit: Vec::new(),
            discovered: mp.discovered().to_vec(),
            finished: false,
        };
        position.discovered.resize(mp.vertex_count(), false);
        expand(mp, filter, &mut position, mp.root_vertex());
        position
    }

    /// Moves to the next activation. `None` once the trace is exhausted.
    pub fn step(&mut self) -> Option<Frame> {
        if self.position.finished {
            return None;
        }
        self.history.push(self.undo_log.len());
        self.advance();
        debug!(depth = self.position.depth, finished = self.position.finished, "step");
        self.current_frame()
    }

    /// Moves past everything the current activation caused.
    pub fn step_over(&mut self) -> Option<Frame> {
        if self.position.finished {
            return None;
        }
        self.history.push(self.undo_log.len());
        let depth = self.position.depth;
        self.advance();
        while !self.position.finished && self.position.depth > depth {
            self.advance();
        }
        debug!(depth = self.position.depth, finished = self.position.finished, "step over");
        self.current_frame()
    }

    /// Undoes the last `step` or `step_over`. Returns `false` at the start.
    pub fn step_back(&mut self) -> bool {
        let Some(mark) = self.history.pop() else {
            return false;
        };
        while self.undo_log.len() > mark {
            if let Some(undo) = self.undo_log.pop() {
                self.retreat(undo);
            }
        }
        debug!(depth = self.position.depth, "step back");
        true
    }

    pub fn reset(&mut self) {
        self.position = Self::start(self.mp, self.filter);
        self.undo_log.clear();
        self.history.clear();
    }

    pub fn is_at_start(&self) -> bool {
        self.history.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.position.finished
    }

    pub fn depth(&self) -> usize {
        self.position.depth
    }

    /// `None` after the last activation.
    pub fn current_frame(&self) -> Option<Frame> {
        if self.position.finished {
            None
        } else {
            Some(self.mp.frame_of(self.position.current))
        }
    }

    /// Innermost frame first, the root last.
    pub fn backtrace(&self) -> Vec<Frame> {
        self.position
            .path
            .iter()
            .rev()
            .map(|&edge| self.mp.to_frame(edge))
            .chain(std::iter::once(self.mp.root_frame()))
            .collect()
    }

    /// The subtree under the current position, collapsing what this
    /// session has already shown.
    pub fn forward_trace(&self, max_depth: Option<usize>) -> ForwardTraceIterator<'a, F> {
        if self.position.finished {
            return ForwardTraceIterator::new(self.mp, None, max_depth, self.filter);
        }
        let mut discovered = self.position.discovered.clone();
        discovered[self.mp.vertex_of(self.position.current).index()] = false;
        ForwardTraceIterator::seeded(
            self.mp,
            self.position.current,
            max_depth,
            self.filter,
            discovered,
        )
    }

    fn advance(&mut self) {
        let position = &mut self.position;
        let mut undo = Undo {
            popped: position.to_visit.pop(),
            current: position.current,
            depth: position.depth,
            truncated: Vec::new(),
            pushed: 0,
            marked: None,
        };
        let Some((edge, depth)) = undo.popped else {
            undo.truncated = std::mem::take(&mut position.path);
            position.finished = true;
            position.current = None;
            position.depth = 0;
            self.undo_log.push(undo);
            return;
        };

        undo.truncated = position.path.split_off(depth.saturating_sub(1).min(position.path.len()));
        let vertex = self.mp.target(edge);
        let cyclic = vertex == self.mp.root_vertex()
            || position
                .path
                .iter()
                .any(|&ancestor| self.mp.target(ancestor) == vertex);
        position.path.push(edge);
        position.current = Some(edge);
        position.depth = depth;

        if !cyclic {
            (undo.pushed, undo.marked) = expand(self.mp, self.filter, position, vertex);
        }
        self.undo_log.push(undo);
    }

    fn retreat(&mut self, undo: Undo) {
        let position = &mut self.position;
        let kept = position.to_visit.len() - undo.pushed;
        position.to_visit.truncate(kept);
        if let Some(vertex) = undo.marked {
            position.discovered[vertex.index()] = false;
        }
        if let Some(entry) = undo.popped {
            position.path.pop();
            position.to_visit.push(entry);
        }
        position.path.extend(undo.truncated);
        position.current = undo.current;
        position.depth = undo.depth;
        position.finished = false;
    }
}

/// Queues the children of `vertex` unless it was already shown. Returns
/// how many entries were queued and the vertex, if it got marked.
fn expand<F: EdgeFilter + ?Sized>(
    mp: &Metaprogram,
    filter: &F,
    position: &mut Position,
    vertex: VertexId,
) -> (usize, Option<VertexId>) {
    if position.discovered[vertex.index()] {
        return (0, None);
    }
    let marked = if mp.mode() != Mode::Full {
        position.discovered[vertex.index()] = true;
        Some(vertex)
    } else {
        None
    };
    let depth = position.depth + 1;
    let edges = mp.filtered_out_edges(vertex, filter);
    let pushed = edges.len();
    position
        .to_visit
        .extend(edges.into_iter().rev().map(|edge| (edge, depth)));
    (pushed, marked)
}
