use facet::Facet;
use std::fmt;

use crate::{EventKind, FileLocation, MetaprogramNode};

/// What the display layer shows for one step of a metaprogram.
///
/// The root frame has no event kind and no point of event; every other
/// frame is built from the edge that activated its node.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct Frame {
    pub node: MetaprogramNode,
    pub source_location: FileLocation,
    pub point_of_event: Option<FileLocation>,
    pub kind: Option<EventKind>,
    /// Seconds between begin and end, once the end event has arrived.
    pub time_taken: Option<f64>,
}

impl Frame {
    pub fn root(node: MetaprogramNode, source_location: FileLocation) -> Self {
        Self {
            node,
            source_location,
            point_of_event: None,
            kind: None,
            time_taken: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.kind.is_none()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)?;
        if let Some(kind) = self.kind {
            write!(f, " ({kind})")?;
        }
        Ok(())
    }
}

/// One row of a forward trace: a frame, its depth below the starting
/// point and how many children it will expand into (0 when collapsed).
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct CallGraphNode {
    pub frame: Frame,
    pub depth: usize,
    pub children: usize,
}

impl CallGraphNode {
    pub fn new(frame: Frame, depth: usize, children: usize) -> Self {
        Self {
            frame,
            depth,
            children,
        }
    }
}
