//! Which out-edges a traversal may expand.
//!
//! The shell decides what is worth showing (hide memoization, show only
//! preprocessor activations, ...); traversals just ask.

use mdb_types::{EdgeId, EventCategory};

use crate::metaprogram::Metaprogram;

pub trait EdgeFilter {
    fn is_enabled(&self, mp: &Metaprogram, edge: EdgeId) -> bool;
}

/// Every edge is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEdges;

impl EdgeFilter for AllEdges {
    fn is_enabled(&self, _mp: &Metaprogram, _edge: EdgeId) -> bool {
        true
    }
}

/// Enables template or preprocessor activations (or both).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCategoryFilter {
    pub templates: bool,
    pub preprocessor: bool,
}

impl EventCategoryFilter {
    pub fn templates() -> Self {
        Self {
            templates: true,
            preprocessor: false,
        }
    }

    pub fn preprocessor() -> Self {
        Self {
            templates: false,
            preprocessor: true,
        }
    }
}

impl EdgeFilter for EventCategoryFilter {
    fn is_enabled(&self, mp: &Metaprogram, edge: EdgeId) -> bool {
        match mp.edge(edge).kind.category() {
            EventCategory::Template => self.templates,
            EventCategory::Preprocessor => self.preprocessor,
            EventCategory::Annotation => false,
        }
    }
}

impl<F> EdgeFilter for F
where
    F: Fn(&Metaprogram, EdgeId) -> bool,
{
    fn is_enabled(&self, mp: &Metaprogram, edge: EdgeId) -> bool {
        self(mp, edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdb_types::{CppCode, EventKind, FileLocation, IncludeArgument, Mode, Type};

    fn mixed() -> (Metaprogram, EdgeId, EdgeId) {
        let loc = FileLocation::new("main.cpp", 1, 1);
        let mut mp = Metaprogram::new(Mode::Normal, CppCode::new("x"), loc.clone());
        let root = mp.root_vertex();
        let t = mp
            .add_vertex(Type::new("vector<int>").into(), loc.clone())
            .expect("vertex fits");
        let i = mp
            .add_vertex(IncludeArgument::sys("vector").into(), loc.clone())
            .expect("vertex fits");
        let te = mp
            .add_edge(root, t, EventKind::TemplateInstantiation, loc.clone(), 0.0)
            .expect("edge fits");
        let ie = mp
            .add_edge(root, i, EventKind::SysInclude, loc, 0.0)
            .expect("edge fits");
        (mp, te, ie)
    }

    #[test]
    fn category_filter_selects_one_side() {
        let (mp, template_edge, include_edge) = mixed();
        let root = mp.root_vertex();

        assert_eq!(
            mp.filtered_out_edges(root, &EventCategoryFilter::templates()),
            vec![template_edge]
        );
        assert_eq!(
            mp.filtered_out_edges(root, &EventCategoryFilter::preprocessor()),
            vec![include_edge]
        );
        assert_eq!(mp.enabled_out_degree(root, &AllEdges), 2);
    }

    #[test]
    fn closures_are_filters() {
        let (mp, template_edge, _) = mixed();
        let no_includes = |mp: &Metaprogram, edge: EdgeId| !mp.edge(edge).kind.is_include();
        assert_eq!(
            mp.filtered_out_edges(mp.root_vertex(), &no_includes),
            vec![template_edge]
        );
    }
}
