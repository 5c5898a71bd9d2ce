use super::*;
use mdb_types::{
    CallGraphNode, CppCode, EdgeId, EvaluationResult, EventKind, FileLocation, IncludeArgument,
    Mode, TraceEvent, Type,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn loc(line: u32) -> FileLocation {
    FileLocation::new("fib.cpp", line, 1)
}

fn builder(mode: Mode) -> MetaprogramBuilder {
    init_tracing();
    MetaprogramBuilder::new(mode, CppCode::new("fib<10>::value"), loc(20))
}

fn begin(name: &str, timestamp: f64) -> TraceEvent {
    TraceEvent::begin_template(name, loc(20), loc(2), timestamp)
}

fn end(timestamp: f64) -> TraceEvent {
    TraceEvent::end_template(timestamp)
}

fn evaluation_end(ty: &str) -> TraceEvent {
    TraceEvent::EvaluationEnd {
        result: EvaluationResult::Type(Type::new(ty)),
    }
}

fn fib10(mode: Mode) -> Metaprogram {
    let mut b = builder(mode);
    b.replay([
        begin("fib<10>", 0.0),
        begin("fib<9>", 1.0),
        end(2.0),
        begin("fib<8>", 3.0),
        end(6.0),
        end(7.0),
        evaluation_end("int_<55>"),
    ])
    .expect("well-formed trace");
    b.finish().expect("finished")
}

fn shape(nodes: impl Iterator<Item = CallGraphNode>) -> Vec<(String, usize, usize)> {
    nodes
        .map(|node| (node.frame.node.to_string(), node.depth, node.children))
        .collect()
}

fn row(name: &str, depth: usize, children: usize) -> (String, usize, usize) {
    (name.to_owned(), depth, children)
}

fn render(nodes: impl Iterator<Item = CallGraphNode>) -> String {
    nodes
        .map(|node| format!("{}{}", "  ".repeat(node.depth), node.frame))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Building ────────────────────────────────────────────

#[test]
fn fib_trace_builds_three_activations() {
    let mp = fib10(Mode::Full);

    // root + fib<10>, fib<9>, fib<8>
    assert_eq!(mp.vertex_count(), 4);
    assert_eq!(mp.edge_count(), 3);

    let root = mp.root_vertex();
    let [fib10] = mp.out_edges(root) else {
        panic!("root must have exactly one activation");
    };
    let fib10_vertex = mp.target(*fib10);
    let children: Vec<_> = mp
        .out_edges(fib10_vertex)
        .iter()
        .map(|&edge| mp.vertex(mp.target(edge)).node.to_string())
        .collect();
    assert_eq!(children, vec!["fib<9>", "fib<8>"]);
    assert!(mp.edges().all(|(_, edge)| !edge.is_open()));

    assert_eq!(
        mp.result(),
        Some(&EvaluationResult::Type(Type::new("int_<55>")))
    );
    assert_eq!(mp.current_edge(), None);
}

#[test]
fn fib_trace_walks_in_activation_order() {
    let mp = fib10(Mode::Full);
    let fib10 = mp.out_edges(mp.root_vertex())[0];

    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, Some(fib10), None, &AllEdges)),
        vec![row("fib<10>", 0, 2), row("fib<9>", 1, 0), row("fib<8>", 1, 0)]
    );
    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges)),
        vec![
            row("fib<10>::value", 0, 1),
            row("fib<10>", 1, 2),
            row("fib<9>", 2, 0),
            row("fib<8>", 2, 0),
        ]
    );
}

#[test]
fn repeated_activations_share_a_vertex() {
    let mut b = builder(Mode::Normal);
    b.replay([
        begin("fib<2>", 0.0),
        begin("fib<1>", 1.0),
        end(2.0),
        begin("fib<0>", 3.0),
        end(4.0),
        end(5.0),
        begin("fib<1>", 6.0),
        end(7.0),
    ])
    .expect("well-formed trace");
    // same type, different location: a different vertex
    b.handle(TraceEvent::begin_template("fib<1>", loc(30), loc(3), 8.0))
        .expect("begin");
    b.handle(end(9.0)).expect("end");

    let mp = b.metaprogram();
    assert_eq!(mp.vertex_count(), 1 + 4);
    assert_eq!(mp.edge_count(), 5);

    let shared = mp
        .vertices()
        .find(|(_, vertex)| vertex.node.to_string() == "fib<1>" && vertex.source_location == loc(2))
        .map(|(id, _)| id)
        .expect("fib<1> vertex");
    let sources: Vec<_> = mp
        .in_edges(shared)
        .iter()
        .map(|&edge| mp.vertex(mp.source(edge)).node.to_string())
        .collect();
    assert_eq!(sources, vec!["fib<2>", "fib<10>::value"]);
}

#[test]
fn edges_are_only_created_by_begin_events() {
    let mut b = builder(Mode::Normal);
    b.handle(begin("fib<1>", 0.0)).expect("begin");
    b.handle_error_directive("nope".to_owned(), loc(4), 0.5)
        .expect("error directive");
    b.handle_line_directive(CppCode::new("12"), loc(5), loc(5), 0.6)
        .expect("line directive");
    b.handle(end(1.0)).expect("end");

    let mp = b.metaprogram();
    assert_eq!(mp.edge_count(), 1);
    let edge = EdgeId::FIRST;
    let kinds: Vec<_> = mp.annotations(Some(edge)).iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![EventKind::ErrorDirective, EventKind::LineDirective]);
    assert!(mp.annotations(None).is_empty());
}

// ── Malformed traces ────────────────────────────────────

#[test]
fn mismatched_end_leaves_the_graph_untouched() {
    let mut b = builder(Mode::Normal);
    b.handle_macro_expansion_begin(CppCode::new("FIB"), None, loc(20), loc(5), 0.0)
        .expect("begin");

    let err = b.handle(end(1.0)).expect_err("a macro expansion is open");
    assert_eq!(
        err,
        MalformedTraceError::KindMismatch {
            expected: Activation::Template,
            found: Some(EventKind::MacroExpansion),
        }
    );
    assert_eq!(b.depth(), 1);
    assert_eq!(b.metaprogram().edge_count(), 1);
    assert!(b.metaprogram().edge(EdgeId::FIRST).is_open());

    assert_eq!(
        b.handle_macro_expansion_end(2.0),
        Err(MalformedTraceError::Aborted)
    );
    assert!(matches!(b.finish(), Err(MalformedTraceError::Aborted)));
}

#[test]
fn end_without_begin_is_rejected() {
    let mut b = builder(Mode::Normal);
    assert_eq!(
        b.handle_include_end(0.0),
        Err(MalformedTraceError::UnmatchedEnd {
            expected: Activation::Include
        })
    );
    assert_eq!(b.metaprogram().edge_count(), 0);
}

#[test]
fn evaluation_end_requires_a_closed_stack() {
    let mut b = builder(Mode::Normal);
    b.handle(begin("fib<10>", 0.0)).expect("begin");
    assert_eq!(
        b.handle(evaluation_end("int_<55>")),
        Err(MalformedTraceError::UnclosedActivations { open: 1 })
    );
    assert!(b.metaprogram().result().is_none());
}

#[test]
fn evaluation_end_is_accepted_once() {
    let mut b = builder(Mode::Normal);
    b.handle(evaluation_end("int_<0>")).expect("first result");
    assert_eq!(
        b.handle(evaluation_end("int_<1>")),
        Err(MalformedTraceError::ResultAlreadySet)
    );
    assert_eq!(
        b.metaprogram().result(),
        Some(&EvaluationResult::Type(Type::new("int_<0>")))
    );
}

#[test]
fn events_after_evaluation_end_are_rejected() {
    let mut b = builder(Mode::Normal);
    b.handle(evaluation_end("int_<0>")).expect("result");
    assert_eq!(
        b.handle(begin("fib<0>", 1.0)),
        Err(MalformedTraceError::AlreadyFinished {
            event: "begin_template"
        })
    );
    assert!(b.is_failed());
}

// ── Traversal ───────────────────────────────────────────

/// root -> a -> c -> d, root -> b -> c
fn shared_subtree(mode: Mode) -> Metaprogram {
    let mut b = builder(mode);
    b.replay([
        begin("a", 0.0),
        begin("c", 1.0),
        begin("d", 2.0),
        end(3.0),
        end(4.0),
        end(5.0),
        begin("b", 6.0),
        begin("c", 7.0),
        begin("d", 8.0),
        end(9.0),
        end(10.0),
        end(11.0),
        evaluation_end("int_<0>"),
    ])
    .expect("well-formed trace");
    b.finish().expect("finished")
}

#[test]
fn normal_mode_collapses_repeated_subtrees() {
    let mp = shared_subtree(Mode::Normal);
    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges)),
        vec![
            row("fib<10>::value", 0, 2),
            row("a", 1, 1),
            row("c", 2, 2),
            row("d", 3, 0),
            row("d", 3, 0),
            row("b", 1, 1),
            row("c", 2, 0),
        ]
    );
}

#[test]
fn full_mode_repeats_shared_subtrees() {
    let mp = shared_subtree(Mode::Full);
    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges)),
        vec![
            row("fib<10>::value", 0, 2),
            row("a", 1, 1),
            row("c", 2, 2),
            row("d", 3, 0),
            row("d", 3, 0),
            row("b", 1, 1),
            row("c", 2, 2),
            row("d", 3, 0),
            row("d", 3, 0),
        ]
    );
}

/// root -> a -> c -> d, root -> b -> c, the second c opening nothing
fn revisited_leaf_activation(mode: Mode) -> Metaprogram {
    let mut b = builder(mode);
    b.replay([
        begin("a", 0.0),
        begin("c", 1.0),
        begin("d", 2.0),
        end(3.0),
        end(4.0),
        end(5.0),
        begin("b", 6.0),
        begin("c", 7.0),
        end(8.0),
        end(9.0),
        evaluation_end("int_<0>"),
    ])
    .expect("well-formed trace");
    b.finish().expect("finished")
}

#[test]
fn normal_mode_collapses_a_revisited_vertex() {
    let mp = revisited_leaf_activation(Mode::Normal);
    // c is one vertex with a single out-edge
    assert_eq!(mp.vertex_count(), 5);
    assert_eq!(mp.edge_count(), 5);
    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges)),
        vec![
            row("fib<10>::value", 0, 2),
            row("a", 1, 1),
            row("c", 2, 1),
            row("d", 3, 0),
            row("b", 1, 1),
            row("c", 2, 0),
        ]
    );
}

#[test]
fn full_mode_expands_a_revisited_vertex_again() {
    let mp = revisited_leaf_activation(Mode::Full);
    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges)),
        vec![
            row("fib<10>::value", 0, 2),
            row("a", 1, 1),
            row("c", 2, 1),
            row("d", 3, 0),
            row("b", 1, 1),
            row("c", 2, 1),
            row("d", 3, 0),
        ]
    );
}

#[test]
fn activation_of_the_root_key_does_not_loop() {
    let mut b = builder(Mode::Full);
    b.handle_preprocessing_condition_begin(CppCode::new("fib<10>::value"), loc(20), 0.0)
        .expect("condition");
    b.handle_preprocessing_condition_end(true, 1.0)
        .expect("condition end");
    b.handle(evaluation_end("int_<55>")).expect("result");
    let mp = b.finish().expect("finished");
    assert_eq!(mp.vertex_count(), 1);

    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges)),
        vec![row("fib<10>::value", 0, 1), row("fib<10>::value", 1, 0)]
    );

    let mut cursor = TraceCursor::new(&mp, &AllEdges);
    assert!(cursor.step().is_some());
    assert_eq!(cursor.depth(), 1);
    assert_eq!(cursor.step(), None);
    assert!(cursor.is_finished());
}

#[test]
fn traversals_do_not_touch_the_store() {
    let mp = shared_subtree(Mode::Normal);
    let first = shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges));
    let second = shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges));
    assert_eq!(first, second);
    assert!(mp.discovered().iter().all(|&seen| !seen));
}

#[test]
fn depth_bound_hides_deeper_activations() {
    let mp = fib10(Mode::Normal);
    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, None, Some(1), &AllEdges)),
        vec![row("fib<10>::value", 0, 1), row("fib<10>", 1, 0)]
    );
}

#[test]
fn profile_mode_shows_slowest_first() {
    let mp = fib10(Mode::Profile);
    let fib10 = mp.out_edges(mp.root_vertex())[0];
    assert_eq!(
        shape(ForwardTraceIterator::new(&mp, Some(fib10), None, &AllEdges)),
        vec![row("fib<10>", 0, 2), row("fib<8>", 1, 0), row("fib<9>", 1, 0)]
    );
}

#[test]
fn traversal_starts_at_the_pause_point() {
    let mut b = builder(Mode::Normal);
    b.replay([begin("fib<10>", 0.0), begin("fib<9>", 1.0)])
        .expect("begin");
    b.pause();

    let mp = b.metaprogram();
    let nodes: Vec<_> = ForwardTraceIterator::from_current(mp, None, &AllEdges).collect();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].frame.node.to_string(), "fib<9>");
    assert_eq!(nodes[0].frame.time_taken, None);
}

#[test]
fn iterators_share_a_finished_store_across_threads() {
    let mp = shared_subtree(Mode::Full);
    let expected = shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges));

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| shape(ForwardTraceIterator::new(&mp, None, None, &AllEdges))))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("walker thread panicked"), expected);
        }
    });
}

#[test]
fn rendered_mixed_trace() {
    let mut b = builder(Mode::Normal);
    b.handle_include_begin(IncludeArgument::sys("vector"), loc(1), 0.0)
        .expect("include");
    b.handle_include_end(0.5).expect("include end");
    b.handle_macro_expansion_begin(
        CppCode::new("FIB"),
        Some(vec![CppCode::new("10")]),
        loc(20),
        loc(5),
        1.0,
    )
    .expect("macro");
    b.handle_expanded_code(CppCode::new("fib<10>::value"), loc(20), 1.1)
        .expect("expanded code");
    b.handle_macro_expansion_end(1.2).expect("macro end");
    b.replay([
        begin("fib<10>", 2.0),
        begin("fib<9>", 3.0),
        end(4.0),
        begin("fib<8>", 5.0),
        end(6.0),
        end(7.0),
        evaluation_end("int_<55>"),
    ])
    .expect("templates");
    let mp = b.finish().expect("finished");

    insta::assert_snapshot!(render(ForwardTraceIterator::new(&mp, None, None, &AllEdges)), @r"
    fib<10>::value
      <vector> (SysInclude)
      FIB(10) (MacroExpansion)
      fib<10> (TemplateInstantiation)
        fib<9> (TemplateInstantiation)
        fib<8> (TemplateInstantiation)
    ");

    let templates = MdbConfig::default().edge_filter();
    insta::assert_snapshot!(render(ForwardTraceIterator::new(&mp, None, None, &templates)), @r"
    fib<10>::value
      fib<10> (TemplateInstantiation)
        fib<9> (TemplateInstantiation)
        fib<8> (TemplateInstantiation)
    ");
}
