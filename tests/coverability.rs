use pn_cover::analysis::{
    AnalysisError, CancellationToken, CoverabilityTreeBuilder, NodeStatus, ResourceLimit, analyze,
};
use pn_cover::config::AnalysisConfig;
use pn_cover::net::{
    IncidenceMatrices, IncidenceModel, Marking, Net, Place, PlaceId, Tokens, Transition, load_net,
    save_net,
};

fn two_place_cycle() -> Net {
    let mut net = Net::named("cycle");
    let p0 = net.add_place(Place::new("P0", 1));
    let p1 = net.add_place(Place::new("P1", 0));
    let t0 = net.add_transition(Transition::new("T0"));
    let t1 = net.add_transition(Transition::new("T1"));
    net.add_input_arc(p0, t0, 1);
    net.add_output_arc(t0, p1, 1);
    net.add_input_arc(p1, t1, 1);
    net.add_output_arc(t1, p0, 1);
    net
}

#[test]
fn cycle_is_a_safe_live_state_machine() {
    let outcome = analyze(
        &two_place_cycle(),
        &AnalysisConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(
        outcome.tree.markings(),
        &[Marking::from_counts([1, 0]), Marking::from_counts([0, 1])]
    );
    let classification = &outcome.classification;
    assert!(classification.bounded);
    assert!(classification.safe);
    assert!(!classification.has_deadlock);
    assert!(classification.state_machine);
    assert!(classification.marked_graph);
    assert!(classification.free_choice);
}

#[test]
fn token_generator_is_unbounded() {
    let mut net = Net::named("generator");
    let p0 = net.add_place(Place::new("P0", 1));
    let t0 = net.add_transition(Transition::new("T0"));
    net.add_input_arc(p0, t0, 1);
    net.add_output_arc(t0, p0, 2);

    let outcome = analyze(&net, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
    assert!(!outcome.classification.bounded);
    assert!(!outcome.classification.safe);
    assert!(
        outcome
            .tree
            .markings()
            .contains(&Marking::from(vec![Tokens::Omega]))
    );
    assert_eq!(
        outcome.boundness.to_string(),
        "unbounded, unbounded places: [P0], witness: [T0]"
    );
}

#[test]
fn overlapping_postsets_are_not_free_choice() {
    let mut net = Net::named("overlap");
    let p0 = net.add_place(Place::new("P0", 1));
    let p1 = net.add_place(Place::new("P1", 1));
    let p2 = net.add_place(Place::new("P2", 0));
    let ta = net.add_transition(Transition::new("Ta"));
    let tb = net.add_transition(Transition::new("Tb"));
    net.add_input_arc(p0, ta, 1);
    net.add_input_arc(p1, ta, 1);
    net.add_input_arc(p1, tb, 1);
    net.add_output_arc(ta, p2, 1);
    net.add_output_arc(tb, p2, 1);

    let outcome = analyze(&net, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
    let classification = &outcome.classification;
    assert!(!classification.free_choice);
    assert!(!classification.extended_free_choice);
    assert!(classification.simple);
    assert!(classification.extended_simple);
    assert!(classification.has_deadlock);
}

#[test]
fn matrices_and_arcs_build_the_same_tree() {
    let net = two_place_cycle();
    let from_arcs = IncidenceModel::from_net(&net).unwrap();
    let from_rows = IncidenceModel::from_matrices(
        IncidenceMatrices {
            forward: vec![vec![0, 1], vec![1, 0]],
            backward: vec![vec![1, 0], vec![0, 1]],
            inhibition: None,
            reset: None,
            reader: None,
        },
        vec![1, 0],
    )
    .unwrap();

    let left = CoverabilityTreeBuilder::new(&from_arcs).build().unwrap();
    let right = CoverabilityTreeBuilder::new(&from_rows).build().unwrap();
    assert_eq!(left.markings(), right.markings());
    assert_eq!(left.render_log(), right.render_log());
}

#[test]
fn mutex_with_inhibitor_guard() {
    // Two workers share one lock; a third transition may only fire while
    // nobody is in the critical section.
    let mut net = Net::named("mutex");
    let idle_a = net.add_place(Place::new("idle_a", 1));
    let busy_a = net.add_place(Place::new("busy_a", 0));
    let idle_b = net.add_place(Place::new("idle_b", 1));
    let busy_b = net.add_place(Place::new("busy_b", 0));
    let lock = net.add_place(Place::new("lock", 1));
    let audits = net.add_place(Place::new("audits", 0));

    let enter_a = net.add_transition(Transition::new("enter_a"));
    let leave_a = net.add_transition(Transition::new("leave_a"));
    let enter_b = net.add_transition(Transition::new("enter_b"));
    let leave_b = net.add_transition(Transition::new("leave_b"));
    let audit = net.add_transition(Transition::new("audit"));
    let clear = net.add_transition(Transition::new("clear"));

    for (idle, busy, enter, leave) in [
        (idle_a, busy_a, enter_a, leave_a),
        (idle_b, busy_b, enter_b, leave_b),
    ] {
        net.add_input_arc(idle, enter, 1);
        net.add_input_arc(lock, enter, 1);
        net.add_output_arc(enter, busy, 1);
        net.add_input_arc(busy, leave, 1);
        net.add_output_arc(leave, idle, 1);
        net.add_output_arc(leave, lock, 1);
        net.add_inhibitor_arc(busy, audit, 1);
    }
    net.add_reader_arc(lock, audit, 1);
    net.add_output_arc(audit, audits, 1);
    net.add_reset_arc(audits, clear);
    net.add_reader_arc(audits, clear, 1);

    let outcome = analyze(&net, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
    assert!(!outcome.classification.bounded);
    assert!(!outcome.classification.has_deadlock);
    assert!(!outcome.boundness.is_place_bounded(audits));
    assert!(outcome.boundness.is_place_bounded(lock));
    for marking in outcome.tree.markings() {
        let held = [busy_a, busy_b]
            .iter()
            .filter(|&&place| !marking.tokens(place).is_zero())
            .count();
        assert!(held <= 1, "mutual exclusion violated in {marking}");
    }
}

#[test]
fn heaviest_weight_fires_without_wrapping() {
    let mut net = Net::named("flood");
    let source = net.add_place(Place::new("source", 1));
    let sink = net.add_place(Place::new("sink", 0));
    let flood = net.add_transition(Transition::new("flood"));
    net.add_input_arc(source, flood, 1);
    net.add_output_arc(flood, sink, u64::MAX);

    let outcome = analyze(&net, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
    assert_eq!(
        outcome.tree.markings(),
        &[Marking::from_counts([1, 0]), Marking::from_counts([0, u64::MAX])]
    );
    assert!(outcome.classification.bounded);
    assert!(!outcome.classification.safe);
    assert!(outcome.classification.has_deadlock);
}

#[test]
fn node_ceiling_reports_resource_exhaustion() {
    let config = AnalysisConfig {
        max_nodes: Some(1),
        ..AnalysisConfig::default()
    };
    let err = analyze(&two_place_cycle(), &config, &CancellationToken::new()).unwrap_err();
    assert!(err.is_resource_exhaustion());
    assert!(matches!(
        err,
        AnalysisError::StateSpaceTooLarge {
            limit: ResourceLimit::Nodes(1),
            ..
        }
    ));
    assert!(err.to_string().starts_with("net too large"));
}

#[test]
fn deadlock_leaf_is_marked_in_the_tree() {
    let mut net = Net::named("fork");
    let p0 = net.add_place(Place::new("start", 1));
    let p1 = net.add_place(Place::new("left", 0));
    let p2 = net.add_place(Place::new("right", 0));
    let t0 = net.add_transition(Transition::new("go_left"));
    let t1 = net.add_transition(Transition::new("go_right"));
    let t2 = net.add_transition(Transition::new("back"));
    net.add_input_arc(p0, t0, 1);
    net.add_output_arc(t0, p1, 1);
    net.add_input_arc(p0, t1, 1);
    net.add_output_arc(t1, p2, 1);
    net.add_input_arc(p1, t2, 1);
    net.add_output_arc(t2, p0, 1);

    let outcome = analyze(&net, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
    let tree = &outcome.tree;
    let leaf = tree.deadlock_node().unwrap();
    assert_eq!(tree.node(leaf).unwrap().status, NodeStatus::Deadlock);
    assert_eq!(
        tree.shortest_path_to_deadlock().unwrap(),
        &[Marking::from_counts([1, 0, 0]), Marking::from_counts([0, 0, 1])]
    );
    assert_eq!(tree.firing_sequence(leaf), vec![t1]);
    assert_eq!(tree.root().marking.tokens(PlaceId::new(0)), Tokens::Finite(1));
}

#[test]
fn json_fixture_loads_and_analyzes() {
    let dir = std::env::temp_dir().join(format!("pn-cover-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("producer_consumer.json");
    std::fs::write(
        &path,
        r#"{
            "name": "producer-consumer",
            "places": [
                {"name": "ready", "tokens": 1},
                {"name": "buffer"},
                {"name": "consumed"}
            ],
            "transitions": [{"name": "produce"}, {"name": "consume"}],
            "arcs": [
                {"place": 0, "transition": 0, "direction": "PlaceToTransition"},
                {"place": 0, "transition": 0, "direction": "TransitionToPlace"},
                {"place": 1, "transition": 0, "direction": "TransitionToPlace"},
                {"place": 1, "transition": 1, "direction": "PlaceToTransition"},
                {"place": 2, "transition": 1, "direction": "TransitionToPlace", "weight": 2}
            ]
        }"#,
    )
    .unwrap();

    let net = load_net(&path).unwrap();
    assert_eq!(net.places_len(), 3);
    let outcome = analyze(&net, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
    assert!(!outcome.classification.bounded);
    assert_eq!(
        outcome.boundness.to_string(),
        "unbounded, unbounded places: [P1, P2], witness: [T0]"
    );

    let copy = dir.join("copy.ron");
    save_net(&copy, &net).unwrap();
    assert_eq!(load_net(&copy).unwrap(), net);
    std::fs::remove_dir_all(&dir).ok();
}
