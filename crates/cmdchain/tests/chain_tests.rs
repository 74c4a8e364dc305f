//! Integration tests for chain construction and matching.

use std::time::Duration;

use cmdchain::{ChainBuilder, Decision, MatchCriterion, MatchOp, Successor};

#[test]
fn match_operations_are_consistent_with_each_other() {
    let text = "-> show vlan completed";
    assert!(MatchCriterion::equals(text).is_match(text));
    assert!(MatchCriterion::starts_with("-> show").is_match(text));
    assert!(MatchCriterion::ends_with("completed").is_match(text));
    assert!(MatchCriterion::contains("show vlan").is_match(text));
    assert!(MatchCriterion::regex(r"show \w+ completed").is_match(text));

    // Every operation that accepts the full text also accepts it as a
    // substring match.
    for criterion in [
        MatchCriterion::equals(text),
        MatchCriterion::starts_with(text),
        MatchCriterion::ends_with(text),
    ] {
        assert!(criterion.is_match(text));
        assert!(MatchCriterion::contains(criterion.pattern().to_string()).is_match(text));
    }
}

#[test]
fn criterion_accessors() {
    let criterion = MatchCriterion::regex(r"\d+");
    assert_eq!(criterion.op(), MatchOp::Regex);
    assert_eq!(criterion.pattern(), r"\d+");
}

#[test]
fn chain_of_n_pairs_has_2n_nodes_linked_in_order() {
    let mut builder = ChainBuilder::new();
    for idx in 0..4 {
        builder.send(format!("cmd {idx}")).ends_with("->");
    }
    let chain = builder.build();

    assert_eq!(chain.len(), 8);
    let mut handle = chain.root();
    let mut visited = 0;
    while let Some(current) = handle {
        visited += 1;
        handle = match chain.node(current).next() {
            Successor::Fixed(next) => Some(*next),
            Successor::Terminal => None,
            Successor::Computed(_) => panic!("no computed successors in this chain"),
        };
    }
    assert_eq!(visited, 8);
}

#[test]
fn previous_links_allow_backwards_navigation() {
    let chain = ChainBuilder::new()
        .send("a")
        .contains("a")
        .send("b")
        .build();

    // Walk forward to the tail, then all the way back.
    let mut tail = chain.root().unwrap();
    while let Successor::Fixed(next) = chain.node(tail).next() {
        tail = *next;
    }
    let mut handle = Some(tail);
    let mut visited = 0;
    while let Some(current) = handle {
        visited += 1;
        handle = chain.node(current).previous();
    }
    assert_eq!(visited, 3);
}

#[test]
fn custom_junction_and_branch_round_trip() {
    let mut builder = ChainBuilder::new();
    let alt = builder.branch(|b| {
        b.send("alternate");
    });
    builder.send("probe").contains("?").custom(move |_, text| {
        if text.contains("retry") {
            Decision::Goto(alt)
        } else {
            Decision::Finish
        }
    });
    let chain = builder.build();

    let junction = chain.root().map(|root| {
        // root -> await -> junction
        let Successor::Fixed(await_node) = chain.node(root).next() else {
            panic!("expected fixed link");
        };
        let Successor::Fixed(junction) = chain.node(*await_node).next() else {
            panic!("expected fixed link");
        };
        *junction
    });
    let junction = junction.unwrap();
    let Successor::Computed(decide) = chain.node(junction).next() else {
        panic!("expected computed successor");
    };
    assert_eq!(decide(junction, "please retry"), Decision::Goto(alt));
    assert_eq!(decide(junction, "all good"), Decision::Finish);
}

#[test]
fn wait_steps_record_their_pause() {
    let chain = ChainBuilder::new()
        .send("slow command")
        .wait(Duration::from_millis(250))
        .build();
    let root = chain.root().unwrap();
    let Successor::Fixed(wait_node) = chain.node(root).next() else {
        panic!("expected fixed link");
    };
    let step = chain.node(*wait_node).step();
    assert!(step.is_wait_only());
    assert_eq!(step.wait, Some(Duration::from_millis(250)));
}
