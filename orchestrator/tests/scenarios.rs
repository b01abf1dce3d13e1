//! The seed scenarios from spec.md §8, driven end-to-end through the
//! `Orchestrator`'s event bus rather than calling plugin internals
//! directly.

use kif_bus::{Event, EventKind, QueryParameters, QueryType};
use kif_orchestrator::Orchestrator;
use kif_term::parse_one;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

fn has_instance(orch: &Orchestrator, pattern: &str) -> bool {
    let term = parse_one(pattern).unwrap();
    !orch.ctx.cognition.global.index().instances_of(&term).is_empty()
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_1_modus_ponens() {
    let orch = Orchestrator::new(1000);
    orch.submit_input(
        parse_one("(=> (instance ?x Dog) (attribute ?x Canine))").unwrap(),
        "user",
        None,
    );
    orch.submit_input(parse_one("(instance Rex Dog)").unwrap(), "user", None);
    settle().await;
    assert!(has_instance(&orch, "(attribute Rex Canine)"));

    let pattern = parse_one("(attribute Rex Canine)").unwrap();
    let ids = orch.ctx.cognition.global.index().instances_of(&pattern);
    let id = ids.iter().next().unwrap();
    let assertion = orch.ctx.cognition.tms().get(id).unwrap();
    assert_eq!(assertion.derivation_depth, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_2_oriented_rewrite() {
    let orch = Orchestrator::new(1000);
    orch.submit_input(parse_one("(= (father Bob) Alice)").unwrap(), "user", None);
    orch.submit_input(parse_one("(knows Carol (father Bob))").unwrap(), "user", None);
    settle().await;
    assert!(has_instance(&orch, "(knows Carol Alice)"));
    assert!(has_instance(&orch, "(knows Carol (father Bob))"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_3_skolemization() {
    let orch = Orchestrator::new(1000);
    orch.submit_input(
        parse_one("(exists (?k) (and (instance ?k Kitten) (owner ?k Mary)))").unwrap(),
        "user",
        None,
    );
    settle().await;
    assert!(has_instance(&orch, "(instance skc_k_0 Kitten)"));
    assert!(has_instance(&orch, "(owner skc_k_0 Mary)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_4_cascading_retraction() {
    let orch = Orchestrator::new(1000);
    orch.submit_input(parse_one("(=> (likes ?p Cats) (happy ?p))").unwrap(), "user", None);
    orch.submit_input(parse_one("(likes Ana Cats)").unwrap(), "user", None);
    settle().await;
    assert!(has_instance(&orch, "(happy Ana)"));

    let a_pattern = parse_one("(likes Ana Cats)").unwrap();
    let a_id = orch
        .ctx
        .cognition
        .global
        .index()
        .instances_of(&a_pattern)
        .into_iter()
        .next()
        .unwrap();

    orch.submit_retraction(a_id, kif_bus::RetractionType::ById, "user", None);
    settle().await;

    let b_pattern = parse_one("(happy Ana)").unwrap();
    let b_id = orch
        .ctx
        .cognition
        .global
        .index()
        .generalisations_of(&b_pattern)
        .into_iter()
        .chain(orch.ctx.cognition.global.index().instances_of(&b_pattern))
        .next();
    if let Some(id) = b_id {
        assert!(!orch.ctx.cognition.tms().is_active(&id));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_5_universal_instantiation() {
    let orch = Orchestrator::new(1000);
    orch.submit_input(
        parse_one("(forall (?x) (=> (instance ?x Bird) (can ?x Fly)))").unwrap(),
        "user",
        None,
    );
    orch.submit_input(parse_one("(instance Tweety Bird)").unwrap(), "user", None);
    settle().await;
    assert!(has_instance(&orch, "(can Tweety Fly)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_6_backward_chaining_with_operator() {
    let orch = Orchestrator::new(1000);
    orch.submit_input(
        parse_one("(=> (and (age ?p ?a) (< 17 ?a)) (adult ?p))").unwrap(),
        "user",
        None,
    );
    orch.submit_input(parse_one("(age Mia 20)").unwrap(), "user", None);
    settle().await;

    let answered = Arc::new(Mutex::new(None));
    let got_it = Arc::new(AtomicBool::new(false));
    {
        let answered = answered.clone();
        let got_it = got_it.clone();
        orch.bus.on(
            EventKind::QueryResult,
            Arc::new(move |event| {
                if let Event::QueryResult { answer } = event {
                    *answered.lock().unwrap() = Some(answer);
                    got_it.store(true, Ordering::SeqCst);
                }
            }),
        );
    }

    let goal = parse_one("(adult ?who)").unwrap();
    orch.submit_query(QueryType::AskBindings, goal, None, QueryParameters::default());
    settle().await;

    assert!(got_it.load(Ordering::SeqCst));
    let answer = answered.lock().unwrap().clone().unwrap();
    assert_eq!(answer.status, kif_bus::AnswerStatus::Success);
    assert_eq!(answer.bindings.len(), 1);
    let binding = &answer.bindings[0];
    assert_eq!(binding.len(), 1);
    assert_eq!(binding.get("?who").map(|t| t.to_kif()), Some("Mia".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn universal_instantiation_respects_depth_cap() {
    let orch = Orchestrator::new(1000);
    orch.submit_input(
        parse_one("(forall (?x) (=> (instance ?x Bird) (can ?x Fly)))").unwrap(),
        "user",
        None,
    );
    orch.submit_input(parse_one("(instance Tweety Bird)").unwrap(), "user", None);
    settle().await;
    assert!(has_instance(&orch, "(can Tweety Fly)"));
    let pattern = parse_one("(can Tweety Fly)").unwrap();
    let ids = orch.ctx.cognition.global.index().instances_of(&pattern);
    let assertion = orch.ctx.cognition.tms().get(ids.iter().next().unwrap()).unwrap();
    assert_eq!(assertion.derivation_depth, 1);
}
