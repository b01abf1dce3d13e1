//! `ExternalInput` handling: dispatches a top-level term by operator and
//! commits the resulting assertion(s)/rule(s) (spec §4.8).

use kif_bus::EventBus;
use kif_kb::{AssertionType, PotentialAssertion};
use kif_reasoner::{add_rule_from_form, binder_var_names, equality_flags, ReasonerContext};
use kif_term::{reserved, skolemize, Bindings, SkolemCounter, Term};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Input priority: `base / (1 + weight)`, base 15 for LLM sources, 10
/// otherwise (spec §4.8).
pub fn input_priority(term: &Term, is_llm_source: bool) -> f64 {
    let base = if is_llm_source { 15.0 } else { 10.0 };
    base / (1.0 + term.weight() as f64)
}

/// Commits `kif`, splitting a top-level `(and ...)` into one commit per
/// conjunct (spec §8 scenario 3: Skolemizing `(exists (?k) (and A B))`
/// yields two separate ground assertions).
fn commit_split(
    ctx: &ReasonerContext,
    bus: &EventBus,
    kb_id: &str,
    kif: Term,
    priority: f64,
    source_note_id: Option<String>,
) {
    if kif.operator() == Some("and") {
        if let Some(items) = kif.as_list() {
            for conjunct in &items[1..] {
                commit_split(ctx, bus, kb_id, conjunct.clone(), priority, source_note_id.clone());
            }
            return;
        }
    }
    let (negated, is_equality, is_oriented_equality) = equality_flags(&kif);
    let potential = PotentialAssertion {
        kif,
        priority,
        source_note_id,
        justification_ids: BTreeSet::new(),
        assertion_type: AssertionType::Ground,
        is_equality,
        is_oriented_equality,
        negated,
        quantified_vars: Vec::new(),
        derivation_depth: 0,
    };
    if let Err(e) = ctx.commit_and_publish(bus, kb_id, potential) {
        debug!(error = %e, "external input commit rejected");
    }
}

/// Handles one `ExternalInput` (spec §4.8). `is_llm_source` selects the
/// input-priority base.
pub fn handle_external_input(
    ctx: &ReasonerContext,
    skolem: &SkolemCounter,
    bus: &EventBus,
    term: &Term,
    source_id: &str,
    target_note_id: Option<&str>,
    is_llm_source: bool,
) {
    let Some(items) = term.as_list() else {
        warn!(%term, source_id, "ignoring non-list external input");
        return;
    };
    let kb_id = target_note_id.unwrap_or(reserved::GLOBAL_KB_ID).to_string();
    let priority = input_priority(term, is_llm_source);

    match term.operator() {
        Some("=>") | Some("<=>") => {
            if items.len() != 3 {
                warn!(%term, "rule input has wrong arity");
                return;
            }
            add_rule_from_form(ctx, bus, term, priority);
        }
        Some("exists") => {
            if items.len() != 3 {
                warn!(%term, "'exists' input has wrong arity");
                return;
            }
            let skolemized = skolemize(&items[1], &items[2], &Bindings::new(), skolem);
            commit_split(ctx, bus, &kb_id, skolemized, priority, target_note_id.map(str::to_string));
        }
        Some("forall") => {
            if items.len() != 3 {
                warn!(%term, "'forall' input has wrong arity");
                return;
            }
            let body = &items[2];
            if matches!(body.operator(), Some("=>") | Some("<=>")) {
                add_rule_from_form(ctx, bus, body, priority);
            } else {
                let potential = PotentialAssertion {
                    kif: term.clone(),
                    priority,
                    source_note_id: target_note_id.map(str::to_string),
                    justification_ids: BTreeSet::new(),
                    assertion_type: AssertionType::Universal,
                    is_equality: false,
                    is_oriented_equality: false,
                    negated: false,
                    quantified_vars: binder_var_names(&items[1]),
                    derivation_depth: 0,
                };
                if let Err(e) = ctx.commit_and_publish(bus, &kb_id, potential) {
                    debug!(error = %e, "universal input commit rejected");
                }
            }
        }
        Some("not") => {
            if items.len() != 2 {
                warn!(%term, "'not' input has wrong arity");
                return;
            }
            if !items[1].is_ground() {
                warn!(%term, "rejecting non-ground plain assertion");
                return;
            }
            commit_split(ctx, bus, &kb_id, term.clone(), priority, target_note_id.map(str::to_string));
        }
        Some("=") => {
            if !term.is_ground() {
                warn!(%term, "rejecting non-ground plain assertion");
                return;
            }
            commit_split(ctx, bus, &kb_id, term.clone(), priority, target_note_id.map(str::to_string));
        }
        _ => {
            if !term.is_ground() {
                warn!(%term, "rejecting non-ground plain assertion");
                return;
            }
            commit_split(ctx, bus, &kb_id, term.clone(), priority, target_note_id.map(str::to_string));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kif_bus::EventBus;
    use kif_kb::Cognition;
    use kif_term::parse_one;
    use std::sync::Arc;

    fn fresh() -> (ReasonerContext, SkolemCounter, EventBus) {
        (
            ReasonerContext::new(Arc::new(Cognition::new(1000))),
            SkolemCounter::new(),
            EventBus::new(),
        )
    }

    #[test]
    fn commits_a_plain_ground_fact() {
        let (ctx, skolem, bus) = fresh();
        let term = parse_one("(instance Rex Dog)").unwrap();
        handle_external_input(&ctx, &skolem, &bus, &term, "user", None, false);
        assert_eq!(ctx.cognition.global.index().instances_of(&term).len(), 1);
    }

    #[test]
    fn rejects_non_ground_plain_assertion() {
        let (ctx, skolem, bus) = fresh();
        let term = parse_one("(instance ?x Dog)").unwrap();
        handle_external_input(&ctx, &skolem, &bus, &term, "user", None, false);
        assert!(ctx.cognition.global.index().instances_of(&term).is_empty());
    }

    #[test]
    fn exists_splits_conjunction_into_two_ground_assertions() {
        let (ctx, skolem, bus) = fresh();
        let term = parse_one("(exists (?k) (and (instance ?k Kitten) (owner ?k Mary)))").unwrap();
        handle_external_input(&ctx, &skolem, &bus, &term, "user", None, false);
        let kitten_pattern = parse_one("(instance skc_k_0 Kitten)").unwrap();
        let owner_pattern = parse_one("(owner skc_k_0 Mary)").unwrap();
        assert_eq!(ctx.cognition.global.index().instances_of(&kitten_pattern).len(), 1);
        assert_eq!(ctx.cognition.global.index().instances_of(&owner_pattern).len(), 1);
    }

    #[test]
    fn rule_input_is_added_to_the_rule_set() {
        let (ctx, skolem, bus) = fresh();
        let term = parse_one("(=> (instance ?x Dog) (attribute ?x Canine))").unwrap();
        handle_external_input(&ctx, &skolem, &bus, &term, "user", None, false);
        assert_eq!(ctx.cognition.rules().len(), 1);
    }

    #[test]
    fn biconditional_input_adds_both_directions() {
        let (ctx, skolem, bus) = fresh();
        let term = parse_one("(<=> (a ?x) (b ?x))").unwrap();
        handle_external_input(&ctx, &skolem, &bus, &term, "user", None, false);
        assert_eq!(ctx.cognition.rules().len(), 2);
    }
}
