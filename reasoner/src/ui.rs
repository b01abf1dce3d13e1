//! Universal instantiation: grounds `forall` assertions against matching
//! facts in either direction (spec §4.11).

use crate::context::ReasonerContext;
use kif_bus::EventBus;
use kif_kb::{Assertion, AssertionType, PotentialAssertion};
use kif_term::{match_pattern, subst_fully, Bindings, Term};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

fn predicate_query(predicate: &str) -> Term {
    Term::list(vec![Term::atom(predicate)])
}

/// Searches every subterm of `body` for a one-way match against `ground`,
/// keeping only bindings that cover all of `quantified` (spec §4.11
/// "Instantiation").
fn find_instantiations(body: &Term, ground: &Term, quantified: &[String]) -> Vec<Bindings> {
    let mut out = Vec::new();
    collect_instantiations(body, ground, quantified, &mut out);
    out
}

fn collect_instantiations(
    subterm: &Term,
    ground: &Term,
    quantified: &[String],
    out: &mut Vec<Bindings>,
) {
    if let Some(theta) = match_pattern(subterm, ground, &Bindings::new()) {
        let covers_all = quantified.iter().all(|name| {
            theta
                .keys()
                .any(|spur| kif_term::interner::resolve(*spur) == name)
        });
        if covers_all {
            out.push(theta);
        }
    }
    if let Some(items) = subterm.as_list() {
        for item in items {
            collect_instantiations(item, ground, quantified, out);
        }
    }
}

fn try_instantiate(
    ctx: &ReasonerContext,
    bus: &EventBus,
    kb_id: &str,
    universal: &Assertion,
    ground: &Assertion,
) {
    let Some(items) = universal.kif.as_list() else { return };
    if items.len() != 3 {
        return;
    }
    let depth = universal.derivation_depth.max(ground.derivation_depth) + 1;
    if depth > ctx.derivation_depth_cap {
        return;
    }
    let body = &items[2];
    for theta in find_instantiations(body, &ground.kif, &universal.quantified_vars) {
        let instantiated = subst_fully(body, &theta);
        if !instantiated.is_ground() || !instantiated.is_list() {
            continue;
        }
        let mut support: BTreeSet<String> = universal.justification_ids.clone();
        support.extend(ground.justification_ids.iter().cloned());
        support.insert(universal.id.clone());
        support.insert(ground.id.clone());
        let base = (universal.priority + ground.priority) / 2.0;
        let priority = ctx
            .cognition
            .derived_priority(&support.iter().cloned().collect::<Vec<_>>(), base);
        let potential = PotentialAssertion {
            kif: instantiated,
            priority,
            source_note_id: ground.source_note_id.clone(),
            justification_ids: support,
            assertion_type: AssertionType::Ground,
            is_equality: false,
            is_oriented_equality: false,
            negated: false,
            quantified_vars: Vec::new(),
            derivation_depth: depth,
        };
        if let Err(e) = ctx.commit_and_publish(bus, kb_id, potential) {
            debug!(error = %e, "universal instantiation commit rejected");
        }
    }
}

/// Handles one `AssertionAdded` event, whichever side of the
/// universal/ground pair it is (spec §4.11 "Two cases").
pub fn handle_assertion_added(ctx: &ReasonerContext, alpha: &Arc<Assertion>, bus: &EventBus) {
    if !alpha.active {
        return;
    }
    match alpha.assertion_type {
        AssertionType::Ground | AssertionType::Skolemized => {
            let Some(predicate) = alpha.kif.operator() else { return };
            for universal in ctx.universal_candidates(&alpha.kb_id, predicate) {
                try_instantiate(ctx, bus, &alpha.kb_id, &universal, alpha);
            }
        }
        AssertionType::Universal => {
            let Some(items) = alpha.kif.as_list() else { return };
            if items.len() != 3 {
                return;
            }
            let Some(predicate) = items[2].operator() else { return };
            for ground in ctx.instance_candidates(&alpha.kb_id, &predicate_query(predicate)) {
                if ground.is_ground_or_skolemized() {
                    try_instantiate(ctx, bus, &alpha.kb_id, alpha, &ground);
                }
            }
        }
    }
}
