//! Oriented rewriting: propagates `(= lhs rhs)` oriented equalities across
//! the active KB (spec §4.10).

use crate::context::ReasonerContext;
use kif_bus::EventBus;
use kif_kb::{Assertion, AssertionType, PotentialAssertion};
use kif_term::{match_pattern, rewrite as rewrite_term, Bindings};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

fn base_priority(a: &Assertion, b: &Assertion) -> f64 {
    (a.priority + b.priority) / 2.0
}

fn try_commit_rewrite(
    ctx: &ReasonerContext,
    bus: &EventBus,
    kb_id: &str,
    rewritten: kif_term::Term,
    target: &Assertion,
    equality: &Assertion,
) {
    if rewritten == target.kif {
        return;
    }
    if !rewritten.is_list() {
        return;
    }
    let weight = rewritten.weight();
    let mut support: BTreeSet<String> = target.justification_ids.clone();
    support.insert(target.id.clone());
    support.insert(equality.id.clone());
    let depth = target.derivation_depth.max(equality.derivation_depth) + 1;
    if weight > ctx.max_derived_weight || depth > ctx.derivation_depth_cap {
        debug!(kif = %rewritten, "rewrite dropped: over weight/depth cap");
        return;
    }
    let priority =
        ctx.cognition
            .derived_priority(&support.iter().cloned().collect::<Vec<_>>(), base_priority(target, equality));
    let potential = PotentialAssertion {
        kif: rewritten,
        priority,
        source_note_id: target.source_note_id.clone(),
        justification_ids: support,
        assertion_type: if target.assertion_type == AssertionType::Universal {
            AssertionType::Universal
        } else {
            AssertionType::Ground
        },
        is_equality: target.is_equality,
        is_oriented_equality: target.is_oriented_equality,
        negated: target.negated,
        quantified_vars: target.quantified_vars.clone(),
        derivation_depth: depth,
    };
    if let Err(e) = ctx.commit_and_publish(bus, kb_id, potential) {
        debug!(error = %e, "oriented rewrite commit rejected");
    }
}

/// Handles one `AssertionAdded` event as either a new rewrite rule or a
/// new rewrite target (spec §4.10, the two symmetric flows).
pub fn handle_assertion_added(ctx: &ReasonerContext, alpha: &Arc<Assertion>, bus: &EventBus) {
    if !alpha.active {
        return;
    }
    if alpha.is_oriented_equality && !alpha.negated && alpha.kif.as_list().map(|l| l.len() == 3).unwrap_or(false) {
        rewrite_with_new_equality(ctx, alpha, bus);
    } else {
        rewrite_new_target(ctx, alpha, bus);
    }
}

fn rewrite_with_new_equality(ctx: &ReasonerContext, alpha: &Arc<Assertion>, bus: &EventBus) {
    let items = alpha.kif.as_list().unwrap();
    let (lhs, rhs) = (&items[1], &items[2]);
    for target in ctx.unifiable_candidates(&alpha.kb_id, lhs) {
        if Arc::ptr_eq(&target, alpha) {
            continue;
        }
        if match_pattern(lhs, &target.kif, &Bindings::new()).is_none() {
            continue;
        }
        if let Some(rewritten) = rewrite_term(&target.kif, lhs, rhs) {
            try_commit_rewrite(ctx, bus, &alpha.kb_id, rewritten, &target, alpha);
        }
    }
}

fn rewrite_new_target(ctx: &ReasonerContext, alpha: &Arc<Assertion>, bus: &EventBus) {
    // Scan active oriented equalities by querying the index with the
    // target itself: any equality whose lhs could unify with alpha's term
    // is a unification candidate for alpha, since unify is symmetric.
    for equality in ctx.unifiable_candidates(&alpha.kb_id, &alpha.kif) {
        if !equality.is_oriented_equality || equality.negated || Arc::ptr_eq(&equality, alpha) {
            continue;
        }
        let Some(items) = equality.kif.as_list() else { continue };
        if items.len() != 3 {
            continue;
        }
        let (lhs, rhs) = (&items[1], &items[2]);
        if match_pattern(lhs, &alpha.kif, &Bindings::new()).is_none() {
            continue;
        }
        if let Some(rewritten) = rewrite_term(&alpha.kif, lhs, rhs) {
            try_commit_rewrite(ctx, bus, &alpha.kb_id, rewritten, alpha, &equality);
        }
    }
}
