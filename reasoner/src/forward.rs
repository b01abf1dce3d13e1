//! Forward chaining: fires rules against newly active Ground/Skolemized
//! assertions (spec §4.9).

use crate::context::ReasonerContext;
use crate::util::{binder_var_names, effective_term, equality_flags, split_clause};
use kif_bus::EventBus;
use kif_kb::{Assertion, AssertionType, PotentialAssertion, Rule};
use kif_term::{skolemize, subst_fully, unify, Bindings, SkolemCounter, Term};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Handles one `AssertionAdded` event: tries every rule against the new
/// assertion as each of its possible antecedent-clause entry points.
pub fn handle_assertion_added(
    ctx: &ReasonerContext,
    skolem: &SkolemCounter,
    alpha: &Arc<Assertion>,
    bus: &EventBus,
) {
    if !alpha.active || !alpha.is_ground_or_skolemized() {
        return;
    }
    for rule in ctx.cognition.rules() {
        for i in 0..rule.antecedents.len() {
            let (neg, pattern) = split_clause(&rule.antecedents[i]);
            if neg != alpha.negated {
                continue;
            }
            let effective = effective_term(&alpha.kif);
            let Some(theta0) = unify(&pattern, &effective, &Bindings::new()) else {
                continue;
            };
            let mut support0 = BTreeSet::new();
            support0.insert(alpha.id.clone());
            let rest: Vec<Term> = rule
                .antecedents
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, c)| c.clone())
                .collect();
            for (theta, support) in match_clauses(ctx, &alpha.kb_id, &rest, theta0, support0) {
                fire_consequent(
                    ctx,
                    skolem,
                    bus,
                    &alpha.kb_id,
                    &rule,
                    &rule.consequent,
                    &theta,
                    &support,
                );
            }
        }
    }
}

/// Recursively resolves `clauses` against the active facts of `kb_id` (and
/// the global KB), accumulating bindings and support ids (spec §4.9 step
/// 3).
fn match_clauses(
    ctx: &ReasonerContext,
    kb_id: &str,
    clauses: &[Term],
    theta: Bindings,
    support: BTreeSet<String>,
) -> Vec<(Bindings, BTreeSet<String>)> {
    let Some((first, rest)) = clauses.split_first() else {
        return vec![(theta, support)];
    };
    let (neg, pattern) = split_clause(first);
    let substituted = subst_fully(&pattern, &theta);
    let mut out = Vec::new();
    for candidate in ctx.unifiable_candidates(kb_id, &substituted) {
        if candidate.negated != neg {
            continue;
        }
        let candidate_effective = effective_term(&candidate.kif);
        let Some(new_theta) = unify(&substituted, &candidate_effective, &theta) else {
            continue;
        };
        let mut new_support = support.clone();
        new_support.insert(candidate.id.clone());
        out.extend(match_clauses(ctx, kb_id, rest, new_theta, new_support));
    }
    out
}

/// Substitutes, simplifies, classifies and commits `consequent` (spec
/// §4.9 step 4).
fn fire_consequent(
    ctx: &ReasonerContext,
    skolem: &SkolemCounter,
    bus: &EventBus,
    kb_id: &str,
    rule: &Rule,
    consequent: &Term,
    theta: &Bindings,
    support: &BTreeSet<String>,
) {
    let substituted = subst_fully(consequent, theta);
    let simplified = ctx.cognition.simplify(&substituted);
    let support_vec: Vec<String> = support.iter().cloned().collect();
    let depth = ctx.cognition.derived_depth(&support_vec) + 1;

    match simplified.operator() {
        Some("and") => {
            if let Some(items) = simplified.as_list() {
                for conjunct in &items[1..] {
                    fire_consequent(ctx, skolem, bus, kb_id, rule, conjunct, theta, support);
                }
            }
        }
        Some("forall") => {
            let Some(items) = simplified.as_list() else { return };
            if items.len() != 3 {
                return;
            }
            let body = &items[2];
            if matches!(body.operator(), Some("=>") | Some("<=>")) {
                add_derived_rule(ctx, bus, body, rule.priority);
            } else {
                let priority = ctx.cognition.derived_priority(&support_vec, rule.priority);
                let potential = PotentialAssertion {
                    kif: simplified.clone(),
                    priority,
                    source_note_id: None,
                    justification_ids: support.clone(),
                    assertion_type: AssertionType::Universal,
                    is_equality: false,
                    is_oriented_equality: false,
                    negated: false,
                    quantified_vars: binder_var_names(&items[1]),
                    derivation_depth: depth,
                };
                try_commit(ctx, bus, kb_id, potential);
            }
        }
        Some("exists") => {
            let Some(items) = simplified.as_list() else { return };
            if items.len() != 3 {
                return;
            }
            let skolemized = skolemize(&items[1], &items[2], theta, skolem);
            let (negated, is_equality, is_oriented_equality) = equality_flags(&skolemized);
            let priority = ctx.cognition.derived_priority(&support_vec, rule.priority);
            let potential = PotentialAssertion {
                kif: skolemized,
                priority,
                source_note_id: None,
                justification_ids: support.clone(),
                assertion_type: AssertionType::Ground,
                is_equality,
                is_oriented_equality,
                negated,
                quantified_vars: Vec::new(),
                derivation_depth: depth,
            };
            try_commit(ctx, bus, kb_id, potential);
        }
        _ => {
            if !simplified.is_ground() {
                return;
            }
            if simplified.weight() > ctx.max_derived_weight || depth > ctx.derivation_depth_cap {
                debug!(kif = %simplified, depth, "forward derivation dropped: over weight/depth cap");
                return;
            }
            let (negated, is_equality, is_oriented_equality) = equality_flags(&simplified);
            let priority = ctx.cognition.derived_priority(&support_vec, rule.priority);
            let potential = PotentialAssertion {
                kif: simplified,
                priority,
                source_note_id: None,
                justification_ids: support.clone(),
                assertion_type: AssertionType::Ground,
                is_equality,
                is_oriented_equality,
                negated,
                quantified_vars: Vec::new(),
                derivation_depth: depth,
            };
            try_commit(ctx, bus, kb_id, potential);
        }
    }
}

fn try_commit(ctx: &ReasonerContext, bus: &EventBus, kb_id: &str, potential: PotentialAssertion) {
    if let Err(e) = ctx.commit_and_publish(bus, kb_id, potential) {
        debug!(error = %e, "forward chaining commit rejected");
    }
}

fn add_derived_rule(ctx: &ReasonerContext, bus: &EventBus, form: &Term, base_priority: f64) {
    crate::util::add_rule_from_form(ctx, bus, form, base_priority * 0.95);
}
