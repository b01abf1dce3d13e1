//! Backward chaining: proves a goal against operators, facts and rules
//! (spec §4.12).

use crate::context::ReasonerContext;
use crate::util::project_bindings;
use kif_term::{subst, subst_fully, unify, Bindings, Term};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

type ProveFuture<'a> = Pin<Box<dyn Future<Output = Vec<Bindings>> + Send + 'a>>;

/// Serves `ASK_BINDINGS`/`ASK_TRUE_FALSE` queries. Owns the monotonic
/// counter used to mint a fresh alpha-renaming suffix per rule
/// application, so two recursive uses of the same rule never collide
/// (spec §4.12 "α-rename its variables with a depth- and
/// counter-specific suffix").
#[derive(Default)]
pub struct BackwardChaining {
    rename_counter: AtomicU64,
}

impl BackwardChaining {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ask_bindings(
        &self,
        ctx: &ReasonerContext,
        goal: &Term,
        kb_id: &str,
        max_depth: Option<u32>,
    ) -> Vec<Bindings> {
        let depth = max_depth.unwrap_or(crate::context::DEFAULT_BACKWARD_DEPTH) as i64;
        let stack = HashSet::new();
        let results = self
            .prove(ctx, goal.clone(), kb_id, Bindings::new(), depth, stack)
            .await;
        let projected: Vec<Bindings> =
            results.iter().map(|theta| project_bindings(goal, theta)).collect();
        dedup_bindings(projected)
    }

    pub async fn ask_true_false(
        &self,
        ctx: &ReasonerContext,
        goal: &Term,
        kb_id: &str,
        max_depth: Option<u32>,
    ) -> bool {
        !self.ask_bindings(ctx, goal, kb_id, max_depth).await.is_empty()
    }

    /// `stack` is the set of fully-substituted goals on the current proof
    /// path; it's carried by value (cloned on branching, not shared
    /// mutably) so the recursive boxed futures here never have to satisfy
    /// a borrow across an `.await` point (spec §4.12 step 2, cycle
    /// avoidance).
    fn prove<'a>(
        &'a self,
        ctx: &'a ReasonerContext,
        goal: Term,
        kb_id: &'a str,
        theta: Bindings,
        depth: i64,
        stack: HashSet<Term>,
    ) -> ProveFuture<'a> {
        Box::pin(async move {
            if depth <= 0 {
                return Vec::new();
            }
            let substituted = subst_fully(&goal, &theta);
            if stack.contains(&substituted) {
                return Vec::new();
            }

            let mut results = Vec::new();

            if let Some(op) = substituted.operator() {
                if let Some(opfn) = ctx.operators.get(op) {
                    let args = &substituted.as_list().unwrap()[1..];
                    if let Some(value) = opfn(args) {
                        if value.as_atom_str() == Some("true") {
                            results.push(theta.clone());
                        } else if let Some(new_theta) = unify(&value, &substituted, &theta) {
                            results.push(new_theta);
                        }
                    }
                }
            }

            for candidate in ctx.unifiable_candidates(kb_id, &substituted) {
                if let Some(new_theta) = unify(&substituted, &candidate.kif, &theta) {
                    results.push(new_theta);
                }
            }

            let mut next_stack = stack;
            next_stack.insert(substituted.clone());
            for rule in ctx.cognition.rules() {
                let suffix = format!(
                    "_b{}_{}",
                    depth,
                    self.rename_counter.fetch_add(1, Ordering::Relaxed)
                );
                let renamed_consequent = alpha_rename(&rule.consequent, &suffix);
                let Some(theta1) = unify(&renamed_consequent, &substituted, &theta) else {
                    continue;
                };
                let renamed_antecedents: Vec<Term> = rule
                    .antecedents
                    .iter()
                    .map(|c| alpha_rename(c, &suffix))
                    .collect();
                let sub_results = self
                    .prove_clauses(
                        ctx,
                        renamed_antecedents,
                        kb_id,
                        theta1,
                        depth - 1,
                        next_stack.clone(),
                    )
                    .await;
                results.extend(sub_results);
            }

            results
        })
    }

    fn prove_clauses<'a>(
        &'a self,
        ctx: &'a ReasonerContext,
        clauses: Vec<Term>,
        kb_id: &'a str,
        theta: Bindings,
        depth: i64,
        stack: HashSet<Term>,
    ) -> ProveFuture<'a> {
        Box::pin(async move {
            let mut clauses = clauses;
            if clauses.is_empty() {
                return vec![theta];
            }
            let first = clauses.remove(0);
            let mut out = Vec::new();
            let branch_results = self
                .prove(ctx, first, kb_id, theta, depth, stack.clone())
                .await;
            for theta2 in branch_results {
                out.extend(
                    self.prove_clauses(ctx, clauses.clone(), kb_id, theta2, depth, stack.clone())
                        .await,
                );
            }
            out
        })
    }
}

fn alpha_rename(term: &Term, suffix: &str) -> Term {
    let mut renaming = Bindings::new();
    for spur in term.vars() {
        let name = kif_term::interner::resolve(*spur);
        renaming.insert(*spur, Term::var(&format!("{name}{suffix}")));
    }
    subst(term, &renaming)
}

fn dedup_bindings(results: Vec<Bindings>) -> Vec<Bindings> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for theta in results {
        let mut key: Vec<(String, String)> = theta
            .iter()
            .map(|(k, v)| (kif_term::interner::resolve(*k).to_string(), v.to_kif()))
            .collect();
        key.sort();
        if seen.insert(key) {
            out.push(theta);
        }
    }
    out
}
