//! Skolemization of `(exists vars body)` forms (spec §4.2).

use crate::term::{reserved, Term};
use crate::unify::{subst, Bindings};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing counter guaranteeing Skolem-name freshness,
/// passed in explicitly rather than kept as a hidden global (spec §9,
/// "Global mutable state").
#[derive(Debug, Default)]
pub struct SkolemCounter(AtomicU64);

impl SkolemCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

fn strip_leading_q(name: &str) -> &str {
    name.strip_prefix('?').unwrap_or(name)
}

fn existential_vars(vars_term: &Term) -> Vec<Term> {
    match vars_term.as_list() {
        Some(items) => items.to_vec(),
        None => vec![vars_term.clone()],
    }
}

/// Collects the free variables of `body` not in `quantified`, substitutes
/// each through `theta`, and sorts by printable form for a stable argument
/// vector (spec §4.2).
fn free_argument_vector(body: &Term, quantified: &[Term], theta: &Bindings) -> Vec<Term> {
    let quantified_names: std::collections::HashSet<_> = quantified
        .iter()
        .filter_map(|v| v.as_var_str())
        .map(|s| s.to_string())
        .collect();

    let mut args: Vec<Term> = body
        .vars()
        .iter()
        .map(|spur| crate::interner::resolve(*spur).to_string())
        .filter(|name| !quantified_names.contains(name))
        .map(|name| subst(&Term::var(&name), theta))
        .collect();

    args.sort_by(|a, b| a.to_kif().cmp(&b.to_kif()));
    args.dedup_by(|a, b| a.to_kif() == b.to_kif());
    args
}

/// Skolemizes `(exists vars body)`: each existential variable is replaced
/// with a fresh Skolem constant (no free args in scope) or a fresh Skolem
/// function of the free argument vector. Returns `subst(body, substitution)`.
pub fn skolemize(
    vars_term: &Term,
    body: &Term,
    theta: &Bindings,
    counter: &SkolemCounter,
) -> Term {
    let quantified = existential_vars(vars_term);
    let args = free_argument_vector(body, &quantified, theta);

    let mut substitution = Bindings::new();
    for v in &quantified {
        let Some(var_name) = v.as_var_str() else {
            continue;
        };
        let label = strip_leading_q(var_name);
        let n = counter.next();
        let skolem_term = if args.is_empty() {
            Term::atom(&format!("{}{}_{}", reserved::SKOLEM_CONST_PREFIX, label, n))
        } else {
            let mut items = vec![Term::atom(&format!(
                "{}{}_{}",
                reserved::SKOLEM_FUNC_PREFIX,
                label,
                n
            ))];
            items.extend(args.iter().cloned());
            Term::list(items)
        };
        substitution.insert(crate::interner::intern(var_name), skolem_term);
    }

    subst(body, &substitution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_one;

    #[test]
    fn ground_existential_yields_skolem_constant() {
        let vars = parse_one("?k").unwrap();
        let body = parse_one("(and (instance ?k Kitten) (owner ?k Mary))").unwrap();
        let counter = SkolemCounter::new();
        let result = skolemize(&vars, &body, &Bindings::new(), &counter);
        assert!(result.has_skolem());
        assert!(result.is_ground());
        let items = result.as_list().unwrap();
        let k1 = items[1].as_list().unwrap()[1].clone();
        let k2 = items[2].as_list().unwrap()[1].clone();
        assert_eq!(k1, k2, "both occurrences share the same Skolem constant");
    }

    #[test]
    fn existential_with_free_vars_yields_skolem_function() {
        let vars = parse_one("?y").unwrap();
        let body = parse_one("(owns ?x ?y)").unwrap();
        let counter = SkolemCounter::new();
        let result = skolemize(&vars, &body, &Bindings::new(), &counter);
        let y_term = result.as_list().unwrap()[2].clone();
        assert!(y_term.operator().unwrap().starts_with("skf_"));
        assert_eq!(y_term.as_list().unwrap().len(), 2); // head + ?x
    }

    #[test]
    fn counter_guarantees_freshness() {
        let vars = parse_one("?k").unwrap();
        let body = parse_one("(instance ?k Kitten)").unwrap();
        let counter = SkolemCounter::new();
        let a = skolemize(&vars, &body, &Bindings::new(), &counter);
        let b = skolemize(&vars, &body, &Bindings::new(), &counter);
        assert_ne!(a, b);
    }
}
