//! Unification, one-way matching, substitution and rewriting (spec §4.1).

use crate::term::Term;
use lasso::Spur;
use std::collections::HashMap;

/// Recursion depth cap tolerating pathological bindings (spec §4.1).
pub const MAX_DEPTH: usize = 50;

/// A variable -> term binding map.
pub type Bindings = HashMap<Spur, Term>;

fn var_spur(t: &Term) -> Spur {
    // SAFETY-by-convention: callers only invoke this on terms known to be
    // `Term::Var`; the interner key is recovered by re-interning its name.
    crate::interner::intern(t.as_var_str().expect("var_spur called on non-variable term"))
}

/// Applies `theta` to `term` once (no fixpoint). Substitution is trivially
/// capture-avoiding: KIF terms carry no variable binders outside the
/// `exists`/`forall` wrapper, which the Skolemizer and input processor
/// strip before substitution ever sees the body.
pub fn subst(term: &Term, theta: &Bindings) -> Term {
    if theta.is_empty() || term.is_ground() && !term.is_var() {
        return term.clone();
    }
    match term.as_var_str() {
        Some(_) => {
            let key = var_spur(term);
            theta.get(&key).cloned().unwrap_or_else(|| term.clone())
        }
        None => match term.as_list() {
            Some(items) => {
                Term::list(items.iter().map(|t| subst(t, theta)).collect())
            }
            None => term.clone(),
        },
    }
}

/// Iteratively substitutes until a fixpoint or [`MAX_DEPTH`] is reached.
pub fn subst_fully(term: &Term, theta: &Bindings) -> Term {
    if theta.is_empty() {
        return term.clone();
    }
    let mut current = term.clone();
    for _ in 0..MAX_DEPTH {
        let next = subst(&current, theta);
        if next == current {
            return next;
        }
        current = next;
    }
    current
}

fn bind_var(v: Spur, u: &Term, theta: &Bindings, depth: usize, occurs_check: bool) -> Option<Bindings> {
    if depth > MAX_DEPTH {
        return None;
    }
    if let Some(existing) = theta.get(&v).cloned() {
        return unify_at(&existing, u, theta, depth + 1);
    }
    let resolved = subst_fully(u, theta);
    if occurs_check && resolved.vars().contains(&v) {
        return None;
    }
    let mut next = theta.clone();
    next.insert(v, resolved);
    Some(next)
}

fn unify_at(x: &Term, y: &Term, theta: &Bindings, depth: usize) -> Option<Bindings> {
    if depth > MAX_DEPTH {
        return None;
    }
    let xs = subst_fully(x, theta);
    let ys = subst_fully(y, theta);
    if xs == ys {
        return Some(theta.clone());
    }
    if xs.is_var() {
        return bind_var(var_spur(&xs), &ys, theta, depth + 1, true);
    }
    if ys.is_var() {
        return bind_var(var_spur(&ys), &xs, theta, depth + 1, true);
    }
    match (xs.as_list(), ys.as_list()) {
        (Some(xitems), Some(yitems)) if xitems.len() == yitems.len() => {
            let mut current = theta.clone();
            for (xi, yi) in xitems.iter().zip(yitems.iter()) {
                current = unify_at(xi, yi, &current, depth + 1)?;
            }
            Some(current)
        }
        _ => None,
    }
}

/// Full first-order unification with occurs-check, bounded by [`MAX_DEPTH`].
pub fn unify(x: &Term, y: &Term, theta: &Bindings) -> Option<Bindings> {
    unify_at(x, y, theta, 0)
}

fn match_at(pattern: &Term, term: &Term, theta: &Bindings, depth: usize) -> Option<Bindings> {
    if depth > MAX_DEPTH {
        return None;
    }
    let p = subst_fully(pattern, theta);
    if p.is_var() {
        return bind_var(var_spur(&p), term, theta, depth + 1, false);
    }
    match (p.as_list(), term.as_list()) {
        (Some(pitems), Some(titems)) if pitems.len() == titems.len() => {
            let mut current = theta.clone();
            for (pi, ti) in pitems.iter().zip(titems.iter()) {
                current = match_at(pi, ti, &current, depth + 1)?;
            }
            Some(current)
        }
        (None, None) => {
            if p == *term {
                Some(theta.clone())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// One-way matching: variables only on `pattern`'s side, no occurs-check.
pub fn match_pattern(pattern: &Term, term: &Term, theta: &Bindings) -> Option<Bindings> {
    match_at(pattern, term, theta, 0)
}

fn rewrite_at(target: &Term, lhs: &Term, rhs: &Term, depth: usize) -> Option<Term> {
    if depth > MAX_DEPTH {
        return None;
    }
    let empty = Bindings::new();
    if let Some(bindings) = match_pattern(lhs, target, &empty) {
        return Some(subst_fully(rhs, &bindings));
    }
    let items = target.as_list()?;
    let mut rewritten_any = false;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if !rewritten_any {
            if let Some(r) = rewrite_at(item, lhs, rhs, depth + 1) {
                out.push(r);
                rewritten_any = true;
                continue;
            }
        }
        out.push(item.clone());
    }
    if rewritten_any {
        Some(Term::list(out))
    } else {
        None
    }
}

/// Attempts `match(lhs, target)`; on success returns `subst_fully(rhs, ..)`,
/// otherwise recurses into `target`'s subterms for the first rewrite found.
pub fn rewrite(target: &Term, lhs: &Term, rhs: &Term) -> Option<Term> {
    rewrite_at(target, lhs, rhs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_one;

    #[test]
    fn unify_soundness() {
        let x = parse_one("(father ?x Bob)").unwrap();
        let y = parse_one("(father Alice Bob)").unwrap();
        let theta = unify(&x, &y, &Bindings::new()).unwrap();
        assert_eq!(subst_fully(&x, &theta), subst_fully(&y, &theta));
    }

    #[test]
    fn occurs_check_fails_unification() {
        let v = parse_one("?X").unwrap();
        let t = parse_one("(f ?X)").unwrap();
        assert!(unify(&v, &t, &Bindings::new()).is_none());
    }

    #[test]
    fn match_allows_self_reference() {
        let v = parse_one("?X").unwrap();
        let t = parse_one("(f ?X)").unwrap();
        let theta = match_pattern(&v, &t, &Bindings::new()).unwrap();
        assert_eq!(subst_fully(&v, &theta), t);
    }

    #[test]
    fn subst_fully_is_idempotent() {
        let t = parse_one("(foo ?x ?y)").unwrap();
        let mut theta = Bindings::new();
        theta.insert(crate::interner::intern("?x"), parse_one("?y").unwrap());
        theta.insert(crate::interner::intern("?y"), parse_one("Bob").unwrap());
        let once = subst_fully(&t, &theta);
        let twice = subst_fully(&once, &theta);
        assert_eq!(once, twice);
    }

    #[test]
    fn rewrite_finds_subterm() {
        let target = parse_one("(knows Carol (father Bob))").unwrap();
        let lhs = parse_one("(father Bob)").unwrap();
        let rhs = parse_one("Alice").unwrap();
        let rewritten = rewrite(&target, &lhs, &rhs).unwrap();
        assert_eq!(rewritten.to_kif(), "(knows Carol Alice)");
    }
}
