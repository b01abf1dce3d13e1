//! Discrimination-tree candidate index (spec §4.3).
//!
//! Each node is keyed by one step along a term's "leftmost spine" (operator,
//! then first argument, then its first argument, ...): an atom's string, a
//! `Var` marker, or a list's operator string / `GenericList` marker when the
//! list has no atom operator. Every node's id set is populated for every
//! term whose spine passes through it, so "the node set" already *is* "all
//! descendants collected so far" without a second aggregation pass.
//!
//! Candidates returned here are over-approximations: callers always filter
//! by activity and a real unify/match before trusting a hit (spec §4.3
//! preamble).

use dashmap::{DashMap, DashSet};
use kif_term::Term;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IndexKey {
    Atom(String),
    Var,
    ListOp(String),
    GenericList,
}

fn key_of(term: &Term) -> IndexKey {
    if let Some(s) = term.as_atom_str() {
        IndexKey::Atom(s.to_string())
    } else if term.is_var() {
        IndexKey::Var
    } else {
        match term.operator() {
            Some(op) => IndexKey::ListOp(op.to_string()),
            None => IndexKey::GenericList,
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    ids: DashSet<String>,
    children: DashMap<IndexKey, Node>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.children.is_empty()
    }
}

/// The spine successor of `term`: its first argument, if it is a
/// multi-element list. Atoms, variables and 1-element lists have no
/// successor.
fn spine_next(term: &Term) -> Option<&Term> {
    term.as_list().and_then(|items| items.get(1))
}

#[derive(Debug, Default)]
pub struct PathIndex {
    root: Node,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, term: &Term, id: &str) {
        Self::insert_rec(&self.root, term, id);
    }

    fn insert_rec(node: &Node, term: &Term, id: &str) {
        let key = key_of(term);
        let child = node.children.entry(key).or_default();
        child.ids.insert(id.to_string());
        if let Some(next) = spine_next(term) {
            Self::insert_rec(&child, next, id);
        }
    }

    /// Removes `id` from every node along `term`'s spine, pruning children
    /// that become empty.
    pub fn remove(&self, term: &Term, id: &str) {
        Self::remove_rec(&self.root, term, id);
    }

    fn remove_rec(node: &Node, term: &Term, id: &str) {
        let key = key_of(term);
        let should_prune = {
            let Some(child) = node.children.get(&key) else {
                return;
            };
            child.ids.remove(id);
            if let Some(next) = spine_next(term) {
                Self::remove_rec(&child, next, id);
            }
            child.is_empty()
        };
        if should_prune {
            node.children.remove(&key);
        }
    }

    fn collect_all(node: &Node, out: &mut std::collections::HashSet<String>) {
        for id in node.ids.iter() {
            out.insert(id.clone());
        }
        for entry in node.children.iter() {
            Self::collect_all(entry.value(), out);
        }
    }

    /// Candidates that might unify with `term` (spec §4.3).
    pub fn unifiable_with(&self, term: &Term) -> std::collections::HashSet<String> {
        let mut out = std::collections::HashSet::new();
        Self::unifiable_rec(&self.root, term, &mut out);
        out
    }

    fn unifiable_rec(node: &Node, term: &Term, out: &mut std::collections::HashSet<String>) {
        if let Some(var_child) = node.children.get(&IndexKey::Var) {
            for id in var_child.ids.iter() {
                out.insert(id.clone());
            }
        }
        if term.is_list() {
            if let Some(generic) = node.children.get(&IndexKey::GenericList) {
                for id in generic.ids.iter() {
                    out.insert(id.clone());
                }
            }
        }
        let key = key_of(term);
        if let Some(child) = node.children.get(&key) {
            for id in child.ids.iter() {
                out.insert(id.clone());
            }
            if term.is_list() {
                Self::collect_all(&child, out);
            } else if let Some(next) = spine_next(term) {
                Self::unifiable_rec(&child, next, out);
            }
        }
        if term.is_var() {
            Self::collect_all(node, out);
        }
    }

    /// Candidates that `term` could be an instance of (spec §4.3).
    pub fn instances_of(&self, term: &Term) -> std::collections::HashSet<String> {
        let mut out = std::collections::HashSet::new();
        Self::instances_rec(&self.root, term, &mut out);
        out
    }

    fn instances_rec(node: &Node, term: &Term, out: &mut std::collections::HashSet<String>) {
        if term.is_var() {
            Self::collect_all(node, out);
            return;
        }
        let key = key_of(term);
        if let Some(child) = node.children.get(&key) {
            for id in child.ids.iter() {
                out.insert(id.clone());
            }
            if term.is_list() {
                Self::collect_all(&child, out);
            }
        }
    }

    /// Candidates that are generalisations of `term` (spec §4.3).
    pub fn generalisations_of(&self, term: &Term) -> std::collections::HashSet<String> {
        let mut out = std::collections::HashSet::new();
        Self::generalisations_rec(&self.root, term, &mut out);
        out
    }

    fn generalisations_rec(node: &Node, term: &Term, out: &mut std::collections::HashSet<String>) {
        if let Some(var_child) = node.children.get(&IndexKey::Var) {
            for id in var_child.ids.iter() {
                out.insert(id.clone());
            }
        }
        let key = key_of(term);
        if let Some(child) = node.children.get(&key) {
            for id in child.ids.iter() {
                out.insert(id.clone());
            }
            if let Some(next) = spine_next(term) {
                Self::generalisations_rec(&child, next, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kif_term::parse_one;

    #[test]
    fn instances_of_finds_ground_fact() {
        let idx = PathIndex::new();
        let t = parse_one("(instance Rex Dog)").unwrap();
        idx.insert(&t, "a1");
        let hits = idx.instances_of(&t);
        assert!(hits.contains("a1"));
    }

    #[test]
    fn instances_of_var_query_collects_everything_filed_under_it() {
        let idx = PathIndex::new();
        let t = parse_one("(instance Rex Dog)").unwrap();
        idx.insert(&t, "a1");
        let hits = idx.instances_of(&Term::var("?whole"));
        assert!(hits.contains("a1"));
    }

    #[test]
    fn unifiable_with_matches_var_and_exact() {
        let idx = PathIndex::new();
        let t = parse_one("(instance Rex Dog)").unwrap();
        idx.insert(&t, "a1");
        let q = parse_one("(instance ?x Dog)").unwrap();
        let hits = idx.unifiable_with(&q);
        assert!(hits.contains("a1"));
    }

    #[test]
    fn generalisations_of_finds_variable_headed_rule_pattern() {
        let idx = PathIndex::new();
        let pattern = parse_one("(instance ?x Dog)").unwrap();
        idx.insert(&pattern, "g1");
        let q = parse_one("(instance Rex Dog)").unwrap();
        let hits = idx.generalisations_of(&q);
        assert!(hits.contains("g1"));
    }

    #[test]
    fn remove_prunes_empty_nodes() {
        let idx = PathIndex::new();
        let t = parse_one("(instance Rex Dog)").unwrap();
        idx.insert(&t, "a1");
        idx.remove(&t, "a1");
        assert!(idx.root.children.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use kif_term::Term;
    use proptest::prelude::*;

    fn arb_ground_fact() -> impl Strategy<Value = Term> {
        ("[a-z][a-z]{0,5}", "[A-Z][a-z]{0,5}", "[A-Z][a-z]{0,5}").prop_map(|(p, a, b)| {
            Term::list(vec![Term::atom(&p), Term::atom(&a), Term::atom(&b)])
        })
    }

    proptest! {
        // `unifiable_with` is documented as an over-approximation of
        // `instances_of` (module-level doc comment); every exact-instance
        // hit must also show up as a unification candidate.
        #[test]
        fn unifiable_candidates_superset_exact_instances(facts in prop::collection::vec(arb_ground_fact(), 1..8)) {
            let idx = PathIndex::new();
            for (i, f) in facts.iter().enumerate() {
                idx.insert(f, &format!("id{i}"));
            }
            for f in &facts {
                let exact = idx.instances_of(f);
                let candidates = idx.unifiable_with(f);
                prop_assert!(exact.is_subset(&candidates));
            }
        }
    }
}
