//! Cognition: the global KB, per-note KBs and the rule set (spec §4.6).

use crate::assertion::{Assertion, PotentialAssertion};
use crate::ids::IdGenerator;
use crate::kb::{CommitError, KbEvent, KnowledgeBase};
use crate::rule::Rule;
use crate::tms::Tms;
use dashmap::{DashMap, DashSet};
use kif_term::{reserved, Term};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Rules are stored behind `Arc` so plugins can hold a snapshot reference
/// without racing a concurrent add/remove.
#[derive(Debug, Clone)]
pub enum RuleEvent {
    Added(Arc<Rule>),
    Removed(Arc<Rule>),
}

/// Owns the global KB, the lazily-created per-note KBs, and the rule set
/// (spec §3, §4.6). Each `Cognition` owns its own id generator and TMS so
/// multiple independent instances never collide on ids.
pub struct Cognition {
    pub global: KnowledgeBase,
    notes: DashMap<String, Arc<KnowledgeBase>>,
    rules: DashSet<Arc<Rule>>,
    default_kb_capacity: usize,
    ids: IdGenerator,
    tms: Tms,
    clock: AtomicU64,
}

impl Cognition {
    pub fn new(default_kb_capacity: usize) -> Self {
        Self {
            global: KnowledgeBase::global(default_kb_capacity),
            notes: DashMap::new(),
            rules: DashSet::new(),
            default_kb_capacity,
            ids: IdGenerator::new(),
            tms: Tms::new(),
            clock: AtomicU64::new(0),
        }
    }

    pub fn tms(&self) -> &Tms {
        &self.tms
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    fn next_timestamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the note's KB, creating it with the global's capacity on
    /// first reference (spec §3: "a map noteId -> KB (lazily created, same
    /// capacity as global)").
    pub fn note_kb(&self, note_id: &str) -> Arc<KnowledgeBase> {
        self.notes
            .entry(note_id.to_string())
            .or_insert_with(|| Arc::new(KnowledgeBase::new(note_id, self.default_kb_capacity)))
            .clone()
    }

    pub fn kb_for(&self, kb_id: &str) -> Option<Arc<KnowledgeBase>> {
        if kb_id == reserved::GLOBAL_KB_ID {
            None
        } else {
            Some(self.note_kb(kb_id))
        }
    }

    /// Commits `potential` to the global KB.
    pub fn commit_global(
        &self,
        potential: PotentialAssertion,
        events: &mut Vec<KbEvent>,
    ) -> Result<Arc<Assertion>, CommitError> {
        let ts = self.next_timestamp();
        self.global.commit(potential, &self.ids, &self.tms, ts, events)
    }

    /// Commits `potential` to `note_id`'s KB, creating it if necessary.
    pub fn commit_note(
        &self,
        note_id: &str,
        potential: PotentialAssertion,
        events: &mut Vec<KbEvent>,
    ) -> Result<Arc<Assertion>, CommitError> {
        let kb = self.note_kb(note_id);
        let ts = self.next_timestamp();
        kb.commit(potential, &self.ids, &self.tms, ts, events)
    }

    pub fn retract(&self, id: &str, events: &mut Vec<KbEvent>) {
        let Some(a) = self.tms.get(id) else { return };
        if a.kb_id == reserved::GLOBAL_KB_ID {
            self.global.retract(id, &self.tms, events);
        } else if let Some(kb) = self.notes.get(&a.kb_id) {
            kb.retract(id, &self.tms, events);
        }
    }

    /// Inserts `rule` by set-membership (equality is by `form`, spec §3,
    /// §4.6); returns `false` if an identical rule already exists.
    pub fn add_rule(&self, rule: Rule) -> (bool, RuleEvent) {
        let arc = Arc::new(rule);
        let inserted = self.rules.insert(arc.clone());
        info!(rule = %arc.form, inserted, "rule add requested");
        (inserted, RuleEvent::Added(arc))
    }

    pub fn remove_rule(&self, form: &Term) -> Option<RuleEvent> {
        let found = self.rules.iter().find(|r| &r.form == form)?.clone();
        self.rules.remove(&found);
        Some(RuleEvent::Removed(found))
    }

    pub fn rules(&self) -> Vec<Arc<Rule>> {
        self.rules.iter().map(|r| r.clone()).collect()
    }

    /// `min(priority of supporters, base) * 0.95`; `base` unscaled when
    /// `support` is empty (spec §9 open question, resolved in favor of the
    /// conservative reading: an input's priority is exactly what the
    /// caller asked for).
    pub fn derived_priority(&self, support: &[String], base: f64) -> f64 {
        let min_support = support
            .iter()
            .filter_map(|id| self.tms.get(id))
            .map(|a| a.priority)
            .fold(f64::INFINITY, f64::min);
        if support.is_empty() || !min_support.is_finite() {
            base
        } else {
            min_support.min(base) * 0.95
        }
    }

    /// `max(depth of supporters)`, or -1 when `support` is empty so the
    /// caller's `+1` yields 0 for top-level inputs (spec §4.6).
    pub fn derived_depth(&self, support: &[String]) -> i64 {
        support
            .iter()
            .filter_map(|id| self.tms.get(id))
            .map(|a| a.derivation_depth)
            .max()
            .unwrap_or(-1)
    }

    /// BFS over the support DAG: if every assertion reachable (inclusive)
    /// that carries a `source_note_id` carries the *same* one, returns it;
    /// any divergence, or no source at all, returns `None` (spec §4.6).
    pub fn common_source_note(&self, support: &[String]) -> Option<String> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<String> = support.iter().cloned().collect();
        let mut found: Option<String> = None;
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(a) = self.tms.get(&id) else { continue };
            if let Some(src) = &a.source_note_id {
                match &found {
                    None => found = Some(src.clone()),
                    Some(existing) if existing != src => return None,
                    _ => {}
                }
            }
            for sup in &a.justification_ids {
                queue.push_back(sup.clone());
            }
        }
        found
    }

    /// Iteratively collapses `(not (not x))` up to depth 5 (spec §4.6).
    pub fn simplify(&self, term: &Term) -> Term {
        let mut current = term.clone();
        for _ in 0..5 {
            match strip_double_negation(&current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }
}

fn strip_double_negation(term: &Term) -> Option<Term> {
    if !term.is_negation() {
        return None;
    }
    let inner = &term.as_list()?[1];
    if inner.is_negation() {
        Some(inner.as_list()?[1].clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kif_term::parse_one;

    #[test]
    fn lazily_creates_note_kb() {
        let cog = Cognition::new(100);
        let kb1 = cog.note_kb("note://a");
        let kb2 = cog.note_kb("note://a");
        assert!(Arc::ptr_eq(&kb1, &kb2));
    }

    #[test]
    fn derived_priority_unscaled_for_input() {
        let cog = Cognition::new(100);
        assert_eq!(cog.derived_priority(&[], 10.0), 10.0);
    }

    #[test]
    fn derived_depth_minus_one_for_input() {
        let cog = Cognition::new(100);
        assert_eq!(cog.derived_depth(&[]), -1);
    }

    #[test]
    fn simplify_collapses_double_negation() {
        let cog = Cognition::new(100);
        let t = parse_one("(not (not (rains Here)))").unwrap();
        let simplified = cog.simplify(&t);
        assert_eq!(simplified.to_kif(), "(rains Here)");
    }

    #[test]
    fn simplify_is_noop_on_single_negation() {
        let cog = Cognition::new(100);
        let t = parse_one("(not (rains Here))").unwrap();
        assert_eq!(cog.simplify(&t), t);
    }

    #[test]
    fn common_source_note_diverges_to_none() {
        let cog = Cognition::new(100);
        let mut events = Vec::new();
        let a = cog
            .commit_note(
                "note://a",
                PotentialAssertion::input(parse_one("(p A)").unwrap(), 5.0, Some("note://a".into())),
                &mut events,
            )
            .unwrap();
        let b = cog
            .commit_note(
                "note://b",
                PotentialAssertion::input(parse_one("(p B)").unwrap(), 5.0, Some("note://b".into())),
                &mut events,
            )
            .unwrap();
        let support = vec![a.id.clone(), b.id.clone()];
        assert_eq!(cog.common_source_note(&support), None);
    }

    #[test]
    fn add_rule_is_idempotent_by_form() {
        let cog = Cognition::new(100);
        let form = parse_one("(=> (a ?x) (b ?x))").unwrap();
        let r1 = Rule::parse("rule_0".into(), form.clone(), 10.0).unwrap();
        let r2 = Rule::parse("rule_1".into(), form, 10.0).unwrap();
        let (first, _) = cog.add_rule(r1);
        let (second, _) = cog.add_rule(r2);
        assert!(first);
        assert!(!second);
        assert_eq!(cog.rules().len(), 1);
    }
}
