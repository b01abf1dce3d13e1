//! The knowledge base: path index, universal index, eviction heap and the
//! `commit` entry point (spec §3, §4.4).

use crate::assertion::{Assertion, AssertionType, EvictionKey, PotentialAssertion};
use crate::ids::IdGenerator;
use crate::path_index::PathIndex;
use crate::tms::{Tms, TmsEvent};
use dashmap::DashMap;
use kif_term::reserved;
use kif_term::Term;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum CommitError {
    #[error("'{0}' is trivially true/false for reflexive predicate {1}")]
    TriviallyReflexive(String, String),
    #[error("an active assertion with an equal form already exists: {0}")]
    DuplicateActive(String),
    #[error("subsumed by an active generalisation already in the knowledge base")]
    Subsumed,
    #[error("knowledge base is at capacity and no assertion could be evicted")]
    CapacityExceeded,
    #[error(transparent)]
    Tms(#[from] crate::tms::TmsError),
}

/// Events the KB emits out of `commit`/`retract` for the bus to forward
/// (spec §4.4, §4.7).
#[derive(Debug, Clone)]
pub enum KbEvent {
    AssertionAdded { assertion: Arc<Assertion>, kb_id: String },
    AssertionRetracted { assertion: Arc<Assertion>, kb_id: String },
    AssertionEvicted { id: String, kb_id: String },
    Tms(TmsEvent),
}

fn reflexive_violation(kif: &Term) -> Option<(&'static str, String)> {
    let (op, items) = match (kif.operator(), kif.as_list()) {
        (Some(op), Some(items)) => (op, items),
        _ => return None,
    };
    // also check the negated form: (not (pred x x))
    if op == "not" && items.len() == 2 {
        if let Some(inner) = reflexive_violation(&items[1]) {
            return Some(inner);
        }
        return None;
    }
    let is_reflexive_pred = op == "=" || reserved::REFLEXIVE_PREDICATES.contains(&op);
    if !is_reflexive_pred || items.len() != 3 {
        return None;
    }
    if items[1] == items[2] {
        Some((
            reserved::REFLEXIVE_PREDICATES
                .iter()
                .find(|p| **p == op)
                .copied()
                .unwrap_or("="),
            kif.to_kif(),
        ))
    } else {
        None
    }
}

/// Owns one note's (or the global) collection of committed assertions:
/// path index for Ground/Skolemized terms, a predicate → rule-id index for
/// Universal assertions, and a min-priority eviction heap over this KB's
/// Ground/Skolemized ids.
pub struct KnowledgeBase {
    pub id: String,
    pub capacity: usize,
    index: PathIndex,
    universal_index: DashMap<String, dashmap::DashSet<String>>,
    eviction_heap: RwLock<BinaryHeap<Reverse<(EvictionKey, String)>>>,
    count: RwLock<usize>,
}

impl KnowledgeBase {
    pub fn new(id: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            capacity,
            index: PathIndex::new(),
            universal_index: DashMap::new(),
            eviction_heap: RwLock::new(BinaryHeap::new()),
            count: RwLock::new(0),
        }
    }

    pub fn global(capacity: usize) -> Self {
        Self::new(reserved::GLOBAL_KB_ID, capacity)
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    pub fn universal_ids_for(&self, predicate: &str) -> Vec<String> {
        self.universal_index
            .get(predicate)
            .map(|s| s.iter().map(|e| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Active assertions in this KB with a `kif` equal to `kif` (step 2).
    fn has_equal_active(&self, tms: &Tms, kif: &Term) -> bool {
        self.index
            .instances_of(kif)
            .into_iter()
            .filter_map(|id| tms.get(&id))
            .any(|a| a.active && a.kb_id == self.id && a.kif == *kif)
    }

    /// Whether any active assertion in this KB, with the same negation
    /// sign, one-way-matches as a generalisation of `kif` (step 3).
    fn subsumed_by_generalisation(&self, tms: &Tms, kif: &Term, negated: bool) -> bool {
        self.index
            .generalisations_of(kif)
            .into_iter()
            .filter_map(|id| tms.get(&id))
            .any(|a| {
                a.active
                    && a.kb_id == self.id
                    && a.negated == negated
                    && kif_term::match_pattern(&a.kif, kif, &kif_term::Bindings::new()).is_some()
            })
    }

    /// Enforces capacity by evicting the worst-ranked Ground/Skolemized
    /// assertion in this KB until `count < capacity` (spec §4.4 "Capacity
    /// enforcement").
    fn enforce_capacity(
        &self,
        tms: &Tms,
        events: &mut Vec<KbEvent>,
    ) -> Result<(), CommitError> {
        while *self.count.read() >= self.capacity {
            let popped = self.eviction_heap.write().pop();
            let Some(Reverse((_, id))) = popped else {
                return Err(CommitError::CapacityExceeded);
            };
            let Some(a) = tms.get(&id) else { continue };
            if a.kb_id != self.id || !a.is_ground_or_skolemized() {
                continue;
            }
            self.retract(&id, tms, events);
            events.push(KbEvent::AssertionEvicted {
                id: id.clone(),
                kb_id: self.id.clone(),
            });
            warn!(kb = %self.id, id = %id, "evicted assertion to enforce capacity");
        }
        Ok(())
    }

    /// Commits `potential` (spec §4.4, the 8-step `commit` algorithm).
    pub fn commit(
        &self,
        potential: PotentialAssertion,
        ids: &IdGenerator,
        tms: &Tms,
        timestamp: u64,
        events: &mut Vec<KbEvent>,
    ) -> Result<Arc<Assertion>, CommitError> {
        if let Some((pred, form)) = reflexive_violation(&potential.kif) {
            return Err(CommitError::TriviallyReflexive(form, pred.to_string()));
        }
        if self.has_equal_active(tms, &potential.kif) {
            return Err(CommitError::DuplicateActive(potential.kif.to_kif()));
        }
        if self.subsumed_by_generalisation(tms, &potential.kif, potential.negated) {
            return Err(CommitError::Subsumed);
        }

        let mut tms_events = Vec::new();
        self.enforce_capacity(tms, &mut tms_events)?;
        events.extend(tms_events.into_iter().map(KbEvent::Tms));

        let assertion_type = if matches!(potential.assertion_type, AssertionType::Ground)
            && potential.kif.has_skolem()
        {
            AssertionType::Skolemized
        } else {
            potential.assertion_type
        };

        let id = ids.next(reserved::FACT_PREFIX);
        let assertion = Assertion {
            id: id.clone(),
            kif: potential.kif.clone(),
            priority: potential.priority,
            timestamp,
            source_note_id: potential.source_note_id,
            justification_ids: potential.justification_ids.clone(),
            assertion_type,
            is_equality: potential.is_equality,
            is_oriented_equality: potential.is_oriented_equality,
            negated: potential.negated,
            quantified_vars: potential.quantified_vars,
            derivation_depth: potential.derivation_depth,
            active: true,
            kb_id: self.id.clone(),
        };

        let mut tms_events = Vec::new();
        let stored = tms.add(assertion, potential.justification_ids, &mut tms_events)?;
        let became_active = stored.active;
        events.extend(tms_events.into_iter().map(KbEvent::Tms));

        if became_active {
            match stored.assertion_type {
                AssertionType::Universal => {
                    for pred in referenced_predicates(&stored.kif) {
                        self.universal_index
                            .entry(pred)
                            .or_default()
                            .insert(stored.id.clone());
                    }
                }
                AssertionType::Ground | AssertionType::Skolemized => {
                    self.index.insert(&stored.kif, &stored.id);
                    self.eviction_heap
                        .write()
                        .push(Reverse((stored.eviction_key(), stored.id.clone())));
                    *self.count.write() += 1;
                }
            }
        }

        info!(kb = %self.id, id = %stored.id, kif = %stored.kif, "committed assertion");
        events.push(KbEvent::AssertionAdded {
            assertion: stored.clone(),
            kb_id: self.id.clone(),
        });
        Ok(stored)
    }

    /// Retracts `id` through the TMS, then removes it from this KB's own
    /// indices (spec §4.4 "Retraction through the KB delegates to the
    /// TMS").
    pub fn retract(&self, id: &str, tms: &Tms, events: &mut Vec<KbEvent>) {
        let removed = tms.get(id);
        let was_active = removed.as_ref().map(|a| a.active).unwrap_or(false);
        let mut tms_events = Vec::new();
        tms.retract(id, &mut tms_events);
        events.extend(tms_events.into_iter().map(KbEvent::Tms));
        if let Some(a) = removed {
            if a.kb_id != self.id {
                return;
            }
            match a.assertion_type {
                AssertionType::Universal => {
                    for pred in referenced_predicates(&a.kif) {
                        if let Some(set) = self.universal_index.get(&pred) {
                            set.remove(id);
                        }
                    }
                }
                AssertionType::Ground | AssertionType::Skolemized => {
                    self.index.remove(&a.kif, id);
                    let mut count = self.count.write();
                    *count = count.saturating_sub(1);
                }
            }
            if was_active {
                events.push(KbEvent::AssertionRetracted {
                    assertion: a,
                    kb_id: self.id.clone(),
                });
            }
            debug!(kb = %self.id, id = %id, "removed assertion from kb indices");
        }
    }
}

/// Atoms appearing as a predicate position anywhere in `kif`: its own
/// operator plus the operator of every list subterm (used to file a
/// Universal assertion under every predicate it mentions, spec §4.4 step
/// 7).
fn referenced_predicates(kif: &Term) -> Vec<String> {
    let mut out = Vec::new();
    collect_predicates(kif, &mut out);
    out
}

fn collect_predicates(term: &Term, out: &mut Vec<String>) {
    if let Some(items) = term.as_list() {
        if let Some(op) = term.operator() {
            out.push(op.to_string());
        }
        for item in items {
            collect_predicates(item, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kif_term::parse_one;

    fn input(kif: &str) -> PotentialAssertion {
        PotentialAssertion::input(parse_one(kif).unwrap(), 10.0, None)
    }

    #[test]
    fn commits_a_simple_fact() {
        let kb = KnowledgeBase::global(100);
        let ids = IdGenerator::new();
        let tms = Tms::new();
        let mut events = Vec::new();
        let a = kb
            .commit(input("(instance Rex Dog)"), &ids, &tms, 0, &mut events)
            .unwrap();
        assert!(a.active);
        assert!(events
            .iter()
            .any(|e| matches!(e, KbEvent::AssertionAdded { .. })));
    }

    #[test]
    fn rejects_reflexive_instance() {
        let kb = KnowledgeBase::global(100);
        let ids = IdGenerator::new();
        let tms = Tms::new();
        let mut events = Vec::new();
        let err = kb
            .commit(input("(instance Rex Rex)"), &ids, &tms, 0, &mut events)
            .unwrap_err();
        assert!(matches!(err, CommitError::TriviallyReflexive(..)));
    }

    #[test]
    fn rejects_duplicate_active_fact() {
        let kb = KnowledgeBase::global(100);
        let ids = IdGenerator::new();
        let tms = Tms::new();
        let mut events = Vec::new();
        kb.commit(input("(instance Rex Dog)"), &ids, &tms, 0, &mut events)
            .unwrap();
        let err = kb
            .commit(input("(instance Rex Dog)"), &ids, &tms, 1, &mut events)
            .unwrap_err();
        assert!(matches!(err, CommitError::DuplicateActive(_)));
    }

    #[test]
    fn rejects_subsumed_by_active_generalisation() {
        let kb = KnowledgeBase::global(100);
        let ids = IdGenerator::new();
        let tms = Tms::new();
        let mut events = Vec::new();
        kb.commit(
            input("(instance ?x Dog)"),
            &ids,
            &tms,
            0,
            &mut events,
        )
        .unwrap();
        let err = kb
            .commit(input("(instance Rex Dog)"), &ids, &tms, 1, &mut events)
            .unwrap_err();
        assert!(matches!(err, CommitError::Subsumed));
    }

    #[test]
    fn evicts_when_over_capacity() {
        let kb = KnowledgeBase::global(1);
        let ids = IdGenerator::new();
        let tms = Tms::new();
        let mut events = Vec::new();
        kb.commit(input("(instance Rex Dog)"), &ids, &tms, 0, &mut events)
            .unwrap();
        kb.commit(input("(instance Fido Dog)"), &ids, &tms, 1, &mut events)
            .unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, KbEvent::AssertionEvicted { .. })));
    }
}
