//! Shared state and helpers every plugin in this crate is built on.

use crate::operators::OperatorRegistry;
use kif_kb::{Assertion, Cognition, KbEvent, PotentialAssertion};
use kif_term::Term;
use std::sync::Arc;

/// Derived assertions heavier than this are rejected (spec §4.9, §4.10:
/// "exceeds max derived weight (~150)").
pub const MAX_DERIVED_WEIGHT: usize = 150;

/// Default backward-chaining depth cap (spec §4.12).
pub const DEFAULT_BACKWARD_DEPTH: u32 = 8;

/// Default forward-derivation depth cap (spec §4.9, §4.11 "exceeds
/// configured derivation depth"); configurable per `ReasonerContext`.
pub const DEFAULT_DERIVATION_DEPTH_CAP: i64 = 20;

/// Everything a plugin needs: the shared cognitive state, the operator
/// registry, and the configured derivation caps.
pub struct ReasonerContext {
    pub cognition: Arc<Cognition>,
    pub operators: Arc<OperatorRegistry>,
    pub max_derived_weight: usize,
    pub derivation_depth_cap: i64,
}

impl ReasonerContext {
    pub fn new(cognition: Arc<Cognition>) -> Self {
        Self {
            cognition,
            operators: Arc::new(OperatorRegistry::with_builtins()),
            max_derived_weight: MAX_DERIVED_WEIGHT,
            derivation_depth_cap: DEFAULT_DERIVATION_DEPTH_CAP,
        }
    }

    /// Active assertions in `kb_id` (then, unless `kb_id` already is the
    /// global KB, the global KB too) whose term is a unification
    /// candidate for `pattern`, deduplicated by id (spec §4.9 step 3,
    /// §4.10, §4.11: "search first the current KB then the global KB
    /// (deduplicated)").
    pub fn unifiable_candidates(&self, kb_id: &str, pattern: &Term) -> Vec<Arc<Assertion>> {
        self.gather(kb_id, |idx| idx.unifiable_with(pattern))
    }

    pub fn instance_candidates(&self, kb_id: &str, pattern: &Term) -> Vec<Arc<Assertion>> {
        self.gather(kb_id, |idx| idx.instances_of(pattern))
    }

    fn gather(
        &self,
        kb_id: &str,
        query: impl Fn(&kif_kb::PathIndex) -> std::collections::HashSet<String>,
    ) -> Vec<Arc<Assertion>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut push_from = |ids: std::collections::HashSet<String>| {
            for id in ids {
                if !seen.insert(id.clone()) {
                    continue;
                }
                if let Some(a) = self.cognition.tms().get(&id) {
                    if a.active {
                        out.push(a);
                    }
                }
            }
        };
        if let Some(kb) = self.cognition.kb_for(kb_id) {
            push_from(query(kb.index()));
        } else {
            push_from(query(self.cognition.global.index()));
        }
        if kb_id != kif_term::reserved::GLOBAL_KB_ID {
            push_from(query(self.cognition.global.index()));
        }
        out
    }

    pub fn universal_candidates(&self, kb_id: &str, predicate: &str) -> Vec<Arc<Assertion>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut push_ids = |ids: Vec<String>| {
            for id in ids {
                if !seen.insert(id.clone()) {
                    continue;
                }
                if let Some(a) = self.cognition.tms().get(&id) {
                    if a.active {
                        out.push(a);
                    }
                }
            }
        };
        if let Some(kb) = self.cognition.kb_for(kb_id) {
            push_ids(kb.universal_ids_for(predicate));
        } else {
            push_ids(self.cognition.global.universal_ids_for(predicate));
        }
        if kb_id != kif_term::reserved::GLOBAL_KB_ID {
            push_ids(self.cognition.global.universal_ids_for(predicate));
        }
        out
    }

    /// Commits `potential` to `kb_id`'s KB (global if `kb_id` is the
    /// global marker), returning events for the caller to forward on the
    /// bus.
    pub fn commit(
        &self,
        kb_id: &str,
        potential: PotentialAssertion,
    ) -> Result<(Arc<Assertion>, Vec<KbEvent>), kif_kb::CommitError> {
        let mut events = Vec::new();
        let result = if kb_id == kif_term::reserved::GLOBAL_KB_ID {
            self.cognition.commit_global(potential, &mut events)
        } else {
            self.cognition.commit_note(kb_id, potential, &mut events)
        };
        result.map(|a| (a, events))
    }

    /// `commit` followed by forwarding the resulting events on `bus`.
    pub fn commit_and_publish(
        &self,
        bus: &kif_bus::EventBus,
        kb_id: &str,
        potential: PotentialAssertion,
    ) -> Result<Arc<Assertion>, kif_kb::CommitError> {
        let (assertion, events) = self.commit(kb_id, potential)?;
        publish(bus, &self.cognition, events);
        Ok(assertion)
    }
}

/// Converts KB-level events into bus events and emits them (spec §4.4
/// step 8, §4.5, §4.7).
pub fn publish(bus: &kif_bus::EventBus, cognition: &Cognition, events: Vec<KbEvent>) {
    for event in events {
        match event {
            KbEvent::AssertionAdded { assertion, kb_id } => {
                bus.emit(kif_bus::Event::AssertionAdded { assertion, kb_id });
            }
            KbEvent::AssertionRetracted { assertion, kb_id } => {
                bus.emit(kif_bus::Event::AssertionRetracted { assertion, kb_id });
            }
            KbEvent::AssertionEvicted { id, kb_id } => {
                bus.emit(kif_bus::Event::AssertionEvicted { id, kb_id });
            }
            KbEvent::Tms(tms_event) => publish_tms(bus, cognition, tms_event),
        }
    }
}

/// `TmsEvent::Retracted` is already surfaced as the richer
/// `KbEvent::AssertionRetracted` by `KnowledgeBase::retract`, so only
/// `StatusChanged`/`ContradictionDetected` need forwarding here.
fn publish_tms(bus: &kif_bus::EventBus, cognition: &Cognition, event: kif_kb::TmsEvent) {
    match event {
        kif_kb::TmsEvent::StatusChanged { id, active } => {
            let kb_id = cognition
                .tms()
                .get(&id)
                .map(|a| a.kb_id.clone())
                .unwrap_or_default();
            bus.emit(kif_bus::Event::AssertionStatusChanged { id, active, kb_id });
        }
        kif_kb::TmsEvent::Retracted { .. } => {}
        kif_kb::TmsEvent::ContradictionDetected { ids, kb_id } => {
            bus.emit(kif_bus::Event::ContradictionDetected { ids, kb_id });
        }
    }
}
