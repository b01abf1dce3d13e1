//! Justification-based truth maintenance (spec §4.5).

use crate::assertion::Assertion;
use dashmap::DashMap;
use kif_term::Term;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TmsError {
    #[error("assertion id {0} already exists in the TMS")]
    DuplicateId(String),
    #[error("supporter {0} is missing from the TMS")]
    MissingSupporter(String),
}

/// Events emitted by the TMS as status changes propagate (spec §4.5, §4.7).
#[derive(Debug, Clone)]
pub enum TmsEvent {
    StatusChanged { id: String, active: bool },
    Retracted { id: String },
    ContradictionDetected { ids: (String, String), kb_id: String },
}

/// How a detected contradiction is handled once both sides are found
/// active in the same KB (spec §9 open question on contradiction
/// resolution). Only `LogOnly` is exercised today; `RetractWeakest` is
/// accepted but currently behaves like `LogOnly` until a priority-based
/// arbiter is specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContradictionPolicy {
    #[default]
    LogOnly,
    RetractWeakest,
}

/// Stores assertions, their justifications, and the reverse dependency DAG,
/// and propagates active/inactive status on add/retract.
pub struct Tms {
    assertions: DashMap<String, Arc<Assertion>>,
    justifications: DashMap<String, BTreeSet<String>>,
    dependents: DashMap<String, BTreeSet<String>>,
    /// Guards the multi-map structural mutation during cascades so a
    /// concurrent add/retract cannot interleave with an in-flight cascade
    /// (spec §5: "Commit, retract, and status-update hold the KB write
    /// lock"; the TMS provides the equivalent guarantee for its own state).
    cascade_lock: RwLock<()>,
    contradiction_policy: ContradictionPolicy,
}

impl Default for Tms {
    fn default() -> Self {
        Self::new()
    }
}

impl Tms {
    pub fn new() -> Self {
        Self {
            assertions: DashMap::new(),
            justifications: DashMap::new(),
            dependents: DashMap::new(),
            cascade_lock: RwLock::new(()),
            contradiction_policy: ContradictionPolicy::default(),
        }
    }

    pub fn with_contradiction_policy(policy: ContradictionPolicy) -> Self {
        Self {
            contradiction_policy: policy,
            ..Self::new()
        }
    }

    pub fn contradiction_policy(&self) -> ContradictionPolicy {
        self.contradiction_policy
    }

    pub fn get(&self, id: &str) -> Option<Arc<Assertion>> {
        self.assertions.get(id).map(|e| e.clone())
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.assertions.get(id).map(|a| a.active).unwrap_or(false)
    }

    fn support_active(&self, support: &BTreeSet<String>) -> bool {
        support.iter().all(|id| self.is_active(id))
    }

    /// Adds `assertion` with justification set `support`, computing its
    /// initial active status (spec §4.5: "Add").
    pub fn add(
        &self,
        mut assertion: Assertion,
        support: BTreeSet<String>,
        events: &mut Vec<TmsEvent>,
    ) -> Result<Arc<Assertion>, TmsError> {
        let _guard = self.cascade_lock.write();
        if self.assertions.contains_key(&assertion.id) {
            return Err(TmsError::DuplicateId(assertion.id));
        }
        for s in &support {
            if !self.assertions.contains_key(s) {
                return Err(TmsError::MissingSupporter(s.clone()));
            }
        }
        let active = support.is_empty() || self.support_active(&support);
        assertion.active = active;
        assertion.justification_ids = support.clone();
        let arc = Arc::new(assertion);
        self.assertions.insert(arc.id.clone(), arc.clone());
        self.justifications.insert(arc.id.clone(), support.clone());
        for s in &support {
            self.dependents.entry(s.clone()).or_default().insert(arc.id.clone());
        }
        if !active {
            events.push(TmsEvent::StatusChanged {
                id: arc.id.clone(),
                active: false,
            });
        } else {
            self.check_contradiction(&arc, events);
        }
        Ok(arc)
    }

    fn check_contradiction(&self, assertion: &Assertion, events: &mut Vec<TmsEvent>) {
        let complement = assertion.kif.complement();
        for entry in self.assertions.iter() {
            let other = entry.value();
            if other.kb_id == assertion.kb_id && other.active && other.kif == complement {
                events.push(TmsEvent::ContradictionDetected {
                    ids: (assertion.id.clone(), other.id.clone()),
                    kb_id: assertion.kb_id.clone(),
                });
                if self.contradiction_policy == ContradictionPolicy::RetractWeakest {
                    tracing::debug!(
                        "RetractWeakest policy selected but not yet wired to an arbiter; logging only"
                    );
                }
            }
        }
    }

    /// Retracts `id`: removes it from all internal maps and recursively
    /// updates the status of its former dependents in dependency-DAG
    /// post-order (spec §4.5, §5 "Cascaded status changes... emitted in a
    /// post-order of the dependency DAG").
    pub fn retract(&self, id: &str, events: &mut Vec<TmsEvent>) {
        let _guard = self.cascade_lock.write();
        self.retract_inner(id, events);
    }

    fn retract_inner(&self, id: &str, events: &mut Vec<TmsEvent>) {
        let Some((_, assertion)) = self.assertions.remove(id) else {
            return;
        };
        if let Some((_, support)) = self.justifications.remove(id) {
            for s in support {
                if let Some(mut d) = self.dependents.get_mut(&s) {
                    d.remove(id);
                }
            }
        }
        let former_dependents = self
            .dependents
            .remove(id)
            .map(|(_, ds)| ds)
            .unwrap_or_default();

        for dep in &former_dependents {
            self.update_status(dep, events);
        }

        if assertion.active {
            events.push(TmsEvent::Retracted { id: id.to_string() });
        } else {
            events.push(TmsEvent::StatusChanged {
                id: id.to_string(),
                active: false,
            });
        }
    }

    /// Recomputes `id`'s active status from its current supporters and
    /// propagates to its own dependents if the status changed.
    fn update_status(&self, id: &str, events: &mut Vec<TmsEvent>) {
        let Some(support) = self.justifications.get(id).map(|s| s.clone()) else {
            return;
        };
        let new_active = !support.is_empty() && self.support_active(&support);
        let changed = {
            let Some(mut entry) = self.assertions.get_mut(id) else {
                return;
            };
            if entry.active == new_active {
                false
            } else {
                let mut updated = (**entry).clone();
                updated.active = new_active;
                *entry = Arc::new(updated);
                true
            }
        };
        if !changed {
            return;
        }
        events.push(TmsEvent::StatusChanged {
            id: id.to_string(),
            active: new_active,
        });
        if new_active {
            if let Some(a) = self.get(id) {
                self.check_contradiction(&a, events);
            }
        }
        if let Some(deps) = self.dependents.get(id).map(|d| d.clone()) {
            for dep in deps {
                self.update_status(&dep, events);
            }
        }
    }

    /// All ids currently marked active in this TMS (across every KB).
    pub fn active_ids(&self) -> Vec<String> {
        self.assertions
            .iter()
            .filter(|e| e.value().active)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assertions.contains_key(id)
    }

    /// Every id currently tracked under `kb_id`, active or not (used by
    /// `RetractionType::ByNote`).
    pub fn ids_for_kb(&self, kb_id: &str) -> Vec<String> {
        self.assertions
            .iter()
            .filter(|e| e.value().kb_id == kb_id)
            .map(|e| e.key().clone())
            .collect()
    }

    /// For diagnostics / the `not (not x)` simplification complement check.
    pub fn complement_term(term: &Term) -> Term {
        term.complement()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::AssertionType;
    use kif_term::parse_one;

    fn ground(id: &str, kif: &str) -> Assertion {
        Assertion {
            id: id.to_string(),
            kif: parse_one(kif).unwrap(),
            priority: 10.0,
            timestamp: 0,
            source_note_id: None,
            justification_ids: BTreeSet::new(),
            assertion_type: AssertionType::Ground,
            is_equality: false,
            is_oriented_equality: false,
            negated: false,
            quantified_vars: vec![],
            derivation_depth: 0,
            active: true,
            kb_id: "kb://global".to_string(),
        }
    }

    #[test]
    fn cascading_retraction_deactivates_dependents_in_order() {
        let tms = Tms::new();
        let mut events = Vec::new();
        tms.add(ground("a1", "(likes Ana Cats)"), BTreeSet::new(), &mut events)
            .unwrap();
        let mut support_b = BTreeSet::new();
        support_b.insert("a1".to_string());
        tms.add(ground("b1", "(happy Ana)"), support_b, &mut events)
            .unwrap();

        events.clear();
        tms.retract("a1", &mut events);

        assert!(matches!(
            events[0],
            TmsEvent::StatusChanged { ref id, active: false } if id == "b1"
        ));
        assert!(matches!(
            events[1],
            TmsEvent::Retracted { ref id } if id == "a1"
        ));
    }

    #[test]
    fn contradiction_is_detected_but_both_kept() {
        let tms = Tms::new();
        let mut events = Vec::new();
        tms.add(ground("a1", "(raining Here)"), BTreeSet::new(), &mut events)
            .unwrap();
        events.clear();
        tms.add(
            ground("a2", "(not (raining Here))"),
            BTreeSet::new(),
            &mut events,
        )
        .unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, TmsEvent::ContradictionDetected { .. })));
        assert!(tms.is_active("a1"));
        assert!(tms.is_active("a2"));
    }

    #[test]
    fn missing_supporter_is_rejected() {
        let tms = Tms::new();
        let mut events = Vec::new();
        let mut support = BTreeSet::new();
        support.insert("ghost".to_string());
        let err = tms.add(ground("b1", "(happy Ana)"), support, &mut events);
        assert!(err.is_err());
    }
}
