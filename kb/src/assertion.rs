//! Assertion and PotentialAssertion (spec §3).

use kif_term::Term;
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssertionType {
    Ground,
    Universal,
    Skolemized,
}

/// The pre-commit proposal: same shape as [`Assertion`] minus id/timestamp/
/// active/kb, and compared by `kif` alone (spec §3).
#[derive(Debug, Clone)]
pub struct PotentialAssertion {
    pub kif: Term,
    pub priority: f64,
    pub source_note_id: Option<String>,
    pub justification_ids: BTreeSet<String>,
    pub assertion_type: AssertionType,
    pub is_equality: bool,
    pub is_oriented_equality: bool,
    pub negated: bool,
    pub quantified_vars: Vec<String>,
    pub derivation_depth: i64,
}

impl PartialEq for PotentialAssertion {
    fn eq(&self, other: &Self) -> bool {
        self.kif == other.kif
    }
}
impl Eq for PotentialAssertion {}

impl PotentialAssertion {
    /// A plain, ground, non-negated, non-equality fact with empty support
    /// (an input, not a derivation).
    pub fn input(kif: Term, priority: f64, source_note_id: Option<String>) -> Self {
        let negated = kif.operator() == Some("not");
        Self {
            kif,
            priority,
            source_note_id,
            justification_ids: BTreeSet::new(),
            assertion_type: AssertionType::Ground,
            is_equality: false,
            is_oriented_equality: false,
            negated,
            quantified_vars: Vec::new(),
            derivation_depth: 0,
        }
    }
}

/// A committed, TMS-tracked assertion (spec §3).
#[derive(Debug, Clone)]
pub struct Assertion {
    pub id: String,
    pub kif: Term,
    pub priority: f64,
    pub timestamp: u64,
    pub source_note_id: Option<String>,
    pub justification_ids: BTreeSet<String>,
    pub assertion_type: AssertionType,
    pub is_equality: bool,
    pub is_oriented_equality: bool,
    pub negated: bool,
    pub quantified_vars: Vec<String>,
    pub derivation_depth: i64,
    pub active: bool,
    pub kb_id: String,
}

impl PartialEq for Assertion {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Assertion {}

impl Assertion {
    pub fn is_ground_or_skolemized(&self) -> bool {
        matches!(
            self.assertion_type,
            AssertionType::Ground | AssertionType::Skolemized
        )
    }

    pub fn eviction_key(&self) -> EvictionKey {
        EvictionKey {
            active: self.active,
            priority: self.priority,
            depth: self.derivation_depth,
            timestamp: self.timestamp,
        }
    }
}

/// Ordering for the capacity-eviction min-heap (spec §3): "active-first then
/// higher priority, lower depth, newer timestamp" ranks assertions worth
/// *keeping* highest; the heap pops the lowest-ranked (worst) assertion
/// first when capacity must be reclaimed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionKey {
    pub active: bool,
    pub priority: f64,
    pub depth: i64,
    pub timestamp: u64,
}

impl Eq for EvictionKey {}

impl Ord for EvictionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.active
            .cmp(&other.active)
            .then_with(|| self.priority.total_cmp(&other.priority))
            .then_with(|| other.depth.cmp(&self.depth))
            .then_with(|| self.timestamp.cmp(&other.timestamp))
    }
}

impl PartialOrd for EvictionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
