//! The event vocabulary flowing through the bus (spec §4.7, §6).

use kif_kb::Assertion;
use kif_term::Term;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetractionType {
    ById,
    ByNote,
    ByRuleForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    AskBindings,
    AskTrueFalse,
    AchieveGoal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerStatus {
    Success,
    Failure,
    Timeout,
    Error,
}

/// A variable -> term binding map surfaced across the external interface,
/// keyed by variable name rather than interned `Spur` (spec §6).
pub type BindingMap = HashMap<String, Term>;

#[derive(Debug, Clone)]
pub struct QueryParameters {
    pub max_depth: Option<u32>,
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self { max_depth: None }
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub query_id: String,
    pub status: AnswerStatus,
    pub bindings: Vec<BindingMap>,
    pub explanation: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SystemStatusSnapshot {
    pub status: String,
    pub kb_count: usize,
    pub kb_capacity: usize,
    pub task_queue_size: usize,
    pub commit_queue_size: usize,
    pub rule_count: usize,
}

/// Every event type the bus carries (spec §4.7, §6). Variant discriminants
/// double as the `on(EventType, ..)` subscription key via [`EventKind`].
#[derive(Debug, Clone)]
pub enum Event {
    AssertionAdded { assertion: Arc<Assertion>, kb_id: String },
    AssertionRetracted { assertion: Arc<Assertion>, kb_id: String },
    AssertionEvicted { id: String, kb_id: String },
    AssertionStatusChanged { id: String, active: bool, kb_id: String },
    RuleAdded { rule_form: Term },
    RuleRemoved { rule_form: Term },
    ContradictionDetected { ids: (String, String), kb_id: String },
    ExternalInput { term: Term, source_id: String, target_note_id: Option<String> },
    RetractionRequest {
        target: String,
        kind: RetractionType,
        source_id: String,
        target_note_id: Option<String>,
    },
    QueryRequest {
        id: String,
        kind: QueryType,
        pattern: Term,
        target_kb_id: Option<String>,
        parameters: QueryParameters,
    },
    QueryResult { answer: Answer },
    SystemStatus(SystemStatusSnapshot),
    /// A not-yet-committed candidate term, matched against patterns the
    /// same way `AssertionAdded` is (spec §4.7).
    TemporaryAssertion { term: Term, kb_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AssertionAdded,
    AssertionRetracted,
    AssertionEvicted,
    AssertionStatusChanged,
    RuleAdded,
    RuleRemoved,
    ContradictionDetected,
    ExternalInput,
    RetractionRequest,
    QueryRequest,
    QueryResult,
    SystemStatus,
    TemporaryAssertion,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AssertionAdded { .. } => EventKind::AssertionAdded,
            Event::AssertionRetracted { .. } => EventKind::AssertionRetracted,
            Event::AssertionEvicted { .. } => EventKind::AssertionEvicted,
            Event::AssertionStatusChanged { .. } => EventKind::AssertionStatusChanged,
            Event::RuleAdded { .. } => EventKind::RuleAdded,
            Event::RuleRemoved { .. } => EventKind::RuleRemoved,
            Event::ContradictionDetected { .. } => EventKind::ContradictionDetected,
            Event::ExternalInput { .. } => EventKind::ExternalInput,
            Event::RetractionRequest { .. } => EventKind::RetractionRequest,
            Event::QueryRequest { .. } => EventKind::QueryRequest,
            Event::QueryResult { .. } => EventKind::QueryResult,
            Event::SystemStatus(_) => EventKind::SystemStatus,
            Event::TemporaryAssertion { .. } => EventKind::TemporaryAssertion,
        }
    }

    /// The term to one-way-match registered patterns against, for the two
    /// event kinds the bus pattern-dispatches (spec §4.7: "For
    /// `AssertionAdded` and `TemporaryAssertion` events only").
    pub fn pattern_subject(&self) -> Option<&Term> {
        match self {
            Event::AssertionAdded { assertion, .. } => Some(&assertion.kif),
            Event::TemporaryAssertion { term, .. } => Some(term),
            _ => None,
        }
    }
}
