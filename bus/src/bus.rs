//! The single cooperative event dispatcher (spec §4.7, §5).

use crate::events::{BindingMap, Event, EventKind};
use dashmap::DashMap;
use kif_term::{interner, match_pattern, Bindings, Term};
use parking_lot::RwLock;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

pub type Listener = Arc<dyn Fn(Event) + Send + Sync>;
pub type PatternListener = Arc<dyn Fn(BindingMap, Event) + Send + Sync>;

fn bindings_to_map(theta: &Bindings) -> BindingMap {
    theta
        .iter()
        .map(|(spur, term)| (interner::resolve(*spur).to_string(), term.clone()))
        .collect()
}

/// Coordinates every reasoner component without any of them holding a
/// reference to another: everything talks through `emit`/`on` (spec §4.7).
///
/// Scheduling uses `tokio::spawn` per listener per event, matching the
/// "parallel-task, cooperative-suspension acceptable" model of §5: two
/// listeners for the same event race freely, but nothing here ever awaits
/// a listener's completion before `emit` returns.
pub struct EventBus {
    kind_listeners: DashMap<EventKind, Vec<Listener>>,
    pattern_listeners: RwLock<Vec<(Term, PatternListener)>>,
    stopped: AtomicBool,
    paused: AtomicBool,
    pause_notify: tokio::sync::Notify,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            kind_listeners: DashMap::new(),
            pattern_listeners: RwLock::new(Vec::new()),
            stopped: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            pause_notify: tokio::sync::Notify::new(),
        }
    }

    /// Registers `listener` to run on every event of kind `kind`.
    pub fn on(&self, kind: EventKind, listener: Listener) {
        self.kind_listeners.entry(kind).or_default().push(listener);
    }

    /// Registers `listener` to run, with bindings, whenever an
    /// `AssertionAdded`/`TemporaryAssertion` event's term one-way-matches
    /// `pattern` (spec §4.7).
    pub fn on_pattern(&self, pattern: Term, listener: PatternListener) {
        self.pattern_listeners.write().push((pattern, listener));
    }

    /// Schedules every registered listener for `event`. Returns
    /// immediately; listener bodies run on the tokio executor. Dropped
    /// silently (with a log) once the bus has been shut down (spec §5:
    /// "new emits are logged and dropped").
    pub fn emit(&self, event: Event) {
        if self.stopped.load(Ordering::SeqCst) {
            warn!(kind = ?event.kind(), "emit after shutdown, dropping");
            return;
        }
        let kind = event.kind();
        if let Some(listeners) = self.kind_listeners.get(&kind) {
            for listener in listeners.iter().cloned() {
                let ev = event.clone();
                tokio::spawn(async move {
                    dispatch_one(move || listener(ev));
                });
            }
        }
        if let Some(subject) = event.pattern_subject() {
            let subject = subject.clone();
            let patterns = self.pattern_listeners.read().clone();
            for (pattern, listener) in patterns {
                if let Some(theta) = match_pattern(&pattern, &subject, &Bindings::new()) {
                    let bindings = bindings_to_map(&theta);
                    let ev = event.clone();
                    tokio::spawn(async move {
                        dispatch_one(move || listener(bindings, ev));
                    });
                }
            }
        }
    }

    /// Stops accepting new emits and clears every subscription (spec
    /// §4.7: "Shutdown clears all subscriptions").
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.kind_listeners.clear();
        self.pattern_listeners.write().clear();
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.pause_notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks the calling (input-feeding) task while the bus is paused
    /// (spec §5: "a pause flag blocks input-feeding threads on a shared
    /// condition variable until cleared").
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::SeqCst) {
            self.pause_notify.notified().await;
        }
    }
}

/// Runs `f`, catching and logging a panic rather than letting it
/// propagate out of the spawned task (spec §4.7: "Listener failures are
/// logged and do not propagate").
fn dispatch_one(f: impl FnOnce() + Send + 'static) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
        let msg = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "listener panicked".to_string());
        error!(%msg, "event bus listener failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Answer, AnswerStatus};
    use kif_term::parse_one;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn kind_listener_runs_for_matching_event() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        bus.on(
            EventKind::QueryResult,
            Arc::new(move |_ev| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.emit(Event::QueryResult {
            answer: Answer {
                query_id: "q1".into(),
                status: AnswerStatus::Success,
                bindings: vec![],
                explanation: None,
                error: None,
            },
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pattern_listener_receives_bindings() {
        let bus = EventBus::new();
        let seen = Arc::new(RwLock::new(None));
        let s = seen.clone();
        bus.on_pattern(
            parse_one("(likes ?who Cats)").unwrap(),
            Arc::new(move |bindings, _ev| {
                *s.write() = Some(bindings);
            }),
        );
        let assertion = Arc::new(kif_kb::Assertion {
            id: "fact_0".into(),
            kif: parse_one("(likes Ana Cats)").unwrap(),
            priority: 10.0,
            timestamp: 0,
            source_note_id: None,
            justification_ids: Default::default(),
            assertion_type: kif_kb::AssertionType::Ground,
            is_equality: false,
            is_oriented_equality: false,
            negated: false,
            quantified_vars: vec![],
            derivation_depth: 0,
            active: true,
            kb_id: "kb://global".into(),
        });
        bus.emit(Event::AssertionAdded {
            assertion,
            kb_id: "kb://global".into(),
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let bindings = seen.read().clone().expect("pattern listener should fire");
        assert_eq!(bindings.get("?who").unwrap().to_kif(), "Ana");
    }

    #[tokio::test]
    async fn shutdown_drops_future_emits() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        bus.on(
            EventKind::RuleAdded,
            Arc::new(move |_ev| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.shutdown();
        bus.emit(Event::RuleAdded {
            rule_form: parse_one("(=> (a ?x) (b ?x))").unwrap(),
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
