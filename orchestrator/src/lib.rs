//! Wires the bus, Cognition and the reasoner plugins together, and owns
//! the three external-input message handlers (spec §4.6-§4.8, §6).

pub mod input;
pub mod retraction;

use kif_bus::{Event, EventBus, EventKind, QueryParameters, QueryType, RetractionType, SystemStatusSnapshot};
use kif_kb::Cognition;
use kif_reasoner::{BackwardChaining, PluginManager, ReasonerContext, ReasonerPlugin};
use kif_term::{reserved, SkolemCounter, Term};
use std::sync::Arc;

/// Owns the shared reasoning state and the event-bus wiring that turns
/// the bus into a working reasoning core: external messages in, derived
/// assertions and query answers out.
pub struct Orchestrator {
    pub ctx: Arc<ReasonerContext>,
    pub bus: Arc<EventBus>,
    pub skolem: Arc<SkolemCounter>,
    pub plugins: Arc<PluginManager>,
}

impl Orchestrator {
    pub fn new(default_kb_capacity: usize) -> Arc<Self> {
        let ctx = Arc::new(ReasonerContext::new(Arc::new(Cognition::new(default_kb_capacity))));
        let bus = Arc::new(EventBus::new());
        let skolem = Arc::new(SkolemCounter::new());
        let backward: Arc<dyn ReasonerPlugin> = Arc::new(BackwardChaining::new());
        let plugins = Arc::new(PluginManager::new(vec![backward]));

        let orchestrator = Arc::new(Self { ctx, bus, skolem, plugins });
        orchestrator.wire();
        orchestrator
    }

    /// Subscribes every plugin and message handler to the bus (spec §4.7:
    /// components only ever talk to each other through `emit`/`on`).
    fn wire(self: &Arc<Self>) {
        {
            let ctx = self.ctx.clone();
            let skolem = self.skolem.clone();
            let bus = self.bus.clone();
            self.bus.on(
                EventKind::AssertionAdded,
                Arc::new(move |event| {
                    if let Event::AssertionAdded { assertion, .. } = &event {
                        kif_reasoner::forward::handle_assertion_added(&ctx, &skolem, assertion, &bus);
                        kif_reasoner::rewrite::handle_assertion_added(&ctx, assertion, &bus);
                        kif_reasoner::ui::handle_assertion_added(&ctx, assertion, &bus);
                    }
                }),
            );
        }
        {
            let ctx = self.ctx.clone();
            let skolem = self.skolem.clone();
            let bus = self.bus.clone();
            self.bus.on(
                EventKind::ExternalInput,
                Arc::new(move |event| {
                    if let Event::ExternalInput { term, source_id, target_note_id } = event {
                        input::handle_external_input(
                            &ctx,
                            &skolem,
                            &bus,
                            &term,
                            &source_id,
                            target_note_id.as_deref(),
                            false,
                        );
                    }
                }),
            );
        }
        {
            let ctx = self.ctx.clone();
            let bus = self.bus.clone();
            self.bus.on(
                EventKind::RetractionRequest,
                Arc::new(move |event| {
                    if let Event::RetractionRequest { target, kind, source_id, .. } = event {
                        retraction::handle_retraction_request(&ctx, &bus, &target, kind, &source_id);
                    }
                }),
            );
        }
        {
            let ctx = self.ctx.clone();
            let bus = self.bus.clone();
            let plugins = self.plugins.clone();
            self.bus.on(
                EventKind::QueryRequest,
                Arc::new(move |event| {
                    if let Event::QueryRequest { id, kind, pattern, target_kb_id, parameters } = event {
                        let ctx = ctx.clone();
                        let bus = bus.clone();
                        let plugins = plugins.clone();
                        tokio::spawn(async move {
                            let kb_id = target_kb_id.unwrap_or_else(|| reserved::GLOBAL_KB_ID.to_string());
                            let answer =
                                plugins.answer(&ctx, &id, kind, &pattern, &kb_id, &parameters).await;
                            bus.emit(Event::QueryResult { answer });
                        });
                    }
                }),
            );
        }
    }

    pub fn submit_input(&self, term: Term, source_id: impl Into<String>, target_note_id: Option<String>) {
        self.bus.emit(Event::ExternalInput { term, source_id: source_id.into(), target_note_id });
    }

    pub fn submit_retraction(
        &self,
        target: impl Into<String>,
        kind: RetractionType,
        source_id: impl Into<String>,
        target_note_id: Option<String>,
    ) {
        self.bus.emit(Event::RetractionRequest {
            target: target.into(),
            kind,
            source_id: source_id.into(),
            target_note_id,
        });
    }

    /// Emits a `QueryRequest` and returns its freshly minted id; the
    /// answer arrives later as a `QueryResult` event on the bus.
    pub fn submit_query(
        &self,
        kind: QueryType,
        pattern: Term,
        target_kb_id: Option<String>,
        parameters: QueryParameters,
    ) -> String {
        let id = self.ctx.cognition.ids().next(reserved::QUERY_PREFIX);
        self.bus.emit(Event::QueryRequest { id: id.clone(), kind, pattern, target_kb_id, parameters });
        id
    }

    pub fn system_status(&self) -> SystemStatusSnapshot {
        SystemStatusSnapshot {
            status: if self.bus.is_paused() { "paused".to_string() } else { "running".to_string() },
            kb_count: 1,
            kb_capacity: self.ctx.cognition.global.capacity,
            task_queue_size: 0,
            commit_queue_size: 0,
            rule_count: self.ctx.cognition.rules().len(),
        }
    }
}
