//! `RetractionRequest` handling (spec §6): retract by assertion id, by
//! note (every assertion filed under a KB), or by rule form.

use kif_bus::{Event, EventBus, RetractionType};
use kif_reasoner::{publish, ReasonerContext};
use kif_term::Term;
use tracing::{info, warn};

pub fn handle_retraction_request(
    ctx: &ReasonerContext,
    bus: &EventBus,
    target: &str,
    kind: RetractionType,
    source_id: &str,
) {
    match kind {
        RetractionType::ById => {
            let mut events = Vec::new();
            ctx.cognition.retract(target, &mut events);
            publish(bus, &ctx.cognition, events);
        }
        RetractionType::ByNote => {
            for id in ctx.cognition.tms().ids_for_kb(target) {
                let mut events = Vec::new();
                ctx.cognition.retract(&id, &mut events);
                publish(bus, &ctx.cognition, events);
            }
            info!(note = target, source_id, "retracted note's assertions");
        }
        RetractionType::ByRuleForm => match kif_term::parse_one(target) {
            Ok(form) => retract_rule_form(ctx, bus, &form),
            Err(e) => warn!(error = %e, target, "could not parse rule form for retraction"),
        },
    }
}

fn retract_rule_form(ctx: &ReasonerContext, bus: &EventBus, form: &Term) {
    if let Some(kif_kb::RuleEvent::Removed(rule)) = ctx.cognition.remove_rule(form) {
        bus.emit(Event::RuleRemoved { rule_form: rule.form.clone() });
    } else {
        warn!(form = %form, "no matching rule to retract");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kif_kb::{Cognition, PotentialAssertion, Rule};
    use kif_term::parse_one;
    use std::sync::Arc;

    #[test]
    fn retracts_by_id() {
        let ctx = ReasonerContext::new(Arc::new(Cognition::new(1000)));
        let bus = EventBus::new();
        let mut events = Vec::new();
        let a = ctx
            .cognition
            .commit_global(
                PotentialAssertion::input(parse_one("(instance Rex Dog)").unwrap(), 10.0, None),
                &mut events,
            )
            .unwrap();
        handle_retraction_request(&ctx, &bus, &a.id, RetractionType::ById, "user");
        assert!(!ctx.cognition.tms().is_active(&a.id));
    }

    #[test]
    fn retracts_by_rule_form() {
        let ctx = ReasonerContext::new(Arc::new(Cognition::new(1000)));
        let bus = EventBus::new();
        let form = parse_one("(=> (a ?x) (b ?x))").unwrap();
        let rule = Rule::parse("rule_0".into(), form.clone(), 10.0).unwrap();
        ctx.cognition.add_rule(rule);
        assert_eq!(ctx.cognition.rules().len(), 1);
        handle_retraction_request(&ctx, &bus, &form.to_kif(), RetractionType::ByRuleForm, "user");
        assert_eq!(ctx.cognition.rules().len(), 0);
    }

    #[test]
    fn retracts_by_note() {
        let ctx = ReasonerContext::new(Arc::new(Cognition::new(1000)));
        let bus = EventBus::new();
        let mut events = Vec::new();
        ctx.cognition
            .commit_note(
                "note1",
                PotentialAssertion::input(parse_one("(instance Rex Dog)").unwrap(), 10.0, Some("note1".into())),
                &mut events,
            )
            .unwrap();
        handle_retraction_request(&ctx, &bus, "note1", RetractionType::ByNote, "user");
        assert!(ctx.cognition.tms().active_ids().is_empty());
    }
}
