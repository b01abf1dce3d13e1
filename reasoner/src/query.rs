//! The plugin capability set and query-answer merging (spec §4.15, §9
//! "Dynamic dispatch over plugins").

use crate::backward::BackwardChaining;
use crate::context::ReasonerContext;
use crate::util::bindings_to_external;
use async_trait::async_trait;
use kif_bus::{Answer, AnswerStatus, BindingMap, QueryParameters, QueryType};
use kif_term::Term;
use std::sync::Arc;

/// The small capability set every reasoner plugin exposes to the
/// orchestrator (spec §9: `on_assertion_event`, `on_rule_event`,
/// `execute_query`, `features`, `supported_query_types`). Forward
/// chaining, rewriting and universal instantiation only react to events
/// (wired directly in `orchestrator`); backward chaining is the one
/// plugin that answers queries, modeled here as a trait object so the
/// manager can fan out without knowing the concrete plugin types.
#[async_trait]
pub trait ReasonerPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn supported_query_types(&self) -> &[QueryType];

    async fn execute_query(
        &self,
        ctx: &ReasonerContext,
        kind: QueryType,
        pattern: &Term,
        kb_id: &str,
        parameters: &QueryParameters,
    ) -> Answer;
}

fn empty_answer(query_id: &str, status: AnswerStatus) -> Answer {
    Answer {
        query_id: query_id.to_string(),
        status,
        bindings: Vec::new(),
        explanation: None,
        error: None,
    }
}

#[async_trait]
impl ReasonerPlugin for BackwardChaining {
    fn name(&self) -> &'static str {
        "backward_chaining"
    }

    fn supported_query_types(&self) -> &[QueryType] {
        &[QueryType::AskBindings, QueryType::AskTrueFalse, QueryType::AchieveGoal]
    }

    async fn execute_query(
        &self,
        ctx: &ReasonerContext,
        kind: QueryType,
        pattern: &Term,
        kb_id: &str,
        parameters: &QueryParameters,
    ) -> Answer {
        let query_id = ctx.cognition.ids().next(kif_term::reserved::QUERY_PREFIX);
        match kind {
            QueryType::AskTrueFalse => {
                let proved = self
                    .ask_true_false(ctx, pattern, kb_id, parameters.max_depth)
                    .await;
                Answer {
                    status: if proved { AnswerStatus::Success } else { AnswerStatus::Failure },
                    ..empty_answer(&query_id, AnswerStatus::Failure)
                }
            }
            QueryType::AskBindings | QueryType::AchieveGoal => {
                let results = self
                    .ask_bindings(ctx, pattern, kb_id, parameters.max_depth)
                    .await;
                if results.is_empty() {
                    empty_answer(&query_id, AnswerStatus::Failure)
                } else {
                    let bindings: Vec<BindingMap> =
                        results.iter().map(bindings_to_external).collect();
                    Answer {
                        query_id,
                        status: AnswerStatus::Success,
                        bindings,
                        explanation: None,
                        error: None,
                    }
                }
            }
        }
    }
}

/// Fans a `QueryRequest` out to every plugin that supports its
/// `QueryType` and merges the answers (spec §6 "A plugin manager merges
/// per-plugin answers by preferring SUCCESS (union of bindings);
/// otherwise the first non-FAILURE status; else FAILURE").
pub struct PluginManager {
    plugins: Vec<Arc<dyn ReasonerPlugin>>,
}

impl PluginManager {
    pub fn new(plugins: Vec<Arc<dyn ReasonerPlugin>>) -> Self {
        Self { plugins }
    }

    pub async fn answer(
        &self,
        ctx: &ReasonerContext,
        query_id: &str,
        kind: QueryType,
        pattern: &Term,
        kb_id: &str,
        parameters: &QueryParameters,
    ) -> Answer {
        let mut answers = Vec::new();
        for plugin in &self.plugins {
            if !plugin.supported_query_types().contains(&kind) {
                continue;
            }
            let mut answer = plugin
                .execute_query(ctx, kind, pattern, kb_id, parameters)
                .await;
            answer.query_id = query_id.to_string();
            answers.push(answer);
        }
        merge_answers(query_id, answers)
    }
}

fn merge_answers(query_id: &str, answers: Vec<Answer>) -> Answer {
    let successes: Vec<Answer> = answers
        .iter()
        .filter(|a| a.status == AnswerStatus::Success)
        .cloned()
        .collect();
    if !successes.is_empty() {
        let mut bindings = Vec::new();
        for a in successes {
            bindings.extend(a.bindings);
        }
        return Answer {
            query_id: query_id.to_string(),
            status: AnswerStatus::Success,
            bindings,
            explanation: None,
            error: None,
        };
    }
    if let Some(first_non_failure) = answers.iter().find(|a| a.status != AnswerStatus::Failure) {
        return Answer { query_id: query_id.to_string(), ..first_non_failure.clone() };
    }
    empty_answer(query_id, AnswerStatus::Failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_success_and_unions_bindings() {
        let a = Answer {
            query_id: "q".into(),
            status: AnswerStatus::Failure,
            bindings: vec![],
            explanation: None,
            error: None,
        };
        let mut b = a.clone();
        b.status = AnswerStatus::Success;
        b.bindings = vec![BindingMap::new()];
        let merged = merge_answers("q", vec![a, b]);
        assert_eq!(merged.status, AnswerStatus::Success);
        assert_eq!(merged.bindings.len(), 1);
    }

    #[test]
    fn merge_falls_back_to_first_non_failure() {
        let mut timeout = Answer {
            query_id: "q".into(),
            status: AnswerStatus::Timeout,
            bindings: vec![],
            explanation: None,
            error: None,
        };
        timeout.status = AnswerStatus::Timeout;
        let failure = Answer { status: AnswerStatus::Failure, ..timeout.clone() };
        let merged = merge_answers("q", vec![failure, timeout]);
        assert_eq!(merged.status, AnswerStatus::Timeout);
    }

    #[test]
    fn merge_is_failure_when_all_fail() {
        let failure = Answer {
            query_id: "q".into(),
            status: AnswerStatus::Failure,
            bindings: vec![],
            explanation: None,
            error: None,
        };
        let merged = merge_answers("q", vec![failure.clone(), failure]);
        assert_eq!(merged.status, AnswerStatus::Failure);
    }
}
