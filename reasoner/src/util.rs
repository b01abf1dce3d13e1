//! Small term-classification helpers shared by every plugin in this crate.

use crate::context::ReasonerContext;
use kif_bus::EventBus;
use kif_kb::Rule;
use kif_term::{reserved, subst_fully, Bindings, Term};

/// Converts an internal `Spur`-keyed binding map into the external,
/// variable-name-keyed shape queries are reported in (spec §6).
pub fn bindings_to_external(theta: &Bindings) -> kif_bus::BindingMap {
    theta
        .iter()
        .map(|(spur, term)| (kif_term::interner::resolve(*spur).to_string(), term.clone()))
        .collect()
}

/// Splits an antecedent clause into `(negated, pattern)`: `(not list)`
/// unwraps to `(true, list)`; a bare list is `(false, list)` (spec §4.9
/// step 1, §3 "each antecedent clause must be a list or `(not list)`").
pub fn split_clause(clause: &Term) -> (bool, Term) {
    if clause.is_negation() {
        (true, clause.as_list().unwrap()[1].clone())
    } else {
        (false, clause.clone())
    }
}

/// The term an assertion actually carries evidence for: for a negated
/// assertion `(not P)`, that's `P` (so it can be compared against an
/// unwrapped antecedent pattern of matching sign).
pub fn effective_term(kif: &Term) -> Term {
    if kif.is_negation() {
        kif.as_list().unwrap()[1].clone()
    } else {
        kif.clone()
    }
}

/// `(negated, is_equality, is_oriented_equality)` for a term about to be
/// committed (spec §4.8 "oriented iff the weight of the LHS exceeds the
/// weight of the RHS").
pub fn equality_flags(term: &Term) -> (bool, bool, bool) {
    let negated = term.is_negation();
    let inner = if negated {
        &term.as_list().unwrap()[1]
    } else {
        term
    };
    if inner.operator() == Some("=") {
        if let Some(items) = inner.as_list() {
            if items.len() == 3 {
                let oriented = items[1].weight() > items[2].weight();
                return (negated, true, oriented);
            }
        }
    }
    (negated, false, false)
}

/// Projects `theta` onto `pattern`'s free variables, resolving each
/// through the full binding chain (spec §6: answer bindings are a map
/// over the query's own variables, not the solver's internal
/// alpha-renamed ones).
pub fn project_bindings(pattern: &Term, theta: &Bindings) -> Bindings {
    pattern
        .vars()
        .iter()
        .map(|spur| {
            let name = kif_term::interner::resolve(*spur);
            (*spur, subst_fully(&Term::var(name), theta))
        })
        .collect()
}

/// Extracts quantified variable names from a `forall`/`exists` binder
/// position, which is either a single `?var` or a list of them (spec
/// §4.2, §4.8).
pub fn binder_var_names(vars_term: &Term) -> Vec<String> {
    if let Some(name) = vars_term.as_var_str() {
        vec![name.to_string()]
    } else if let Some(items) = vars_term.as_list() {
        items.iter().filter_map(|t| t.as_var_str().map(str::to_string)).collect()
    } else {
        Vec::new()
    }
}

/// Parses `form` (`(=> ant con)` or `(<=> ant con)`) as a rule, adding the
/// reversed implication too for `<=>` (spec §4.8, §4.9 "forall" consequent
/// case). Shared by forward chaining's derived-rule case and the external
/// input handler's rule case, since both reduce to the same "add a rule,
/// maybe its reverse" operation.
pub fn add_rule_from_form(ctx: &ReasonerContext, bus: &EventBus, form: &Term, priority: f64) {
    let Some(items) = form.as_list() else { return };
    if items.len() != 3 {
        return;
    }
    let forward_form = Term::list(vec![Term::atom("=>"), items[1].clone(), items[2].clone()]);
    add_single_rule(ctx, bus, forward_form, priority);
    if form.operator() == Some("<=>") {
        let reversed = Term::list(vec![Term::atom("=>"), items[2].clone(), items[1].clone()]);
        add_single_rule(ctx, bus, reversed, priority);
    }
}

fn add_single_rule(ctx: &ReasonerContext, bus: &EventBus, form: Term, priority: f64) {
    let id = ctx.cognition.ids().next(reserved::RULE_PREFIX);
    if let Ok(rule) = Rule::parse(id, form.clone(), priority) {
        let (inserted, _event) = ctx.cognition.add_rule(rule);
        if inserted {
            bus.emit(kif_bus::Event::RuleAdded { rule_form: form });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kif_kb::Cognition;
    use kif_term::parse_one;
    use std::sync::Arc;

    #[test]
    fn split_clause_unwraps_negation() {
        let (negated, pattern) = split_clause(&parse_one("(not (p ?x))").unwrap());
        assert!(negated);
        assert_eq!(pattern, parse_one("(p ?x)").unwrap());
    }

    #[test]
    fn split_clause_passes_through_plain_list() {
        let (negated, pattern) = split_clause(&parse_one("(p ?x)").unwrap());
        assert!(!negated);
        assert_eq!(pattern, parse_one("(p ?x)").unwrap());
    }

    #[test]
    fn equality_flags_detects_orientation_by_weight() {
        let (negated, is_eq, oriented) = equality_flags(&parse_one("(= (father Bob) Alice)").unwrap());
        assert!(!negated);
        assert!(is_eq);
        assert!(oriented);
    }

    #[test]
    fn binder_var_names_handles_single_and_list() {
        assert_eq!(binder_var_names(&parse_one("?x").unwrap()), vec!["?x".to_string()]);
        assert_eq!(
            binder_var_names(&parse_one("(?x ?y)").unwrap()),
            vec!["?x".to_string(), "?y".to_string()]
        );
    }

    #[test]
    fn add_rule_from_form_adds_both_directions_for_biconditional() {
        let ctx = ReasonerContext::new(Arc::new(Cognition::new(100)));
        let bus = EventBus::new();
        let form = parse_one("(<=> (a ?x) (b ?x))").unwrap();
        add_rule_from_form(&ctx, &bus, &form, 10.0);
        assert_eq!(ctx.cognition.rules().len(), 2);
    }
}
