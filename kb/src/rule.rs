//! Rules: `(=> antecedent consequent)` / `(<=> ...)` forms (spec §3, §4.8).

use kif_term::Term;
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleParseError {
    #[error("rule form must be a list")]
    NotAList,
    #[error("rule form must be (=> antecedent consequent), got operator {0:?}")]
    WrongOperator(Option<String>),
    #[error("rule form must have exactly 3 elements (operator antecedent consequent)")]
    WrongArity,
    #[error("antecedent clause must be a list or (not list): {0}")]
    BadAntecedentClause(String),
    #[error("'or' in rule antecedents is unsupported")]
    UnsupportedOr,
}

/// A forward/backward-chaining rule. Equality and hashing are by `form`
/// only (spec §3): two syntactically identical rules are the same rule
/// regardless of priority or id.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub form: Term,
    pub antecedent: Term,
    pub consequent: Term,
    pub priority: f64,
    pub antecedents: Arc<Vec<Term>>,
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.form == other.form
    }
}
impl Eq for Rule {}

impl std::hash::Hash for Rule {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.form.to_kif().hash(state);
    }
}

fn validate_clause(clause: &Term) -> Result<(), RuleParseError> {
    if clause.operator() == Some("or") {
        return Err(RuleParseError::UnsupportedOr);
    }
    if clause.is_negation() {
        let inner = &clause.as_list().unwrap()[1];
        if !inner.is_list() {
            return Err(RuleParseError::BadAntecedentClause(clause.to_kif()));
        }
        if inner.operator() == Some("or") {
            return Err(RuleParseError::UnsupportedOr);
        }
        return Ok(());
    }
    if clause.is_list() {
        Ok(())
    } else {
        Err(RuleParseError::BadAntecedentClause(clause.to_kif()))
    }
}

/// Flattens an outer `(and c1 c2 ...)` antecedent into its conjuncts,
/// validating each clause is a list or `(not list)` (spec §3).
fn flatten_antecedent(antecedent: &Term) -> Result<Vec<Term>, RuleParseError> {
    if antecedent.operator() == Some("or") {
        return Err(RuleParseError::UnsupportedOr);
    }
    let clauses = if antecedent.operator() == Some("and") {
        antecedent.as_list().unwrap()[1..].to_vec()
    } else {
        vec![antecedent.clone()]
    };
    for c in &clauses {
        validate_clause(c)?;
    }
    Ok(clauses)
}

impl Rule {
    /// Parses `form` — which must be `(=> antecedent consequent)` — into a
    /// `Rule`. Callers wanting `<=>` semantics parse both directions
    /// separately (spec §4.8: "for `<=>`, also add the reversed
    /// implication").
    pub fn parse(id: String, form: Term, priority: f64) -> Result<Rule, RuleParseError> {
        let items = form.as_list().ok_or(RuleParseError::NotAList)?;
        if items.len() != 3 {
            return Err(RuleParseError::WrongArity);
        }
        match items[0].as_atom_str() {
            Some("=>") => {}
            other => return Err(RuleParseError::WrongOperator(other.map(str::to_string))),
        }
        let antecedent = items[1].clone();
        let consequent = items[2].clone();
        let antecedents = flatten_antecedent(&antecedent)?;
        Ok(Rule {
            id,
            form,
            antecedent,
            consequent,
            priority,
            antecedents: Arc::new(antecedents),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kif_term::parse_one;

    #[test]
    fn parses_simple_implication() {
        let form = parse_one("(=> (instance ?x Dog) (attribute ?x Canine))").unwrap();
        let rule = Rule::parse("rule_0".into(), form, 10.0).unwrap();
        assert_eq!(rule.antecedents.len(), 1);
    }

    #[test]
    fn flattens_conjunctive_antecedent() {
        let form = parse_one("(=> (and (age ?p ?a) (adult ?a)) (votes ?p))").unwrap();
        let rule = Rule::parse("rule_0".into(), form, 10.0).unwrap();
        assert_eq!(rule.antecedents.len(), 2);
    }

    #[test]
    fn rejects_or_antecedent() {
        let form = parse_one("(=> (or (a ?x) (b ?x)) (c ?x))").unwrap();
        let err = Rule::parse("rule_0".into(), form, 10.0).unwrap_err();
        assert!(matches!(err, RuleParseError::UnsupportedOr));
    }

    #[test]
    fn equality_is_by_form_only() {
        let form = parse_one("(=> (a ?x) (b ?x))").unwrap();
        let r1 = Rule::parse("rule_0".into(), form.clone(), 5.0).unwrap();
        let r2 = Rule::parse("rule_1".into(), form, 99.0).unwrap();
        assert_eq!(r1, r2);
    }
}
