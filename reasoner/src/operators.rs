//! Built-in arithmetic/comparison operators keyed by predicate atom (spec
//! §4.13).

use dashmap::DashMap;
use kif_term::Term;
use std::sync::Arc;

pub type OperatorFn = Arc<dyn Fn(&[Term]) -> Option<Term> + Send + Sync>;

/// A concurrent map from predicate atom to operator (spec §5: "the operator
/// registry is a concurrent map").
pub struct OperatorRegistry {
    ops: DashMap<String, OperatorFn>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn numeric_args(args: &[Term]) -> Option<Vec<f64>> {
    args.iter()
        .map(|t| t.as_atom_str().and_then(|s| s.parse::<f64>().ok()))
        .collect()
}

fn fmt_number(n: f64) -> Term {
    Term::atom(&format!("{n}"))
}

fn bool_term(b: bool) -> Term {
    Term::atom(if b { "true" } else { "false" })
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self { ops: DashMap::new() }
    }

    pub fn register(&self, predicate: &str, f: OperatorFn) {
        self.ops.insert(predicate.to_string(), f);
    }

    pub fn get(&self, predicate: &str) -> Option<OperatorFn> {
        self.ops.get(predicate).map(|e| e.clone())
    }

    pub fn contains(&self, predicate: &str) -> bool {
        self.ops.contains_key(predicate)
    }

    /// The registry pre-loaded with the arithmetic/comparison built-ins
    /// named in spec §4.13.
    pub fn with_builtins() -> Self {
        let reg = Self::new();
        reg.register(
            "+",
            Arc::new(|args| numeric_args(args).map(|ns| fmt_number(ns.iter().sum()))),
        );
        reg.register(
            "-",
            Arc::new(|args| {
                let ns = numeric_args(args)?;
                let (first, rest) = ns.split_first()?;
                Some(fmt_number(rest.iter().fold(*first, |acc, n| acc - n)))
            }),
        );
        reg.register(
            "*",
            Arc::new(|args| {
                numeric_args(args).map(|ns| fmt_number(ns.iter().product()))
            }),
        );
        reg.register(
            "/",
            Arc::new(|args| {
                let ns = numeric_args(args)?;
                let (first, rest) = ns.split_first()?;
                // Division by zero is well-defined as NaN (spec §4.13); a
                // Rust f64 divide already yields it, no special-casing.
                Some(fmt_number(rest.iter().fold(*first, |acc, n| acc / n)))
            }),
        );
        reg.register(
            "<",
            Arc::new(|args| numeric_args(args).map(|ns| bool_term(ns.windows(2).all(|w| w[0] < w[1])))),
        );
        reg.register(
            ">",
            Arc::new(|args| numeric_args(args).map(|ns| bool_term(ns.windows(2).all(|w| w[0] > w[1])))),
        );
        reg.register(
            "<=",
            Arc::new(|args| numeric_args(args).map(|ns| bool_term(ns.windows(2).all(|w| w[0] <= w[1])))),
        );
        reg.register(
            ">=",
            Arc::new(|args| numeric_args(args).map(|ns| bool_term(ns.windows(2).all(|w| w[0] >= w[1])))),
        );
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_sums_numeric_atoms() {
        let reg = OperatorRegistry::with_builtins();
        let op = reg.get("+").unwrap();
        let result = op(&[Term::atom("2"), Term::atom("3")]).unwrap();
        assert_eq!(result.to_kif(), "5");
    }

    #[test]
    fn division_by_zero_is_nan() {
        let reg = OperatorRegistry::with_builtins();
        let op = reg.get("/").unwrap();
        let result = op(&[Term::atom("1"), Term::atom("0")]).unwrap();
        assert_eq!(result.to_kif(), "NaN");
    }

    #[test]
    fn unparseable_argument_yields_no_result() {
        let reg = OperatorRegistry::with_builtins();
        let op = reg.get("+").unwrap();
        assert!(op(&[Term::atom("two"), Term::atom("3")]).is_none());
    }

    #[test]
    fn comparison_returns_boolean_atom() {
        let reg = OperatorRegistry::with_builtins();
        let op = reg.get("<").unwrap();
        let result = op(&[Term::atom("2"), Term::atom("3")]).unwrap();
        assert_eq!(result.to_kif(), "true");
    }
}
