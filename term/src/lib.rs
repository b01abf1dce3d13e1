//! Term algebra, interner, lexer, parser, unifier and Skolemizer for the
//! KIF reasoning core (spec §4.1, §4.2).

pub mod interner;
pub mod lexer;
pub mod parser;
pub mod skolem;
pub mod term;
pub mod unify;

pub use parser::{parse, parse_one, ParseError};
pub use skolem::{skolemize, SkolemCounter};
pub use term::{reserved, Term};
pub use unify::{match_pattern, rewrite, subst, subst_fully, unify, Bindings, MAX_DEPTH};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_atom_name() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_-]{0,8}".prop_map(|s| s)
    }

    fn arb_var_name() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9]{0,5}".prop_map(|s| format!("?{s}"))
    }

    fn arb_term() -> impl Strategy<Value = Term> {
        let leaf = prop_oneof![
            arb_atom_name().prop_map(|s| Term::atom(&s)),
            arb_var_name().prop_map(|s| Term::var(&s)),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop::collection::vec(inner, 1..4).prop_map(Term::list)
        })
    }

    proptest! {
        #[test]
        fn parse_to_kif_round_trips(t in arb_term()) {
            let printed = t.to_kif();
            let reparsed = parse_one(&printed).expect("printed form must reparse");
            prop_assert_eq!(&t, &reparsed);
        }

        #[test]
        fn subst_fully_idempotent(t in arb_term()) {
            let theta = Bindings::new();
            let once = subst_fully(&t, &theta);
            let twice = subst_fully(&once, &theta);
            prop_assert_eq!(once, twice);
        }
    }
}
