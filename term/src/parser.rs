//! Recursive-descent reader: text -> `Term`, grounded on the teacher's
//! token-cursor parsing style (`parser::ast::TokenCursor` in the original).

use crate::lexer::{tokenize, Spanned, Token};
use crate::term::Term;
use bumpalo::Bump;
use bumpalo::collections::Vec as BVec;

#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at {line}:{col}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

struct Cursor<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Spanned> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eof_error(&self, message: &str) -> ParseError {
        let (line, col) = self
            .tokens
            .last()
            .map(|s| (s.line, s.col))
            .unwrap_or((1, 1));
        ParseError {
            line,
            col,
            message: message.to_string(),
        }
    }
}

fn parse_term(cur: &mut Cursor<'_>) -> Result<Term, ParseError> {
    let spanned = cur
        .next()
        .ok_or_else(|| cur.eof_error("unexpected end of input, expected a term"))?;
    match &spanned.token {
        Token::LParen => {
            let mut items = Vec::new();
            loop {
                match cur.peek() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => {
                        cur.next();
                        break;
                    }
                    Some(_) => items.push(parse_term(cur)?),
                    None => {
                        return Err(ParseError {
                            line: spanned.line,
                            col: spanned.col,
                            message: "unterminated list, expected ')'".to_string(),
                        });
                    }
                }
            }
            Ok(Term::list(items))
        }
        Token::RParen => Err(ParseError {
            line: spanned.line,
            col: spanned.col,
            message: "unexpected ')'".to_string(),
        }),
        Token::Str(s) => Ok(Term::atom(s)),
        Token::Var(v) => {
            if v.len() < 2 {
                return Err(ParseError {
                    line: spanned.line,
                    col: spanned.col,
                    message: format!("variable name too short: {v}"),
                });
            }
            Ok(Term::var(v))
        }
        Token::Atom(a) => Ok(Term::atom(a)),
    }
}

/// Parses every top-level form in `input`. The token stream itself lives in
/// a bump arena for the duration of the parse and is dropped when this
/// function returns; the resulting `Term`s are independently owned
/// (interned, `Arc`-backed) and outlive the arena.
pub fn parse(input: &str) -> Result<Vec<Term>, ParseError> {
    let arena = Bump::new();
    let mut tokens: BVec<Spanned> = BVec::new_in(&arena);
    tokens.extend(tokenize(input));

    let mut cur = Cursor {
        tokens: &tokens,
        pos: 0,
    };
    let mut out = Vec::new();
    while cur.peek().is_some() {
        out.push(parse_term(&mut cur)?);
    }
    Ok(out)
}

/// Parses exactly one top-level term, erroring if there is trailing input.
pub fn parse_one(input: &str) -> Result<Term, ParseError> {
    let mut terms = parse(input)?;
    match terms.len() {
        1 => Ok(terms.pop().unwrap()),
        0 => Err(ParseError {
            line: 1,
            col: 1,
            message: "no term found in input".to_string(),
        }),
        _ => Err(ParseError {
            line: 1,
            col: 1,
            message: "expected exactly one top-level term".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_atom() {
        let t = parse_one("Rex").unwrap();
        assert_eq!(t.to_kif(), "Rex");
    }

    #[test]
    fn round_trip_list() {
        let t = parse_one("(instance Rex Dog)").unwrap();
        assert_eq!(t.to_kif(), "(instance Rex Dog)");
    }

    #[test]
    fn round_trip_nested() {
        let t = parse_one("(=> (instance ?x Dog) (attribute ?x Canine))").unwrap();
        let printed = t.to_kif();
        let reparsed = parse_one(&printed).unwrap();
        assert_eq!(t, reparsed);
    }

    #[test]
    fn quoted_string_round_trips() {
        let t = parse_one(r#"(says Bob "hi \"there\"")"#).unwrap();
        let printed = t.to_kif();
        let reparsed = parse_one(&printed).unwrap();
        assert_eq!(t, reparsed);
    }

    #[test]
    fn comments_are_ignored() {
        let t = parse_one("(foo Bar) ; a trailing comment\n").unwrap();
        assert_eq!(t.to_kif(), "(foo Bar)");
    }

    #[test]
    fn unterminated_list_errors_with_location() {
        let err = parse_one("(foo Bar").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
