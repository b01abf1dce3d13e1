//! Token stream for the KIF reader, grounded on the teacher's `logos`-based
//! tokenizer (`tokenize` in the original `src/lexer.rs`).

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    #[regex(r#""(\\.|[^"\\])*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"\?[^()\s\";?]+", |lex| lex.slice().to_string())]
    Var(String),

    #[regex(r#"[^()\s\";?][^()\s\";]*"#, |lex| lex.slice().to_string())]
    Atom(String),
}

fn unescape(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// A lexed token plus the 1-based line/column of its first character,
/// used by the parser to report `ParseError` locations (spec §4.1).
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

/// Tokenizes `input`, tracking line/column by scanning consumed bytes.
/// Unrecognized characters are skipped with a warning rather than aborting
/// the whole parse (scanner errors are reported by the parser instead, once
/// it discovers it cannot build a term from an empty token stream).
pub fn tokenize(input: &str) -> Vec<Spanned> {
    let mut lexer = Token::lexer(input);
    let mut out = Vec::new();
    let mut line = 1usize;
    let mut line_start = 0usize;
    let mut consumed = 0usize;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        // advance line/col bookkeeping over any skipped bytes too
        for (i, b) in input.as_bytes()[consumed..span.start].iter().enumerate() {
            if *b == b'\n' {
                line += 1;
                line_start = consumed + i + 1;
            }
        }
        consumed = span.start;
        let col = span.start - line_start + 1;
        match result {
            Ok(token) => out.push(Spanned {
                token,
                line,
                col,
            }),
            Err(_) => {
                tracing::warn!(at = span.start, "unrecognized character in KIF input");
            }
        }
        for (i, b) in input.as_bytes()[span.start..span.end].iter().enumerate() {
            if *b == b'\n' {
                line += 1;
                line_start = span.start + i + 1;
            }
        }
        consumed = span.end;
    }
    out
}
