//! Process-wide interning for atom and variable spellings.
//!
//! Every `Term::Atom`/`Term::Var` stores a `lasso::Spur` rather than a
//! `String`, so structural equality between atoms reduces to a `u32`
//! comparison and cloning a `Term` never touches the heap for the leaves.

use lasso::{Spur, ThreadedRodeo};
use std::sync::OnceLock;

static INTERNER: OnceLock<ThreadedRodeo> = OnceLock::new();

fn rodeo() -> &'static ThreadedRodeo {
    INTERNER.get_or_init(ThreadedRodeo::new)
}

/// Interns `s`, returning a stable key usable for equality and lookup.
pub fn intern(s: &str) -> Spur {
    rodeo().get_or_intern(s)
}

/// Resolves a previously-interned key back to its spelling.
pub fn resolve(key: Spur) -> &'static str {
    rodeo().resolve(&key)
}
