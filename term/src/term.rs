//! The immutable term algebra: atoms, variables and lists, per spec §3.

use crate::interner::{intern, resolve};
use lasso::Spur;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Reserved atom-name prefixes (spec §6, bit-exact).
pub mod reserved {
    pub const RULE_PREFIX: &str = "rule_";
    pub const FACT_PREFIX: &str = "fact_";
    pub const SKOLEM_CONST_PREFIX: &str = "skc_";
    pub const SKOLEM_FUNC_PREFIX: &str = "skf_";
    pub const TMS_PREFIX: &str = "tms_";
    pub const QUERY_PREFIX: &str = "query_";
    pub const OPERATOR_PREFIX: &str = "op_";

    /// Predicates for which `(pred x x)` (and its negation) is trivially
    /// true/false and rejected on commit (spec §4.4 step 1).
    pub const REFLEXIVE_PREDICATES: &[&str] = &[
        "instance",
        "subclass",
        "subrelation",
        "equivalent",
        "same",
        "equal",
        "domain",
        "range",
    ];

    pub const GLOBAL_KB_ID: &str = "kb://global";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TermKind {
    Atom(Spur),
    Var(Spur),
    List(Vec<Term>),
}

struct TermData {
    kind: TermKind,
    weight: usize,
    vars: BTreeSet<Spur>,
    hash: u64,
    kif: String,
    has_skolem: bool,
}

impl std::fmt::Debug for TermData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.kif)
    }
}

/// A node in the term algebra. Cheap to clone (`Arc`), structurally equal
/// and hashed via a cached hash computed bottom-up at construction time.
#[derive(Clone, Debug)]
pub struct Term(Arc<TermData>);

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.0.hash == other.0.hash && self.0.kind == other.0.kind
    }
}
impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

fn chars_allowed_bare(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-+*/.<>=:".contains(c))
}

fn quote_atom(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn print_atom(name: &str) -> String {
    if chars_allowed_bare(name) {
        name.to_string()
    } else {
        quote_atom(name)
    }
}

fn compute_hash(kind: &TermKind) -> u64 {
    let mut h = std::collections::hash_map::DefaultHasher::new();
    kind.hash(&mut h);
    h.finish()
}

impl Term {
    fn from_kind(kind: TermKind) -> Term {
        let (weight, vars, kif, has_skolem) = match &kind {
            TermKind::Atom(s) => {
                let name = resolve(*s);
                let skolem = name.starts_with(reserved::SKOLEM_CONST_PREFIX);
                (1usize, BTreeSet::new(), print_atom(name), skolem)
            }
            TermKind::Var(s) => {
                let mut vars = BTreeSet::new();
                vars.insert(*s);
                (1usize, vars, resolve(*s).to_string(), false)
            }
            TermKind::List(items) => {
                let mut weight = 1usize;
                let mut vars = BTreeSet::new();
                let mut parts = Vec::with_capacity(items.len());
                let mut has_skolem = false;
                for (i, it) in items.iter().enumerate() {
                    weight += it.weight();
                    vars.extend(it.vars().iter().copied());
                    parts.push(it.to_kif());
                    if it.has_skolem() {
                        has_skolem = true;
                    }
                    if i == 0 {
                        if let TermKind::Atom(s) = &it.0.kind {
                            if resolve(*s).starts_with(reserved::SKOLEM_FUNC_PREFIX) {
                                has_skolem = true;
                            }
                        }
                    }
                }
                (weight, vars, format!("({})", parts.join(" ")), has_skolem)
            }
        };
        let hash = compute_hash(&kind);
        Term(Arc::new(TermData {
            kind,
            weight,
            vars,
            hash,
            kif,
            has_skolem,
        }))
    }

    pub fn atom(name: &str) -> Term {
        Term::from_kind(TermKind::Atom(intern(name)))
    }

    /// `name` must start with `?` and have length >= 2; callers constructing
    /// terms from a parsed token already hold this invariant, this
    /// constructor asserts it defensively for programmatic callers.
    pub fn var(name: &str) -> Term {
        debug_assert!(
            name.starts_with('?') && name.len() >= 2,
            "variable name must start with '?' and be at least 2 chars: {name}"
        );
        Term::from_kind(TermKind::Var(intern(name)))
    }

    pub fn list(items: Vec<Term>) -> Term {
        Term::from_kind(TermKind::List(items))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self.0.kind, TermKind::Atom(_))
    }

    pub fn is_var(&self) -> bool {
        matches!(self.0.kind, TermKind::Var(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.0.kind, TermKind::List(_))
    }

    pub fn as_atom_str(&self) -> Option<&str> {
        match &self.0.kind {
            TermKind::Atom(s) => Some(resolve(*s)),
            _ => None,
        }
    }

    pub fn as_var_str(&self) -> Option<&str> {
        match &self.0.kind {
            TermKind::Var(s) => Some(resolve(*s)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match &self.0.kind {
            TermKind::List(v) => Some(v),
            _ => None,
        }
    }

    /// The first element of a list, iff it is an atom: the list's operator.
    pub fn operator(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(|t| t.as_atom_str())
    }

    pub fn weight(&self) -> usize {
        self.0.weight
    }

    pub fn vars(&self) -> &BTreeSet<Spur> {
        &self.0.vars
    }

    pub fn is_ground(&self) -> bool {
        self.0.vars.is_empty()
    }

    pub fn has_skolem(&self) -> bool {
        self.0.has_skolem
    }

    pub fn to_kif(&self) -> String {
        self.0.kif.clone()
    }

    /// `true` iff this term is `(not inner)` for some `inner`.
    pub fn is_negation(&self) -> bool {
        self.operator() == Some("not") && self.as_list().map(|l| l.len() == 2).unwrap_or(false)
    }

    /// Strips or adds a `(not ...)` wrapper, producing the logical
    /// complement used by TMS contradiction checks (spec §4.5).
    pub fn complement(&self) -> Term {
        if let Some(items) = self.as_list() {
            if items.len() == 2 && items[0].as_atom_str() == Some("not") {
                return items[1].clone();
            }
        }
        Term::list(vec![Term::atom("not"), self.clone()])
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.kif)
    }
}
