//! Knowledge base: path index, truth maintenance, rules and cognition
//! (spec §3, §4.3-§4.6).

pub mod assertion;
pub mod cognition;
pub mod ids;
pub mod kb;
pub mod path_index;
pub mod rule;
pub mod tms;

pub use assertion::{Assertion, AssertionType, EvictionKey, PotentialAssertion};
pub use cognition::{Cognition, RuleEvent};
pub use ids::IdGenerator;
pub use kb::{CommitError, KbEvent, KnowledgeBase};
pub use path_index::PathIndex;
pub use rule::{Rule, RuleParseError};
pub use tms::{ContradictionPolicy, Tms, TmsError, TmsEvent};
