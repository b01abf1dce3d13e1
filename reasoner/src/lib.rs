//! Forward/backward chaining, oriented rewriting, universal instantiation
//! and operator plugins built atop `kif-kb` and coordinated via
//! `kif-bus`.

pub mod backward;
pub mod context;
pub mod forward;
pub mod operators;
pub mod query;
pub mod rewrite;
pub mod ui;
pub mod util;

pub use backward::BackwardChaining;
pub use context::{
    publish, ReasonerContext, DEFAULT_BACKWARD_DEPTH, DEFAULT_DERIVATION_DEPTH_CAP,
    MAX_DERIVED_WEIGHT,
};
pub use operators::OperatorRegistry;
pub use query::{PluginManager, ReasonerPlugin};
pub use util::{add_rule_from_form, binder_var_names, equality_flags};
