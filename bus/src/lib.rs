//! The async event bus coordinating KB, TMS, reasoner plugins and external
//! collaborators (spec §4.7, §5, §6).

pub mod bus;
pub mod events;

pub use bus::{EventBus, Listener, PatternListener};
pub use events::{
    Answer, AnswerStatus, BindingMap, Event, EventKind, QueryParameters, QueryType,
    RetractionType, SystemStatusSnapshot,
};
