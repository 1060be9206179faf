pub mod kinds;
pub mod record;
pub mod scalars;
pub mod state;

pub use kinds::{
    CodeContent, EpisodicContent, MemoryKind, ProceduralContent, SemanticContent, TaskContent,
    TypedContent,
};
pub use record::MemoryRecord;
pub use scalars::{Activation, Confidence, Priority, Progress, Strength, Usefulness};
pub use state::ConsolidationState;
