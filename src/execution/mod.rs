// Decision cycle: guard, dispatch and the orchestrator tying them together
pub mod dispatcher;
pub mod guard;
pub mod orchestrator;

pub use dispatcher::OrderDispatcher;
pub use guard::PositionGuard;
pub use orchestrator::{CycleOutcome, CycleRecord, DecisionOrchestrator};
