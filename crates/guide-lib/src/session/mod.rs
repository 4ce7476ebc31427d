pub mod orchestrator;
pub mod turn;

pub use orchestrator::{AskOutcome, Orchestrator, SessionState, StartOutcome, build_prompt};
pub use turn::{History, Role, Turn};
