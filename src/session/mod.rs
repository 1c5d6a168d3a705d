//! Upload session module
//!
//! State machine `Idle → Initiating → Transferring ⇄ Paused → Completed`,
//! with `Failed` reachable from `Initiating` and `Transferring`.

mod control;
mod orchestrator;
mod state;

pub use control::PauseToken;
pub use orchestrator::{SessionOutcome, UploadSession};
pub use state::{ProgressSnapshot, SessionRecord, SessionState};
