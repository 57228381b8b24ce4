//! Session Module
//!
//! Runtime side of the engine: one `GameSession` per game, the delayed
//! continuations it schedules, and the snapshots it hands out.
//!
//! ## Module Structure
//!
//! - `game_session`: Session handle and manager
//! - `scheduler`: Delayed task execution (tokio and manual clocks)
//! - `protocol`: Snapshot and phase types

pub mod game_session;
pub mod scheduler;
pub mod protocol;

pub use game_session::{GameSession, SessionError, SessionId, SessionManager};
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
pub use protocol::{SessionPhase, Snapshot};
