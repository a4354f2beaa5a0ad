pub mod agent;
pub mod clock;
pub mod common;
pub mod config;
pub mod control;
pub mod dump;
pub mod error;
pub mod game_event;
pub mod kickoff;
pub mod memory_io;
pub mod observation;
pub mod rocket_league;
pub mod session;
pub mod telemetry;
pub mod tick_loop;

#[cfg(test)]
mod test_support;

pub use agent::{Action, DecisionAgent};
pub use config::BotConfig;
pub use error::PipelineError;
pub use game_event::{BotEvent, GameEvent, GameSource};
pub use memory_io::{MemoryIo, ShmemProcess};
pub use tick_loop::TickLoop;
