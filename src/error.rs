use thiserror::Error;

use crate::agent::Action;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MemoryIoError {
    #[error("process not found: {0}")]
    NotFound(String),
    #[error("failed to read {len} bytes at {address:#x}: {reason}")]
    Read {
        address: usize,
        len: usize,
        reason: String,
    },
    #[error("failed to write {len} bytes at {address:#x}: {reason}")]
    Write {
        address: usize,
        len: usize,
        reason: String,
    },
    #[error("process is gone")]
    ProcessGone,
}

impl MemoryIoError {
    pub fn is_process_lost(&self) -> bool {
        matches!(self, MemoryIoError::ProcessGone | MemoryIoError::NotFound(_))
    }
}

/// A collection the snapshot cannot do without could not be read.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("unable to enumerate {0}")]
    Enumerate(&'static str),
    #[error("unable to read {0}")]
    Field(&'static str),
    #[error(transparent)]
    Memory(#[from] MemoryIoError),
}

impl DecodeError {
    pub fn is_process_lost(&self) -> bool {
        match self {
            DecodeError::Memory(err) => err.is_process_lost(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ObservationError {
    #[error("controlled car index {index} is out of range for {num_cars} cars")]
    SelfIndexOutOfRange { index: usize, num_cars: usize },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum KickoffError {
    #[error("kickoff pause without a ball")]
    MissingBall,
    #[error("controlled car index {0} is not in the snapshot")]
    MissingSelf(usize),
}

/// The decision step could not produce an action that is safe to write.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error("decision agent failed: {0:#}")]
    Agent(anyhow::Error),
    #[error("decision agent returned a non-finite action {0:?}")]
    InvalidAction(Action),
}

#[derive(Debug, Error)]
pub enum EnableError {
    #[error("no game event is active")]
    NoGameEvent,
    #[error("no local players found")]
    NoLocalPlayers,
    #[error("multiple local players not supported")]
    MultipleLocalPlayers,
    #[error("player is spectator")]
    Spectator,
    #[error("player car not found")]
    PlayerNotFound,
    #[error("failed to get team index")]
    NoTeam,
    #[error("field info unavailable: {0}")]
    FieldInfo(DecodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors that end the whole session rather than a single tick.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("external process lost: {0}")]
    ProcessLost(MemoryIoError),
}
