use crate::agent::Action;
use crate::error::KickoffError;
use crate::rocket_league::{GameSnapshot, Team};

/// Cars within this many units of the closest distance to the ball contend for the kickoff.
pub const KICKOFF_TAKER_TOLERANCE: f32 = 10.0;

const TICKS_PER_UNIT: usize = 4;

/// Speedflip kickoff, as (units of 4 ticks, action).
const KICKOFF_PHASES: [(usize, Action); 7] = [
    (11, Action::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
    (4, Action::new([1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
    (2, Action::new([1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0])),
    (1, Action::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
    (1, Action::new([1.0, 0.0, -0.7, 0.8, 0.0, 1.0, 1.0, 0.0])),
    (13, Action::new([1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
    (10, Action::new([1.0, 0.0, 0.5, 0.0, 1.0, 0.0, 0.0, 0.0])),
];

pub fn kickoff_len() -> usize {
    KICKOFF_PHASES
        .iter()
        .map(|(units, _)| units * TICKS_PER_UNIT)
        .sum()
}

pub fn kickoff_action(index: usize) -> Option<Action> {
    let mut remaining = index;
    for (units, action) in KICKOFF_PHASES.iter() {
        let ticks = units * TICKS_PER_UNIT;
        if remaining < ticks {
            return Some(*action);
        }
        remaining -= ticks;
    }
    None
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KickoffState {
    #[default]
    Undecided,
    NotTaker,
    Step(usize),
}

impl KickoffState {
    /// -1 undecided, -2 not taking the kickoff, otherwise the choreography step.
    pub fn index(&self) -> i64 {
        match self {
            KickoffState::Undecided => -1,
            KickoffState::NotTaker => -2,
            KickoffState::Step(n) => *n as i64,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct KickoffSequencer {
    state: KickoffState,
}

impl KickoffSequencer {
    pub fn new() -> Self {
        KickoffSequencer::default()
    }

    pub fn state(&self) -> KickoffState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = KickoffState::Undecided;
    }

    /// Advances the choreography and returns the action overriding the model this tick, if any.
    pub fn step(
        &mut self,
        snapshot: &GameSnapshot,
        self_index: usize,
        ticks_elapsed: u64,
    ) -> Result<Option<Action>, KickoffError> {
        if !snapshot.game_info.is_kickoff_pause {
            self.state = KickoffState::Undecided;
            return Ok(None);
        }
        let ball = snapshot.ball_location().ok_or(KickoffError::MissingBall)?;
        self.state = match self.state {
            KickoffState::Step(n) => KickoffState::Step(n + ticks_elapsed as usize),
            KickoffState::Undecided => {
                let taker = is_kickoff_taker(snapshot, self_index)?;
                tracing::debug!(self_index, taker, "kickoff role decided");
                if taker {
                    KickoffState::Step(0)
                } else {
                    KickoffState::NotTaker
                }
            }
            KickoffState::NotTaker => KickoffState::NotTaker,
        };
        match self.state {
            // The ball leaving the center line means the kickoff has been hit.
            KickoffState::Step(n) if ball.y == 0.0 => Ok(kickoff_action(n)),
            _ => Ok(None),
        }
    }
}

/// The closest car (within tolerance) takes the kickoff; between equally close teammates the
/// one further left goes. Positive x is left for blue and right for orange.
pub fn is_kickoff_taker(snapshot: &GameSnapshot, self_index: usize) -> Result<bool, KickoffError> {
    let ball = snapshot.ball_location().ok_or(KickoffError::MissingBall)?;
    let me = snapshot
        .cars
        .get(self_index)
        .ok_or(KickoffError::MissingSelf(self_index))?;
    let distances: Vec<f32> = snapshot
        .cars
        .iter()
        .map(|car| car.physics.location.planar_distance(&ball))
        .collect();
    let closest = distances.iter().copied().fold(f32::INFINITY, f32::min);
    let my_distance = distances[self_index];
    if (closest - my_distance).abs() > KICKOFF_TAKER_TOLERANCE {
        return Ok(false);
    }
    let my_x = me.physics.location.x;
    let yields = snapshot.cars.iter().enumerate().any(|(idx, car)| {
        if idx == self_index
            || car.team != me.team
            || (distances[idx] - my_distance).abs() > KICKOFF_TAKER_TOLERANCE
        {
            return false;
        }
        let x = car.physics.location.x;
        match me.team() {
            Some(Team::Orange) => x <= my_x,
            _ => x >= my_x,
        }
    });
    Ok(!yields)
}
