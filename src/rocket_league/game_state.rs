use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::car::PlayerInfo;
use super::physics_object::Physics;

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, Serialize, Deserialize)]
pub enum Team {
    Blue = 0,
    Orange = 1,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub seconds_elapsed: f64,
    pub game_time_remaining: f32,
    pub is_overtime: bool,
    pub is_unlimited_time: bool,
    pub is_round_active: bool,
    pub is_kickoff_pause: bool,
    pub is_match_ended: bool,
    pub world_gravity_z: f32,
    pub game_speed: f32,
    pub frame_num: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BallInfo {
    pub physics: Physics,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub team_index: u8,
    pub score: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostPadState {
    pub is_active: bool,
    /// Seconds since the pad was taken; 0 while active.
    pub timer: f32,
}

/// Everything decoded for one tick. Built fresh each tick and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_info: GameInfo,
    pub ball: Option<BallInfo>,
    pub cars: Vec<PlayerInfo>,
    pub teams: Vec<TeamInfo>,
    pub boost_pads: Vec<BoostPadState>,
}

impl GameSnapshot {
    pub fn num_cars(&self) -> usize {
        self.cars.len()
    }

    pub fn ball_location(&self) -> Option<crate::common::Vec3> {
        self.ball.map(|ball| ball.physics.location)
    }
}
