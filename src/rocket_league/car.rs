use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::game_state::Team;
use super::physics_object::Physics;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub physics: Physics,
    pub is_demolished: bool,
    pub has_wheel_contact: bool,
    pub is_super_sonic: bool,
    pub jumped: bool,
    pub double_jumped: bool,
    pub name: String,
    pub team: u8,
    /// Always in [0, 100].
    pub boost: u8,
}

impl PlayerInfo {
    pub fn team(&self) -> Option<Team> {
        Team::from_u8(self.team)
    }
}

/// Rounds a boost fraction up to a whole percentage.
pub fn boost_percent(amount: f32) -> u8 {
    if !amount.is_finite() {
        return 0;
    }
    (amount * 100.0).ceil().clamp(0.0, 100.0) as u8
}
