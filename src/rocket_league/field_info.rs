use serde::{Deserialize, Serialize};

use crate::common::Vec3;
use crate::error::DecodeError;
use crate::game_event::GameEvent;

use super::{MAX_BOOSTS, MAX_GOALS};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostPad {
    pub location: Vec3,
    pub is_full_boost: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalInfo {
    pub team_num: u8,
    pub location: Vec3,
    pub direction: Vec3,
    pub width: f32,
    pub height: f32,
}

/// Static arena layout, read once per game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub boost_pads: Vec<BoostPad>,
    pub goals: Vec<GoalInfo>,
}

impl FieldInfo {
    pub fn capture(game_event: &dyn GameEvent) -> Result<Self, DecodeError> {
        let boost_pads = game_event
            .boost_pads()?
            .iter()
            .take(MAX_BOOSTS)
            .map(|pad| BoostPad {
                location: pad.location,
                is_full_boost: pad.is_big,
            })
            .collect();
        let goals = game_event
            .goals()?
            .iter()
            .take(MAX_GOALS)
            .map(|goal| GoalInfo {
                team_num: goal.team_num,
                location: goal.location,
                direction: goal.direction,
                width: goal.width,
                height: goal.height,
            })
            .collect();
        Ok(FieldInfo { boost_pads, goals })
    }

    pub fn goal_of(&self, team_num: u8) -> Option<&GoalInfo> {
        self.goals.iter().find(|goal| goal.team_num == team_num)
    }
}
