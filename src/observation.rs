use std::f32::consts::PI;

use crate::agent::Action;
use crate::common::Vec3;
use crate::error::ObservationError;
use crate::rocket_league::{FieldInfo, GameSnapshot, PlayerInfo, Team};

pub const POS_STD: f32 = 2300.0;
pub const ANG_STD: f32 = PI;
pub const BALL_FEATURES: usize = 9;
pub const CAR_FEATURES: usize = 19;
pub const PAD_FEATURES: usize = 5;

/// Fixed-shape model input for a single decision.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Snapshot car indices in observation order: self, teammates, opponents.
    pub car_order: Vec<usize>,
    pub cars: Vec<[f32; CAR_FEATURES]>,
    pub ball: [f32; BALL_FEATURES],
    pub boost_pads: Vec<[f32; PAD_FEATURES]>,
    pub own_goal: [f32; 3],
    pub opponent_goal: [f32; 3],
    pub previous_action: Action,
    /// True when the view is mirrored so that the controlled team always attacks +y.
    pub inverted: bool,
}

/// Builds observations against the arena layout captured when the bot was enabled.
#[derive(Clone, Debug)]
pub struct ObservationBuilder {
    field_info: FieldInfo,
}

impl ObservationBuilder {
    pub fn new(field_info: FieldInfo) -> Self {
        ObservationBuilder { field_info }
    }

    pub fn field_info(&self) -> &FieldInfo {
        &self.field_info
    }

    pub fn build(
        &self,
        snapshot: &GameSnapshot,
        self_index: usize,
        previous_action: &Action,
    ) -> Result<Observation, ObservationError> {
        let car_order = order_cars(snapshot, self_index)?;
        let player = &snapshot.cars[self_index];
        let inverted = player.team() == Some(Team::Orange);
        let view = |v: Vec3| if inverted { v.inverted() } else { v };

        let cars = car_order
            .iter()
            .map(|&idx| {
                let car = &snapshot.cars[idx];
                car_features(car, car.team == player.team, &view)
            })
            .collect();

        let mut ball = [0.0; BALL_FEATURES];
        if let Some(info) = &snapshot.ball {
            let physics = &info.physics;
            ball[0..3].copy_from_slice(&view(physics.location).scaled(1.0 / POS_STD).to_array());
            ball[3..6].copy_from_slice(&view(physics.velocity).scaled(1.0 / POS_STD).to_array());
            ball[6..9].copy_from_slice(
                &view(physics.angular_velocity)
                    .scaled(1.0 / ANG_STD)
                    .to_array(),
            );
        }

        let mut boost_pads: Vec<[f32; PAD_FEATURES]> = self
            .field_info
            .boost_pads
            .iter()
            .enumerate()
            .map(|(idx, pad)| {
                let location = view(pad.location).scaled(1.0 / POS_STD);
                let active = snapshot
                    .boost_pads
                    .get(idx)
                    .map_or(0.0, |state| if state.is_active { 1.0 } else { 0.0 });
                [
                    location.x,
                    location.y,
                    location.z,
                    if pad.is_full_boost { 1.0 } else { 0.0 },
                    active,
                ]
            })
            .collect();
        if inverted {
            boost_pads.reverse();
        }

        let goal_location = |team_num: u8| {
            self.field_info
                .goal_of(team_num)
                .map_or([0.0; 3], |goal| view(goal.location).scaled(1.0 / POS_STD).to_array())
        };

        Ok(Observation {
            car_order,
            cars,
            ball,
            boost_pads,
            own_goal: goal_location(player.team),
            opponent_goal: goal_location(1 - player.team.min(1)),
            previous_action: *previous_action,
            inverted,
        })
    }
}

/// Controlled car first, then its teammates, then everyone else, each group in snapshot order.
pub fn order_cars(snapshot: &GameSnapshot, self_index: usize) -> Result<Vec<usize>, ObservationError> {
    let player = snapshot
        .cars
        .get(self_index)
        .ok_or(ObservationError::SelfIndexOutOfRange {
            index: self_index,
            num_cars: snapshot.num_cars(),
        })?;
    let (teammates, opponents): (Vec<usize>, Vec<usize>) = (0..snapshot.num_cars())
        .filter(|&idx| idx != self_index)
        .partition(|&idx| snapshot.cars[idx].team == player.team);
    let mut order = Vec::with_capacity(snapshot.num_cars());
    order.push(self_index);
    order.extend(teammates);
    order.extend(opponents);
    Ok(order)
}

fn car_features(car: &PlayerInfo, is_teammate: bool, view: &impl Fn(Vec3) -> Vec3) -> [f32; CAR_FEATURES] {
    let physics = &car.physics;
    let mut features = [0.0; CAR_FEATURES];
    features[0..3].copy_from_slice(&view(physics.location).scaled(1.0 / POS_STD).to_array());
    features[3..6].copy_from_slice(&view(physics.velocity).scaled(1.0 / POS_STD).to_array());
    features[6..9].copy_from_slice(
        &view(physics.angular_velocity)
            .scaled(1.0 / ANG_STD)
            .to_array(),
    );
    features[9..12].copy_from_slice(&view(physics.rotation.forward()).to_array());
    features[12..15].copy_from_slice(&view(physics.rotation.up()).to_array());
    features[15] = car.boost as f32 / 100.0;
    features[16] = if car.has_wheel_contact { 1.0 } else { 0.0 };
    features[17] = if car.is_demolished { 1.0 } else { 0.0 };
    features[18] = if is_teammate { 1.0 } else { 0.0 };
    features
}
