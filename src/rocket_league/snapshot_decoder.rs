use crate::error::DecodeError;
use crate::game_event::{GameEvent, RawPlayer};

use super::car::{boost_percent, PlayerInfo};
use super::game_state::{BallInfo, BoostPadState, GameInfo, GameSnapshot, TeamInfo};
use super::physics_object::Physics;
use super::{MAX_BOOSTS, MAX_CARS, MAX_TEAMS};

pub const WORLD_GRAVITY_Z: f32 = 1.0;
pub const GAME_SPEED: f32 = 1.0;

/// Values the decoder takes from the caller rather than from game memory.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DecodeContext {
    pub seconds_elapsed: f64,
    pub frame_num: u64,
    /// Event-driven round state. The polled flag in memory lags behind and is not used here.
    pub round_active: bool,
}

pub fn decode(game_event: &dyn GameEvent, ctx: &DecodeContext) -> Result<GameSnapshot, DecodeError> {
    let ball = game_event
        .balls()?
        .first()
        .map(|raw| BallInfo {
            physics: Physics::from(raw),
        });
    let is_kickoff_pause = ctx.round_active
        && ball.map_or(false, |ball| {
            ball.physics.location.x == 0.0 && ball.physics.location.y == 0.0
        });

    let game_info = GameInfo {
        seconds_elapsed: ctx.seconds_elapsed,
        game_time_remaining: game_event.time_remaining()?,
        is_overtime: game_event.is_overtime()?,
        is_unlimited_time: game_event.is_unlimited_time()?,
        is_round_active: ctx.round_active,
        is_kickoff_pause,
        is_match_ended: game_event.is_match_ended()?,
        world_gravity_z: WORLD_GRAVITY_Z,
        game_speed: GAME_SPEED,
        frame_num: ctx.frame_num,
    };

    let players = game_event.players()?;
    let mut cars: Vec<PlayerInfo> = players.iter().filter_map(decode_player).collect();
    truncate_to_capacity(&mut cars, MAX_CARS, "cars");

    let mut teams: Vec<TeamInfo> = game_event
        .teams()?
        .iter()
        .map(|team| TeamInfo {
            team_index: team.index,
            score: team.score,
        })
        .collect();
    truncate_to_capacity(&mut teams, MAX_TEAMS, "teams");

    let mut boost_pads: Vec<BoostPadState> = game_event
        .boost_pads()?
        .iter()
        .map(|pad| BoostPadState {
            is_active: pad.is_active,
            timer: if pad.is_active { 0.0 } else { pad.elapsed_time },
        })
        .collect();
    truncate_to_capacity(&mut boost_pads, MAX_BOOSTS, "boost pads");

    Ok(GameSnapshot {
        game_info,
        ball,
        cars,
        teams,
        boost_pads,
    })
}

/// Whether a player record occupies a slot in `GameSnapshot::cars`.
pub fn has_car_slot(player: &RawPlayer) -> bool {
    !player.is_spectator && player.team.is_some()
}

/// Index in `GameSnapshot::cars` of the player stored at `address`.
pub fn car_index_of(players: &[RawPlayer], address: usize) -> Option<usize> {
    players
        .iter()
        .filter(|player| has_car_slot(player))
        .take(MAX_CARS)
        .position(|player| player.address == address)
}

fn decode_player(raw: &RawPlayer) -> Option<PlayerInfo> {
    if !has_car_slot(raw) {
        return None;
    }
    let team = raw.team?;
    let mut info = PlayerInfo {
        name: raw.name.clone(),
        team,
        ..Default::default()
    };
    match &raw.car {
        Some(car) => {
            info.physics = Physics::from(&car.physics);
            info.has_wheel_contact = car.on_ground;
            info.is_super_sonic = car.supersonic;
            info.jumped = car.jumped;
            info.double_jumped = car.double_jumped;
            info.boost = car.boost_amount.map_or(0, boost_percent);
        }
        // A player on a team without a car is waiting to respawn.
        None => info.is_demolished = true,
    }
    Some(info)
}

fn truncate_to_capacity<T>(items: &mut Vec<T>, capacity: usize, what: &'static str) {
    if items.len() > capacity {
        tracing::warn!(
            count = items.len(),
            capacity,
            "dropping {what} beyond capacity"
        );
        items.truncate(capacity);
    }
}
