use crate::common::{Rotator, Vec3};
use crate::error::DecodeError;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawPhysics {
    pub location: Vec3,
    pub velocity: Vec3,
    pub rotation: Rotator,
    pub angular_velocity: Vec3,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawCar {
    pub physics: RawPhysics,
    pub on_ground: bool,
    pub supersonic: bool,
    pub jumped: bool,
    pub double_jumped: bool,
    /// Fraction in [0, 1]; `None` when the boost component could not be read.
    pub boost_amount: Option<f32>,
}

/// A player record. `team` and `car` are `None` when they could not be resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPlayer {
    pub address: usize,
    pub name: String,
    pub is_spectator: bool,
    pub team: Option<u8>,
    pub car: Option<RawCar>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawTeam {
    pub index: u8,
    pub score: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawBoostPad {
    pub location: Vec3,
    pub is_big: bool,
    pub is_active: bool,
    pub elapsed_time: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawGoal {
    pub team_num: u8,
    pub location: Vec3,
    pub direction: Vec3,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalPlayer {
    pub controller_address: usize,
    pub player_address: usize,
}

/// Live view of the running match, resolved by the process memory layer.
pub trait GameEvent {
    fn balls(&self) -> Result<Vec<RawPhysics>, DecodeError>;
    fn players(&self) -> Result<Vec<RawPlayer>, DecodeError>;
    fn teams(&self) -> Result<Vec<RawTeam>, DecodeError>;
    fn boost_pads(&self) -> Result<Vec<RawBoostPad>, DecodeError>;
    fn goals(&self) -> Result<Vec<RawGoal>, DecodeError>;
    fn local_players(&self) -> Result<Vec<LocalPlayer>, DecodeError>;
    fn time_remaining(&self) -> Result<f32, DecodeError>;
    fn is_overtime(&self) -> Result<bool, DecodeError>;
    fn is_unlimited_time(&self) -> Result<bool, DecodeError>;
    fn is_match_ended(&self) -> Result<bool, DecodeError>;
    /// Polled flag. It lags behind `BotEvent::RoundActiveStateChanged` and is only used to probe.
    fn is_round_active(&self) -> Result<bool, DecodeError>;
}

pub trait GameSource {
    fn game_event(&self) -> Option<&dyn GameEvent>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Callbacks from the game, queued and consumed one at a time by the tick loop.
#[derive(Clone, Debug, PartialEq)]
pub enum BotEvent {
    PlayerTick,
    KeyPressed { key: String, state: KeyState },
    RoundActiveStateChanged { is_active: bool },
    GameEventDestroyed,
}
