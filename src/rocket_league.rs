pub mod car;
pub mod field_info;
pub mod game_state;
pub mod physics_object;
pub mod snapshot_decoder;

pub use car::PlayerInfo;
pub use field_info::{BoostPad, FieldInfo, GoalInfo};
pub use game_state::{BallInfo, BoostPadState, GameInfo, GameSnapshot, Team, TeamInfo};
pub use physics_object::Physics;
pub use snapshot_decoder::{decode, DecodeContext};

pub const MAX_CARS: usize = 64;
pub const MAX_TEAMS: usize = 2;
pub const MAX_BOOSTS: usize = 50;
pub const MAX_GOALS: usize = 200;
