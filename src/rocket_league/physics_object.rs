use serde::{Deserialize, Serialize};

use crate::common::{Rotator, Vec3};
use crate::game_event::RawPhysics;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub location: Vec3,
    pub rotation: Rotator,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl From<&RawPhysics> for Physics {
    fn from(raw: &RawPhysics) -> Self {
        Physics {
            location: raw.location,
            rotation: raw.rotation,
            velocity: raw.velocity,
            angular_velocity: raw.angular_velocity,
        }
    }
}
