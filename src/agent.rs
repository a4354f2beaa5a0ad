use serde::{Deserialize, Serialize};

use crate::observation::Observation;

pub mod lookup_action;

pub use lookup_action::{lookup_table, select_action, LookupAgent};

pub const ACTION_SIZE: usize = 8;

/// Best action every time.
pub const BETA_BEST: f32 = 1.0;
/// Sample in proportion to the learned distribution; used on kickoff pauses.
pub const BETA_KICKOFF: f32 = 0.5;
/// Uniformly random; used once the match has ended.
pub const BETA_MATCH_ENDED: f32 = 0.0;

/// `[throttle, steer, pitch, yaw, roll, jump, boost, handbrake]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Action(pub [f32; ACTION_SIZE]);

impl Action {
    pub const fn new(values: [f32; ACTION_SIZE]) -> Self {
        Action(values)
    }

    pub fn zero() -> Self {
        Action([0.0; ACTION_SIZE])
    }

    pub fn throttle(&self) -> f32 {
        self.0[0]
    }

    pub fn steer(&self) -> f32 {
        self.0[1]
    }

    pub fn pitch(&self) -> f32 {
        self.0[2]
    }

    pub fn yaw(&self) -> f32 {
        self.0[3]
    }

    pub fn roll(&self) -> f32 {
        self.0[4]
    }

    pub fn jump(&self) -> bool {
        self.0[5] > 0.0
    }

    pub fn boost(&self) -> bool {
        self.0[6] > 0.0
    }

    pub fn handbrake(&self) -> bool {
        self.0[7] > 0.0
    }

    pub fn as_array(&self) -> &[f32; ACTION_SIZE] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// Relative importance the model gave to each observed entity, diagnostics only.
pub type AttentionWeights = Vec<f32>;

/// The decision model. Implementations may be expensive; callers invoke `act` at most once per
/// decision window.
pub trait DecisionAgent {
    fn act(
        &mut self,
        observation: &Observation,
        beta: f32,
    ) -> anyhow::Result<(Action, Option<AttentionWeights>)>;
}

impl<A: DecisionAgent + ?Sized> DecisionAgent for Box<A> {
    fn act(
        &mut self,
        observation: &Observation,
        beta: f32,
    ) -> anyhow::Result<(Action, Option<AttentionWeights>)> {
        (**self).act(observation, beta)
    }
}
