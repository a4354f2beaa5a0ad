use std::sync::OnceLock;

use anyhow::{anyhow, ensure};
use itertools::iproduct;

use super::{Action, AttentionWeights, DecisionAgent};
use crate::observation::Observation;

static LOOKUP_TABLE: OnceLock<Vec<Action>> = OnceLock::new();

/// The discrete action space policies over this crate's observations choose from.
pub fn lookup_table() -> &'static [Action] {
    LOOKUP_TABLE.get_or_init(build_lookup_table)
}

fn build_lookup_table() -> Vec<Action> {
    let axis = [-1.0_f32, 0.0, 1.0];
    let toggle = [0.0_f32, 1.0];
    let mut actions = Vec::with_capacity(90);
    // Ground
    for (throttle, steer, boost, handbrake) in iproduct!(axis, axis, toggle, toggle) {
        if boost == 1.0 && throttle != 1.0 {
            continue;
        }
        let throttle = if throttle != 0.0 { throttle } else { boost };
        actions.push(Action::new([
            throttle, steer, 0.0, steer, 0.0, 0.0, boost, handbrake,
        ]));
    }
    // Aerial
    for (pitch, yaw, roll, jump, boost) in iproduct!(axis, axis, axis, toggle, toggle) {
        if jump == 1.0 && yaw != 0.0 {
            // Only need roll for sideflip
            continue;
        }
        if pitch == 0.0 && roll == 0.0 && jump == 0.0 {
            // Duplicate with ground
            continue;
        }
        // Enable handbrake for potential wavedashes
        let handbrake = if jump == 1.0 && (pitch != 0.0 || yaw != 0.0 || roll != 0.0) {
            1.0
        } else {
            0.0
        };
        actions.push(Action::new([
            boost, yaw, pitch, yaw, roll, jump, boost, handbrake,
        ]));
    }
    actions
}

/// Picks an index from `logits` according to `beta`: 1 is argmax, -1 is argmin, 0 is uniform
/// and 0.5 samples from the softmax of the logits as given.
pub fn select_action(logits: &[f32], beta: f32, rng: &mut fastrand::Rng) -> Option<usize> {
    if logits.is_empty() {
        return None;
    }
    if beta >= 1.0 {
        return argmax(logits.iter().copied());
    }
    if beta <= -1.0 {
        return argmax(logits.iter().map(|v| -v));
    }
    let scale = if beta == 0.0 {
        0.0
    } else {
        ((1.0 + beta) / (1.0 - beta)).ln() / 3.0_f32.ln()
    };
    let scaled: Vec<f32> = logits.iter().map(|v| v * scale).collect();
    let max = scaled.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let weights: Vec<f32> = scaled.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = weights.iter().sum();
    let mut remaining = rng.f32() * total;
    for (idx, weight) in weights.iter().enumerate() {
        if remaining < *weight {
            return Some(idx);
        }
        remaining -= weight;
    }
    Some(weights.len() - 1)
}

/// Adapts a policy emitting one logit per lookup table entry into a `DecisionAgent`.
pub struct LookupAgent<P> {
    policy: P,
    rng: fastrand::Rng,
}

impl<P> LookupAgent<P>
where
    P: FnMut(&Observation) -> anyhow::Result<(Vec<f32>, Option<AttentionWeights>)>,
{
    pub fn new(policy: P) -> Self {
        LookupAgent {
            policy,
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(policy: P, seed: u64) -> Self {
        LookupAgent {
            policy,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl<P> DecisionAgent for LookupAgent<P>
where
    P: FnMut(&Observation) -> anyhow::Result<(Vec<f32>, Option<AttentionWeights>)>,
{
    fn act(
        &mut self,
        observation: &Observation,
        beta: f32,
    ) -> anyhow::Result<(Action, Option<AttentionWeights>)> {
        let (logits, weights) = (self.policy)(observation)?;
        let table = lookup_table();
        ensure!(
            logits.len() == table.len(),
            "policy returned {} logits for {} lookup actions",
            logits.len(),
            table.len()
        );
        let idx = select_action(&logits, beta, &mut self.rng)
            .ok_or_else(|| anyhow!("no action could be selected"))?;
        Ok((table[idx], weights))
    }
}

fn argmax(values: impl Iterator<Item = f32>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}
