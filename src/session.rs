use std::time::Instant;

use crate::agent::{Action, DecisionAgent, BETA_KICKOFF, BETA_MATCH_ENDED};
use crate::config::BotConfig;
use crate::control::ControlState;
use crate::error::DecisionError;
use crate::kickoff::{KickoffSequencer, KickoffState};
use crate::observation::ObservationBuilder;
use crate::rocket_league::{FieldInfo, GameSnapshot};

/// Ticks between decision refreshes.
pub const TICK_SKIP: u64 = 8;
pub const TICKS_PER_SECOND: f64 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSettings {
    pub beta: f32,
    pub hardcoded_kickoffs: bool,
    pub stochastic_kickoffs: bool,
}

impl From<&BotConfig> for SessionSettings {
    fn from(config: &BotConfig) -> Self {
        SessionSettings {
            beta: config.beta,
            hardcoded_kickoffs: config.hardcoded_kickoffs,
            stochastic_kickoffs: config.stochastic_kickoffs,
        }
    }
}

/// Decision state for one enabled stretch of the bot. Dropped on disable.
pub struct BotSession {
    index: usize,
    team: u8,
    name: String,
    settings: SessionSettings,
    observation_builder: ObservationBuilder,
    ticks: u64,
    prev_time: Option<f64>,
    update_action: bool,
    action: Action,
    controls: ControlState,
    kickoff: KickoffSequencer,
    decisions: u64,
}

impl BotSession {
    pub fn new(
        index: usize,
        team: u8,
        name: String,
        field_info: FieldInfo,
        settings: SessionSettings,
    ) -> Self {
        BotSession {
            index,
            team,
            name,
            settings,
            observation_builder: ObservationBuilder::new(field_info),
            // Decide on the very first tick.
            ticks: TICK_SKIP,
            prev_time: None,
            update_action: true,
            action: Action::zero(),
            controls: ControlState::default(),
            kickoff: KickoffSequencer::new(),
            decisions: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn team(&self) -> u8 {
        self.team
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn kickoff_state(&self) -> KickoffState {
        self.kickoff.state()
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    pub fn reset_kickoff(&mut self) {
        self.kickoff.reset();
    }

    pub fn next_controls<A: DecisionAgent + ?Sized>(
        &mut self,
        agent: &mut A,
        snapshot: &GameSnapshot,
    ) -> Result<ControlState, DecisionError> {
        let cur_time = snapshot.game_info.seconds_elapsed;
        let ticks_elapsed = match self.prev_time {
            Some(prev_time) => ((cur_time - prev_time) * TICKS_PER_SECOND).round().max(0.0) as u64,
            None => 0,
        };
        self.prev_time = Some(cur_time);
        self.ticks += ticks_elapsed;

        if self.update_action && snapshot.num_cars() > self.index {
            self.update_action = false;
            self.decide(agent, snapshot)?;
        }

        if self.ticks >= TICK_SKIP - 1 {
            self.controls = ControlState::from(&self.action);
        }

        if self.ticks >= TICK_SKIP {
            self.ticks = 0;
            self.update_action = true;
        }

        if self.settings.hardcoded_kickoffs {
            match self.kickoff.step(snapshot, self.index, ticks_elapsed) {
                Ok(Some(action)) => {
                    self.action = action;
                    self.controls = ControlState::from(&action);
                }
                Ok(None) => (),
                Err(err) => tracing::warn!("failed to do kickoff: {err}"),
            }
        }

        Ok(self.controls)
    }

    fn decide<A: DecisionAgent + ?Sized>(
        &mut self,
        agent: &mut A,
        snapshot: &GameSnapshot,
    ) -> Result<(), DecisionError> {
        let observation = self
            .observation_builder
            .build(snapshot, self.index, &self.action)?;

        let mut beta = self.settings.beta;
        if snapshot.game_info.is_match_ended {
            beta = BETA_MATCH_ENDED;
        }
        if self.settings.stochastic_kickoffs && snapshot.game_info.is_kickoff_pause {
            beta = BETA_KICKOFF;
        }

        let started = Instant::now();
        let (action, weights) = agent
            .act(&observation, beta)
            .map_err(DecisionError::Agent)?;
        if !action.is_finite() {
            return Err(DecisionError::InvalidAction(action));
        }
        tracing::trace!(
            beta,
            elapsed_us = started.elapsed().as_micros() as u64,
            weights = ?weights,
            "decision"
        );
        self.action = action;
        self.decisions += 1;
        Ok(())
    }
}
