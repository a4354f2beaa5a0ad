use anyhow::anyhow;

use crate::agent::{Action, AttentionWeights, DecisionAgent};
use crate::common::{Rotator, Vec3};
use crate::error::{DecodeError, MemoryIoError};
use crate::game_event::{
    GameEvent, GameSource, LocalPlayer, RawBoostPad, RawCar, RawGoal, RawPhysics, RawPlayer,
    RawTeam,
};
use crate::observation::Observation;

pub const CONTROLLER_ADDRESS: usize = 0x5000;
pub const SELF_ADDRESS: usize = 0x100;

pub fn player_at(address: usize, team: u8, x: f32, y: f32) -> RawPlayer {
    RawPlayer {
        address,
        name: format!("player-{address:x}"),
        is_spectator: false,
        team: Some(team),
        car: Some(RawCar {
            physics: RawPhysics {
                location: Vec3::new(x, y, 17.0),
                rotation: Rotator::new(0.0, if team == 0 { 0.5 } else { -2.6 }, 0.0),
                ..Default::default()
            },
            on_ground: true,
            boost_amount: Some(0.333),
            ..Default::default()
        }),
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeGameEvent {
    pub balls: Vec<RawPhysics>,
    pub players: Vec<RawPlayer>,
    pub teams: Vec<RawTeam>,
    pub boost_pads: Vec<RawBoostPad>,
    pub goals: Vec<RawGoal>,
    pub local_players: Vec<LocalPlayer>,
    pub time_remaining: f32,
    pub overtime: bool,
    pub match_ended: bool,
    pub round_active: bool,
    pub fail_teams: bool,
    pub lost: bool,
}

impl FakeGameEvent {
    /// 2v2 with the ball on the center spot. The local player is the blue car at index 0.
    pub fn kickoff() -> Self {
        FakeGameEvent {
            balls: vec![RawPhysics {
                location: Vec3::new(0.0, 0.0, 92.75),
                ..Default::default()
            }],
            players: vec![
                player_at(SELF_ADDRESS, 0, -2048.0, -2560.0),
                player_at(0x200, 0, 0.0, -4608.0),
                player_at(0x300, 1, 2048.0, 2560.0),
                player_at(0x400, 1, 0.0, 4608.0),
            ],
            teams: vec![RawTeam { index: 0, score: 1 }, RawTeam { index: 1, score: 2 }],
            boost_pads: vec![
                RawBoostPad {
                    location: Vec3::new(-3072.0, -4096.0, 73.0),
                    is_big: true,
                    is_active: true,
                    elapsed_time: 0.0,
                },
                RawBoostPad {
                    location: Vec3::new(3072.0, 4096.0, 73.0),
                    is_big: true,
                    is_active: false,
                    elapsed_time: 4.0,
                },
            ],
            goals: vec![
                RawGoal {
                    team_num: 0,
                    location: Vec3::new(0.0, -5120.0, 0.0),
                    direction: Vec3::new(0.0, 1.0, 0.0),
                    width: 1786.0,
                    height: 642.0,
                },
                RawGoal {
                    team_num: 1,
                    location: Vec3::new(0.0, 5120.0, 0.0),
                    direction: Vec3::new(0.0, -1.0, 0.0),
                    width: 1786.0,
                    height: 642.0,
                },
            ],
            local_players: vec![LocalPlayer {
                controller_address: CONTROLLER_ADDRESS,
                player_address: SELF_ADDRESS,
            }],
            time_remaining: 300.0,
            round_active: true,
            ..Default::default()
        }
    }

    /// Same lineup with the ball away from the center spot.
    pub fn open_play() -> Self {
        let mut event = FakeGameEvent::kickoff();
        event.balls[0].location = Vec3::new(500.0, 1200.0, 92.75);
        event
    }

    fn check(&self) -> Result<(), DecodeError> {
        if self.lost {
            Err(DecodeError::Memory(MemoryIoError::ProcessGone))
        } else {
            Ok(())
        }
    }
}

impl GameEvent for FakeGameEvent {
    fn balls(&self) -> Result<Vec<RawPhysics>, DecodeError> {
        self.check()?;
        Ok(self.balls.clone())
    }

    fn players(&self) -> Result<Vec<RawPlayer>, DecodeError> {
        self.check()?;
        Ok(self.players.clone())
    }

    fn teams(&self) -> Result<Vec<RawTeam>, DecodeError> {
        self.check()?;
        if self.fail_teams {
            return Err(DecodeError::Enumerate("teams"));
        }
        Ok(self.teams.clone())
    }

    fn boost_pads(&self) -> Result<Vec<RawBoostPad>, DecodeError> {
        self.check()?;
        Ok(self.boost_pads.clone())
    }

    fn goals(&self) -> Result<Vec<RawGoal>, DecodeError> {
        self.check()?;
        Ok(self.goals.clone())
    }

    fn local_players(&self) -> Result<Vec<LocalPlayer>, DecodeError> {
        self.check()?;
        Ok(self.local_players.clone())
    }

    fn time_remaining(&self) -> Result<f32, DecodeError> {
        self.check()?;
        Ok(self.time_remaining)
    }

    fn is_overtime(&self) -> Result<bool, DecodeError> {
        self.check()?;
        Ok(self.overtime)
    }

    fn is_unlimited_time(&self) -> Result<bool, DecodeError> {
        self.check()?;
        Ok(false)
    }

    fn is_match_ended(&self) -> Result<bool, DecodeError> {
        self.check()?;
        Ok(self.match_ended)
    }

    fn is_round_active(&self) -> Result<bool, DecodeError> {
        self.check()?;
        Ok(self.round_active)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeSource {
    pub event: Option<FakeGameEvent>,
}

impl FakeSource {
    pub fn with(event: FakeGameEvent) -> Self {
        FakeSource { event: Some(event) }
    }

    pub fn event_mut(&mut self) -> &mut FakeGameEvent {
        self.event.get_or_insert_with(FakeGameEvent::default)
    }
}

impl GameSource for FakeSource {
    fn game_event(&self) -> Option<&dyn GameEvent> {
        self.event.as_ref().map(|event| event as &dyn GameEvent)
    }
}

enum Script {
    Counting,
    Fixed(Action),
    Failing,
}

/// Agent returning canned actions and recording how it was called.
pub struct ScriptedAgent {
    script: Script,
    betas: Vec<f32>,
}

impl ScriptedAgent {
    /// Every call returns a distinct action: throttle is the call number / 100.
    pub fn counting() -> Self {
        ScriptedAgent {
            script: Script::Counting,
            betas: Vec::new(),
        }
    }

    pub fn fixed(action: Action) -> Self {
        ScriptedAgent {
            script: Script::Fixed(action),
            betas: Vec::new(),
        }
    }

    pub fn failing() -> Self {
        ScriptedAgent {
            script: Script::Failing,
            betas: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.betas.len()
    }

    pub fn betas(&self) -> &[f32] {
        &self.betas
    }
}

impl DecisionAgent for ScriptedAgent {
    fn act(
        &mut self,
        _observation: &Observation,
        beta: f32,
    ) -> anyhow::Result<(Action, Option<AttentionWeights>)> {
        self.betas.push(beta);
        match &self.script {
            Script::Counting => {
                let throttle = self.betas.len() as f32 / 100.0;
                Ok((
                    Action::new([throttle, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
                    None,
                ))
            }
            Script::Fixed(action) => Ok((*action, Some(vec![1.0]))),
            Script::Failing => Err(anyhow!("model exploded")),
        }
    }
}
