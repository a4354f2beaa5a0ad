use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use bytemuck::Zeroable;

use crate::agent::DecisionAgent;
use crate::clock::Clock;
use crate::config::BotConfig;
use crate::control::{encode, ControlPacket};
use crate::dump::dump_snapshot;
use crate::error::{EnableError, MemoryIoError, PipelineError};
use crate::game_event::{BotEvent, GameSource, KeyState};
use crate::memory_io::{ContinuousWriter, MemoryIo, WriteTarget};
use crate::rocket_league::snapshot_decoder::car_index_of;
use crate::rocket_league::{decode, DecodeContext, FieldInfo, GameSnapshot};
use crate::session::{BotSession, SessionSettings};
use crate::telemetry::Telemetry;

const MONITORING_EVERY: u64 = 10;

/// Drives the pipeline from game events. Holds a `BotSession` while the bot is enabled.
pub struct TickLoop<S: GameSource, M: MemoryIo + 'static, A: DecisionAgent> {
    config: BotConfig,
    source: S,
    memory: Arc<M>,
    agent: A,
    clock: Box<dyn Clock>,
    writer: ContinuousWriter<M>,
    field_info: Option<FieldInfo>,
    session: Option<BotSession>,
    round_active: bool,
    virtual_start: Duration,
    frame_num: u64,
    telemetry: Telemetry,
    input_address: Option<usize>,
    last_packet: Option<ControlPacket>,
    last_snapshot: Option<GameSnapshot>,
}

impl<S: GameSource, M: MemoryIo + 'static, A: DecisionAgent> TickLoop<S, M, A> {
    pub fn new(
        config: BotConfig,
        source: S,
        memory: Arc<M>,
        agent: A,
        clock: impl Clock + 'static,
    ) -> Self {
        let writer = ContinuousWriter::new(Arc::clone(&memory), config.write_interval());
        let virtual_start = clock.now();
        TickLoop {
            config,
            source,
            memory,
            agent,
            clock: Box::new(clock),
            writer,
            field_info: None,
            session: None,
            round_active: false,
            virtual_start,
            frame_num: 0,
            telemetry: Telemetry::default(),
            input_address: None,
            last_packet: None,
            last_snapshot: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&BotSession> {
        self.session.as_ref()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn frame_num(&self) -> u64 {
        self.frame_num
    }

    pub fn field_info(&self) -> Option<&FieldInfo> {
        self.field_info.as_ref()
    }

    pub fn last_snapshot(&self) -> Option<&GameSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn last_packet(&self) -> Option<&ControlPacket> {
        self.last_packet.as_ref()
    }

    pub fn input_address(&self) -> Option<usize> {
        self.input_address
    }

    pub fn is_writing(&self) -> bool {
        self.writer.is_running()
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consumes events until the sender hangs up or the session hits a fatal error.
    pub fn run(&mut self, events: &Receiver<BotEvent>) -> Result<(), PipelineError> {
        for event in events.iter() {
            self.handle(event)?;
        }
        self.disable();
        Ok(())
    }

    pub fn handle(&mut self, event: BotEvent) -> Result<(), PipelineError> {
        match event {
            BotEvent::PlayerTick => self.on_tick(),
            BotEvent::KeyPressed { key, state } => {
                self.on_key_pressed(&key, state);
                Ok(())
            }
            BotEvent::RoundActiveStateChanged { is_active } => {
                self.on_round_active_state_changed(is_active);
                Ok(())
            }
            BotEvent::GameEventDestroyed => {
                tracing::info!("game event destroyed");
                self.virtual_start = self.clock.now();
                self.disable();
                Ok(())
            }
        }
    }

    fn on_round_active_state_changed(&mut self, is_active: bool) {
        self.round_active = is_active;
        if !is_active {
            self.reset_inputs();
            if let Some(session) = self.session.as_mut() {
                session.reset_kickoff();
            }
        }
    }

    fn on_key_pressed(&mut self, key: &str, state: KeyState) {
        if state != KeyState::Pressed {
            return;
        }
        if key == self.config.bot_toggle_key {
            if self.is_enabled() {
                self.disable();
            } else {
                self.try_enable();
            }
        }
        if key == self.config.dump_game_tick_packet_key {
            if let Some(snapshot) = &self.last_snapshot {
                if let Err(err) = dump_snapshot(&self.config.dump_dir, snapshot) {
                    tracing::warn!("failed to dump game tick packet: {err:#}");
                }
            }
        }
    }

    fn on_tick(&mut self) -> Result<(), PipelineError> {
        if self.writer.process_lost() {
            return self.fail(MemoryIoError::ProcessGone);
        }

        if self.field_info.is_none() {
            if let Some(game_event) = self.source.game_event() {
                // Retried next tick on failure.
                self.field_info = FieldInfo::capture(game_event).ok();
            }
        }

        if self.session.is_none() && self.config.autotoggle {
            let round_active = self
                .source
                .game_event()
                .map_or(false, |game_event| game_event.is_round_active().unwrap_or(false));
            if round_active {
                self.try_enable();
                return Ok(());
            }
        }

        if self.session.is_none() {
            return Ok(());
        }

        let tick_start = self.clock.now();
        self.telemetry.on_tick(tick_start);
        self.frame_num += 1;

        let Some(game_event) = self.source.game_event() else {
            return Ok(());
        };
        let ctx = DecodeContext {
            seconds_elapsed: tick_start.saturating_sub(self.virtual_start).as_secs_f64(),
            frame_num: self.frame_num,
            round_active: self.round_active,
        };
        let snapshot = match decode(game_event, &ctx) {
            Ok(snapshot) => snapshot,
            Err(err) if err.is_process_lost() => {
                return self.fail(MemoryIoError::ProcessGone);
            }
            Err(err) => {
                tracing::warn!(frame = self.frame_num, "failed to generate game tick packet: {err}");
                return Ok(());
            }
        };
        let local_players = game_event.local_players();

        let controls = match self.session.as_mut() {
            Some(session) if snapshot.game_info.is_round_active => {
                match session.next_controls(&mut self.agent, &snapshot) {
                    Ok(controls) => Some(controls),
                    Err(err) => {
                        tracing::error!("failed to get bot output: {err}");
                        self.disable();
                        return Ok(());
                    }
                }
            }
            _ => None,
        };
        // Outside an active round the input block is zeroed, not encoded from default controls.
        let packet = controls.as_ref().map_or_else(ControlPacket::zeroed, encode);

        match local_players {
            Ok(local_players) => {
                if let Some(player_controller) = local_players.first() {
                    let address = player_controller.controller_address + self.config.input_offset;
                    self.write(address, packet)?;
                }
            }
            Err(err) if err.is_process_lost() => return self.fail(MemoryIoError::ProcessGone),
            Err(err) => tracing::warn!("failed to resolve local player: {err}"),
        }
        if !self.is_enabled() {
            return Ok(());
        }

        self.telemetry
            .record_duration(self.clock.now().saturating_sub(tick_start));
        if self.config.monitoring && self.frame_num % MONITORING_EVERY == 0 {
            let info = &snapshot.game_info;
            tracing::debug!(
                tick_rate = self.telemetry.tick_rate(),
                tick_ms = self.telemetry.last_tick_duration().as_secs_f64() * 1000.0,
                frame = info.frame_num,
                round_active = info.is_round_active,
                overtime = info.is_overtime,
                match_ended = info.is_match_ended,
                kickoff_pause = info.is_kickoff_pause,
                ?controls,
                "monitoring"
            );
        }
        self.last_snapshot = Some(snapshot);
        Ok(())
    }

    fn write(&mut self, address: usize, packet: ControlPacket) -> Result<(), PipelineError> {
        self.input_address = Some(address);
        self.last_packet = Some(packet);
        self.writer.set(WriteTarget { address, packet });
        match self.memory.write_bytes(address, packet.as_bytes()) {
            Ok(()) => (),
            Err(err) if err.is_process_lost() => return self.fail(err),
            Err(err) => {
                tracing::error!("failed to write controls: {err}");
                self.disable();
                return Ok(());
            }
        }
        if !self.writer.is_running() {
            self.writer.start();
        }
        Ok(())
    }

    fn try_enable(&mut self) {
        if let Err(err) = self.enable() {
            tracing::warn!("failed to enable bot: {err}");
            self.disable();
        }
    }

    pub fn enable(&mut self) -> Result<(), EnableError> {
        let game_event = self.source.game_event().ok_or(EnableError::NoGameEvent)?;
        self.frame_num = 0;

        let local_players = game_event.local_players()?;
        let local_player = match local_players.as_slice() {
            [] => return Err(EnableError::NoLocalPlayers),
            [local_player] => *local_player,
            _ => return Err(EnableError::MultipleLocalPlayers),
        };
        let players = game_event.players()?;
        let player = players
            .iter()
            .find(|player| player.address == local_player.player_address)
            .ok_or(EnableError::PlayerNotFound)?;
        if player.is_spectator {
            return Err(EnableError::Spectator);
        }
        let team = player.team.ok_or(EnableError::NoTeam)?;
        let index = car_index_of(&players, local_player.player_address)
            .ok_or(EnableError::PlayerNotFound)?;

        if game_event.is_round_active().unwrap_or(false) {
            self.round_active = true;
        }
        let field_info = match &self.field_info {
            Some(field_info) => field_info.clone(),
            None => FieldInfo::capture(game_event).map_err(EnableError::FieldInfo)?,
        };
        self.field_info = Some(field_info.clone());

        tracing::info!(index, team, name = %player.name, "bot enabled");
        self.session = Some(BotSession::new(
            index,
            team,
            player.name.clone(),
            field_info,
            SessionSettings::from(&self.config),
        ));
        Ok(())
    }

    /// Restores neutral input and stops the writer before returning.
    pub fn disable(&mut self) {
        let was_enabled = self.session.take().is_some();
        self.stop_writing();
        self.input_address = None;
        self.last_packet = None;
        self.last_snapshot = None;
        self.frame_num = 0;
        self.telemetry.reset();
        if was_enabled {
            tracing::info!("bot disabled");
        }
    }

    fn fail(&mut self, err: MemoryIoError) -> Result<(), PipelineError> {
        tracing::error!("lost the game process: {err}");
        self.disable();
        Err(PipelineError::ProcessLost(err))
    }

    fn stop_writing(&mut self) {
        if let Some(address) = self.input_address {
            // A latched handbrake would stick otherwise.
            self.writer.set(WriteTarget::neutral(address));
        }
        self.writer.stop();
        if let Some(address) = self.input_address {
            let neutral = WriteTarget::neutral(address);
            if let Err(err) = self.memory.write_bytes(address, neutral.packet.as_bytes()) {
                tracing::warn!("failed to restore neutral input: {err}");
            }
        }
        self.writer.clear();
    }

    fn reset_inputs(&mut self) {
        if let Some(address) = self.input_address {
            let neutral = WriteTarget::neutral(address);
            self.writer.set(neutral);
            self.last_packet = Some(neutral.packet);
            if let Err(err) = self.memory.write_bytes(address, neutral.packet.as_bytes()) {
                tracing::warn!("failed to reset inputs: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::agent::Action;
    use crate::clock::ManualClock;
    use crate::control::encode_action;
    use crate::kickoff::kickoff_action;
    use crate::memory_io::LocalMemory;
    use crate::test_support::{FakeGameEvent, FakeSource, ScriptedAgent, CONTROLLER_ADDRESS};

    const TICK: Duration = Duration::from_nanos(8_333_333);
    const INPUT_ADDRESS: usize = CONTROLLER_ADDRESS + 0x0990;

    type TestLoop = TickLoop<FakeSource, LocalMemory, ScriptedAgent>;

    fn build(config: BotConfig, event: FakeGameEvent, agent: ScriptedAgent) -> (TestLoop, Arc<LocalMemory>, ManualClock) {
        let memory = Arc::new(LocalMemory::new(CONTROLLER_ADDRESS, 0x1000));
        let clock = ManualClock::new();
        let tick_loop = TickLoop::new(
            config,
            FakeSource::with(event),
            Arc::clone(&memory),
            agent,
            clock.clone(),
        );
        (tick_loop, memory, clock)
    }

    fn toggle(tick_loop: &mut TestLoop) -> Result<(), PipelineError> {
        tick_loop.handle(BotEvent::KeyPressed {
            key: BotConfig::default().bot_toggle_key,
            state: KeyState::Pressed,
        })
    }

    fn tick(tick_loop: &mut TestLoop, clock: &ManualClock) -> Result<(), PipelineError> {
        clock.advance(TICK);
        tick_loop.handle(BotEvent::PlayerTick)
    }

    fn input_bytes(memory: &LocalMemory) -> Vec<u8> {
        memory.read_bytes(INPUT_ADDRESS, 32).unwrap()
    }

    #[test]
    fn test_packets_refresh_once_per_tick_skip_window() -> Result<(), PipelineError> {
        let (mut tick_loop, _memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::counting());
        toggle(&mut tick_loop)?;
        assert!(tick_loop.is_enabled());

        let mut packets = Vec::new();
        for _ in 0..16 {
            tick(&mut tick_loop, &clock)?;
            packets.push(*tick_loop.last_packet().unwrap());
        }
        // Ticks 1-7 carry the first decision; tick 8 applies the next one.
        assert!(packets[0..7].iter().all(|packet| *packet == packets[0]));
        assert_ne!(packets[7], packets[6]);
        assert!(packets[7..15].iter().all(|packet| *packet == packets[7]));
        assert_ne!(packets[15], packets[14]);
        assert_eq!(tick_loop.agent().calls(), 3);
        assert_eq!(tick_loop.frame_num(), 16);
        assert!(tick_loop.is_writing());
        Ok(())
    }

    #[test]
    fn test_disable_leaves_neutral_input() -> Result<(), PipelineError> {
        let held = Action::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        let (mut tick_loop, memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::fixed(held));
        toggle(&mut tick_loop)?;
        for _ in 0..4 {
            tick(&mut tick_loop, &clock)?;
        }
        assert_eq!(input_bytes(&memory), encode_action(&held).as_bytes());

        toggle(&mut tick_loop)?;
        assert!(!tick_loop.is_enabled());
        assert!(!tick_loop.is_writing());
        assert_eq!(input_bytes(&memory), vec![0_u8; 32]);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(input_bytes(&memory), vec![0_u8; 32]);
        assert_eq!(tick_loop.frame_num(), 0);
        Ok(())
    }

    #[test]
    fn test_structural_decode_failure_skips_tick() -> Result<(), PipelineError> {
        let (mut tick_loop, _memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::counting());
        toggle(&mut tick_loop)?;
        tick(&mut tick_loop, &clock)?;
        let frame = tick_loop.last_snapshot().unwrap().game_info.frame_num;

        tick_loop.source_mut().event_mut().fail_teams = true;
        tick(&mut tick_loop, &clock)?;
        assert!(tick_loop.is_enabled());
        assert_eq!(tick_loop.last_snapshot().unwrap().game_info.frame_num, frame);

        tick_loop.source_mut().event_mut().fail_teams = false;
        tick(&mut tick_loop, &clock)?;
        assert_eq!(tick_loop.last_snapshot().unwrap().game_info.frame_num, frame + 2);
        Ok(())
    }

    #[test]
    fn test_lost_process_is_fatal() -> Result<(), PipelineError> {
        let (mut tick_loop, memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::counting());
        toggle(&mut tick_loop)?;
        tick(&mut tick_loop, &clock)?;
        memory.detach();
        let result = tick(&mut tick_loop, &clock);
        assert!(matches!(result, Err(PipelineError::ProcessLost(_))));
        assert!(!tick_loop.is_enabled());
        assert!(!tick_loop.is_writing());

        let (mut tick_loop, _memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::counting());
        toggle(&mut tick_loop)?;
        tick_loop.source_mut().event_mut().lost = true;
        assert!(tick(&mut tick_loop, &clock).is_err());
        Ok(())
    }

    #[test]
    fn test_decision_failure_disables_bot() -> Result<(), PipelineError> {
        let (mut tick_loop, memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::failing());
        toggle(&mut tick_loop)?;
        tick(&mut tick_loop, &clock)?;
        assert!(!tick_loop.is_enabled());
        assert_eq!(input_bytes(&memory), vec![0_u8; 32]);
        Ok(())
    }

    #[test]
    fn test_autotoggle_enables_on_active_round() -> Result<(), PipelineError> {
        let config = BotConfig {
            autotoggle: true,
            ..Default::default()
        };
        let mut event = FakeGameEvent::open_play();
        event.round_active = false;
        let (mut tick_loop, _memory, clock) = build(config, event, ScriptedAgent::counting());
        tick(&mut tick_loop, &clock)?;
        assert!(!tick_loop.is_enabled());
        assert!(tick_loop.field_info().is_some());

        tick_loop.source_mut().event_mut().round_active = true;
        tick(&mut tick_loop, &clock)?;
        assert!(tick_loop.is_enabled());
        assert_eq!(tick_loop.frame_num(), 0);
        tick(&mut tick_loop, &clock)?;
        assert_eq!(tick_loop.frame_num(), 1);
        Ok(())
    }

    #[test]
    fn test_inactive_round_writes_neutral() -> Result<(), PipelineError> {
        let held = Action::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let (mut tick_loop, memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::fixed(held));
        toggle(&mut tick_loop)?;
        tick(&mut tick_loop, &clock)?;
        assert!(!tick_loop.last_packet().unwrap().is_neutral());

        tick_loop.handle(BotEvent::RoundActiveStateChanged { is_active: false })?;
        assert!(tick_loop.last_packet().unwrap().is_neutral());
        tick(&mut tick_loop, &clock)?;
        assert!(tick_loop.is_enabled());
        assert!(tick_loop.last_packet().unwrap().is_neutral());
        assert_eq!(input_bytes(&memory), vec![0_u8; 32]);
        tick(&mut tick_loop, &clock)?;
        assert_eq!(input_bytes(&memory), vec![0_u8; 32]);
        assert_eq!(tick_loop.agent().calls(), 1);
        tick_loop.disable();
        assert_eq!(input_bytes(&memory), vec![0_u8; 32]);
        Ok(())
    }

    #[test]
    fn test_game_event_destroyed_disables() -> Result<(), PipelineError> {
        let (mut tick_loop, _memory, clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::counting());
        toggle(&mut tick_loop)?;
        tick(&mut tick_loop, &clock)?;
        tick_loop.handle(BotEvent::GameEventDestroyed)?;
        assert!(!tick_loop.is_enabled());
        assert!(tick_loop.last_snapshot().is_none());
        Ok(())
    }

    #[test]
    fn test_enable_rejects_bad_local_players() {
        let mut event = FakeGameEvent::open_play();
        event.local_players.clear();
        let (mut tick_loop, _memory, _clock) = build(BotConfig::default(), event, ScriptedAgent::counting());
        assert!(matches!(tick_loop.enable(), Err(EnableError::NoLocalPlayers)));

        let mut event = FakeGameEvent::open_play();
        event.players[0].is_spectator = true;
        let (mut tick_loop, _memory, _clock) = build(BotConfig::default(), event, ScriptedAgent::counting());
        assert!(matches!(tick_loop.enable(), Err(EnableError::Spectator)));

        let (mut tick_loop, _memory, _clock) = build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::counting());
        tick_loop.source_mut().event = None;
        assert!(matches!(tick_loop.enable(), Err(EnableError::NoGameEvent)));
    }

    #[test]
    fn test_kickoff_choreography_reaches_memory() -> Result<(), PipelineError> {
        let (mut tick_loop, _memory, clock) =
            build(BotConfig::default(), FakeGameEvent::kickoff(), ScriptedAgent::counting());
        toggle(&mut tick_loop)?;
        tick(&mut tick_loop, &clock)?;
        assert_eq!(
            tick_loop.last_packet(),
            Some(&encode_action(&kickoff_action(0).unwrap()))
        );
        assert_eq!(tick_loop.agent().betas()[0], crate::agent::BETA_KICKOFF);
        for _ in 0..50 {
            tick(&mut tick_loop, &clock)?;
        }
        assert_eq!(
            tick_loop.last_packet(),
            Some(&encode_action(&kickoff_action(50).unwrap()))
        );
        Ok(())
    }

    #[test]
    fn test_dump_key_writes_last_snapshot() -> Result<(), PipelineError> {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig {
            dump_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let (mut tick_loop, _memory, clock) = build(config, FakeGameEvent::open_play(), ScriptedAgent::counting());
        toggle(&mut tick_loop)?;
        tick(&mut tick_loop, &clock)?;
        tick(&mut tick_loop, &clock)?;
        tick_loop.handle(BotEvent::KeyPressed {
            key: "F2".to_string(),
            state: KeyState::Pressed,
        })?;
        assert!(dir.path().join("game_tick_packet_2.json").exists());
        Ok(())
    }

    #[test]
    fn test_run_drains_queue_and_disables() -> Result<(), PipelineError> {
        let (mut tick_loop, memory, _clock) =
            build(BotConfig::default(), FakeGameEvent::open_play(), ScriptedAgent::counting());
        let (sender, receiver) = mpsc::channel();
        sender
            .send(BotEvent::KeyPressed {
                key: BotConfig::default().bot_toggle_key,
                state: KeyState::Pressed,
            })
            .unwrap();
        for _ in 0..5 {
            sender.send(BotEvent::PlayerTick).unwrap();
        }
        drop(sender);
        tick_loop.run(&receiver)?;
        assert!(!tick_loop.is_enabled());
        assert_eq!(input_bytes(&memory), vec![0_u8; 32]);
        Ok(())
    }
}
