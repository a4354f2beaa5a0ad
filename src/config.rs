use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Offset of the vehicle input block inside the local player controller.
pub const DEFAULT_INPUT_OFFSET: usize = 0x0990;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub bot_toggle_key: String,
    pub dump_game_tick_packet_key: String,
    /// Enable the bot as soon as a round becomes active.
    pub autotoggle: bool,
    pub monitoring: bool,
    pub beta: f32,
    pub hardcoded_kickoffs: bool,
    pub stochastic_kickoffs: bool,
    pub input_offset: usize,
    pub write_interval_ms: u64,
    pub dump_dir: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            bot_toggle_key: "XboxTypeS_RightShoulder".to_string(),
            dump_game_tick_packet_key: "F2".to_string(),
            autotoggle: false,
            monitoring: false,
            beta: 1.0,
            hardcoded_kickoffs: true,
            stochastic_kickoffs: true,
            input_offset: DEFAULT_INPUT_OFFSET,
            write_interval_ms: 2,
            dump_dir: PathBuf::from("."),
        }
    }
}

impl BotConfig {
    /// Reads the config at `path`, writing the defaults there first if it does not exist.
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = BotConfig::default();
            fs::write(path, serde_json::to_string_pretty(&config)?)
                .with_context(|| format!("failed to write default config to {}", path.display()))?;
            tracing::info!(path = %path.display(), "default config written");
            return Ok(config);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn write_interval(&self) -> Duration {
        Duration::from_millis(self.write_interval_ms.max(1))
    }
}
