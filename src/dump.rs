use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::rocket_league::GameSnapshot;

/// Writes `snapshot` as `game_tick_packet_<frame>.json` under `dir` for offline inspection.
pub fn dump_snapshot(dir: &Path, snapshot: &GameSnapshot) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!(
        "game_tick_packet_{}.json",
        snapshot.game_info.frame_num
    ));
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "game tick packet dumped");
    Ok(path)
}
