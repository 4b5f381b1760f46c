/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub engine: EngineConfig,
    pub levels_dir: PathBuf,
    pub frame_ms: u64,
}

/// Everything the simulation needs to know about speeds and timing.
/// Speeds are pixels per tick call; countdowns are elapsed ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub tile_size: i32,
    pub board_offset_x: i32,
    pub board_offset_y: i32,
    pub falling_speed: i32,
    pub cursor_move_speed: i32,
    pub horiz_mover_speed: i32,
    pub vert_mover_speed: i32,
    pub one_way_speed: i32,
    pub mover_countdown: i32,
    pub copy_delay: i32,
    pub swap_delay: i32,
    pub brick_die_ticks: i32,
}

impl EngineConfig {
    #[inline]
    pub fn pixel_x(&self, x: i32) -> i32 {
        x * self.tile_size + self.board_offset_x
    }

    #[inline]
    pub fn pixel_y(&self, y: i32) -> i32 {
        y * self.tile_size + self.board_offset_y
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        TomlEngine::default().into()
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    engine: TomlEngine,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlEngine {
    #[serde(default = "default_tile_size")]
    tile_size: i32,
    #[serde(default)]
    board_offset_x: i32,
    #[serde(default)]
    board_offset_y: i32,
    #[serde(default = "default_falling_speed")]
    falling_speed: i32,
    #[serde(default = "default_cursor_speed")]
    cursor_move_speed: i32,
    #[serde(default = "default_mover_speed")]
    horiz_mover_speed: i32,
    #[serde(default = "default_mover_speed")]
    vert_mover_speed: i32,
    #[serde(default = "default_one_way_speed")]
    one_way_speed: i32,
    #[serde(default = "default_mover_countdown")]
    mover_countdown: i32,
    #[serde(default = "default_trigger_delay")]
    copy_delay: i32,
    #[serde(default = "default_trigger_delay")]
    swap_delay: i32,
    #[serde(default = "default_die_ticks")]
    brick_die_ticks: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

// ── Defaults ──

fn default_tile_size() -> i32 { 20 }
fn default_falling_speed() -> i32 { 4 }
fn default_cursor_speed() -> i32 { 4 }
fn default_mover_speed() -> i32 { 1 }
fn default_one_way_speed() -> i32 { 2 }
fn default_mover_countdown() -> i32 { 2000 }
fn default_trigger_delay() -> i32 { 500 }
fn default_die_ticks() -> i32 { 500 }
fn default_levels_dir() -> String { "levels".into() }
fn default_frame_ms() -> u64 { 16 }

impl Default for TomlEngine {
    fn default() -> Self {
        TomlEngine {
            tile_size: default_tile_size(),
            board_offset_x: 0,
            board_offset_y: 0,
            falling_speed: default_falling_speed(),
            cursor_move_speed: default_cursor_speed(),
            horiz_mover_speed: default_mover_speed(),
            vert_mover_speed: default_mover_speed(),
            one_way_speed: default_one_way_speed(),
            mover_countdown: default_mover_countdown(),
            copy_delay: default_trigger_delay(),
            swap_delay: default_trigger_delay(),
            brick_die_ticks: default_die_ticks(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl From<TomlEngine> for EngineConfig {
    fn from(t: TomlEngine) -> Self {
        EngineConfig {
            tile_size: t.tile_size.max(1),
            board_offset_x: t.board_offset_x,
            board_offset_y: t.board_offset_y,
            falling_speed: t.falling_speed.max(1),
            cursor_move_speed: t.cursor_move_speed.max(1),
            horiz_mover_speed: t.horiz_mover_speed.max(1),
            vert_mover_speed: t.vert_mover_speed.max(1),
            one_way_speed: t.one_way_speed.max(1),
            mover_countdown: t.mover_countdown,
            copy_delay: t.copy_delay,
            swap_delay: t.swap_delay,
            brick_die_ticks: t.brick_die_ticks,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            engine: toml_cfg.engine.into(),
            levels_dir,
            frame_ms: toml_cfg.general.frame_ms.max(1),
        }
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilefall");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text),
                Err(e) => {
                    tracing::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("config.toml parse error, using default settings: {e}");
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = parse_toml("[engine]\nfalling_speed = 5\n");
        let engine: EngineConfig = cfg.engine.into();
        assert_eq!(engine.falling_speed, 5);
        assert_eq!(engine.tile_size, 20);
        assert_eq!(engine.mover_countdown, 2000);
        assert_eq!(cfg.general.levels_dir, "levels");
    }

    #[test]
    fn broken_toml_uses_defaults() {
        let cfg = parse_toml("[engine\nfalling_speed = ");
        let engine: EngineConfig = cfg.engine.into();
        assert_eq!(engine, EngineConfig::default());
    }

    #[test]
    fn speeds_are_never_zero() {
        let cfg = parse_toml("[engine]\nfalling_speed = 0\ntile_size = 0\n");
        let engine: EngineConfig = cfg.engine.into();
        assert_eq!(engine.falling_speed, 1);
        assert_eq!(engine.tile_size, 1);
    }

    #[test]
    fn pixel_mapping_uses_offset() {
        let mut engine = EngineConfig::default();
        engine.board_offset_x = 7;
        engine.board_offset_y = -3;
        assert_eq!(engine.pixel_x(2), 47);
        assert_eq!(engine.pixel_y(1), 17);
    }
}
