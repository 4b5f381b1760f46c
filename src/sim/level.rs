/// Level file loading and saving.
///
/// ## Format
///   A header of `key=value` lines, `#` comments and blank lines, then a
///   `[data]` marker followed by up to `FIELD_SIZE` rows of two-digit tile
///   codes. Missing rows and short rows are empty.
///
///   ```
///   #Name of the level
///   levelname=Stairs
///   seconds=120
///   teleport=1,9:9,1
///   switch=5,10:3,4
///   [data]
///   1111111111111111111111
///   1100000000000000000011
///   ```
///
/// Saving writes the fixed header layout back in a stable key order, so a
/// load/save round trip is byte-for-byte for files written by `render_level`.
///
/// ## Sources
///   1. Files named on the command line
///   2. `levels/` directory (`.lvl` and `.txt`, sorted by file name)
///   3. A built-in demo level

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::tile::{TileKind, RESERVED_CODE};
use super::field::{Field, FIELD_SIZE};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level file: {0}")]
    Io(#[from] std::io::Error),
    #[error("level has no [data] block")]
    MissingData,
    #[error("row {row} has more tiles than the board is wide")]
    RowTooLong { row: usize },
    #[error("row {row} has an odd number of digits")]
    OddRow { row: usize },
    #[error("row {row}, column {col}: '{text}' is not a tile code")]
    BadCode { row: usize, col: usize, text: String },
    #[error("row {row}, column {col}: unknown tile code {code}")]
    UnknownCode { row: usize, col: usize, code: u8 },
    #[error("malformed link line: {line}")]
    BadLink { line: String },
}

/// A source/destination pair: teleport entry and exit, or switch and target.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Link {
    pub sx: i32,
    pub sy: i32,
    pub dx: i32,
    pub dy: i32,
}

impl Link {
    /// Parse `sx,sy:dx,dy`.
    fn parse(text: &str) -> Option<Link> {
        let (src, dst) = text.split_once(':')?;
        let (sx, sy) = parse_pair(src)?;
        let (dx, dy) = parse_pair(dst)?;
        Some(Link { sx, sy, dx, dy })
    }
}

fn parse_pair(text: &str) -> Option<(i32, i32)> {
    let (a, b) = text.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Level header. Presentation keys are carried through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelInfo {
    pub author: String,
    pub level_name: String,
    pub seconds: i32,
    pub bg_file: String,
    pub tile_base: String,
    pub expl_base: String,
    pub wall_base: String,
    pub sound_dir: String,
    pub char_base: String,
    pub cursor_file: String,
    pub start_image: Option<String>,
    pub stop_image: Option<String>,
    pub show_tele_path: i32,
    pub show_switch_path: i32,
    pub completable: i32,
    pub teleports: Vec<Link>,
    pub switches: Vec<Link>,
}

impl Default for LevelInfo {
    fn default() -> Self {
        LevelInfo {
            author: "Unknown".into(),
            level_name: "Unnamed".into(),
            seconds: 120,
            bg_file: String::new(),
            tile_base: String::new(),
            expl_base: String::new(),
            wall_base: String::new(),
            sound_dir: String::new(),
            char_base: String::new(),
            cursor_file: String::new(),
            start_image: None,
            stop_image: None,
            show_tele_path: 0,
            show_switch_path: 0,
            completable: 0,
            teleports: Vec::new(),
            switches: Vec::new(),
        }
    }
}

/// Parsed level: header plus a row-major grid of tile kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelData {
    pub info: LevelInfo,
    pub tiles: Vec<Option<TileKind>>,
}

impl LevelData {
    pub fn tile(&self, x: i32, y: i32) -> Option<TileKind> {
        if x < 0 || y < 0 || x >= FIELD_SIZE || y >= FIELD_SIZE {
            return None;
        }
        self.tiles[(y * FIELD_SIZE + x) as usize]
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

pub fn load_level_file(path: &Path) -> Result<LevelData, LevelError> {
    let text = std::fs::read_to_string(path)?;
    let level = parse_level(&text)?;
    tracing::info!(path = %path.display(), name = %level.info.level_name, "level loaded");
    Ok(level)
}

/// Write a running field back to disk with the given header.
pub fn save_level(path: &Path, info: &LevelInfo, field: &Field) -> Result<(), LevelError> {
    std::fs::write(path, render_level(info, &field.save_grid()))?;
    tracing::info!(path = %path.display(), "level saved");
    Ok(())
}

/// Read only the header of a level and report its completable flag.
/// Unreadable files count as not completable.
pub fn is_level_completable(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_header(&text).0.completable != 0,
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not read level: {e}");
            false
        }
    }
}

/// Rewrite a level file with its completable flag changed.
pub fn set_level_completable(path: &Path, completable: bool) -> Result<(), LevelError> {
    let mut level = load_level_file(path)?;
    level.info.completable = completable as i32;
    std::fs::write(path, render_level(&level.info, &level.tiles))?;
    Ok(())
}

/// Level files in a directory, sorted by file name.
pub fn scan_levels(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |x| x == "lvl" || x == "txt"))
        .collect();
    paths.sort();
    paths
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

pub fn parse_level(text: &str) -> Result<LevelData, LevelError> {
    let (info, data) = parse_header(text);
    let data = data.ok_or(LevelError::MissingData)?;
    let n = FIELD_SIZE as usize;
    let mut tiles = vec![None; n * n];

    for (row, line) in data.lines().take(n).enumerate() {
        let line: String = line.chars().filter(|&c| c != '\r').collect();
        let bytes = line.as_bytes();
        if bytes.len() > n * 2 {
            return Err(LevelError::RowTooLong { row });
        }
        if bytes.len() % 2 != 0 {
            return Err(LevelError::OddRow { row });
        }
        for (col, pair) in bytes.chunks(2).enumerate() {
            let text = String::from_utf8_lossy(pair);
            let code: u8 = match text.parse() {
                Ok(c) if pair.iter().all(u8::is_ascii_digit) => c,
                _ => return Err(LevelError::BadCode { row, col, text: text.into_owned() }),
            };
            if code == 0 {
                continue;
            }
            match TileKind::from_code(code) {
                Some(kind) => tiles[row * n + col] = Some(kind),
                None => return Err(LevelError::UnknownCode { row, col, code }),
            }
        }
    }

    Ok(LevelData { info, tiles })
}

/// Parse header lines up to `[data]`. Returns the rest after the marker line.
fn parse_header(text: &str) -> (LevelInfo, Option<&str>) {
    let mut info = LevelInfo::default();
    let mut rest = text;

    while !rest.is_empty() {
        let (line, tail) = match rest.find('\n') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        rest = tail;
        let line = line.trim();

        if line == "[data]" {
            return (info, Some(rest));
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            tracing::debug!("ignoring header line: {line}");
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "author" => info.author = value.to_string(),
            "levelname" => info.level_name = value.to_string(),
            "seconds" => info.seconds = value.parse().unwrap_or(info.seconds),
            "bgfile" => info.bg_file = value.to_string(),
            "tilebase" => info.tile_base = value.to_string(),
            "explbase" => info.expl_base = value.to_string(),
            "wallbase" => info.wall_base = value.to_string(),
            "sounddir" => info.sound_dir = value.to_string(),
            "charbase" => info.char_base = value.to_string(),
            "cursorfile" => info.cursor_file = value.to_string(),
            "startimage" => info.start_image = image_name(value),
            "stopimage" => info.stop_image = image_name(value),
            "showtelepath" => info.show_tele_path = value.parse().unwrap_or(0),
            "showswitchpath" => info.show_switch_path = value.parse().unwrap_or(0),
            "completable" => info.completable = value.parse().unwrap_or(0),
            "teleport" => push_link(&mut info.teleports, value),
            "switch" => push_link(&mut info.switches, value),
            other => tracing::debug!("unknown header key {other}"),
        }
    }

    (info, None)
}

fn image_name(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn push_link(list: &mut Vec<Link>, value: &str) {
    match Link::parse(value) {
        Some(link) => list.push(link),
        None => tracing::warn!("{}", LevelError::BadLink { line: value.to_string() }),
    }
}

// ══════════════════════════════════════════════════════════════
// Rendering
// ══════════════════════════════════════════════════════════════

/// Serialise a level. Empty and reserved slots are written as `00`.
pub fn render_level(info: &LevelInfo, tiles: &[Option<TileKind>]) -> String {
    let mut out = String::new();
    let _ = write!(out, "#Author of level\nauthor={}\n\n", info.author);
    let _ = write!(out, "#Name of the level\nlevelname={}\n\n", info.level_name);
    let _ = write!(out, "#Seconds to complete level\nseconds={}\n\n", info.seconds);
    let _ = writeln!(out, "bgfile={}", info.bg_file);
    let _ = writeln!(out, "tilebase={}", info.tile_base);
    let _ = writeln!(out, "explbase={}", info.expl_base);
    let _ = writeln!(out, "wallbase={}", info.wall_base);
    let _ = writeln!(out, "sounddir={}", info.sound_dir);
    let _ = writeln!(out, "charbase={}", info.char_base);
    let _ = writeln!(out, "cursorfile={}", info.cursor_file);
    let _ = writeln!(out, "startimage={}", info.start_image.as_deref().unwrap_or("none"));
    let _ = writeln!(out, "stopimage={}", info.stop_image.as_deref().unwrap_or("none"));
    let _ = writeln!(out, "showtelepath={}", info.show_tele_path);
    let _ = writeln!(out, "showswitchpath={}", info.show_switch_path);
    let _ = writeln!(out, "completable={}", info.completable);

    if !info.teleports.is_empty() {
        out.push_str("\n#Teleports\n");
        write_links(&mut out, "teleport", &info.teleports);
    }
    if !info.switches.is_empty() {
        out.push_str("\n#Switches\n");
        write_links(&mut out, "switch", &info.switches);
    }

    out.push_str("\n#The level-data block\n[data]");
    let n = FIELD_SIZE as usize;
    for y in 0..n {
        out.push('\n');
        for x in 0..n {
            let code = tiles.get(y * n + x).copied().flatten().map_or(0, TileKind::code);
            debug_assert_ne!(code, RESERVED_CODE);
            let _ = write!(out, "{code:02}");
        }
    }
    out.push('\n');
    out
}

fn write_links(out: &mut String, key: &str, links: &[Link]) {
    for l in links {
        let _ = writeln!(out, "{key}={},{}:{},{}", l.sx, l.sy, l.dx, l.dy);
    }
}

// ══════════════════════════════════════════════════════════════
// Built-in level
// ══════════════════════════════════════════════════════════════

/// Small demo board used when no level files are found.
pub fn embedded_level() -> LevelData {
    const DEMO: &str = "\
levelname=Warm-up
author=Tilefall
seconds=90
teleport=2,5:8,2
[data]
1111111111111111111111
1100000000000000000011
1100000000000000000011
1100000000000000000011
1100000000000000000011
1100020000000001000011
1100111111001111110011
1100000000000000000011
1100010000000000020011
1100111300000000111111
1111111111111111111111
";
    match parse_level(DEMO) {
        Ok(level) => level,
        Err(e) => {
            tracing::error!("built-in level is broken: {e}");
            LevelData {
                info: LevelInfo::default(),
                tiles: vec![None; (FIELD_SIZE * FIELD_SIZE) as usize],
            }
        }
    }
}
