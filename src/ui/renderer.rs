/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Cells are placed by their pixel position, so sliding bricks move in
/// half-tile steps across the two columns each tile occupies.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::EngineConfig;
use crate::domain::cell::Cell as BoardCell;
use crate::domain::cursor::CURSOR_MARGIN;
use crate::domain::edges::EdgeMask;
use crate::domain::tile::TileKind;
use crate::sim::event::{EffectPreset, GameEvent};
use crate::sim::field::FIELD_SIZE;
use crate::sim::session::{Phase, Session};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// inter-row gap colour matches on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: i32, y: i32, cell: Cell) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.cells[y as usize * self.width + x as usize] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn bg_at(&self, x: i32, y: i32) -> Color {
        if x < 0 || y < 0 {
            return Cell::BASE_BG;
        }
        self.get(x as usize, y as usize).bg
    }

    fn put_str(&mut self, x: i32, y: i32, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i as i32, y, Cell::new(ch, fg, Cell::BASE_BG));
        }
    }
}

// ── Particles ──

struct Spark {
    col: f32,
    row: f32,
    vcol: f32,
    vrow: f32,
    life: i32,
    color: Color,
}

// ── Layout ──

/// Each tile is two terminal columns wide and one row high.
const CELL_W: i32 = 2;
const HUD_ROW: i32 = 0;
const MAP_ROW: i32 = 2;
const MAP_COL: i32 = 2;
const FRAME: Color = Color::Rgb { r: 70, g: 70, b: 95 };

const BRICK_COLORS: [Color; 10] = [
    Color::Rgb { r: 220, g: 60, b: 60 },
    Color::Rgb { r: 60, g: 170, b: 230 },
    Color::Rgb { r: 240, g: 200, b: 40 },
    Color::Rgb { r: 80, g: 200, b: 90 },
    Color::Rgb { r: 190, g: 90, b: 220 },
    Color::Rgb { r: 240, g: 140, b: 40 },
    Color::Rgb { r: 60, g: 210, b: 190 },
    Color::Rgb { r: 230, g: 110, b: 170 },
    Color::Rgb { r: 150, g: 150, b: 160 },
    Color::Rgb { r: 150, g: 110, b: 70 },
];
const BRICK_MARKS: [char; 10] = ['o', 'x', '+', '=', '#', '%', '@', '&', '*', '~'];

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    sparks: Vec<Spark>,
    seed: u32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            sparks: Vec::new(),
            seed: 0x2545_f491,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    // ── Effects ──

    fn rand(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1103515245).wrapping_add(12345);
        (self.seed >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Turn particle events into sparks. Counts are scaled down to what a
    /// terminal can show.
    pub fn add_effects(&mut self, events: &[GameEvent], cfg: &EngineConfig) {
        for ev in events {
            let GameEvent::Effect { preset, px, py, count, life } = *ev else {
                continue;
            };
            let (col, row) = (pixel_col(px, cfg) as f32, pixel_row(py, cfg) as f32);
            for _ in 0..(count / 10).max(1) {
                let color = match preset {
                    EffectPreset::White => Color::White,
                    EffectPreset::Black => Color::DarkGrey,
                    EffectPreset::Color => {
                        let i = (self.rand() * BRICK_COLORS.len() as f32) as usize;
                        BRICK_COLORS[i.min(BRICK_COLORS.len() - 1)]
                    }
                };
                let vcol = (self.rand() - 0.5) * 0.02;
                let vrow = (self.rand() - 0.5) * 0.01;
                self.sparks.push(Spark { col, row, vcol, vrow, life: life as i32, color });
            }
        }
    }

    /// Advance sparks by `elapsed` ms.
    pub fn tick_effects(&mut self, elapsed: i32) {
        for s in &mut self.sparks {
            s.col += s.vcol * elapsed as f32;
            s.row += s.vrow * elapsed as f32;
            s.life -= elapsed;
        }
        self.sparks.retain(|s| s.life > 0);
    }

    // ── Frame ──

    pub fn render(&mut self, s: &Session) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        if self.last_phase != Some(s.phase) {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(s.phase);
        }

        self.front.clear();
        self.compose_hud(s);
        self.compose_frame();
        self.compose_board(s);
        self.compose_cursor(s);
        self.compose_sparks();
        self.compose_footer(s);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;

        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }
                if need_move {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
            }
            need_move = true;
        }
        self.writer.flush()
    }

    // ── Compose ──

    fn compose_hud(&mut self, s: &Session) {
        let secs = (s.time_left.max(0) + 999) / 1000;
        let hud = format!(
            " {:<18} Score:{:<6} Lives:{}  Time:{}:{:02}",
            s.level.info.level_name, s.score, s.lives, secs / 60, secs % 60,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White);
    }

    fn compose_frame(&mut self) {
        let w = FIELD_SIZE * CELL_W;
        for x in -1..=w {
            self.front.set(MAP_COL + x, MAP_ROW - 1, Cell::new('─', FRAME, Cell::BASE_BG));
            self.front.set(MAP_COL + x, MAP_ROW + FIELD_SIZE, Cell::new('─', FRAME, Cell::BASE_BG));
        }
        for y in 0..FIELD_SIZE {
            self.front.set(MAP_COL - 1, MAP_ROW + y, Cell::new('│', FRAME, Cell::BASE_BG));
            self.front.set(MAP_COL + w, MAP_ROW + y, Cell::new('│', FRAME, Cell::BASE_BG));
        }
        self.front.set(MAP_COL - 1, MAP_ROW - 1, Cell::new('┌', FRAME, Cell::BASE_BG));
        self.front.set(MAP_COL + w, MAP_ROW - 1, Cell::new('┐', FRAME, Cell::BASE_BG));
        self.front.set(MAP_COL - 1, MAP_ROW + FIELD_SIZE, Cell::new('└', FRAME, Cell::BASE_BG));
        self.front.set(MAP_COL + w, MAP_ROW + FIELD_SIZE, Cell::new('┘', FRAME, Cell::BASE_BG));
    }

    fn compose_board(&mut self, s: &Session) {
        let field = &s.field;
        let cfg = &field.cfg;
        let info = &s.level.info;

        if info.show_tele_path != 0 {
            for t in &field.teleports {
                for (x, y, mark) in [(t.sx, t.sy, '('), (t.dx, t.dy, ')')] {
                    let (col, row) = (MAP_COL + x * CELL_W, MAP_ROW + y);
                    self.front.set(col, row, Cell::new(mark, Color::DarkCyan, Cell::BASE_BG));
                    self.front.set(col + 1, row, Cell::new(mark, Color::DarkCyan, Cell::BASE_BG));
                }
            }
        }

        for &key in &field.deactivated {
            let c = &field.cells[key];
            let (col, row) = (MAP_COL + c.dx * CELL_W, MAP_ROW + c.dy);
            self.front.set(col, row, Cell::new('·', Color::DarkGrey, Cell::BASE_BG));
            self.front.set(col + 1, row, Cell::new('·', Color::DarkGrey, Cell::BASE_BG));
        }

        // Static tiles first so sliding bricks draw over them.
        let mut cells: Vec<&BoardCell> = field.cells.iter()
            .filter(|(k, _)| !field.deactivated.contains(k))
            .map(|(_, c)| c)
            .collect();
        cells.sort_by_key(|c| c.is_brick());
        for c in cells {
            let [left, right] = tile_glyphs(c);
            let col = MAP_COL + pixel_col(c.px, cfg);
            let row = MAP_ROW + pixel_row(c.py, cfg);
            self.front.set(col, row, left);
            self.front.set(col + 1, row, right);
        }
    }

    fn compose_cursor(&mut self, s: &Session) {
        if s.phase != Phase::Playing {
            return;
        }
        let cfg = &s.field.cfg;
        let col = MAP_COL + pixel_col(s.cursor.px + CURSOR_MARGIN, cfg);
        let row = MAP_ROW + pixel_row(s.cursor.py + CURSOR_MARGIN, cfg);
        let (fg, l, r) = if s.cursor.lock {
            (Color::Yellow, '[', ']')
        } else {
            (Color::White, '‹', '›')
        };
        // Brackets go in the neighbouring columns so the tile stays visible.
        let lb = self.front.bg_at(col - 1, row);
        let rb = self.front.bg_at(col + CELL_W, row);
        self.front.set(col - 1, row, Cell::new(l, fg, lb));
        self.front.set(col + CELL_W, row, Cell::new(r, fg, rb));
    }

    fn compose_sparks(&mut self) {
        for i in 0..self.sparks.len() {
            let s = &self.sparks[i];
            let (col, row, color) = (MAP_COL + s.col.round() as i32, MAP_ROW + s.row.round() as i32, s.color);
            let bg = self.front.bg_at(col, row);
            self.front.set(col, row, Cell::new('*', color, bg));
        }
    }

    fn compose_footer(&mut self, s: &Session) {
        let row = MAP_ROW + FIELD_SIZE + 1;
        let banner = match s.phase {
            Phase::Won => Some(("LEVEL COMPLETE", Color::Green)),
            Phase::Stuck => Some(("STUCK", Color::Yellow)),
            Phase::GameOver => Some(("GAME OVER", Color::Red)),
            Phase::Clearing => Some(("OUCH", Color::Red)),
            Phase::Playing => None,
        };
        if let Some((text, color)) = banner {
            let col = MAP_COL + (FIELD_SIZE * CELL_W - text.len() as i32) / 2;
            self.front.put_str(col, row, text, color);
        }
        if !s.message.is_empty() {
            self.front.put_str(1, row + 1, &s.message, Color::Grey);
        }
        self.front.put_str(
            1,
            row + 2,
            "arrows move  space grab  r restart  n next  F2 save  q quit",
            Color::DarkGrey,
        );
    }
}

// ── Glyph selection ──

/// Terminal column of a pixel x, relative to the board.
fn pixel_col(px: i32, cfg: &EngineConfig) -> i32 {
    ((px - cfg.board_offset_x) * CELL_W + cfg.tile_size / 2).div_euclid(cfg.tile_size)
}

/// Terminal row of a pixel y, relative to the board.
fn pixel_row(py: i32, cfg: &EngineConfig) -> i32 {
    (py - cfg.board_offset_y + cfg.tile_size / 2).div_euclid(cfg.tile_size)
}

/// Quadrant block for a fill pattern: bit 0 top-left, 1 top-right,
/// 2 bottom-left, 3 bottom-right.
const QUADRANTS: [char; 16] = [
    ' ', '▘', '▝', '▀', '▖', '▌', '▞', '▛', '▗', '▚', '▐', '▜', '▄', '▙', '▟', '█',
];

/// Wall halves with convex corners rounded off.
fn wall_glyphs(edges: EdgeMask) -> [char; 2] {
    let mut left = 0b1111u8;
    let mut right = 0b1111u8;
    if edges.has(EdgeMask::TOP_LEFT) { left &= !0b0001; }
    if edges.has(EdgeMask::BOTTOM_LEFT) { left &= !0b0100; }
    if edges.has(EdgeMask::TOP_RIGHT) { right &= !0b0010; }
    if edges.has(EdgeMask::BOTTOM_RIGHT) { right &= !0b1000; }
    [QUADRANTS[left as usize], QUADRANTS[right as usize]]
}

fn tile_glyphs(c: &BoardCell) -> [Cell; 2] {
    let dim = |col: Color| if c.active { col } else { Color::DarkGrey };
    let pair = |l: char, r: char, fg: Color| [Cell::new(l, fg, Cell::BASE_BG), Cell::new(r, fg, Cell::BASE_BG)];

    match c.kind {
        TileKind::Brick(v) => {
            let v = (v as usize).min(BRICK_COLORS.len() - 1);
            let color = BRICK_COLORS[v];
            if c.is_doomed() {
                pair('░', '░', color)
            } else {
                let mark = BRICK_MARKS[v];
                [Cell::new(mark, Color::Black, color), Cell::new(mark, Color::Black, color)]
            }
        }
        TileKind::Wall => {
            let [l, r] = wall_glyphs(c.edges);
            pair(l, r, Color::Rgb { r: 120, g: 120, b: 140 })
        }
        TileKind::Glue => pair('≈', '≈', Color::Rgb { r: 120, g: 200, b: 80 }),
        TileKind::OneWayLeft => pair('<', '<', dim(Color::Cyan)),
        TileKind::OneWayRight => pair('>', '>', dim(Color::Cyan)),
        TileKind::MoverHorizontal => match c.heading {
            h if h < 0 => pair('◂', '═', dim(Color::Yellow)),
            _ => pair('═', '▸', dim(Color::Yellow)),
        },
        TileKind::MoverVertical => match c.heading {
            h if h < 0 => pair('▴', '║', dim(Color::Yellow)),
            _ => pair('║', '▾', dim(Color::Yellow)),
        },
        TileKind::EvilTrigger => pair('!', '!', dim(Color::Red)),
        TileKind::RemoveTrigger => pair('x', 'x', dim(Color::Magenta)),
        TileKind::CopyTrigger => pair('+', '+', dim(Color::Green)),
        TileKind::SwapTrigger => pair('⇄', ' ', dim(Color::Blue)),
        TileKind::SwitchOn => pair('[', '|', Color::Green),
        TileKind::SwitchOff => pair('|', ']', Color::DarkRed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_wall_is_rounded() {
        let m = EdgeMask::classify(0, 0, |x, y| x == 0 && y == 0);
        assert_eq!(wall_glyphs(m), ['▐', '▌']);
        // a wall buried in walls is solid
        let m = EdgeMask::classify(5, 5, |_, _| true);
        assert_eq!(wall_glyphs(m), ['█', '█']);
    }

    #[test]
    fn pixels_map_to_half_tiles() {
        let cfg = EngineConfig::default();
        let t = cfg.tile_size;
        assert_eq!(pixel_col(cfg.pixel_x(3), &cfg), 6);
        assert_eq!(pixel_col(cfg.pixel_x(3) + t / 2, &cfg), 7);
        assert_eq!(pixel_row(cfg.pixel_y(4), &cfg), 4);
        assert_eq!(pixel_row(cfg.pixel_y(4) + t / 2 - 1, &cfg), 4);
    }

    #[test]
    fn doomed_brick_fades() {
        let cfg = EngineConfig::default();
        let mut c = BoardCell::new(TileKind::Brick(2), 0, 0, &cfg);
        assert_eq!(tile_glyphs(&c)[0].ch, '+');
        c.removal = Some(crate::domain::cell::Removal::Queued);
        assert_eq!(tile_glyphs(&c)[0].ch, '░');
    }

    #[test]
    fn sparks_expire() {
        let cfg = EngineConfig::default();
        let mut r = Renderer::new();
        let ev = GameEvent::Effect { preset: EffectPreset::White, px: 40, py: 40, count: 30, life: 200 };
        r.add_effects(&[ev], &cfg);
        assert_eq!(r.sparks.len(), 3);
        r.tick_effects(150);
        assert_eq!(r.sparks.len(), 3);
        r.tick_effects(50);
        assert!(r.sparks.is_empty());
    }
}
