/// Field: the complete state of a running board.
///
/// ## Ownership
///
/// Cells live in a slot map arena (`cells`). The grid stores `Slot`s that
/// either point at a cell by key, are empty, or hold one of the two
/// reserved markers:
///   - `Reserved::Source`     : a cell is sliding out of (or dying in) this slot
///   - `Reserved::Destination`: a cell is sliding into this slot
///
/// A sliding cell is reachable only through `moving` until it commits.
/// Markers are plain tags, never cells, so nothing can free them twice.
///
/// All slot mutations go through `set_slot()`. Out-of-bounds reads answer
/// `Slot::Empty`, so neighbour checks need no bounds juggling.

use slotmap::{new_key_type, SlotMap};

use crate::config::EngineConfig;
use crate::domain::cell::Cell;
use crate::domain::edges::EdgeMask;
use crate::domain::tile::{TileKind, BRICK_VARIANTS};
use super::level::{LevelData, Link};
use super::switch::SwitchBoard;

/// Width and height of every board.
pub const FIELD_SIZE: i32 = 11;

new_key_type! {
    pub struct CellKey;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reserved {
    Source,
    Destination,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Slot {
    #[default]
    Empty,
    Cell(CellKey),
    Reserved(Reserved),
}

pub struct Field {
    /// Row-major grid, `FIELD_SIZE * FIELD_SIZE`.
    slots: Vec<Slot>,
    pub cells: SlotMap<CellKey, Cell>,
    /// Live bricks per variant, including dying and sliding ones.
    pub census: [u32; BRICK_VARIANTS as usize],
    /// Cells sliding between slots, in the order their moves started.
    pub moving: Vec<CellKey>,
    /// Cells queued for removal or counting down their death animation.
    pub removing: Vec<CellKey>,
    /// Switch-lifted walls waiting to be put back.
    pub deactivated: Vec<CellKey>,
    pub teleports: Vec<Link>,
    pub switches: SwitchBoard,
    pub cfg: EngineConfig,
    /// Death animation length for removed bricks.
    pub die_ticks: i32,
}

// ── Construction ──

impl Field {
    pub fn new(cfg: EngineConfig) -> Self {
        let n = (FIELD_SIZE * FIELD_SIZE) as usize;
        Field {
            slots: vec![Slot::Empty; n],
            cells: SlotMap::with_key(),
            census: [0; BRICK_VARIANTS as usize],
            moving: Vec::new(),
            removing: Vec::new(),
            deactivated: Vec::new(),
            teleports: Vec::new(),
            switches: SwitchBoard::default(),
            die_ticks: cfg.brick_die_ticks,
            cfg,
        }
    }

    /// Build a field from a parsed level: cells, wall edges, switch targets.
    pub fn from_level(level: &LevelData, cfg: EngineConfig) -> Self {
        let mut field = Field::new(cfg);
        for y in 0..FIELD_SIZE {
            for x in 0..FIELD_SIZE {
                if let Some(kind) = level.tile(x, y) {
                    field.create_cell(x, y, kind);
                }
            }
        }
        field.teleports = level.info.teleports.clone();
        field.switches = SwitchBoard::new(level.info.switches.clone());
        field.classify_static_edges();
        super::switch::set_targets(&mut field);
        tracing::debug!(
            cells = field.cells.len(),
            teleports = field.teleports.len(),
            "field loaded"
        );
        field
    }
}

// ── Slot query / mutation API ──

impl Field {
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < FIELD_SIZE && y < FIELD_SIZE
    }

    #[inline]
    fn index(x: i32, y: i32) -> usize {
        (y * FIELD_SIZE + x) as usize
    }

    /// Slot at (x, y). Out of bounds reads as empty.
    #[inline]
    pub fn slot(&self, x: i32, y: i32) -> Slot {
        if self.in_bounds(x, y) {
            self.slots[Self::index(x, y)]
        } else {
            Slot::Empty
        }
    }

    #[inline]
    pub fn set_slot(&mut self, x: i32, y: i32, slot: Slot) {
        if self.in_bounds(x, y) {
            self.slots[Self::index(x, y)] = slot;
        }
    }

    #[inline]
    pub fn is_empty(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.slot(x, y) == Slot::Empty
    }

    #[inline]
    pub fn is_reserved(&self, x: i32, y: i32) -> bool {
        matches!(self.slot(x, y), Slot::Reserved(_))
    }

    /// Key of the resting cell at (x, y), if any.
    pub fn cell_at(&self, x: i32, y: i32) -> Option<CellKey> {
        match self.slot(x, y) {
            Slot::Cell(key) if self.cells.contains_key(key) => Some(key),
            _ => None,
        }
    }

    pub fn cell_ref_at(&self, x: i32, y: i32) -> Option<&Cell> {
        self.cell_at(x, y).and_then(|k| self.cells.get(k))
    }

    pub fn kind_at(&self, x: i32, y: i32) -> Option<TileKind> {
        self.cell_ref_at(x, y).map(|c| c.kind)
    }

    /// Resting matchable brick at (x, y)?
    pub fn brick_at(&self, x: i32, y: i32) -> Option<CellKey> {
        self.cell_at(x, y).filter(|&k| self.cells[k].is_brick())
    }

    /// True iff (x, y) is in bounds and holds a static blocking tile.
    pub fn is_blocking(&self, x: i32, y: i32) -> bool {
        self.kind_at(x, y).map_or(false, TileKind::is_blocking)
    }

    /// Is the slot below (x, y) reserved (sliding or dying cell)?
    pub fn on_top_of_reserved(&self, x: i32, y: i32) -> bool {
        y + 1 < FIELD_SIZE && self.is_reserved(x, y + 1)
    }
}

// ── Cell lifecycle ──

impl Field {
    /// Create a cell resting at (x, y), replacing whatever the slot held.
    pub fn create_cell(&mut self, x: i32, y: i32, kind: TileKind) -> CellKey {
        let key = self.cells.insert(Cell::new(kind, x, y, &self.cfg));
        if let Some(v) = kind.brick_variant() {
            self.census[v as usize] += 1;
        }
        self.set_slot(x, y, Slot::Cell(key));
        key
    }

    /// Free a cell. Census is left alone; removal bookkeeping does that.
    pub fn destroy_cell(&mut self, key: CellKey) -> Option<Cell> {
        self.cells.remove(key)
    }

    /// Recompute edge masks for every blocking tile.
    pub fn classify_static_edges(&mut self) {
        let mut masks = Vec::new();
        for y in 0..FIELD_SIZE {
            for x in 0..FIELD_SIZE {
                if self.is_blocking(x, y) {
                    if let Some(key) = self.cell_at(x, y) {
                        masks.push((key, EdgeMask::classify(x, y, |ax, ay| self.is_blocking(ax, ay))));
                    }
                }
            }
        }
        for (key, mask) in masks {
            if let Some(c) = self.cells.get_mut(key) {
                c.edges = mask;
            }
        }
    }

    /// Tile kinds as they sit on the grid. Reserved and empty slots are `None`.
    pub fn tile_grid(&self) -> Vec<Option<TileKind>> {
        let mut out = Vec::with_capacity(self.slots.len());
        for y in 0..FIELD_SIZE {
            for x in 0..FIELD_SIZE {
                out.push(self.kind_at(x, y));
            }
        }
        out
    }

    /// Tile grid for writing back to a level file. A sliding cell goes to
    /// the slot it left. Lifted walls go home unless a cell took the slot.
    pub fn save_grid(&self) -> Vec<Option<TileKind>> {
        let mut out = self.tile_grid();
        let mut put = |x: i32, y: i32, kind: TileKind, overwrite: bool| {
            if self.in_bounds(x, y) {
                let slot = &mut out[Self::index(x, y)];
                if overwrite || slot.is_none() {
                    *slot = Some(kind);
                }
            }
        };
        for &key in &self.moving {
            if let Some(c) = self.cells.get(key) {
                put(c.sx, c.sy, c.kind, true);
            }
        }
        for &key in &self.removing {
            if let Some(c) = self.cells.get(key) {
                put(c.dx, c.dy, c.kind, true);
            }
        }
        for &key in &self.deactivated {
            if let Some(c) = self.cells.get(key) {
                put(c.dx, c.dy, c.kind, false);
            }
        }
        out
    }

    /// Pixel centre of a cell, for effect spawns.
    pub fn centre_of(&self, cell: &Cell) -> (i32, i32) {
        let half = self.cfg.tile_size / 2;
        (cell.px + half, cell.py + half)
    }
}

// ══════════════════════════════════════════════════════════════
// Test helpers
// ══════════════════════════════════════════════════════════════

/// Build a field from an ASCII diagram anchored at the top-left corner.
/// Legend:  '#'=Wall  'g'=Glue  '<'/'>'=One-way  'H'/'V'=Movers
///         'E'=Evil  'C'=Copy  'S'=Swap  'R'=Remove  '1'/'0'=Switch on/off
///         'a'..'j'=Brick variants 0..9  '.'/' '=Empty
#[cfg(test)]
pub fn field_from(rows: &[&str]) -> Field {
    let mut field = Field::new(EngineConfig::default());
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let kind = match ch {
                '#' => TileKind::Wall,
                'g' => TileKind::Glue,
                '<' => TileKind::OneWayLeft,
                '>' => TileKind::OneWayRight,
                'H' => TileKind::MoverHorizontal,
                'V' => TileKind::MoverVertical,
                'E' => TileKind::EvilTrigger,
                'C' => TileKind::CopyTrigger,
                'S' => TileKind::SwapTrigger,
                'R' => TileKind::RemoveTrigger,
                '1' => TileKind::SwitchOn,
                '0' => TileKind::SwitchOff,
                c @ 'a'..='j' => TileKind::Brick(c as u8 - b'a'),
                _ => continue,
            };
            field.create_cell(x as i32, y as i32, kind);
        }
    }
    field.classify_static_edges();
    field
}

/// Same as `field_from`, but the diagram is anchored at the bottom rows.
#[cfg(test)]
pub fn field_from_bottom(rows: &[&str]) -> Field {
    let pad = FIELD_SIZE as usize - rows.len();
    let mut all: Vec<&str> = vec![""; pad];
    all.extend_from_slice(rows);
    field_from(&all)
}
