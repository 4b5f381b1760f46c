/// Cell: one tile object living on the field.
///
/// A cell sits in exactly one grid slot while resting. While it slides
/// between slots the grid holds reserved markers and the cell is reachable
/// only through the field's move list, until it commits at its destination.

use super::edges::EdgeMask;
use super::tile::TileKind;
use crate::config::EngineConfig;

/// Lifecycle of a cell on the removal list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Removal {
    /// Enqueued this tick, break not yet announced.
    Queued,
    /// Break announced; slot is reserved until the countdown ends.
    Dying { remaining: i32 },
}

impl Removal {
    /// Advance a dying countdown. Returns true once it has run out.
    pub fn tick(&mut self, elapsed: i32) -> bool {
        match self {
            Removal::Queued => false,
            Removal::Dying { remaining } => {
                *remaining -= elapsed;
                *remaining < 1
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub kind: TileKind,
    /// Grid slot the current move started from (== dest while resting).
    pub sx: i32,
    pub sy: i32,
    /// Grid slot the cell is heading to (== source while resting).
    pub dx: i32,
    pub dy: i32,
    /// Pixel position, interpolated between slots.
    pub px: i32,
    pub py: i32,
    /// Pixels per tick on each axis; zero while resting.
    pub vx: i32,
    pub vy: i32,
    pub edges: EdgeMask,
    /// Switch-controlled. Inactive movers, floors and triggers do nothing.
    pub active: bool,
    /// Mover travel direction as a screen delta on its axis.
    pub heading: i32,
    /// Mover: ticks left blocked before reversing.
    pub mover_timer: i32,
    /// Copy/swap trigger: ticks until it may fire again.
    pub cooldown: i32,
    pub removal: Option<Removal>,
    /// Visited by the static scan this tick.
    pub checked: bool,
    pub cursor_lock: bool,
    /// Cursor push queued while sliding, applied at the end of the tick.
    pub nudge: i32,
}

impl Cell {
    pub fn new(kind: TileKind, x: i32, y: i32, cfg: &EngineConfig) -> Self {
        let heading = match kind {
            TileKind::MoverVertical => 1,
            _ => -1,
        };
        Cell {
            kind,
            sx: x,
            sy: y,
            dx: x,
            dy: y,
            px: cfg.pixel_x(x),
            py: cfg.pixel_y(y),
            vx: 0,
            vy: 0,
            edges: EdgeMask::default(),
            active: true,
            heading,
            mover_timer: cfg.mover_countdown,
            cooldown: 0,
            removal: None,
            checked: false,
            cursor_lock: false,
            nudge: 0,
        }
    }

    pub fn is_brick(&self) -> bool {
        self.kind.is_brick()
    }

    pub fn is_moving(&self) -> bool {
        self.vx != 0 || self.vy != 0
    }

    /// Has this cell been enqueued for removal (in any phase)?
    pub fn is_doomed(&self) -> bool {
        self.removal.is_some()
    }

    /// Mover countdown while blocked. Reverses heading when it runs out.
    pub fn mover_blocked(&mut self, elapsed: i32, countdown: i32) {
        self.mover_timer -= elapsed;
        if self.mover_timer < 1 {
            self.heading = -self.heading;
            self.mover_timer = countdown;
        }
    }
}
