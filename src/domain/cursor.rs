/// Cursor contract between the input layer and the engine.
///
/// The engine only reads the lock and grid position, and writes back the
/// pixel position while a locked brick slides or teleports.

#[derive(Clone, Debug, Default)]
pub struct Cursor {
    /// Grid slot under the cursor.
    pub x: i32,
    pub y: i32,
    /// Grid slot the cursor is heading to (follows a locked brick).
    pub dx: i32,
    pub dy: i32,
    /// Pixel position of the cursor frame.
    pub px: i32,
    pub py: i32,
    /// Holding a brick.
    pub lock: bool,
    /// Pointer button held (mouse/touch). Teleports drop the lock while held.
    pub pointer_down: bool,
}

/// Cursor frame is drawn this many pixels outside the tile.
pub const CURSOR_MARGIN: i32 = 4;

impl Cursor {
    pub fn at(x: i32, y: i32) -> Self {
        Cursor { x, y, dx: x, dy: y, ..Cursor::default() }
    }

    pub fn is_on(&self, x: i32, y: i32) -> bool {
        self.x == x && self.y == y
    }

    /// Track a brick's pixel position.
    pub fn follow_pixels(&mut self, px: i32, py: i32) {
        self.px = px - CURSOR_MARGIN;
        self.py = py - CURSOR_MARGIN;
    }

    /// Snap grid position to a slot.
    pub fn snap_to(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
        self.dx = x;
        self.dy = y;
    }
}
